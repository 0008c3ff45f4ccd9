//! Session module - the signed-in user and the login/register flows.

mod session_model;
mod session_service;
mod session_traits;

pub use session_model::{AccountCreated, AuthResponse, Credentials, Registration, SignedIn};
pub use session_service::{InMemorySessionStore, SessionService};
pub use session_traits::{AuthService, SessionStore};
