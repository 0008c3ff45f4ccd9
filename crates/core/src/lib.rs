//! HabitBuddy Core - goal-match aggregation and enrollment.
//!
//! This crate contains the client-side business logic for HabitBuddy.
//! It is transport-agnostic and defines the remote service traits that are
//! implemented by the `habitbuddy-client` crate.

pub mod constants;
pub mod enrollment;
pub mod errors;
pub mod goals;
pub mod matches;
pub mod session;

// Re-export the engines
pub use enrollment::EnrollmentWorkflow;
pub use matches::MatchAggregator;
pub use session::SessionService;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
pub use errors::ServiceError;
