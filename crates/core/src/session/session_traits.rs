use crate::errors::{Result, ServiceError};
use crate::session::session_model::{AuthResponse, Credentials, Registration};
use async_trait::async_trait;

/// Key/value store holding the signed-in user's session.
///
/// Implementations decide where values live (a JSON file for the command
/// line app, memory for tests).
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Login and registration endpoints.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(
        &self,
        credentials: &Credentials,
    ) -> std::result::Result<AuthResponse, ServiceError>;
    async fn register(
        &self,
        registration: &Registration,
    ) -> std::result::Result<AuthResponse, ServiceError>;
}
