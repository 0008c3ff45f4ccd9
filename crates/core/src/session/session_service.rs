use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::session_model::{AccountCreated, AuthResponse, Credentials, Registration, SignedIn};
use super::session_traits::{AuthService, SessionStore};
use crate::constants::USER_ID_KEY;
use crate::errors::{Error, Result};

/// Single access point to the signed-in user.
///
/// Callers read the user id here once and pass it explicitly into
/// aggregation and enrollment.
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    auth: Arc<dyn AuthService>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, auth: Arc<dyn AuthService>) -> Self {
        Self { store, auth }
    }

    /// The stored user id, or a session error when nobody is signed in.
    pub fn current_user_id(&self) -> Result<String> {
        match self.store.get(USER_ID_KEY)? {
            Some(id) if !id.trim().is_empty() => Ok(id),
            _ => Err(Error::session("Not signed in. Run `login` first.")),
        }
    }

    pub fn is_signed_in(&self) -> Result<bool> {
        Ok(self
            .store
            .get(USER_ID_KEY)?
            .is_some_and(|id| !id.trim().is_empty()))
    }

    pub async fn login(&self, credentials: Credentials) -> Result<SignedIn> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(Error::validation("Email and password are required"));
        }

        info!("[SessionService] Logging in {}", credentials.email);
        let response = self
            .auth
            .login(&credentials)
            .await
            .map_err(|e| Error::Auth(format!("Failed to login: {}", e)))?;

        self.store_session(response)
    }

    /// Create an account. The session is stored only when the server returns
    /// a user id with the confirmation; otherwise the user logs in next.
    pub async fn register(&self, registration: Registration) -> Result<AccountCreated> {
        if registration.name.trim().is_empty()
            || registration.email.trim().is_empty()
            || registration.password.is_empty()
        {
            return Err(Error::validation("Name, email and password are required"));
        }

        info!("[SessionService] Registering {}", registration.email);
        let response = self
            .auth
            .register(&registration)
            .await
            .map_err(|e| Error::Auth(format!("Failed to register: {}", e)))?;

        match response.user_id {
            Some(id) if !id.trim().is_empty() => {
                let signed_in = self.store_session(AuthResponse {
                    message: response.message,
                    user_id: Some(id),
                })?;
                Ok(AccountCreated {
                    message: signed_in.message,
                    user_id: Some(signed_in.user_id),
                })
            }
            _ => {
                debug!("[SessionService] Account created without a session");
                Ok(AccountCreated {
                    message: response.message,
                    user_id: None,
                })
            }
        }
    }

    pub fn logout(&self) -> Result<()> {
        info!("[SessionService] Clearing session");
        self.store.delete(USER_ID_KEY)
    }

    fn store_session(&self, response: AuthResponse) -> Result<SignedIn> {
        let user_id = match response.user_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                return Err(Error::Auth(format!(
                    "Server did not return a user id ({})",
                    response.message
                )))
            }
        };

        self.store.set(USER_ID_KEY, &user_id)?;
        debug!("[SessionService] Stored session for {}", user_id);
        Ok(SignedIn {
            user_id,
            message: response.message,
        })
    }
}

/// Session store that keeps values in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user_id: &str) -> Self {
        let store = Self::default();
        store
            .values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(USER_ID_KEY.to_string(), user_id.to_string());
        store
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ServiceError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockAuthService {
        response: Mutex<Option<std::result::Result<AuthResponse, ServiceError>>>,
    }

    impl MockAuthService {
        fn returning(response: std::result::Result<AuthResponse, ServiceError>) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Some(response)),
            })
        }

        fn take(&self) -> std::result::Result<AuthResponse, ServiceError> {
            self.response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(ServiceError::unavailable("no response queued")))
        }
    }

    #[async_trait]
    impl AuthService for MockAuthService {
        async fn login(
            &self,
            _credentials: &Credentials,
        ) -> std::result::Result<AuthResponse, ServiceError> {
            self.take()
        }

        async fn register(
            &self,
            _registration: &Registration,
        ) -> std::result::Result<AuthResponse, ServiceError> {
            self.take()
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            email: "ada@example.com".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_stores_user_id() {
        let store = Arc::new(InMemorySessionStore::new());
        let auth = MockAuthService::returning(Ok(AuthResponse {
            message: "Login successful".to_string(),
            user_id: Some("u1".to_string()),
        }));
        let session = SessionService::new(store.clone(), auth);

        let signed_in = session.login(credentials()).await.unwrap();

        assert_eq!(signed_in.user_id, "u1");
        assert_eq!(signed_in.message, "Login successful");
        assert_eq!(store.get(USER_ID_KEY).unwrap(), Some("u1".to_string()));
        assert_eq!(session.current_user_id().unwrap(), "u1");
    }

    #[tokio::test]
    async fn test_login_without_user_id_stores_nothing() {
        let store = Arc::new(InMemorySessionStore::new());
        let auth = MockAuthService::returning(Ok(AuthResponse {
            message: "Login successful".to_string(),
            user_id: None,
        }));
        let session = SessionService::new(store.clone(), auth);

        let err = session.login(credentials()).await.unwrap_err();

        assert!(matches!(err, Error::Auth(_)));
        assert_eq!(store.get(USER_ID_KEY).unwrap(), None);
        assert!(!session.is_signed_in().unwrap());
    }

    #[tokio::test]
    async fn test_rejected_login_is_an_auth_error() {
        let store = Arc::new(InMemorySessionStore::new());
        let auth = MockAuthService::returning(Err(ServiceError::api(401, "Invalid credentials")));
        let session = SessionService::new(store, auth);

        let err = session.login(credentials()).await.unwrap_err();
        assert!(err.to_string().contains("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_register_requires_all_fields() {
        let store = Arc::new(InMemorySessionStore::new());
        let auth = Arc::new(MockAuthService::default());
        let session = SessionService::new(store, auth);

        let err = session
            .register(Registration {
                name: " ".to_string(),
                email: "ada@example.com".to_string(),
                password: "hunter2".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
    }

    fn registration() -> Registration {
        Registration {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_without_user_id_succeeds_signed_out() {
        let store = Arc::new(InMemorySessionStore::new());
        let auth = MockAuthService::returning(Ok(AuthResponse {
            message: "User created successfully".to_string(),
            user_id: None,
        }));
        let session = SessionService::new(store.clone(), auth);

        let created = session.register(registration()).await.unwrap();

        assert_eq!(created.message, "User created successfully");
        assert_eq!(created.user_id, None);
        assert_eq!(store.get(USER_ID_KEY).unwrap(), None);
        assert!(!session.is_signed_in().unwrap());
    }

    #[tokio::test]
    async fn test_register_with_user_id_signs_in() {
        let store = Arc::new(InMemorySessionStore::new());
        let auth = MockAuthService::returning(Ok(AuthResponse {
            message: "User created successfully".to_string(),
            user_id: Some("u7".to_string()),
        }));
        let session = SessionService::new(store, auth);

        let created = session.register(registration()).await.unwrap();

        assert_eq!(created.user_id.as_deref(), Some("u7"));
        assert_eq!(session.current_user_id().unwrap(), "u7");
    }

    #[tokio::test]
    async fn test_rejected_registration_is_an_auth_error() {
        let store = Arc::new(InMemorySessionStore::new());
        let auth = MockAuthService::returning(Err(ServiceError::api(400, "Email already in use")));
        let session = SessionService::new(store, auth);

        let err = session.register(registration()).await.unwrap_err();
        assert!(matches!(err, Error::Auth(ref msg) if msg.contains("Email already in use")));
    }

    #[test]
    fn test_logout_clears_session() {
        let store = Arc::new(InMemorySessionStore::with_user("u1"));
        let session = SessionService::new(store, Arc::new(MockAuthService::default()));

        assert_eq!(session.current_user_id().unwrap(), "u1");
        session.logout().unwrap();
        assert!(matches!(session.current_user_id(), Err(Error::Session(_))));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let rendered = format!("{:?}", credentials());
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("ada@example.com"));
    }
}
