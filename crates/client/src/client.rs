//! HabitBuddy API client for the user service cloud functions.
//!
//! One client implements every remote trait the core consumes.

use async_trait::async_trait;
use log::debug;
use std::time::Duration;

use habitbuddy_core::goals::{EnrollmentService, Goal, GoalCatalogService, GoalDetailService};
use habitbuddy_core::matches::{GoalMatchService, GoalMatches, UserDetailService};
use habitbuddy_core::session::{AuthResponse, AuthService, Credentials, Registration};
use habitbuddy_core::ServiceError;

use crate::error::{ClientError, Result};
use crate::types::*;

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client for the HabitBuddy user service.
#[derive(Debug, Clone)]
pub struct HabitBuddyClient {
    client: reqwest::Client,
    base_url: String,
}

impl HabitBuddyClient {
    /// Create a new client with the default timeout.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The user service base URL (e.g., "https://.../userservice")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a new client whose every request gives up after `timeout`.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::invalid_request(format!(
                "Base URL must be http(s): {}",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::invalid_request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        debug!("API response ({}): {}", status, body);

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .ok()
                .and_then(ApiErrorResponse::into_message)
                .unwrap_or_else(|| format!("Request failed: {}", body));
            return Err(ClientError::api(status.as_u16(), message));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "Failed to deserialize response. Body: {}, Error: {}",
                body,
                e
            );
            ClientError::malformed(format!("Failed to parse response: {}", e))
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Matches
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch a user's matched and unmatched goal records.
    ///
    /// POST /matches/getUserGoalMatches
    pub async fn fetch_user_goal_matches(&self, user_id: &str) -> Result<GoalMatches> {
        let url = format!("{}/matches/getUserGoalMatches", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&UserGoalMatchesRequest { user_id })
            .send()
            .await?;

        Self::parse_response::<UserGoalMatchesResponse>(response)
            .await?
            .into_goal_matches()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Goals
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a goal's display name.
    ///
    /// GET /goals/{goalId}
    pub async fn fetch_goal_name(&self, goal_id: &str) -> Result<String> {
        let url = format!("{}/goals/{}", self.base_url, urlencoding::encode(goal_id));

        let response = self.client.get(&url).send().await?;

        Self::parse_response::<NameResponse>(response)
            .await?
            .into_name()
    }

    /// List every selectable goal.
    ///
    /// GET /getAllGoals
    pub async fn fetch_all_goals(&self) -> Result<Vec<Goal>> {
        let url = format!("{}/getAllGoals", self.base_url);

        let response = self.client.get(&url).send().await?;

        Self::parse_response::<Vec<GoalWire>>(response)
            .await?
            .into_iter()
            .map(GoalWire::into_goal)
            .collect()
    }

    /// Enroll a user in a goal. Returns the server's confirmation message.
    ///
    /// POST /goals/addUserGoal
    pub async fn post_user_goal(&self, user_id: &str, goal_id: &str) -> Result<String> {
        let url = format!("{}/goals/addUserGoal", self.base_url);
        debug!("Adding goal {} for user {}", goal_id, user_id);

        let response = self
            .client
            .post(&url)
            .json(&AddUserGoalRequest { user_id, goal_id })
            .send()
            .await?;

        Ok(Self::parse_response::<MessageResponse>(response)
            .await?
            .message)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a user's display name.
    ///
    /// GET /users/{userId}
    pub async fn fetch_user_name(&self, user_id: &str) -> Result<String> {
        let url = format!("{}/users/{}", self.base_url, urlencoding::encode(user_id));

        let response = self.client.get(&url).send().await?;

        Self::parse_response::<NameResponse>(response)
            .await?
            .into_name()
    }

    /// Sign in with email and password.
    ///
    /// POST /users/login
    pub async fn post_login(&self, credentials: &Credentials) -> Result<AuthResponse> {
        let url = format!("{}/users/login", self.base_url);
        debug!("Logging in {}", credentials.email);

        let response = self.client.post(&url).json(credentials).send().await?;

        Self::parse_response(response).await
    }

    /// Create an account. The response carries a message and, on some
    /// deployments, the new user's id.
    ///
    /// POST /users/createUser
    pub async fn post_register(&self, registration: &Registration) -> Result<AuthResponse> {
        let url = format!("{}/users/createUser", self.base_url);
        debug!("Registering {}", registration.email);

        let response = self.client.post(&url).json(registration).send().await?;

        Self::parse_response(response).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Core service traits
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl GoalMatchService for HabitBuddyClient {
    async fn get_user_goal_matches(
        &self,
        user_id: &str,
    ) -> std::result::Result<GoalMatches, ServiceError> {
        Ok(self.fetch_user_goal_matches(user_id).await?)
    }
}

#[async_trait]
impl GoalDetailService for HabitBuddyClient {
    async fn get_goal_name(&self, goal_id: &str) -> std::result::Result<String, ServiceError> {
        Ok(self.fetch_goal_name(goal_id).await?)
    }
}

#[async_trait]
impl UserDetailService for HabitBuddyClient {
    async fn get_user_name(&self, user_id: &str) -> std::result::Result<String, ServiceError> {
        Ok(self.fetch_user_name(user_id).await?)
    }
}

#[async_trait]
impl GoalCatalogService for HabitBuddyClient {
    async fn get_all_goals(&self) -> std::result::Result<Vec<Goal>, ServiceError> {
        Ok(self.fetch_all_goals().await?)
    }
}

#[async_trait]
impl EnrollmentService for HabitBuddyClient {
    async fn add_user_goal(
        &self,
        user_id: &str,
        goal_id: &str,
    ) -> std::result::Result<String, ServiceError> {
        Ok(self.post_user_goal(user_id, goal_id).await?)
    }
}

#[async_trait]
impl AuthService for HabitBuddyClient {
    async fn login(
        &self,
        credentials: &Credentials,
    ) -> std::result::Result<AuthResponse, ServiceError> {
        Ok(self.post_login(credentials).await?)
    }

    async fn register(
        &self,
        registration: &Registration,
    ) -> std::result::Result<AuthResponse, ServiceError> {
        Ok(self.post_register(registration).await?)
    }
}
