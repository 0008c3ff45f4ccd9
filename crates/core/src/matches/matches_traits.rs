use crate::errors::ServiceError;
use crate::matches::matches_model::GoalMatches;
use async_trait::async_trait;

/// Returns a user's matched and unmatched goal-match records.
#[async_trait]
pub trait GoalMatchService: Send + Sync {
    async fn get_user_goal_matches(&self, user_id: &str) -> Result<GoalMatches, ServiceError>;
}

/// Looks up a user's display name by their identifier.
#[async_trait]
pub trait UserDetailService: Send + Sync {
    async fn get_user_name(&self, user_id: &str) -> Result<String, ServiceError>;
}
