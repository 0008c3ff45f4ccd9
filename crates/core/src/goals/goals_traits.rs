use crate::errors::ServiceError;
use crate::goals::goals_model::Goal;
use async_trait::async_trait;

/// Looks up a goal's display name by its identifier.
#[async_trait]
pub trait GoalDetailService: Send + Sync {
    async fn get_goal_name(&self, goal_id: &str) -> Result<String, ServiceError>;
}

/// Lists every goal a user can enroll in.
#[async_trait]
pub trait GoalCatalogService: Send + Sync {
    async fn get_all_goals(&self) -> Result<Vec<Goal>, ServiceError>;
}

/// Creates a goal membership for a user.
///
/// Returns the server's confirmation message.
#[async_trait]
pub trait EnrollmentService: Send + Sync {
    async fn add_user_goal(&self, user_id: &str, goal_id: &str) -> Result<String, ServiceError>;
}
