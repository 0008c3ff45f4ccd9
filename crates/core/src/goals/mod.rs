//! Goals module - catalog models and the remote goal service traits.

mod goals_model;
mod goals_traits;

pub use goals_model::{EnrollmentConfirmation, Goal};
pub use goals_traits::{EnrollmentService, GoalCatalogService, GoalDetailService};
