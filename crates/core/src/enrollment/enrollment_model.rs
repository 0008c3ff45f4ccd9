//! Enrollment workflow models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle state of the enrollment workflow.
///
///   Idle → Selecting → Submitting → Succeeded → Idle
///                          └──────→ Failed → Selecting
///   (any state → Idle on cancel)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EnrollmentState {
    Idle,
    /// Catalog opened; the user is choosing a goal.
    Selecting,
    /// An enrollment request is in flight.
    Submitting,
    Succeeded { message: String },
    Failed { reason: String },
}

impl fmt::Display for EnrollmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrollmentState::Idle => write!(f, "idle"),
            EnrollmentState::Selecting => write!(f, "selecting"),
            EnrollmentState::Submitting => write!(f, "submitting"),
            EnrollmentState::Succeeded { .. } => write!(f, "succeeded"),
            EnrollmentState::Failed { .. } => write!(f, "failed"),
        }
    }
}

/// The goal currently picked in the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentSelection {
    pub selected_goal_id: Option<String>,
}

impl EnrollmentSelection {
    pub fn is_empty(&self) -> bool {
        self.selected_goal_id.is_none()
    }
}
