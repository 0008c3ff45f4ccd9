//! Wire types for HabitBuddy user service requests and responses.
//!
//! Responses are decoded into these shapes first and validated before they
//! are turned into core models, so a missing or empty required field fails
//! at the boundary instead of surfacing later as a blank name.

use serde::{Deserialize, Serialize};

use habitbuddy_core::goals::Goal;
use habitbuddy_core::matches::{GoalMatchRecord, GoalMatches, MatchStatus};

use crate::error::{ClientError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

/// Body of `POST /matches/getUserGoalMatches`.
#[derive(Debug, Clone, Serialize)]
pub struct UserGoalMatchesRequest<'a> {
    pub user_id: &'a str,
}

/// Body of `POST /goals/addUserGoal`.
#[derive(Debug, Clone, Serialize)]
pub struct AddUserGoalRequest<'a> {
    pub user_id: &'a str,
    pub goal_id: &'a str,
}

// ─────────────────────────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────────────────────────

/// A goal-match entry as the service sends it. Extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct GoalMatchWire {
    pub id: String,
    pub goal_id: String,
    #[serde(default)]
    pub matched_with: Option<String>,
}

impl GoalMatchWire {
    fn into_record(self, status: MatchStatus) -> Result<GoalMatchRecord> {
        require("goal match id", &self.id)?;
        require("goal_id", &self.goal_id)?;
        Ok(GoalMatchRecord {
            id: self.id,
            goal_id: self.goal_id,
            matched_with: self.matched_with.filter(|id| !id.trim().is_empty()),
            status,
        })
    }
}

/// Response of `POST /matches/getUserGoalMatches`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserGoalMatchesResponse {
    pub matched: Vec<GoalMatchWire>,
    pub unmatched: Vec<GoalMatchWire>,
}

impl UserGoalMatchesResponse {
    /// Validate required fields and tag each record with the list it came from.
    ///
    /// A matched entry without `matched_with` is passed through; the
    /// aggregator rejects it as an inconsistent record.
    pub fn into_goal_matches(self) -> Result<GoalMatches> {
        let matched = self
            .matched
            .into_iter()
            .map(|wire| wire.into_record(MatchStatus::Matched))
            .collect::<Result<Vec<_>>>()?;
        let unmatched = self
            .unmatched
            .into_iter()
            .map(|wire| wire.into_record(MatchStatus::Unmatched))
            .collect::<Result<Vec<_>>>()?;
        Ok(GoalMatches { matched, unmatched })
    }
}

/// Response of `GET /goals/{id}` and `GET /users/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct NameResponse {
    pub name: String,
}

impl NameResponse {
    pub fn into_name(self) -> Result<String> {
        require("name", &self.name)?;
        Ok(self.name)
    }
}

/// Catalog entry of `GET /getAllGoals`.
#[derive(Debug, Clone, Deserialize)]
pub struct GoalWire {
    pub id: String,
    pub name: String,
}

impl GoalWire {
    pub fn into_goal(self) -> Result<Goal> {
        require("goal id", &self.id)?;
        require("goal name", &self.name)?;
        Ok(Goal::new(self.id, self.name))
    }
}

/// Response carrying a server message (`addUserGoal`).
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body the service sends with non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorResponse {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClientError::malformed(format!("{} is empty", field)));
    }
    Ok(())
}
