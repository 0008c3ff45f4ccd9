//! Goal-match domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Whether a user's goal enrollment has a matching partner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MatchStatus {
    Matched,
    Unmatched,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::Matched => write!(f, "matched"),
            MatchStatus::Unmatched => write!(f, "unmatched"),
        }
    }
}

/// Raw goal-match record as returned by the match service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GoalMatchRecord {
    pub id: String,
    pub goal_id: String,
    pub matched_with: Option<String>,
    pub status: MatchStatus,
}

impl GoalMatchRecord {
    pub fn matched(
        id: impl Into<String>,
        goal_id: impl Into<String>,
        matched_with: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            goal_id: goal_id.into(),
            matched_with: Some(matched_with.into()),
            status: MatchStatus::Matched,
        }
    }

    pub fn unmatched(id: impl Into<String>, goal_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            goal_id: goal_id.into(),
            matched_with: None,
            status: MatchStatus::Unmatched,
        }
    }
}

/// A user's match records, split the way the match service returns them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GoalMatches {
    pub matched: Vec<GoalMatchRecord>,
    pub unmatched: Vec<GoalMatchRecord>,
}

impl GoalMatches {
    /// Goal ids across both lists.
    pub fn goal_ids(&self) -> HashSet<String> {
        self.matched
            .iter()
            .chain(self.unmatched.iter())
            .map(|record| record.goal_id.clone())
            .collect()
    }
}

/// Outcome of a single display-name lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DisplayName {
    Available { name: String },
    /// The lookup failed; the record is kept and the field marked.
    Unavailable { reason: String },
}

impl DisplayName {
    pub fn available(name: impl Into<String>) -> Self {
        Self::Available { name: name.into() }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DisplayName::Available { name } => Some(name),
            DisplayName::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, DisplayName::Available { .. })
    }
}

/// A goal-match record joined with its display names.
///
/// `matched_with_name` is present only for matched records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedGoalMatch {
    #[serde(flatten)]
    pub record: GoalMatchRecord,
    pub goal_name: DisplayName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_with_name: Option<DisplayName>,
}

impl EnrichedGoalMatch {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn goal_id(&self) -> &str {
        &self.record.goal_id
    }

    /// True when some lookup for this record came back unavailable.
    pub fn is_partial(&self) -> bool {
        !self.goal_name.is_available()
            || self
                .matched_with_name
                .as_ref()
                .is_some_and(|name| !name.is_available())
    }
}

/// Both enriched lists for one user, in the order the match service returned them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub user_id: String,
    pub matched: Vec<EnrichedGoalMatch>,
    pub unmatched: Vec<EnrichedGoalMatch>,
    pub fetched_at: DateTime<Utc>,
}

impl AggregationResult {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            matched: Vec::new(),
            unmatched: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matched.is_empty() && self.unmatched.is_empty()
    }

    /// Goal ids the user is already enrolled in, matched or not.
    pub fn owned_goal_ids(&self) -> HashSet<String> {
        self.matched
            .iter()
            .chain(self.unmatched.iter())
            .map(|m| m.record.goal_id.clone())
            .collect()
    }

    pub fn partial_count(&self) -> usize {
        self.matched
            .iter()
            .chain(self.unmatched.iter())
            .filter(|m| m.is_partial())
            .count()
    }
}

/// How enrichment failures affect an aggregation run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum JoinPolicy {
    /// Any failed lookup fails the whole run.
    Strict,
    /// Failed lookups are marked unavailable and every record is kept.
    #[default]
    BestEffort,
}

impl std::str::FromStr for JoinPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(JoinPolicy::Strict),
            "best-effort" | "best_effort" | "besteffort" => Ok(JoinPolicy::BestEffort),
            other => Err(format!("Unknown join policy: {}", other)),
        }
    }
}

/// Result of a publishing refresh.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// The run was the latest one started and its result is now published.
    Published {
        run_id: u64,
        result: Arc<AggregationResult>,
    },
    /// A newer run started while this one was in flight; its result was dropped.
    Stale { run_id: u64, latest_run_id: u64 },
}

impl RefreshOutcome {
    pub fn run_id(&self) -> u64 {
        match self {
            RefreshOutcome::Published { run_id, .. } | RefreshOutcome::Stale { run_id, .. } => {
                *run_id
            }
        }
    }

    pub fn published(&self) -> Option<&Arc<AggregationResult>> {
        match self {
            RefreshOutcome::Published { result, .. } => Some(result),
            RefreshOutcome::Stale { .. } => None,
        }
    }
}
