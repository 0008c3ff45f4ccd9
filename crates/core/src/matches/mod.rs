//! Matches module - goal-match models, remote traits, and the aggregation engine.

mod matches_model;
mod matches_service;
mod matches_traits;

#[cfg(test)]
mod matches_service_tests;

pub use matches_model::{
    AggregationResult, DisplayName, EnrichedGoalMatch, GoalMatchRecord, GoalMatches, JoinPolicy,
    MatchStatus, RefreshOutcome,
};
pub use matches_service::MatchAggregator;
pub use matches_traits::{GoalMatchService, UserDetailService};
