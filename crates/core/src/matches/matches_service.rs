use chrono::Utc;
use futures::future::join_all;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::matches_model::{
    AggregationResult, DisplayName, EnrichedGoalMatch, GoalMatchRecord, JoinPolicy, MatchStatus,
    RefreshOutcome,
};
use super::matches_traits::{GoalMatchService, UserDetailService};
use crate::errors::{Error, Result, ServiceError};
use crate::goals::GoalDetailService;

type Lookup = std::result::Result<String, ServiceError>;

/// Fetches a user's goal matches and joins display names onto every record.
///
/// Each run issues one goal lookup per record and, for matched records, one
/// partner lookup. All lookups of a run are awaited together before anything
/// is returned, and results are zipped back by position so completion order
/// never leaks into the output.
pub struct MatchAggregator {
    match_service: Arc<dyn GoalMatchService>,
    goal_details: Arc<dyn GoalDetailService>,
    user_details: Arc<dyn UserDetailService>,
    policy: JoinPolicy,
    run_seq: AtomicU64,
    latest: RwLock<Option<Arc<AggregationResult>>>,
}

impl MatchAggregator {
    pub fn new(
        match_service: Arc<dyn GoalMatchService>,
        goal_details: Arc<dyn GoalDetailService>,
        user_details: Arc<dyn UserDetailService>,
    ) -> Self {
        Self {
            match_service,
            goal_details,
            user_details,
            policy: JoinPolicy::default(),
            run_seq: AtomicU64::new(0),
            latest: RwLock::new(None),
        }
    }

    pub fn with_policy(mut self, policy: JoinPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> JoinPolicy {
        self.policy
    }

    /// Fetch and enrich the user's goal matches.
    ///
    /// Fails with [`Error::Upstream`] when the match fetch fails and with
    /// [`Error::InconsistentRecord`] when a record breaks the match service
    /// contract. Under [`JoinPolicy::Strict`] any failed lookup fails the run
    /// with [`Error::Join`].
    pub async fn aggregate(&self, user_id: &str) -> Result<AggregationResult> {
        if user_id.trim().is_empty() {
            return Err(Error::validation("User id must not be empty"));
        }

        debug!("[MatchAggregator] Fetching goal matches for {}", user_id);
        let matches = self
            .match_service
            .get_user_goal_matches(user_id)
            .await
            .map_err(|source| Error::Upstream {
                user_id: user_id.to_string(),
                source,
            })?;

        validate_records(&matches.matched, MatchStatus::Matched)?;
        validate_records(&matches.unmatched, MatchStatus::Unmatched)?;

        debug!(
            "[MatchAggregator] Enriching {} matched and {} unmatched records",
            matches.matched.len(),
            matches.unmatched.len()
        );

        let (matched, unmatched) = futures::join!(
            self.enrich(matches.matched),
            self.enrich(matches.unmatched)
        );

        let result = AggregationResult {
            user_id: user_id.to_string(),
            matched: matched?,
            unmatched: unmatched?,
            fetched_at: Utc::now(),
        };

        let partial = result.partial_count();
        if partial > 0 {
            warn!(
                "[MatchAggregator] {} records for {} have unavailable names",
                partial, user_id
            );
        }

        Ok(result)
    }

    /// Run an aggregation and publish it if no newer run started meanwhile.
    ///
    /// A failed run leaves the published result untouched. Results and
    /// failures of superseded runs are discarded.
    pub async fn refresh(&self, user_id: &str) -> Result<RefreshOutcome> {
        let run_id = self.run_seq.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("[MatchAggregator] Starting run {} for {}", run_id, user_id);

        let outcome = self.aggregate(user_id).await;

        let mut latest = self.latest.write().unwrap_or_else(PoisonError::into_inner);
        let latest_run_id = self.run_seq.load(Ordering::SeqCst);
        if latest_run_id != run_id {
            info!(
                "[MatchAggregator] Discarding run {} (superseded by run {})",
                run_id, latest_run_id
            );
            return Ok(RefreshOutcome::Stale {
                run_id,
                latest_run_id,
            });
        }

        let result = Arc::new(outcome?);
        *latest = Some(result.clone());
        info!(
            "[MatchAggregator] Published run {}: {} matched, {} unmatched",
            run_id,
            result.matched.len(),
            result.unmatched.len()
        );
        Ok(RefreshOutcome::Published { run_id, result })
    }

    /// The most recently published result, if any.
    pub fn latest(&self) -> Option<Arc<AggregationResult>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn enrich(&self, records: Vec<GoalMatchRecord>) -> Result<Vec<EnrichedGoalMatch>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let lookups = records.iter().map(|record| self.lookup_names(record));
        let responses = join_all(lookups).await;

        records
            .into_iter()
            .zip(responses)
            .map(|(record, (goal_name, partner_name))| {
                self.join_record(record, goal_name, partner_name)
            })
            .collect()
    }

    async fn lookup_names(&self, record: &GoalMatchRecord) -> (Lookup, Option<Lookup>) {
        let goal = self.goal_details.get_goal_name(&record.goal_id);
        let partner = async {
            match (&record.status, record.matched_with.as_deref()) {
                (MatchStatus::Matched, Some(partner_id)) => {
                    Some(self.user_details.get_user_name(partner_id).await)
                }
                _ => None,
            }
        };
        futures::join!(goal, partner)
    }

    fn join_record(
        &self,
        record: GoalMatchRecord,
        goal_name: Lookup,
        partner_name: Option<Lookup>,
    ) -> Result<EnrichedGoalMatch> {
        let goal_name = self.resolve(&record.id, goal_name)?;
        let matched_with_name = match partner_name {
            Some(lookup) => Some(self.resolve(&record.id, lookup)?),
            None => None,
        };

        Ok(EnrichedGoalMatch {
            record,
            goal_name,
            matched_with_name,
        })
    }

    fn resolve(&self, record_id: &str, lookup: Lookup) -> Result<DisplayName> {
        match (lookup, self.policy) {
            (Ok(name), _) => Ok(DisplayName::available(name)),
            (Err(source), JoinPolicy::Strict) => Err(Error::Join {
                record_id: record_id.to_string(),
                source,
            }),
            (Err(source), JoinPolicy::BestEffort) => {
                warn!(
                    "[MatchAggregator] Lookup for record {} failed: {}",
                    record_id, source
                );
                Ok(DisplayName::unavailable(source.to_string()))
            }
        }
    }
}

fn validate_records(records: &[GoalMatchRecord], expected: MatchStatus) -> Result<()> {
    for record in records {
        if record.id.trim().is_empty() {
            return Err(Error::inconsistent("", "record has no id"));
        }
        if record.goal_id.trim().is_empty() {
            return Err(Error::inconsistent(&record.id, "record has no goal id"));
        }
        if record.status != expected {
            return Err(Error::inconsistent(
                &record.id,
                format!("{} record listed as {}", record.status, expected),
            ));
        }
        let has_partner = record
            .matched_with
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        if record.status == MatchStatus::Matched && !has_partner {
            return Err(Error::inconsistent(
                &record.id,
                "matched record has no counterpart user",
            ));
        }
    }
    Ok(())
}
