//! Tests for MatchAggregator enrichment, join policies and run publication.

use crate::errors::{Error, ServiceError};
use crate::goals::GoalDetailService;
use crate::matches::{
    DisplayName, GoalMatchRecord, GoalMatchService, GoalMatches, JoinPolicy, MatchAggregator,
    RefreshOutcome, UserDetailService,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =========================================================================
// Mock GoalMatchService
// =========================================================================

type MatchResponse = (u64, Result<GoalMatches, ServiceError>);

#[derive(Default)]
struct MockMatchService {
    responses: Mutex<VecDeque<MatchResponse>>,
    calls: AtomicUsize,
}

impl MockMatchService {
    fn returning(matches: GoalMatches) -> Arc<Self> {
        let service = Self::default();
        service.push(0, Ok(matches));
        Arc::new(service)
    }

    fn push(&self, delay_ms: u64, response: Result<GoalMatches, ServiceError>) {
        self.responses
            .lock()
            .unwrap()
            .push_back((delay_ms, response));
    }
}

#[async_trait]
impl GoalMatchService for MockMatchService {
    async fn get_user_goal_matches(&self, _user_id: &str) -> Result<GoalMatches, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().unwrap().pop_front();
        let (delay_ms, response) =
            next.unwrap_or_else(|| (0, Err(ServiceError::unavailable("no response queued"))));
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        response
    }
}

// =========================================================================
// Mock name directory (used for both goal and user lookups)
// =========================================================================

#[derive(Default)]
struct MockNames {
    names: HashMap<String, String>,
    delays_ms: HashMap<String, u64>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl MockNames {
    fn with(entries: &[(&str, &str)]) -> Self {
        Self {
            names: entries
                .iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    fn delay(mut self, id: &str, ms: u64) -> Self {
        self.delays_ms.insert(id.to_string(), ms);
        self
    }

    fn fail(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn lookup(&self, id: &str) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ms) = self.delays_ms.get(id) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        if self.failing.contains(id) {
            return Err(ServiceError::api(500, format!("lookup for {} failed", id)));
        }
        self.names
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::api(404, format!("{} not found", id)))
    }
}

#[async_trait]
impl GoalDetailService for MockNames {
    async fn get_goal_name(&self, goal_id: &str) -> Result<String, ServiceError> {
        self.lookup(goal_id).await
    }
}

#[async_trait]
impl UserDetailService for MockNames {
    async fn get_user_name(&self, user_id: &str) -> Result<String, ServiceError> {
        self.lookup(user_id).await
    }
}

fn aggregator(
    matches: Arc<MockMatchService>,
    goals: &Arc<MockNames>,
    users: &Arc<MockNames>,
) -> MatchAggregator {
    MatchAggregator::new(matches, goals.clone(), users.clone())
}

fn goal_catalog() -> MockNames {
    MockNames::with(&[
        ("g1", "Run 5k"),
        ("g2", "Read"),
        ("g3", "Meditate"),
        ("g4", "Swim"),
        ("g5", "Write"),
    ])
}

fn people() -> MockNames {
    MockNames::with(&[
        ("u2", "Alice"),
        ("u3", "Bob"),
        ("u4", "Carol"),
        ("u5", "Dan"),
        ("u6", "Eve"),
    ])
}

// =========================================================================
// Enrichment
// =========================================================================

#[tokio::test]
async fn test_matched_record_gets_goal_and_partner_names() {
    let matches = MockMatchService::returning(GoalMatches {
        matched: vec![GoalMatchRecord::matched("m1", "g1", "u2")],
        unmatched: vec![],
    });
    let goals = Arc::new(goal_catalog());
    let users = Arc::new(people());

    let result = aggregator(matches, &goals, &users)
        .aggregate("u1")
        .await
        .unwrap();

    assert_eq!(result.user_id, "u1");
    assert_eq!(result.matched.len(), 1);
    let m1 = &result.matched[0];
    assert_eq!(m1.id(), "m1");
    assert_eq!(m1.record.matched_with.as_deref(), Some("u2"));
    assert_eq!(m1.goal_name, DisplayName::available("Run 5k"));
    assert_eq!(m1.matched_with_name, Some(DisplayName::available("Alice")));
    assert!(result.unmatched.is_empty());
}

#[tokio::test]
async fn test_order_preserved_when_lookups_complete_out_of_order() {
    let matched = vec![
        GoalMatchRecord::matched("m1", "g1", "u2"),
        GoalMatchRecord::matched("m2", "g2", "u3"),
        GoalMatchRecord::matched("m3", "g3", "u4"),
        GoalMatchRecord::matched("m4", "g4", "u5"),
    ];
    let matches = MockMatchService::returning(GoalMatches {
        matched: matched.clone(),
        unmatched: vec![GoalMatchRecord::unmatched("x1", "g5")],
    });
    // Earlier records resolve last.
    let goals = Arc::new(
        goal_catalog()
            .delay("g1", 40)
            .delay("g2", 30)
            .delay("g3", 20)
            .delay("g4", 10),
    );
    let users = Arc::new(people().delay("u2", 5).delay("u5", 35));

    let result = aggregator(matches, &goals, &users)
        .aggregate("u1")
        .await
        .unwrap();

    let pairs: Vec<_> = result
        .matched
        .iter()
        .map(|m| (m.record.goal_id.clone(), m.record.matched_with.clone()))
        .collect();
    let expected: Vec<_> = matched
        .iter()
        .map(|r| (r.goal_id.clone(), r.matched_with.clone()))
        .collect();
    assert_eq!(pairs, expected);

    let names: Vec<_> = result
        .matched
        .iter()
        .map(|m| {
            (
                m.goal_name.as_str().unwrap().to_string(),
                m.matched_with_name
                    .as_ref()
                    .and_then(|n| n.as_str())
                    .unwrap()
                    .to_string(),
            )
        })
        .collect();
    assert_eq!(
        names,
        vec![
            ("Run 5k".to_string(), "Alice".to_string()),
            ("Read".to_string(), "Bob".to_string()),
            ("Meditate".to_string(), "Carol".to_string()),
            ("Swim".to_string(), "Dan".to_string()),
        ]
    );
    assert_eq!(result.unmatched[0].goal_name, DisplayName::available("Write"));
}

#[tokio::test]
async fn test_empty_lists_issue_no_lookups() {
    let matches = MockMatchService::returning(GoalMatches::default());
    let goals = Arc::new(goal_catalog());
    let users = Arc::new(people());

    let result = aggregator(matches, &goals, &users)
        .aggregate("u1")
        .await
        .unwrap();

    assert!(result.matched.is_empty());
    assert!(result.unmatched.is_empty());
    assert_eq!(goals.calls(), 0);
    assert_eq!(users.calls(), 0);
}

#[tokio::test]
async fn test_unmatched_records_skip_partner_lookup() {
    let matches = MockMatchService::returning(GoalMatches {
        matched: vec![],
        unmatched: vec![
            GoalMatchRecord::unmatched("x1", "g1"),
            GoalMatchRecord::unmatched("x2", "g2"),
        ],
    });
    let goals = Arc::new(goal_catalog());
    let users = Arc::new(people());

    let result = aggregator(matches, &goals, &users)
        .aggregate("u1")
        .await
        .unwrap();

    assert_eq!(result.unmatched.len(), 2);
    assert!(result.unmatched.iter().all(|m| m.matched_with_name.is_none()));
    assert_eq!(goals.calls(), 2);
    assert_eq!(users.calls(), 0);
}

// =========================================================================
// Failure handling
// =========================================================================

#[tokio::test]
async fn test_upstream_failure_is_reported() {
    let matches = Arc::new(MockMatchService::default());
    matches.push(0, Err(ServiceError::unavailable("connection refused")));
    let goals = Arc::new(goal_catalog());
    let users = Arc::new(people());

    let err = aggregator(matches, &goals, &users)
        .aggregate("u1")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Upstream { ref user_id, .. } if user_id == "u1"));
    assert_eq!(goals.calls(), 0);
}

#[tokio::test]
async fn test_strict_policy_fails_whole_run_on_single_lookup_failure() {
    let matches = MockMatchService::returning(GoalMatches {
        matched: vec![
            GoalMatchRecord::matched("m1", "g1", "u2"),
            GoalMatchRecord::matched("m2", "g2", "u3"),
        ],
        unmatched: vec![GoalMatchRecord::unmatched("x1", "g3")],
    });
    let goals = Arc::new(goal_catalog());
    let users = Arc::new(people().fail("u3"));

    let err = aggregator(matches, &goals, &users)
        .with_policy(JoinPolicy::Strict)
        .aggregate("u1")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Join { ref record_id, .. } if record_id == "m2"));
}

#[tokio::test]
async fn test_best_effort_marks_failed_fields_unavailable() {
    let matches = MockMatchService::returning(GoalMatches {
        matched: vec![
            GoalMatchRecord::matched("m1", "g1", "u2"),
            GoalMatchRecord::matched("m2", "g2", "u3"),
        ],
        unmatched: vec![GoalMatchRecord::unmatched("x1", "g3")],
    });
    let goals = Arc::new(goal_catalog().fail("g3"));
    let users = Arc::new(people().fail("u3"));

    let aggregator = aggregator(matches, &goals, &users);
    assert_eq!(aggregator.policy(), JoinPolicy::BestEffort);
    let result = aggregator.aggregate("u1").await.unwrap();

    assert_eq!(result.matched.len(), 2);
    assert_eq!(result.unmatched.len(), 1);
    assert_eq!(result.matched[1].goal_name, DisplayName::available("Read"));
    assert!(matches!(
        result.matched[1].matched_with_name,
        Some(DisplayName::Unavailable { .. })
    ));
    assert!(!result.unmatched[0].goal_name.is_available());
    assert!(!result.matched[0].is_partial());
    assert_eq!(result.partial_count(), 2);
}

#[tokio::test]
async fn test_matched_record_without_partner_fails_fast() {
    let mut broken = GoalMatchRecord::matched("m2", "g2", "u3");
    broken.matched_with = None;
    let matches = MockMatchService::returning(GoalMatches {
        matched: vec![GoalMatchRecord::matched("m1", "g1", "u2"), broken],
        unmatched: vec![],
    });
    let goals = Arc::new(goal_catalog());
    let users = Arc::new(people());

    let err = aggregator(matches, &goals, &users)
        .aggregate("u1")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InconsistentRecord { ref record_id, .. } if record_id == "m2"));
    assert_eq!(goals.calls(), 0);
    assert_eq!(users.calls(), 0);
}

#[tokio::test]
async fn test_record_in_wrong_list_is_inconsistent() {
    let matches = MockMatchService::returning(GoalMatches {
        matched: vec![],
        unmatched: vec![GoalMatchRecord::matched("m1", "g1", "u2")],
    });
    let goals = Arc::new(goal_catalog());
    let users = Arc::new(people());

    let err = aggregator(matches, &goals, &users)
        .aggregate("u1")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InconsistentRecord { .. }));
}

#[tokio::test]
async fn test_blank_user_id_is_rejected() {
    let matches = MockMatchService::returning(GoalMatches::default());
    let goals = Arc::new(goal_catalog());
    let users = Arc::new(people());
    let service = matches.clone();

    let err = aggregator(matches, &goals, &users)
        .aggregate("  ")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(service.calls.load(Ordering::SeqCst), 0);
}

// =========================================================================
// Publication
// =========================================================================

#[tokio::test]
async fn test_failed_refresh_keeps_published_result() {
    let matches = Arc::new(MockMatchService::default());
    matches.push(
        0,
        Ok(GoalMatches {
            matched: vec![GoalMatchRecord::matched("m1", "g1", "u2")],
            unmatched: vec![],
        }),
    );
    matches.push(0, Err(ServiceError::unavailable("timeout")));
    let goals = Arc::new(goal_catalog());
    let users = Arc::new(people());
    let aggregator = aggregator(matches, &goals, &users);

    assert!(aggregator.latest().is_none());
    let first = aggregator.refresh("u1").await.unwrap();
    assert_eq!(first.run_id(), 1);
    assert!(first.published().is_some());

    let err = aggregator.refresh("u1").await.unwrap_err();
    assert!(matches!(err, Error::Upstream { .. }));

    let latest = aggregator.latest().unwrap();
    assert_eq!(latest.matched.len(), 1);
    assert_eq!(latest.matched[0].id(), "m1");
}

#[tokio::test]
async fn test_superseded_refresh_is_discarded() {
    let matches = Arc::new(MockMatchService::default());
    matches.push(
        60,
        Ok(GoalMatches {
            matched: vec![],
            unmatched: vec![GoalMatchRecord::unmatched("old", "g1")],
        }),
    );
    matches.push(
        0,
        Ok(GoalMatches {
            matched: vec![],
            unmatched: vec![GoalMatchRecord::unmatched("new", "g2")],
        }),
    );
    let goals = Arc::new(goal_catalog());
    let users = Arc::new(people());
    let aggregator = aggregator(matches, &goals, &users);

    let (slow, fast) = tokio::join!(aggregator.refresh("u1"), aggregator.refresh("u1"));

    let slow = slow.unwrap();
    let fast = fast.unwrap();
    assert!(matches!(
        slow,
        RefreshOutcome::Stale {
            run_id: 1,
            latest_run_id: 2
        }
    ));
    assert!(fast.published().is_some());

    let latest = aggregator.latest().unwrap();
    assert_eq!(latest.unmatched[0].id(), "new");
}
