use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::enrollment_model::{EnrollmentSelection, EnrollmentState};
use crate::errors::{Error, Result};
use crate::goals::{EnrollmentConfirmation, EnrollmentService, Goal, GoalCatalogService};

/// Number of transitions kept in the history.
const HISTORY_LIMIT: usize = 32;

struct WorkflowInner {
    state: EnrollmentState,
    selection: EnrollmentSelection,
    catalog: Vec<Goal>,
    owned: HashSet<String>,
    /// Bumped on cancel so in-flight results land nowhere.
    epoch: u64,
    /// Goal of the enrollment request still awaiting a response, cancelled or not.
    in_flight: Option<String>,
    history: Vec<EnrollmentState>,
}

impl WorkflowInner {
    fn transition(&mut self, next: EnrollmentState) {
        debug!("[EnrollmentWorkflow] {} -> {}", self.state, next);
        self.state = next.clone();
        if self.history.len() == HISTORY_LIMIT {
            self.history.remove(0);
        }
        self.history.push(next);
    }
}

/// State machine for picking a goal from the catalog and enrolling in it.
///
/// Only one submission may be in flight; the lock is never held across an
/// await, so a second `submit` observes the pending request and is rejected.
/// This holds across `cancel` until the abandoned request has answered.
pub struct EnrollmentWorkflow {
    catalog_service: Arc<dyn GoalCatalogService>,
    enrollment_service: Arc<dyn EnrollmentService>,
    inner: Mutex<WorkflowInner>,
}

impl EnrollmentWorkflow {
    pub fn new(
        catalog_service: Arc<dyn GoalCatalogService>,
        enrollment_service: Arc<dyn EnrollmentService>,
    ) -> Self {
        Self {
            catalog_service,
            enrollment_service,
            inner: Mutex::new(WorkflowInner {
                state: EnrollmentState::Idle,
                selection: EnrollmentSelection::default(),
                catalog: Vec::new(),
                owned: HashSet::new(),
                epoch: 0,
                in_flight: None,
                history: vec![EnrollmentState::Idle],
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WorkflowInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> EnrollmentState {
        self.lock().state.clone()
    }

    pub fn selection(&self) -> EnrollmentSelection {
        self.lock().selection.clone()
    }

    /// States entered since the last cancel, oldest first. Only the most
    /// recent transitions are kept.
    pub fn history(&self) -> Vec<EnrollmentState> {
        self.lock().history.clone()
    }

    /// The full loaded catalog.
    pub fn catalog(&self) -> Vec<Goal> {
        self.lock().catalog.clone()
    }

    /// Catalog entries the user is not enrolled in yet.
    pub fn selectable_goals(&self) -> Vec<Goal> {
        let inner = self.lock();
        inner
            .catalog
            .iter()
            .filter(|goal| !inner.owned.contains(&goal.id))
            .cloned()
            .collect()
    }

    /// Record the goals the user already owns; they cannot be selected.
    pub fn mark_owned<I>(&self, goal_ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut inner = self.lock();
        inner.owned = goal_ids.into_iter().collect();
        let selected_is_owned = inner
            .selection
            .selected_goal_id
            .as_ref()
            .is_some_and(|id| inner.owned.contains(id));
        if selected_is_owned {
            inner.selection = EnrollmentSelection::default();
        }
    }

    /// Open (or reload) the catalog.
    ///
    /// The workflow is `Selecting` afterwards even when loading fails; the
    /// previous list is kept in that case.
    pub async fn open_catalog(&self) -> Result<Vec<Goal>> {
        let epoch = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            match inner.state {
                EnrollmentState::Submitting => {
                    return Err(Error::invalid_transition("open the catalog", &inner.state))
                }
                EnrollmentState::Selecting => {}
                EnrollmentState::Succeeded { .. } => {
                    inner.transition(EnrollmentState::Idle);
                    inner.transition(EnrollmentState::Selecting);
                }
                EnrollmentState::Idle | EnrollmentState::Failed { .. } => {
                    inner.transition(EnrollmentState::Selecting);
                }
            }
            inner.epoch
        };

        debug!("[EnrollmentWorkflow] Loading goal catalog");
        let loaded = self.catalog_service.get_all_goals().await;

        let mut inner = self.lock();
        if inner.epoch != epoch {
            info!("[EnrollmentWorkflow] Catalog load finished after cancel; ignoring");
            return loaded.map_err(Error::CatalogLoad);
        }

        match loaded {
            Ok(goals) => {
                info!("[EnrollmentWorkflow] Loaded {} goals", goals.len());
                inner.catalog = goals;
                let selected_is_known = inner
                    .selection
                    .selected_goal_id
                    .as_ref()
                    .is_some_and(|id| inner.catalog.iter().any(|g| &g.id == id));
                if !selected_is_known {
                    inner.selection = EnrollmentSelection::default();
                }
                Ok(inner
                    .catalog
                    .iter()
                    .filter(|goal| !inner.owned.contains(&goal.id))
                    .cloned()
                    .collect())
            }
            Err(e) => {
                warn!("[EnrollmentWorkflow] Failed to load catalog: {}", e);
                Err(Error::CatalogLoad(e))
            }
        }
    }

    /// Pick a goal from the loaded catalog. No network call.
    pub fn select_goal(&self, goal_id: &str) -> Result<()> {
        let mut inner = self.lock();
        if inner.state != EnrollmentState::Selecting {
            return Err(Error::invalid_transition("select a goal", &inner.state));
        }
        if !inner.catalog.iter().any(|goal| goal.id == goal_id) {
            return Err(Error::validation(format!(
                "Goal {} is not in the catalog",
                goal_id
            )));
        }
        if inner.owned.contains(goal_id) {
            return Err(Error::validation(format!(
                "Already enrolled in goal {}",
                goal_id
            )));
        }

        debug!("[EnrollmentWorkflow] Selected goal {}", goal_id);
        inner.selection.selected_goal_id = Some(goal_id.to_string());
        Ok(())
    }

    /// Submit the selected goal for `user_id`.
    ///
    /// On success the selection is cleared and the workflow is `Succeeded`.
    /// On failure it passes through `Failed` back to `Selecting` with the
    /// selection kept for a retry.
    pub async fn submit(&self, user_id: &str) -> Result<EnrollmentConfirmation> {
        let (goal_id, epoch) = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            if let Some(pending) = &inner.in_flight {
                debug!(
                    "[EnrollmentWorkflow] Enrollment in goal {} still pending; rejecting submit",
                    pending
                );
                return Err(Error::ConcurrentSubmission);
            }
            match inner.state {
                EnrollmentState::Submitting => return Err(Error::ConcurrentSubmission),
                EnrollmentState::Selecting => {}
                _ => return Err(Error::invalid_transition("submit", &inner.state)),
            }
            if user_id.trim().is_empty() {
                return Err(Error::validation("User id must not be empty"));
            }
            let goal_id = match &inner.selection.selected_goal_id {
                Some(id) => id.clone(),
                None => return Err(Error::validation("Please select a goal")),
            };
            inner.in_flight = Some(goal_id.clone());
            inner.transition(EnrollmentState::Submitting);
            (goal_id, inner.epoch)
        };

        info!("[EnrollmentWorkflow] Enrolling {} in goal {}", user_id, goal_id);
        let response = self
            .enrollment_service
            .add_user_goal(user_id, &goal_id)
            .await;

        let mut inner = self.lock();
        inner.in_flight = None;
        let cancelled = inner.epoch != epoch;
        if cancelled {
            info!(
                "[EnrollmentWorkflow] Submission for goal {} finished after cancel; ignoring",
                goal_id
            );
        }

        match response {
            Ok(message) => {
                if !cancelled {
                    inner.owned.insert(goal_id.clone());
                    inner.selection = EnrollmentSelection::default();
                    inner.transition(EnrollmentState::Succeeded {
                        message: message.clone(),
                    });
                }
                Ok(EnrollmentConfirmation { goal_id, message })
            }
            Err(source) => {
                if !cancelled {
                    warn!(
                        "[EnrollmentWorkflow] Enrollment in goal {} failed: {}",
                        goal_id, source
                    );
                    inner.transition(EnrollmentState::Failed {
                        reason: source.to_string(),
                    });
                    inner.transition(EnrollmentState::Selecting);
                }
                Err(Error::Enrollment { goal_id, source })
            }
        }
    }

    /// Leave `Succeeded` for `Idle`.
    pub fn acknowledge(&self) -> Result<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        match inner.state {
            EnrollmentState::Succeeded { .. } => {
                inner.transition(EnrollmentState::Idle);
                Ok(())
            }
            EnrollmentState::Idle => Ok(()),
            _ => Err(Error::invalid_transition("acknowledge", &inner.state)),
        }
    }

    /// Return to `Idle` from any state, dropping the selection, catalog and
    /// history.
    ///
    /// A submission in flight still completes remotely; its result is ignored
    /// and no new submission is accepted until it has answered.
    pub fn cancel(&self) {
        let mut inner = self.lock();
        debug!("[EnrollmentWorkflow] {} -> {} (cancelled)", inner.state, EnrollmentState::Idle);
        inner.epoch += 1;
        inner.selection = EnrollmentSelection::default();
        inner.catalog.clear();
        inner.state = EnrollmentState::Idle;
        inner.history = vec![EnrollmentState::Idle];
    }
}
