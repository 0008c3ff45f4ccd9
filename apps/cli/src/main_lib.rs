use std::sync::Arc;

use habitbuddy_client::HabitBuddyClient;
use habitbuddy_core::matches::{GoalMatchService, JoinPolicy};
use habitbuddy_core::{EnrollmentWorkflow, MatchAggregator, SessionService};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{config::Config, session_store::FileSessionStore};

pub struct AppState {
    pub session: SessionService,
    pub match_service: Arc<dyn GoalMatchService>,
    pub aggregator: MatchAggregator,
    pub workflow: EnrollmentWorkflow,
}

pub fn init_tracing() {
    let log_format = std::env::var("HABITBUDDY_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

/// Wire the HTTP client and the file session store into the core services.
///
/// `join_policy` overrides the configured policy when set.
pub fn build_state(config: &Config, join_policy: Option<JoinPolicy>) -> anyhow::Result<AppState> {
    let client = Arc::new(HabitBuddyClient::with_timeout(
        &config.api_url,
        config.request_timeout,
    )?);
    tracing::debug!("API base URL in use: {}", client.base_url());

    let store = Arc::new(FileSessionStore::new(config.session_file.clone()));
    tracing::debug!("Session file in use: {}", config.session_file.display());

    let policy = join_policy.unwrap_or(config.join_policy);
    let session = SessionService::new(store, client.clone());
    let aggregator =
        MatchAggregator::new(client.clone(), client.clone(), client.clone()).with_policy(policy);
    let workflow = EnrollmentWorkflow::new(client.clone(), client.clone());

    Ok(AppState {
        session,
        match_service: client,
        aggregator,
        workflow,
    })
}
