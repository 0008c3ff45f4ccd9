use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use habitbuddy_core::constants::DEFAULT_API_URL;
use habitbuddy_core::matches::JoinPolicy;

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub struct Config {
    pub api_url: String,
    pub session_file: PathBuf,
    pub request_timeout: Duration,
    pub join_policy: JoinPolicy,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_source(|key| std::env::var(key).ok())
    }

    fn from_source<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = var("HABITBUDDY_API_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let session_file = var("HABITBUDDY_SESSION_FILE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                var("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".habitbuddy")
                    .join("session.json")
            });
        let timeout_ms: u64 = var("HABITBUDDY_REQUEST_TIMEOUT_MS")
            .and_then(|raw| raw.trim().parse().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        let join_policy = match var("HABITBUDDY_JOIN_POLICY") {
            Some(raw) if !raw.trim().is_empty() => raw
                .parse::<JoinPolicy>()
                .map_err(anyhow::Error::msg)
                .context("Invalid HABITBUDDY_JOIN_POLICY")?,
            _ => JoinPolicy::default(),
        };
        Ok(Self {
            api_url,
            session_file,
            request_timeout: Duration::from_millis(timeout_ms),
            join_policy,
        })
    }
}
