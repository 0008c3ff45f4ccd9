//! HabitBuddy Client - HTTP client for the HabitBuddy user service.
//!
//! This crate implements the remote service traits of `habitbuddy-core`
//! (goal matches, goal and user names, the goal catalog, enrollment and
//! authentication) on top of the user service cloud functions.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use habitbuddy_client::HabitBuddyClient;
//! use habitbuddy_core::MatchAggregator;
//!
//! let client = Arc::new(HabitBuddyClient::new("https://example.net/userservice")?);
//! let aggregator = MatchAggregator::new(client.clone(), client.clone(), client);
//! let result = aggregator.aggregate("u1").await?;
//! ```

mod client;
mod error;
mod types;

pub use client::{HabitBuddyClient, DEFAULT_TIMEOUT_SECS};
pub use error::{ClientError, Result};
pub use types::*;
