//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources: the pipeline, the in-memory backends, and the config.

use crate::config::Config;
use crate::memory::{ActivityFeed, MemoryStore, Outbox, RosterMatcher};
use memora_core::pipeline::Pipeline;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<MemoryStore>,
    pub outbox: Arc<Outbox>,
    pub activity: Arc<ActivityFeed>,
    pub roster: Arc<RosterMatcher>,
    pub config: Arc<Config>,
}
