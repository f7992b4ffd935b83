//! Shared application state for the Axum server.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::MemoryPropsCache;
use crate::config::SkillConfig;
use crate::engine::DirectiveEngine;
use crate::gateway::MockEventGateway;
use crate::profile::MockProfileFetcher;
use crate::registry::{MemoryCredentialsStore, MemoryDeviceRegistry};
use crate::shadow::MemoryShadowAccessor;

/// Shared application state, cloned into every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DirectiveEngine>,
}

impl AppState {
    pub fn new(engine: Arc<DirectiveEngine>) -> Self {
        Self { engine }
    }

    /// Fully in-memory state (tests and local development): memory-backed
    /// shadows, registry and cache, a mock broker channel, and doubles
    /// for the Alexa-facing HTTP collaborators.
    pub fn in_memory(config: SkillConfig) -> Self {
        let cache_ttl = Duration::from_secs(config.cache_ttl_secs);
        let engine = DirectiveEngine::new(
            Arc::new(MemoryShadowAccessor::new()),
            Arc::new(hl_mqtt_channel::MockChannel::new()),
            Arc::new(MemoryPropsCache::new(cache_ttl)),
            Arc::new(MockEventGateway::new()),
            Arc::new(MemoryDeviceRegistry::new()),
            Arc::new(MemoryCredentialsStore::new()),
            Arc::new(MockProfileFetcher::new()),
            config,
        );
        Self::new(Arc::new(engine))
    }
}
