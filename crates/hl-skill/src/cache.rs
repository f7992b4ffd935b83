//! State-report cache — short-TTL read-through cache of the last known
//! property set per `(thingId, endpointId)`.
//!
//! Written opportunistically whenever an async state report or change
//! report is produced; consulted on inbound `ReportState` to answer
//! synchronously instead of round-tripping to a possibly-slow or
//! disconnected device. Cache unavailability must never fail the calling
//! operation: writes swallow and log, reads degrade to `Miss`-equivalent
//! handling at the caller.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use hl_protocol::Property;

/// Outcome of a cache read. A miss is a first-class outcome, not an
/// error; a backend error is kept distinct so the caller can log it, but
/// both degrade identically to a deferred response.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    Hit(Vec<Property>),
    Miss,
    Error(String),
}

/// The state-report cache seam.
#[async_trait]
pub trait PropsCache: Send + Sync {
    async fn read(&self, thing_id: &str, endpoint_id: &str) -> CacheLookup;

    /// Best-effort write; implementations log failures instead of
    /// returning them.
    async fn write(&self, thing_id: &str, endpoint_id: &str, properties: &[Property]);

    /// Best-effort delete, used when a device is undiscovered.
    async fn delete(&self, thing_id: &str, endpoint_id: &str);
}

fn cache_key(thing_id: &str, endpoint_id: &str) -> String {
    format!("{thing_id}.{endpoint_id}")
}

/// In-memory TTL cache. Values are stored JSON-serialized, matching the
/// external-cache wire format, so a hit exercises the same decode path.
pub struct MemoryPropsCache {
    entries: Mutex<HashMap<String, (Instant, String)>>,
    ttl: Duration,
}

impl MemoryPropsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Number of live (unexpired) entries. Test helper.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap();
        entries
            .values()
            .filter(|(written, _)| written.elapsed() < self.ttl)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PropsCache for MemoryPropsCache {
    async fn read(&self, thing_id: &str, endpoint_id: &str) -> CacheLookup {
        let key = cache_key(thing_id, endpoint_id);
        let mut entries = self.entries.lock().unwrap();

        let Some((written, raw)) = entries.get(&key) else {
            return CacheLookup::Miss;
        };

        if written.elapsed() >= self.ttl {
            entries.remove(&key);
            return CacheLookup::Miss;
        }

        match serde_json::from_str(raw) {
            Ok(props) => CacheLookup::Hit(props),
            Err(e) => CacheLookup::Error(format!("cached value for {key} is corrupt: {e}")),
        }
    }

    async fn write(&self, thing_id: &str, endpoint_id: &str, properties: &[Property]) {
        let key = cache_key(thing_id, endpoint_id);
        match serde_json::to_string(properties) {
            Ok(raw) => {
                tracing::debug!(key = %key, "caching state-report properties");
                self.entries
                    .lock()
                    .unwrap()
                    .insert(key, (Instant::now(), raw));
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "caching properties failed");
            }
        }
    }

    async fn delete(&self, thing_id: &str, endpoint_id: &str) {
        let key = cache_key(thing_id, endpoint_id);
        tracing::debug!(key = %key, "clearing cached properties");
        self.entries.lock().unwrap().remove(&key);
    }
}

/// Cache double whose reads always report a backend error. Used to verify
/// that callers degrade a broken cache to the deferred-response path.
pub struct FailingPropsCache;

#[async_trait]
impl PropsCache for FailingPropsCache {
    async fn read(&self, _thing_id: &str, _endpoint_id: &str) -> CacheLookup {
        CacheLookup::Error("cache backend unavailable".into())
    }

    async fn write(&self, thing_id: &str, endpoint_id: &str, _properties: &[Property]) {
        tracing::warn!(
            key = %cache_key(thing_id, endpoint_id),
            "caching properties failed: cache backend unavailable"
        );
    }

    async fn delete(&self, _thing_id: &str, _endpoint_id: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props() -> Vec<Property> {
        vec![Property::new(
            "Alexa.PowerController",
            "powerState",
            json!("ON"),
        )]
    }

    #[tokio::test]
    async fn read_after_write_hits() {
        let cache = MemoryPropsCache::new(Duration::from_secs(60));
        cache.write("hlt-001", "hld-a", &props()).await;

        match cache.read("hlt-001", "hld-a").await {
            CacheLookup::Hit(cached) => {
                assert_eq!(cached.len(), 1);
                assert_eq!(cached[0].name, "powerState");
            }
            other => panic!("expected hit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_key_misses() {
        let cache = MemoryPropsCache::new(Duration::from_secs(60));
        assert!(matches!(
            cache.read("hlt-001", "hld-a").await,
            CacheLookup::Miss
        ));
    }

    #[tokio::test]
    async fn expired_entry_misses() {
        let cache = MemoryPropsCache::new(Duration::from_millis(0));
        cache.write("hlt-001", "hld-a", &props()).await;
        assert!(matches!(
            cache.read("hlt-001", "hld-a").await,
            CacheLookup::Miss
        ));
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache = MemoryPropsCache::new(Duration::from_secs(60));
        cache.write("hlt-001", "hld-a", &props()).await;
        cache.delete("hlt-001", "hld-a").await;
        assert!(matches!(
            cache.read("hlt-001", "hld-a").await,
            CacheLookup::Miss
        ));
    }

    #[tokio::test]
    async fn keys_are_scoped_per_endpoint() {
        let cache = MemoryPropsCache::new(Duration::from_secs(60));
        cache.write("hlt-001", "hld-a", &props()).await;
        assert!(matches!(
            cache.read("hlt-001", "hld-b").await,
            CacheLookup::Miss
        ));
        assert!(matches!(
            cache.read("hlt-002", "hld-a").await,
            CacheLookup::Miss
        ));
    }

    #[tokio::test]
    async fn failing_cache_reports_error_variant() {
        let cache = FailingPropsCache;
        assert!(matches!(
            cache.read("hlt-001", "hld-a").await,
            CacheLookup::Error(_)
        ));
    }
}
