//! MQTT channel — async client for AWS IoT Core communication.
//!
//! Wraps `rumqttc::AsyncClient` with typed publish helpers for the
//! device-bound message kinds the skill backend emits: sanitized directive
//! stubs, desired-state shadow deltas, and service operations.

use async_trait::async_trait;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use serde::Serialize;

use crate::config::MqttConfig;
use crate::error::{MqttError, MqttResult};
use crate::tls;
use hl_protocol::topics;

// ── Channel trait ─────────────────────────────────────────────

/// Abstraction for MQTT message publishing and subscribing.
///
/// Enables mocking in tests without a real MQTT broker.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Publish a raw payload to a topic.
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<()>;

    /// Subscribe to a topic filter.
    async fn subscribe(&self, filter: &str, qos: QoS) -> MqttResult<()>;
}

/// Typed publish helpers, available to every `Channel` implementation.
///
/// The payloads are fire-and-forget from the backend's perspective:
/// delivery is at-least-once, the device applies them idempotently.
#[async_trait]
pub trait DevicePublish: Channel {
    /// Publish a sanitized directive stub to an endpoint's command topic.
    async fn publish_directive<T: Serialize + Sync>(
        &self,
        thing_id: &str,
        endpoint_id: &str,
        stub: &T,
    ) -> MqttResult<()> {
        let topic = topics::directive(thing_id, endpoint_id);
        self.publish_json(&topic, stub).await
    }

    /// Publish a desired-state delta document to an endpoint's shadow
    /// update topic.
    async fn publish_shadow_update<T: Serialize + Sync>(
        &self,
        thing_id: &str,
        endpoint_id: &str,
        delta: &T,
    ) -> MqttResult<()> {
        let topic = topics::shadow_update(thing_id, endpoint_id);
        self.publish_json(&topic, delta).await
    }

    /// Publish a service operation (kill, overrideConfig, setDeviceStatus)
    /// to a thing's service topic.
    async fn publish_service<T: Serialize + Sync>(
        &self,
        thing_id: &str,
        payload: &T,
    ) -> MqttResult<()> {
        let topic = topics::service(thing_id);
        self.publish_json(&topic, payload).await
    }

    /// Publish to the legacy kill topic for clients older than v2.
    async fn publish_legacy_kill<T: Serialize + Sync>(
        &self,
        thing_id: &str,
        payload: &T,
    ) -> MqttResult<()> {
        let topic = topics::kill(thing_id);
        self.publish_json(&topic, payload).await
    }

    /// Subscribe to backchannel events from all things.
    async fn subscribe_backchannels(&self) -> MqttResult<()> {
        self.subscribe(&topics::all_backchannels(), QoS::AtLeastOnce)
            .await
    }

    async fn publish_json<T: Serialize + Sync>(&self, topic: &str, payload: &T) -> MqttResult<()> {
        let bytes =
            serde_json::to_vec(payload).map_err(|e| MqttError::Serialization(e.to_string()))?;
        self.publish(topic, &bytes, QoS::AtLeastOnce).await
    }
}

impl<C: Channel + ?Sized> DevicePublish for C {}

// ── MqttChannel ───────────────────────────────────────────────

/// MQTT channel connected to AWS IoT Core.
///
/// Owns the `AsyncClient` for publishing/subscribing. The `EventLoop`
/// is returned separately from `new()` — the caller (the backchannel
/// bridge) must drive it via `eventloop.poll()`.
pub struct MqttChannel {
    client: AsyncClient,
}

impl MqttChannel {
    /// Create a new MQTT channel with TLS (production mode).
    ///
    /// Returns `(channel, event_loop)`. The caller must poll the event loop:
    /// ```ignore
    /// tokio::spawn(async move {
    ///     loop {
    ///         if let Err(e) = eventloop.poll().await {
    ///             tracing::error!("MQTT event loop error: {e}");
    ///             tokio::time::sleep(Duration::from_secs(5)).await;
    ///         }
    ///     }
    /// });
    /// ```
    pub fn new(config: &MqttConfig) -> MqttResult<(Self, EventLoop)> {
        let mut options =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(std::time::Duration::from_secs(config.keepalive_secs.into()));

        let transport = tls::load_tls_transport(config)?;
        options.set_transport(transport);

        let (client, eventloop) = AsyncClient::new(options, 64);

        Ok((Self { client }, eventloop))
    }

    /// Create a channel for local development (no TLS).
    pub fn new_plaintext(host: &str, port: u16, client_id: &str) -> (Self, EventLoop) {
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(std::time::Duration::from_secs(30));

        let (client, eventloop) = AsyncClient::new(options, 64);

        (Self { client }, eventloop)
    }
}

#[async_trait]
impl Channel for MqttChannel {
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<()> {
        self.client
            .publish(topic, qos, false, payload)
            .await
            .map_err(|e| MqttError::Publish(e.to_string()))
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> MqttResult<()> {
        self.client
            .subscribe(filter, qos)
            .await
            .map_err(|e| MqttError::Subscribe(e.to_string()))
    }
}
