//! Device service operations — control messages on a thing's service
//! topic (kill, status display, config override).

use serde_json::{Value, json};

use hl_mqtt_channel::{Channel, DevicePublish};
use hl_protocol::version::is_feature_supported_by_client;

use crate::registry::make_user_id_token;

/// Tell a thing to disconnect and stay down, with a reason the client
/// surfaces to the user. Also published on the pre-v2 kill topic.
pub async fn kill_device(channel: &dyn Channel, thing_id: &str, reason: &str) -> bool {
    let service = json!({ "operation": "kill", "reason": reason });
    if let Err(e) = channel.publish_service(thing_id, &service).await {
        tracing::error!(thing_id, error = %e, "kill publish failed");
        return false;
    }

    let legacy = json!({ "reason": reason });
    if let Err(e) = channel.publish_legacy_kill(thing_id, &legacy).await {
        tracing::warn!(thing_id, error = %e, "legacy kill publish failed");
    }

    tracing::info!(thing_id, reason, "killed thing");
    true
}

pub async fn kill_device_due_to_outdated_version(channel: &dyn Channel, thing_id: &str) -> bool {
    kill_device(
        channel,
        thing_id,
        "OUTDATED VERSION! Please update the homelink client package",
    )
    .await
}

/// Show a yellow degraded-status marker on the given devices.
pub async fn set_device_status_degraded(
    channel: &dyn Channel,
    thing_id: &str,
    status: &str,
    device_ids: &[String],
) {
    let payload = json!({
        "operation": "setDeviceStatus",
        "status": status,
        "color": "yellow",
        "devices": device_ids,
    });
    if let Err(e) = channel.publish_service(thing_id, &payload).await {
        tracing::warn!(thing_id, error = %e, "setDeviceStatus publish failed");
    }
}

/// Build the `overrideConfig` payload answering a requestConfig event.
///
/// Clients with message-rate-limiter support get per-cause-type token
/// bucket profiles; older clients get the flat window-based limits.
pub fn override_config_payload(
    user_id: &str,
    thing_id: &str,
    secret: &str,
    allowed_device_count: usize,
    client_version: &str,
) -> Value {
    let mut payload = json!({
        "operation": "overrideConfig",
        "userIdToken": make_user_id_token(user_id, thing_id, secret),
        "allowedDeviceCount": allowed_device_count,
    });

    if is_feature_supported_by_client("msgRateLimiter", client_version) {
        payload["msgRateLimiter"] = json!({
            "profiles": {
                "DEFAULT": {
                    "maxConcurrent": 1,
                    "minTime": 1000,
                    "highWater": 0,
                    "strategy": "BLOCK",
                    "penalty": 30_000,
                    "reservoir": 60,
                    "reservoirIncreaseInterval": 60_000,
                    "reservoirIncreaseAmount": 1,
                    "reservoirIncreaseMaximum": 60,
                },
                "PHYSICAL_INTERACTION_DEFAULT": {
                    "maxConcurrent": 1,
                    "minTime": 2500,
                    "highWater": 1,
                    "strategy": "LEAK",
                    "reservoir": 30,
                    "reservoirIncreaseInterval": 900_000,
                    "reservoirIncreaseAmount": 1,
                    "reservoirIncreaseMaximum": 15,
                },
                "VOICE_INTERACTION_DEFAULT": {
                    "maxConcurrent": 1,
                    "minTime": 0,
                    "highWater": 0,
                    "strategy": "OVERFLOW",
                    "reservoir": 20,
                    "reservoirIncreaseInterval": 300_000,
                    "reservoirIncreaseAmount": 2,
                    "reservoirIncreaseMaximum": 10,
                },
                "STATE_REPORT_DEFAULT": {
                    "maxConcurrent": 1,
                    "minTime": 0,
                    "highWater": 0,
                    "strategy": "BLOCK",
                    "penalty": 60_000,
                    "reservoir": 60,
                    "reservoirIncreaseInterval": 300_000,
                    "reservoirIncreaseAmount": 15,
                    "reservoirIncreaseMaximum": 60,
                },
            },
            "profileMapping": {
                "PHYSICAL_INTERACTION_DEFAULT": "PHYSICAL_INTERACTION_DEFAULT",
                "VOICE_INTERACTION_DEFAULT": "VOICE_INTERACTION_DEFAULT",
                "STATE_REPORT_DEFAULT": "STATE_REPORT_DEFAULT",
            },
        });
    } else {
        payload["rateLimiter"] = json!([
            { "period": 60_000, "limit": 12, "penalty": 0, "repeat": 10 },
            { "period": 600_000, "limit": 5, "penalty": 1 },
        ]);
    }

    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl_mqtt_channel::MockChannel;

    #[tokio::test]
    async fn kill_publishes_both_topics() {
        let channel = MockChannel::new();
        assert!(kill_device(&channel, "hlt-001", "account blocked").await);

        let service = channel.published_to("homelink/hlt-001/service");
        assert_eq!(service.len(), 1);
        assert_eq!(service[0].json()["operation"], "kill");

        let legacy = channel.published_to("homelink/hlt-001/kill");
        assert_eq!(legacy.len(), 1);
        assert_eq!(legacy[0].json()["reason"], "account blocked");
    }

    #[test]
    fn modern_client_gets_rate_limiter_profiles() {
        let payload = override_config_payload("u1", "hlt-001", "s3cret", 10, "2.12.0");
        assert_eq!(payload["allowedDeviceCount"], 10);
        assert!(payload["msgRateLimiter"]["profiles"]["DEFAULT"].is_object());
        assert!(payload.get("rateLimiter").is_none());
    }

    #[test]
    fn legacy_client_gets_flat_rate_limits() {
        let payload = override_config_payload("u1", "hlt-001", "s3cret", 10, "2.11.0");
        assert!(payload["rateLimiter"].is_array());
        assert!(payload.get("msgRateLimiter").is_none());
    }

    #[test]
    fn config_carries_verifiable_user_id_token() {
        let payload = override_config_payload("u1", "hlt-001", "s3cret", 10, "2.13.1");
        let token = payload["userIdToken"].as_str().unwrap();
        assert_eq!(
            crate::registry::verify_user_id_token(token, "hlt-001", "s3cret").as_deref(),
            Some("u1")
        );
    }
}
