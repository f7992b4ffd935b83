//! MQTT bridge — subscribes to device backchannel topics and dispatches
//! events through the same engine logic as the HTTP endpoints.

use rumqttc::{Event, Packet};

use hl_protocol::BackchannelEvent;
use hl_protocol::topics::{self, ParsedTopic};

use crate::state::AppState;

/// Run the MQTT bridge event loop.
///
/// Drives the rumqttc `EventLoop`, classifying incoming publishes and
/// handing backchannel events to the directive engine.
pub async fn run(mut eventloop: rumqttc::EventLoop, state: AppState) {
    tracing::info!("mqtt bridge started");

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                handle_incoming(&publish.topic, &publish.payload, &state).await;
            }
            Ok(_) => {} // ConnAck, SubAck, PingResp, etc.
            Err(e) => {
                tracing::error!(error = %e, "mqtt event loop error — reconnecting in 5s");
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            }
        }
    }
}

/// Classify and handle an incoming MQTT publish.
pub async fn handle_incoming(topic: &str, payload: &[u8], state: &AppState) {
    let Some(ParsedTopic::Backchannel { thing_id }) = topics::parse_topic(topic) else {
        tracing::debug!(topic, "ignoring non-backchannel mqtt topic");
        return;
    };

    let event: BackchannelEvent = match serde_json::from_slice(payload) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(topic, error = %e, "undecodable backchannel event");
            return;
        }
    };

    // The topic is broker-authenticated per thing; reject payloads that
    // claim a different thing.
    if event.thing_id != thing_id {
        tracing::warn!(
            topic,
            claimed = %event.thing_id,
            "backchannel thing id does not match topic"
        );
        return;
    }

    let handled = state.engine.handle_backchannel(event).await;
    tracing::debug!(thing_id, handled, "backchannel event processed");
}
