//! MQTT topic builders and parsers for the bridge topic hierarchy.
//!
//! Topic structure:
//! ```text
//! homelink/{thing_id}/{endpoint_id}/directive
//! homelink/{thing_id}/{endpoint_id}/shadow/update
//! homelink/{thing_id}/backchannel
//! homelink/{thing_id}/service
//! homelink/{thing_id}/kill              (clients < v2.x)
//! ```

const PREFIX: &str = "homelink";

// ─── Device-bound topics ───

/// Sanitized directive stubs for one endpoint.
pub fn directive(thing_id: &str, endpoint_id: &str) -> String {
    format!("{PREFIX}/{thing_id}/{endpoint_id}/directive")
}

/// Desired-state deltas for one endpoint.
pub fn shadow_update(thing_id: &str, endpoint_id: &str) -> String {
    format!("{PREFIX}/{thing_id}/{endpoint_id}/shadow/update")
}

/// Service operations (kill, overrideConfig, setDeviceStatus) for a thing.
pub fn service(thing_id: &str) -> String {
    format!("{PREFIX}/{thing_id}/service")
}

/// Legacy kill topic for clients older than v2.
pub fn kill(thing_id: &str) -> String {
    format!("{PREFIX}/{thing_id}/kill")
}

// ─── Backend-bound topics ───

/// Device-originated backchannel events for a thing.
pub fn backchannel(thing_id: &str) -> String {
    format!("{PREFIX}/{thing_id}/backchannel")
}

// ─── Subscription patterns (with MQTT wildcards) ───

/// Subscribe to backchannel events from every thing (cloud bridge).
pub fn all_backchannels() -> String {
    format!("{PREFIX}/+/backchannel")
}

// ─── Topic parsing ───

/// Parsed MQTT topic components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedTopic {
    Directive { thing_id: String, endpoint_id: String },
    ShadowUpdate { thing_id: String, endpoint_id: String },
    Backchannel { thing_id: String },
    Service { thing_id: String },
}

/// Parse a topic string into its components.
/// Returns `None` if the topic doesn't match the expected format.
pub fn parse_topic(topic: &str) -> Option<ParsedTopic> {
    let parts: Vec<&str> = topic.split('/').collect();

    if parts.first() != Some(&PREFIX) || parts.len() < 3 {
        return None;
    }

    let thing_id = parts[1].to_string();

    match (parts.len(), parts[2]) {
        (3, "backchannel") => Some(ParsedTopic::Backchannel { thing_id }),
        (3, "service") => Some(ParsedTopic::Service { thing_id }),
        (4, endpoint_id) if parts[3] == "directive" => Some(ParsedTopic::Directive {
            thing_id,
            endpoint_id: endpoint_id.to_string(),
        }),
        (5, endpoint_id) if parts[3] == "shadow" && parts[4] == "update" => {
            Some(ParsedTopic::ShadowUpdate {
                thing_id,
                endpoint_id: endpoint_id.to_string(),
            })
        }
        _ => None,
    }
}
