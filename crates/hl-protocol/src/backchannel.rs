use serde::{Deserialize, Serialize};

use crate::property::ChangedProperty;
use crate::template::Template;

/// Which backchannel flow a device-originated event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rule {
    #[serde(rename = "bulkdiscover")]
    BulkDiscover,
    #[serde(rename = "bulkundiscover")]
    BulkUndiscover,
    #[serde(rename = "changeReport")]
    ChangeReport,
    #[serde(rename = "requestConfig")]
    RequestConfig,
    /// Pre-2.x clients; always answered with a kill.
    #[serde(rename = "discover")]
    LegacyDiscover,
}

/// What caused a change report, which in turn selects the Alexa event shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CauseType {
    PhysicalInteraction,
    VoiceInteraction,
    StateReport,
    AppInteraction,
    PeriodicPoll,
    RuleTrigger,
}

/// A device stub carried by bulk (un)discovery events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStub {
    pub device_id: String,
    pub friendly_name: String,
    pub template: Template,
}

/// An event published by a client on its backchannel topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackchannelEvent {
    pub rule: Rule,
    pub thing_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<Template>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<ChangedProperty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause_type: Option<CauseType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
    /// Thing-bound authenticated user reference, `{userId}#{sha256…}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id_token: Option<String>,
    #[serde(default = "unknown_version")]
    pub client_version: String,
    /// Devices for bulk (un)discovery rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<DeviceStub>,
}

fn unknown_version() -> String {
    "0.0.0".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn change_report_event_deserializes() {
        let ev: BackchannelEvent = serde_json::from_value(json!({
            "rule": "changeReport",
            "thingId": "hlt-001",
            "endpointId": "hld-lamp1",
            "template": "DIMMABLE_LIGHT_BULB",
            "causeType": "PHYSICAL_INTERACTION",
            "clientVersion": "2.14.0",
            "properties": [{
                "namespace": "Alexa.PowerController",
                "name": "powerState",
                "value": "ON",
                "timeOfSample": "2026-01-01T00:00:00.000Z",
                "uncertaintyInMilliseconds": 500,
                "changed": true
            }]
        }))
        .unwrap();
        assert_eq!(ev.rule, Rule::ChangeReport);
        assert_eq!(ev.cause_type, Some(CauseType::PhysicalInteraction));
        assert_eq!(ev.properties.len(), 1);
        assert!(ev.properties[0].changed);
    }

    #[test]
    fn bulk_discover_event_deserializes() {
        let ev: BackchannelEvent = serde_json::from_value(json!({
            "rule": "bulkdiscover",
            "thingId": "hlt-001",
            "clientVersion": "2.13.1",
            "devices": [
                { "deviceId": "hld-a", "friendlyName": "Desk Lamp", "template": "SWITCH" },
                { "deviceId": "hld-b", "friendlyName": "Blinds", "template": "BLINDS" }
            ]
        }))
        .unwrap();
        assert_eq!(ev.rule, Rule::BulkDiscover);
        assert_eq!(ev.devices.len(), 2);
        assert_eq!(ev.devices[1].template, Template::Blinds);
    }

    #[test]
    fn missing_client_version_defaults() {
        let ev: BackchannelEvent = serde_json::from_value(json!({
            "rule": "requestConfig",
            "thingId": "hlt-002"
        }))
        .unwrap();
        assert_eq!(ev.client_version, "0.0.0");
        assert!(ev.properties.is_empty());
    }

    #[test]
    fn cause_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&CauseType::VoiceInteraction).unwrap(),
            r#""VOICE_INTERACTION""#
        );
        assert_eq!(
            serde_json::to_string(&CauseType::StateReport).unwrap(),
            r#""STATE_REPORT""#
        );
    }
}
