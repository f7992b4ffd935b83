//! Discovery endpoint construction — registry records to the Alexa
//! `Discover.Response` / `AddOrUpdateReport` endpoint shape.

use serde_json::{Value, json};

use crate::registry::DeviceRecord;

/// Render one registry record as a discovery endpoint. The cookie is the
/// only place the thingId/template travel between discovery and later
/// directives.
pub fn endpoint_for_device(device: &DeviceRecord) -> Value {
    let mut endpoint = device.template.discovery_payload();
    endpoint["endpointId"] = json!(device.device_id);
    endpoint["friendlyName"] = json!(device.friendly_name);
    endpoint["description"] = json!(format!(
        "{}: {}",
        endpoint["description"].as_str().unwrap_or_default(),
        device.friendly_name
    ));
    endpoint["cookie"] = json!({
        "template": device.template,
        "thingId": device.thing_id,
    });
    endpoint
}

pub fn endpoints_for_devices(devices: &[DeviceRecord]) -> Vec<Value> {
    devices.iter().map(endpoint_for_device).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl_protocol::Template;

    fn record() -> DeviceRecord {
        DeviceRecord {
            device_id: "hld-a".into(),
            user_id: "u1".into(),
            thing_id: "hlt-001".into(),
            friendly_name: "Kitchen Light".into(),
            template: Template::DimmableLightBulb,
        }
    }

    #[test]
    fn endpoint_carries_routing_cookie() {
        let endpoint = endpoint_for_device(&record());
        assert_eq!(endpoint["endpointId"], "hld-a");
        assert_eq!(endpoint["friendlyName"], "Kitchen Light");
        assert_eq!(endpoint["cookie"]["thingId"], "hlt-001");
        assert_eq!(endpoint["cookie"]["template"], "DIMMABLE_LIGHT_BULB");
    }

    #[test]
    fn description_is_suffixed_with_friendly_name() {
        let endpoint = endpoint_for_device(&record());
        let description = endpoint["description"].as_str().unwrap();
        assert!(description.ends_with(": Kitchen Light"));
    }

    #[test]
    fn every_endpoint_reports_endpoint_health() {
        for endpoint in endpoints_for_devices(&[record()]) {
            let caps = endpoint["capabilities"].as_array().unwrap();
            assert!(
                caps.iter()
                    .any(|c| c["interface"] == "Alexa.EndpointHealth")
            );
        }
    }
}
