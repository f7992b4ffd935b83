use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// An Alexa-shaped endpoint property as it appears in `context.properties`
/// and change-report payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub namespace: String,
    pub name: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub time_of_sample: String,
    pub uncertainty_in_milliseconds: u32,
}

impl Property {
    /// Build a property with a fresh `timeOfSample` and the standard
    /// 500 ms uncertainty used for device-reported state.
    pub fn new(namespace: &str, name: &str, value: Value) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            value,
            instance: None,
            time_of_sample: iso_now(),
            uncertainty_in_milliseconds: 500,
        }
    }

    pub fn with_instance(mut self, instance: &str) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Re-stamp `timeOfSample` to now, keeping everything else.
    pub fn restamped(mut self) -> Self {
        self.time_of_sample = iso_now();
        self
    }

    /// Synthetic `Alexa.EndpointHealth` connectivity property.
    pub fn connectivity(reachable: bool) -> Self {
        Self::new(
            "Alexa.EndpointHealth",
            "connectivity",
            json!({ "value": if reachable { "OK" } else { "UNREACHABLE" } }),
        )
    }
}

/// A property in transit from the device, tagged with whether it changed
/// as part of the event that produced it. The tag is stripped before any
/// Alexa-facing emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedProperty {
    #[serde(flatten)]
    pub property: Property,
    #[serde(default)]
    pub changed: bool,
}

impl ChangedProperty {
    /// Strip the transit tag, re-stamping the sample time.
    pub fn into_property(self) -> Property {
        self.property.restamped()
    }
}

/// Split transit properties into `(changed, unchanged)`, both stripped of
/// the `changed` tag and freshly stamped.
pub fn partition_changed(props: Vec<ChangedProperty>) -> (Vec<Property>, Vec<Property>) {
    let (changed, unchanged): (Vec<_>, Vec<_>) = props.into_iter().partition(|p| p.changed);
    (
        changed.into_iter().map(ChangedProperty::into_property).collect(),
        unchanged.into_iter().map(ChangedProperty::into_property).collect(),
    )
}

pub fn iso_now() -> String {
    iso(Utc::now())
}

pub fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_serializes_camel_case() {
        let p = Property::new("Alexa.PowerController", "powerState", json!("ON"));
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["namespace"], "Alexa.PowerController");
        assert_eq!(v["name"], "powerState");
        assert_eq!(v["value"], "ON");
        assert_eq!(v["uncertaintyInMilliseconds"], 500);
        assert!(v["timeOfSample"].as_str().unwrap().contains('T'));
        assert!(v.get("instance").is_none());
    }

    #[test]
    fn instance_round_trips() {
        let p = Property::new("Alexa.RangeController", "rangeValue", json!(7))
            .with_instance("Fan.Speed");
        let json = serde_json::to_string(&p).unwrap();
        let back: Property = serde_json::from_str(&json).unwrap();
        assert_eq!(back.instance.as_deref(), Some("Fan.Speed"));
    }

    #[test]
    fn changed_property_flattens() {
        let cp = ChangedProperty {
            property: Property::new("Alexa.BrightnessController", "brightness", json!(40)),
            changed: true,
        };
        let v = serde_json::to_value(&cp).unwrap();
        assert_eq!(v["name"], "brightness");
        assert_eq!(v["changed"], true);
    }

    #[test]
    fn into_property_strips_changed_tag() {
        let cp = ChangedProperty {
            property: Property::new("Alexa.PowerController", "powerState", json!("OFF")),
            changed: true,
        };
        let v = serde_json::to_value(cp.into_property()).unwrap();
        assert!(v.get("changed").is_none());
    }

    #[test]
    fn partition_splits_on_changed_flag() {
        let props = vec![
            ChangedProperty {
                property: Property::new("Alexa.PowerController", "powerState", json!("ON")),
                changed: true,
            },
            ChangedProperty {
                property: Property::new("Alexa.BrightnessController", "brightness", json!(80)),
                changed: false,
            },
        ];
        let (changed, unchanged) = partition_changed(props);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].name, "powerState");
        assert_eq!(unchanged.len(), 1);
        assert_eq!(unchanged[0].name, "brightness");
    }

    #[test]
    fn connectivity_values() {
        let ok = Property::connectivity(true);
        assert_eq!(ok.value["value"], "OK");
        let gone = Property::connectivity(false);
        assert_eq!(gone.value["value"], "UNREACHABLE");
    }
}
