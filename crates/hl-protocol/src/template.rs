use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Capability class of a device. Decides which Alexa interfaces the device
/// exposes at discovery and which directive branches apply to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Template {
    Switch,
    Plug,
    DimmerSwitch,
    DimmableLightBulb,
    ColorChangingLightBulb,
    Fan,
    Blinds,
    Thermostat,
    Scene,
    ContactSensor,
    MotionSensor,
    TemperatureSensor,
    DoorbellEventSource,
}

impl Template {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Switch => "SWITCH",
            Self::Plug => "PLUG",
            Self::DimmerSwitch => "DIMMER_SWITCH",
            Self::DimmableLightBulb => "DIMMABLE_LIGHT_BULB",
            Self::ColorChangingLightBulb => "COLOR_CHANGING_LIGHT_BULB",
            Self::Fan => "FAN",
            Self::Blinds => "BLINDS",
            Self::Thermostat => "THERMOSTAT",
            Self::Scene => "SCENE",
            Self::ContactSensor => "CONTACT_SENSOR",
            Self::MotionSensor => "MOTION_SENSOR",
            Self::TemperatureSensor => "TEMPERATURE_SENSOR",
            Self::DoorbellEventSource => "DOORBELL_EVENT_SOURCE",
        }
    }

    pub fn display_categories(&self) -> Vec<&'static str> {
        match self {
            Self::Switch | Self::DimmerSwitch => vec!["SWITCH"],
            Self::Plug => vec!["SMARTPLUG"],
            Self::DimmableLightBulb | Self::ColorChangingLightBulb => vec!["LIGHT"],
            Self::Fan => vec!["FAN"],
            Self::Blinds => vec!["INTERIOR_BLIND"],
            Self::Thermostat => vec!["THERMOSTAT", "TEMPERATURE_SENSOR"],
            Self::Scene => vec!["SCENE_TRIGGER"],
            Self::ContactSensor => vec!["CONTACT_SENSOR"],
            Self::MotionSensor => vec!["MOTION_SENSOR"],
            Self::TemperatureSensor => vec!["TEMPERATURE_SENSOR"],
            Self::DoorbellEventSource => vec!["DOORBELL"],
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Switch => "virtual switch",
            Self::Plug => "virtual plug",
            Self::DimmerSwitch => "virtual dimmer switch",
            Self::DimmableLightBulb => "virtual dimmable light bulb",
            Self::ColorChangingLightBulb => "virtual color changing light bulb",
            Self::Fan => "virtual fan",
            Self::Blinds => "virtual blinds",
            Self::Thermostat => "virtual thermostat",
            Self::Scene => "virtual scene",
            Self::ContactSensor => "virtual contact sensor",
            Self::MotionSensor => "virtual motion sensor",
            Self::TemperatureSensor => "virtual temperature sensor",
            Self::DoorbellEventSource => "virtual doorbell event source",
        }
    }

    /// The Alexa capability-interface list this template advertises at
    /// discovery. `proactivelyReported`/`retrievable` are set uniformly:
    /// every controllable facet both reports changes and answers queries.
    pub fn capabilities(&self) -> Vec<Value> {
        let mut caps: Vec<Value> = match self {
            Self::Switch | Self::Plug => vec![iface("Alexa.PowerController", &["powerState"])],
            Self::DimmerSwitch | Self::DimmableLightBulb => vec![
                iface("Alexa.PowerController", &["powerState"]),
                iface("Alexa.BrightnessController", &["brightness"]),
            ],
            Self::ColorChangingLightBulb => vec![
                iface("Alexa.PowerController", &["powerState"]),
                iface("Alexa.BrightnessController", &["brightness"]),
                iface("Alexa.ColorTemperatureController", &["colorTemperatureInKelvin"]),
                iface("Alexa.ColorController", &["color"]),
            ],
            Self::Fan => vec![
                iface("Alexa.PowerController", &["powerState"]),
                fan_speed_range(),
            ],
            Self::Blinds => vec![blind_lift_range(), blind_position_mode()],
            Self::Thermostat => vec![
                json!({
                    "type": "AlexaInterface",
                    "interface": "Alexa.ThermostatController",
                    "version": "3.2",
                    "properties": {
                        "supported": [
                            { "name": "targetSetpoint" },
                            { "name": "thermostatMode" }
                        ],
                        "proactivelyReported": true,
                        "retrievable": true
                    },
                    "configuration": {
                        "supportedModes": ["AUTO", "HEAT", "COOL", "OFF"],
                        "supportsScheduling": false
                    }
                }),
                iface("Alexa.TemperatureSensor", &["temperature"]),
            ],
            Self::Scene => vec![json!({
                "type": "AlexaInterface",
                "interface": "Alexa.SceneController",
                "version": "3",
                "supportsDeactivation": true
            })],
            Self::ContactSensor => vec![iface("Alexa.ContactSensor", &["detectionState"])],
            Self::MotionSensor => vec![iface("Alexa.MotionSensor", &["detectionState"])],
            Self::TemperatureSensor => vec![iface("Alexa.TemperatureSensor", &["temperature"])],
            Self::DoorbellEventSource => vec![json!({
                "type": "AlexaInterface",
                "interface": "Alexa.DoorbellEventSource",
                "version": "3",
                "proactivelyReported": true
            })],
        };

        caps.push(iface("Alexa.EndpointHealth", &["connectivity"]));
        caps.push(json!({
            "type": "AlexaInterface",
            "interface": "Alexa",
            "version": "3"
        }));
        caps
    }

    /// The static discovery payload skeleton for this template. The caller
    /// fills in `endpointId`, `friendlyName` and the routing `cookie`.
    pub fn discovery_payload(&self) -> Value {
        json!({
            "endpointId": "",
            "manufacturerName": "homelink",
            "description": self.description(),
            "friendlyName": "",
            "cookie": {},
            "additionalAttributes": {
                "manufacturer": "homelink",
                "model": "homelink",
                "serialNumber": "0000000",
                "firmwareVersion": "1.0.0",
                "softwareVersion": "1.0.0",
                "customIdentifier": "0000000"
            },
            "displayCategories": self.display_categories(),
            "capabilities": self.capabilities(),
        })
    }
}

fn iface(interface: &str, props: &[&str]) -> Value {
    let supported: Vec<Value> = props.iter().map(|p| json!({ "name": p })).collect();
    json!({
        "type": "AlexaInterface",
        "interface": interface,
        "version": "3",
        "properties": {
            "supported": supported,
            "proactivelyReported": true,
            "retrievable": true
        }
    })
}

fn fan_speed_range() -> Value {
    json!({
        "type": "AlexaInterface",
        "interface": "Alexa.RangeController",
        "instance": "Fan.Speed",
        "version": "3",
        "properties": {
            "supported": [{ "name": "rangeValue" }],
            "proactivelyReported": true,
            "retrievable": true
        },
        "capabilityResources": {
            "friendlyNames": [
                { "@type": "asset", "value": { "assetId": "Alexa.Setting.FanSpeed" } }
            ]
        },
        "configuration": {
            "supportedRange": { "minimumValue": 0, "maximumValue": 10, "precision": 1 }
        }
    })
}

fn blind_lift_range() -> Value {
    json!({
        "type": "AlexaInterface",
        "interface": "Alexa.RangeController",
        "instance": "Blind.Lift",
        "version": "3",
        "properties": {
            "supported": [{ "name": "rangeValue" }],
            "proactivelyReported": true,
            "retrievable": true
        },
        "capabilityResources": {
            "friendlyNames": [
                { "@type": "asset", "value": { "assetId": "Alexa.Setting.Opening" } }
            ]
        },
        "configuration": {
            "supportedRange": { "minimumValue": 0, "maximumValue": 100, "precision": 1 },
            "unitOfMeasure": "Alexa.Unit.Percent"
        },
        "semantics": {
            "actionMappings": [
                {
                    "@type": "ActionsToDirective",
                    "actions": ["Alexa.Actions.Close"],
                    "directive": { "name": "SetRangeValue", "payload": { "rangeValue": 0 } }
                },
                {
                    "@type": "ActionsToDirective",
                    "actions": ["Alexa.Actions.Open"],
                    "directive": { "name": "SetRangeValue", "payload": { "rangeValue": 100 } }
                },
                {
                    "@type": "ActionsToDirective",
                    "actions": ["Alexa.Actions.Lower"],
                    "directive": {
                        "name": "AdjustRangeValue",
                        "payload": { "rangeValueDelta": -10, "rangeValueDeltaDefault": false }
                    }
                },
                {
                    "@type": "ActionsToDirective",
                    "actions": ["Alexa.Actions.Raise"],
                    "directive": {
                        "name": "AdjustRangeValue",
                        "payload": { "rangeValueDelta": 10, "rangeValueDeltaDefault": false }
                    }
                }
            ],
            "stateMappings": [
                { "@type": "StatesToValue", "states": ["Alexa.States.Closed"], "value": 0 },
                {
                    "@type": "StatesToRange",
                    "states": ["Alexa.States.Open"],
                    "range": { "minimumValue": 1, "maximumValue": 100 }
                }
            ]
        }
    })
}

fn blind_position_mode() -> Value {
    json!({
        "type": "AlexaInterface",
        "interface": "Alexa.ModeController",
        "instance": "Blinds.Position",
        "version": "3",
        "properties": {
            "supported": [{ "name": "mode" }],
            "proactivelyReported": true,
            "retrievable": true
        },
        "capabilityResources": {
            "friendlyNames": [
                { "@type": "asset", "value": { "assetId": "Alexa.Setting.Opening" } }
            ]
        },
        "configuration": {
            "ordered": false,
            "supportedModes": [
                {
                    "value": "Position.Up",
                    "modeResources": {
                        "friendlyNames": [
                            { "@type": "asset", "value": { "assetId": "Alexa.Value.Open" } }
                        ]
                    }
                },
                {
                    "value": "Position.Down",
                    "modeResources": {
                        "friendlyNames": [
                            { "@type": "asset", "value": { "assetId": "Alexa.Value.Close" } }
                        ]
                    }
                }
            ]
        },
        "semantics": {
            "actionMappings": [
                {
                    "@type": "ActionsToDirective",
                    "actions": ["Alexa.Actions.Close"],
                    "directive": { "name": "SetMode", "payload": { "mode": "Position.Down" } }
                },
                {
                    "@type": "ActionsToDirective",
                    "actions": ["Alexa.Actions.Open"],
                    "directive": { "name": "SetMode", "payload": { "mode": "Position.Up" } }
                }
            ],
            "stateMappings": [
                { "@type": "StatesToValue", "states": ["Alexa.States.Closed"], "value": "Position.Down" },
                { "@type": "StatesToValue", "states": ["Alexa.States.Open"], "value": "Position.Up" }
            ]
        }
    })
}
