//! Directive resolver — maps an inbound directive name and payload to
//! the device-bound desired-state delta plus the anticipated property
//! set to report back.
//!
//! Resolution is template-conditional in places: range values mean fan
//! speed on a fan but lift percentage on blinds, and blinds couple their
//! position mode and lift percentage so a change to either derives the
//! other. Adjust-style directives step from the current reported value
//! with the same clamping discipline as brightness.

use serde::Serialize;
use serde_json::Value;

use hl_protocol::{ColorHsb, DirectiveName, LightMode, PowerState, Property, ReportedState, Template};

use serde_json::json;

/// Ordered color-temperature palette stepped through by the
/// Increase/Decrease directives. Increase past the top overflows to
/// 10000 K, decrease below the bottom underflows to 1000 K.
const KELVIN_PALETTE: [i64; 5] = [2200, 2700, 4000, 5500, 7000];

const FAN_SPEED_DEFAULT: i64 = 5;
const BLIND_LIFT_DEFAULT: i64 = 50;
const BRIGHTNESS_DEFAULT: i64 = 50;
const KELVIN_DEFAULT: i64 = 4000;
const SETPOINT_DEFAULT: f64 = 20.0;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("directive {0} is not supported")]
    Unsupported(String),
    #[error("directive {0} payload is missing field {1}")]
    Payload(String, &'static str),
}

/// Desired-state delta written to the device's shadow update topic.
/// Serialized untagged so the variant flattens into the plain key/value
/// document the device expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum DesiredDelta {
    Power {
        power_state: PowerState,
        #[serde(skip_serializing_if = "Option::is_none")]
        brightness: Option<i64>,
    },
    Brightness {
        brightness: i64,
        power_state: PowerState,
    },
    Percentage {
        percentage: i64,
    },
    Color {
        color: ColorHsb,
        light_mode: LightMode,
        power_state: PowerState,
    },
    ColorTemperature {
        color_temperature_in_kelvin: i64,
        light_mode: LightMode,
        #[serde(skip_serializing_if = "Option::is_none")]
        power_state: Option<PowerState>,
    },
    Blinds {
        percentage: i64,
        mode: String,
    },
    Fan {
        speed: i64,
        power_state: PowerState,
    },
    Mode {
        mode: String,
        instance: String,
    },
    Thermostat {
        target_temperature: f64,
        target_scale: String,
        thermostat_mode: String,
    },
    None,
}

/// Outcome of resolving one directive.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The properties the device is anticipated to report once the delta
    /// is applied; echoed in the async correlated response.
    pub properties: Vec<Property>,
    pub desired: DesiredDelta,
}

fn payload_i64(payload: &Value, field: &'static str, name: &DirectiveName) -> Result<i64, ResolveError> {
    payload
        .get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| ResolveError::Payload(name.as_str().to_string(), field))
}

fn power_property(state: PowerState) -> Property {
    Property::new("Alexa.PowerController", "powerState", json!(state))
}

fn brightness_property(brightness: i64) -> Property {
    Property::new("Alexa.BrightnessController", "brightness", json!(brightness))
}

fn kelvin_property(kelvin: i64) -> Property {
    Property::new(
        "Alexa.ColorTemperatureController",
        "colorTemperatureInKelvin",
        json!(kelvin),
    )
}

fn fan_speed_property(speed: i64) -> Property {
    Property::new("Alexa.RangeController", "rangeValue", json!(speed)).with_instance("Fan.Speed")
}

fn blind_lift_property(percentage: i64) -> Property {
    Property::new("Alexa.RangeController", "rangeValue", json!(percentage))
        .with_instance("Blind.Lift")
}

fn blind_mode_property(mode: &str) -> Property {
    Property::new("Alexa.ModeController", "mode", json!(mode)).with_instance("Blinds.Position")
}

fn blind_mode_for(percentage: i64) -> &'static str {
    if percentage == 100 {
        "Position.Up"
    } else {
        "Position.Down"
    }
}

fn blind_percentage_for(mode: &str) -> i64 {
    if mode == "Position.Up" { 100 } else { 0 }
}

fn blinds_resolution(percentage: i64) -> Resolution {
    let mode = blind_mode_for(percentage);
    Resolution {
        properties: vec![blind_lift_property(percentage), blind_mode_property(mode)],
        desired: DesiredDelta::Blinds {
            percentage,
            mode: mode.to_string(),
        },
    }
}

fn fan_resolution(speed: i64) -> Resolution {
    let speed = speed.clamp(0, 10);
    let power_state = PowerState::from_level(speed);
    Resolution {
        properties: vec![fan_speed_property(speed), power_property(power_state)],
        desired: DesiredDelta::Fan { speed, power_state },
    }
}

fn brightness_resolution(brightness: i64) -> Resolution {
    let brightness = brightness.clamp(0, 100);
    let power_state = PowerState::from_level(brightness);
    Resolution {
        properties: vec![brightness_property(brightness), power_property(power_state)],
        desired: DesiredDelta::Brightness {
            brightness,
            power_state,
        },
    }
}

fn kelvin_resolution(kelvin: i64, power_state: Option<PowerState>) -> Resolution {
    let mut properties = vec![kelvin_property(kelvin)];
    if let Some(state) = power_state {
        properties.push(power_property(state));
    }
    Resolution {
        properties,
        desired: DesiredDelta::ColorTemperature {
            color_temperature_in_kelvin: kelvin,
            light_mode: LightMode::Temp,
            power_state,
        },
    }
}

/// Resolve a directive against the device's current reported state.
///
/// `instance` is the semantic instance from the directive header (e.g.
/// `Blind.Lift`); `template` selects the template-conditional branches.
pub fn resolve(
    name: &DirectiveName,
    payload: &Value,
    instance: Option<&str>,
    reported: &ReportedState,
    template: Template,
) -> Result<Resolution, ResolveError> {
    match name {
        DirectiveName::TurnOn => {
            let mut properties = vec![power_property(PowerState::On)];
            // A dimmer left at brightness 0 would come back "on but
            // invisible"; restore full brightness alongside the power-on.
            let brightness = if reported.brightness == Some(0) {
                properties.push(brightness_property(100));
                Some(100)
            } else {
                None
            };
            Ok(Resolution {
                properties,
                desired: DesiredDelta::Power {
                    power_state: PowerState::On,
                    brightness,
                },
            })
        }

        DirectiveName::TurnOff => Ok(Resolution {
            properties: vec![power_property(PowerState::Off)],
            desired: DesiredDelta::Power {
                power_state: PowerState::Off,
                brightness: None,
            },
        }),

        DirectiveName::SetBrightness => {
            let brightness = payload_i64(payload, "brightness", name)?;
            Ok(brightness_resolution(brightness))
        }

        DirectiveName::AdjustBrightness => {
            let delta = payload_i64(payload, "brightnessDelta", name)?;
            let current = reported.brightness.unwrap_or(BRIGHTNESS_DEFAULT);
            Ok(brightness_resolution(current + delta))
        }

        DirectiveName::SetPercentage => {
            let percentage = payload_i64(payload, "percentage", name)?;
            if template == Template::Blinds {
                return Ok(blinds_resolution(percentage));
            }
            Ok(Resolution {
                properties: vec![Property::new(
                    "Alexa.PercentageController",
                    "percentage",
                    json!(percentage),
                )],
                desired: DesiredDelta::Percentage { percentage },
            })
        }

        DirectiveName::SetColor => {
            let color: ColorHsb = payload
                .get("color")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .ok_or_else(|| ResolveError::Payload(name.as_str().to_string(), "color"))?;
            Ok(Resolution {
                properties: vec![
                    Property::new("Alexa.ColorController", "color", json!(color)),
                    power_property(PowerState::On),
                ],
                desired: DesiredDelta::Color {
                    color,
                    light_mode: LightMode::Hsb,
                    power_state: PowerState::On,
                },
            })
        }

        DirectiveName::SetColorTemperature => {
            let kelvin = payload_i64(payload, "colorTemperatureInKelvin", name)?;
            Ok(kelvin_resolution(kelvin, Some(PowerState::On)))
        }

        DirectiveName::IncreaseColorTemperature => {
            let current = reported.color_temperature_in_kelvin.unwrap_or(KELVIN_DEFAULT);
            let next = KELVIN_PALETTE
                .iter()
                .copied()
                .find(|&k| k > current)
                .unwrap_or(10_000);
            Ok(kelvin_resolution(next, None))
        }

        DirectiveName::DecreaseColorTemperature => {
            let current = reported.color_temperature_in_kelvin.unwrap_or(KELVIN_DEFAULT);
            let next = KELVIN_PALETTE
                .iter()
                .copied()
                .rev()
                .find(|&k| k < current)
                .unwrap_or(1_000);
            Ok(kelvin_resolution(next, None))
        }

        DirectiveName::SetMode => {
            let mode = payload
                .get("mode")
                .and_then(Value::as_str)
                .ok_or_else(|| ResolveError::Payload(name.as_str().to_string(), "mode"))?;
            if template == Template::Blinds {
                let percentage = blind_percentage_for(mode);
                return Ok(Resolution {
                    properties: vec![blind_mode_property(mode), blind_lift_property(percentage)],
                    desired: DesiredDelta::Blinds {
                        percentage,
                        mode: mode.to_string(),
                    },
                });
            }
            let instance = instance
                .ok_or_else(|| ResolveError::Payload(name.as_str().to_string(), "instance"))?;
            Ok(Resolution {
                properties: vec![
                    Property::new("Alexa.ModeController", "mode", json!(mode))
                        .with_instance(instance),
                ],
                desired: DesiredDelta::Mode {
                    mode: mode.to_string(),
                    instance: instance.to_string(),
                },
            })
        }

        DirectiveName::SetRangeValue => {
            let value = payload_i64(payload, "rangeValue", name)?;
            match template {
                Template::Fan => Ok(fan_resolution(value)),
                Template::Blinds => Ok(blinds_resolution(value)),
                _ => Err(ResolveError::Unsupported(name.as_str().to_string())),
            }
        }

        DirectiveName::AdjustRangeValue => {
            let delta = payload_i64(payload, "rangeValueDelta", name)?;
            match template {
                Template::Fan => {
                    let current = reported.speed.unwrap_or(FAN_SPEED_DEFAULT);
                    Ok(fan_resolution(current + delta))
                }
                Template::Blinds => {
                    let current = reported.percentage.unwrap_or(BLIND_LIFT_DEFAULT);
                    Ok(blinds_resolution((current + delta).clamp(0, 100)))
                }
                _ => Err(ResolveError::Unsupported(name.as_str().to_string())),
            }
        }

        DirectiveName::SetTargetTemperature => {
            let setpoint = payload
                .get("targetSetpoint")
                .ok_or_else(|| ResolveError::Payload(name.as_str().to_string(), "targetSetpoint"))?;
            let value = setpoint
                .get("value")
                .and_then(Value::as_f64)
                .ok_or_else(|| ResolveError::Payload(name.as_str().to_string(), "targetSetpoint.value"))?;
            let scale = setpoint
                .get("scale")
                .and_then(Value::as_str)
                .unwrap_or("CELSIUS")
                .to_string();
            Ok(thermostat_resolution(value, scale))
        }

        DirectiveName::AdjustTargetTemperature => {
            let delta = payload
                .get("targetSetpointDelta")
                .and_then(|v| v.get("value"))
                .and_then(Value::as_f64)
                .ok_or_else(|| {
                    ResolveError::Payload(name.as_str().to_string(), "targetSetpointDelta.value")
                })?;
            let current = reported.target_temperature.unwrap_or(SETPOINT_DEFAULT);
            let scale = reported
                .target_scale
                .clone()
                .unwrap_or_else(|| "CELSIUS".to_string());
            Ok(thermostat_resolution(current + delta, scale))
        }

        // Scenes answer with an activation event, not properties; the
        // device still receives the (sanitized) directive itself.
        DirectiveName::Activate | DirectiveName::Deactivate => Ok(Resolution {
            properties: Vec::new(),
            desired: DesiredDelta::None,
        }),

        DirectiveName::ReportState
        | DirectiveName::Discover
        | DirectiveName::Unknown(_) => Err(ResolveError::Unsupported(name.as_str().to_string())),
    }
}

fn thermostat_resolution(value: f64, scale: String) -> Resolution {
    Resolution {
        properties: vec![
            Property::new(
                "Alexa.ThermostatController",
                "targetSetpoint",
                json!({ "value": value, "scale": scale }),
            ),
            Property::new("Alexa.ThermostatController", "thermostatMode", json!("AUTO")),
        ],
        desired: DesiredDelta::Thermostat {
            target_temperature: value,
            target_scale: scale,
            thermostat_mode: "AUTO".to_string(),
        },
    }
}
