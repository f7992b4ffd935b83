//! Property projector — turns a raw `reported` shadow state into the
//! Alexa-shaped property list for state reports and change reports.
//!
//! Pure and total: every shadow key is optional and presence-tested, so
//! a sparse or empty document projects to a short (possibly empty) list
//! instead of an error. Color-capable lights report either color
//! temperature or HSB color, never both, selected by the light-mode
//! discriminator.

use serde_json::json;

use hl_protocol::{LightMode, Property, ReportedState};

use crate::shadow::ShadowAccessor;

/// Project a reported shadow state into Alexa properties.
///
/// `light_mode` overrides the discriminator baked into the shadow; pass
/// `None` to let the shadow's own `lightMode`/`mode` keys decide.
pub fn project(reported: &ReportedState, light_mode: Option<LightMode>) -> Vec<Property> {
    let mut properties = Vec::new();

    if let Some(power_state) = reported.power_state {
        properties.push(Property::new(
            "Alexa.PowerController",
            "powerState",
            json!(power_state),
        ));
    }

    if let Some(brightness) = reported.brightness {
        properties.push(Property::new(
            "Alexa.BrightnessController",
            "brightness",
            json!(brightness),
        ));
    }

    match reported.effective_light_mode(light_mode) {
        LightMode::Temp => {
            if let Some(kelvin) = reported.color_temperature_in_kelvin {
                properties.push(Property::new(
                    "Alexa.ColorTemperatureController",
                    "colorTemperatureInKelvin",
                    json!(kelvin),
                ));
            }
        }
        LightMode::Hsb => {
            if let Some(color) = reported.color {
                properties.push(Property::new("Alexa.ColorController", "color", json!(color)));
            }
        }
    }

    if let (Some(temperature), Some(scale)) = (reported.temperature, reported.scale.as_deref()) {
        properties.push(Property::new(
            "Alexa.TemperatureSensor",
            "temperature",
            json!({ "value": temperature, "scale": scale }),
        ));
    }

    if let (Some(target), Some(scale)) = (
        reported.target_temperature,
        reported.target_scale.as_deref(),
    ) {
        properties.push(Property::new(
            "Alexa.ThermostatController",
            "targetSetpoint",
            json!({ "value": target, "scale": scale }),
        ));
    }

    if let Some(speed) = reported.speed {
        properties.push(
            Property::new("Alexa.RangeController", "rangeValue", json!(speed))
                .with_instance("Fan.Speed"),
        );
    }

    if let Some(percentage) = reported.percentage {
        properties.push(
            Property::new("Alexa.RangeController", "rangeValue", json!(percentage))
                .with_instance("Blind.Lift"),
        );
    }

    if let (Some(mode), Some(instance)) = (reported.mode.as_deref(), reported.instance.as_deref()) {
        properties
            .push(Property::new("Alexa.ModeController", "mode", json!(mode)).with_instance(instance));
    }

    properties
}

/// Project the device shadow and append a thing-level connectivity
/// property.
///
/// Connectivity comes from the thing shadow, not the device shadow: the
/// bridge process is the unit that connects to the broker. If either
/// shadow cannot be fetched (including plain not-found), the result
/// degrades to a single `UNREACHABLE` health property — a report with
/// only health information is still a valid report.
pub async fn project_with_connectivity(
    shadows: &dyn ShadowAccessor,
    thing_id: &str,
    endpoint_id: &str,
) -> Vec<Property> {
    let thing = match shadows.thing_shadow(thing_id).await {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!(thing_id, error = %e, "thing shadow fetch failed, reporting unreachable");
            return vec![Property::connectivity(false)];
        }
    };

    let mut properties = match shadows.device_shadow(thing_id, endpoint_id).await {
        Ok(doc) => project(&doc.state.reported, None),
        Err(e) => {
            tracing::warn!(thing_id, endpoint_id, error = %e, "device shadow fetch failed, reporting unreachable");
            return vec![Property::connectivity(false)];
        }
    };

    properties.push(Property::connectivity(
        thing.state.reported.connected.unwrap_or(false),
    ));
    properties
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shadow::MemoryShadowAccessor;
    use hl_protocol::{ColorHsb, PowerState, ShadowDocument, ShadowState};

    fn names(properties: &[Property]) -> Vec<&str> {
        properties.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn empty_state_projects_to_nothing() {
        assert!(project(&ReportedState::default(), None).is_empty());
    }

    #[test]
    fn full_light_state_in_temp_mode() {
        let reported = ReportedState {
            power_state: Some(PowerState::On),
            brightness: Some(80),
            color_temperature_in_kelvin: Some(4000),
            color: Some(ColorHsb {
                hue: 120.0,
                saturation: 0.5,
                brightness: 0.8,
            }),
            ..Default::default()
        };

        let properties = project(&reported, Some(LightMode::Temp));
        assert_eq!(
            names(&properties),
            vec!["powerState", "brightness", "colorTemperatureInKelvin"]
        );
    }

    #[test]
    fn hsb_mode_prefers_color_over_temperature() {
        let reported = ReportedState {
            color_temperature_in_kelvin: Some(4000),
            color: Some(ColorHsb {
                hue: 120.0,
                saturation: 0.5,
                brightness: 0.8,
            }),
            ..Default::default()
        };

        let properties = project(&reported, Some(LightMode::Hsb));
        assert_eq!(names(&properties), vec!["color"]);
        assert_eq!(properties[0].value["hue"], 120.0);
    }

    #[test]
    fn shadow_mode_key_selects_hsb_when_not_overridden() {
        let reported = ReportedState {
            mode: Some("hsb".into()),
            color: Some(ColorHsb {
                hue: 10.0,
                saturation: 1.0,
                brightness: 1.0,
            }),
            color_temperature_in_kelvin: Some(2700),
            ..Default::default()
        };

        let properties = project(&reported, None);
        assert_eq!(names(&properties), vec!["color"]);
    }

    #[test]
    fn range_properties_carry_instances() {
        let reported = ReportedState {
            speed: Some(7),
            percentage: Some(100),
            ..Default::default()
        };

        let properties = project(&reported, None);
        assert_eq!(properties[0].instance.as_deref(), Some("Fan.Speed"));
        assert_eq!(properties[1].instance.as_deref(), Some("Blind.Lift"));
    }

    #[test]
    fn temperature_requires_both_value_and_scale() {
        let reported = ReportedState {
            temperature: Some(21.5),
            ..Default::default()
        };
        assert!(project(&reported, None).is_empty());
    }

    #[test]
    fn projection_is_stable_apart_from_timestamps() {
        let reported = ReportedState {
            power_state: Some(PowerState::Off),
            brightness: Some(30),
            ..Default::default()
        };

        let mut a = project(&reported, None);
        let mut b = project(&reported, None);
        for p in a.iter_mut().chain(b.iter_mut()) {
            p.time_of_sample.clear();
        }
        assert_eq!(serde_json::to_value(&a).unwrap(), serde_json::to_value(&b).unwrap());
    }

    fn doc(reported: ReportedState) -> ShadowDocument {
        ShadowDocument {
            state: ShadowState {
                desired: json!({}),
                reported,
            },
        }
    }

    #[tokio::test]
    async fn connectivity_comes_from_thing_shadow() {
        let store = MemoryShadowAccessor::new();
        store.put_thing_shadow(
            "hlt-001",
            doc(ReportedState {
                connected: Some(true),
                ..Default::default()
            }),
        );
        store.put_device_shadow(
            "hlt-001",
            "hld-a",
            doc(ReportedState {
                power_state: Some(PowerState::On),
                ..Default::default()
            }),
        );

        let properties = project_with_connectivity(&store, "hlt-001", "hld-a").await;
        assert_eq!(names(&properties), vec!["powerState", "connectivity"]);
        assert_eq!(properties[1].value["value"], "OK");
    }

    #[tokio::test]
    async fn missing_shadow_degrades_to_unreachable_only() {
        let store = MemoryShadowAccessor::new();
        let properties = project_with_connectivity(&store, "hlt-001", "hld-a").await;
        assert_eq!(names(&properties), vec!["connectivity"]);
        assert_eq!(properties[0].value["value"], "UNREACHABLE");
    }
}
