use serde::{Deserialize, Serialize};
use serde_json::Value;

/// ON / OFF power state as Alexa spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerState {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
}

impl PowerState {
    /// Derive power state from a dimmable level (0 means off).
    pub fn from_level(level: i64) -> Self {
        if level > 0 { Self::On } else { Self::Off }
    }
}

/// Which facet of a color-capable light is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightMode {
    Temp,
    Hsb,
}

/// Hue/saturation/brightness color value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorHsb {
    pub hue: f64,
    pub saturation: f64,
    pub brightness: f64,
}

/// The `reported` sub-state of a thing or endpoint shadow. Every key is
/// optional; which ones are present depends on the device template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportedState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_state: Option<PowerState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_temperature_in_kelvin: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorHsb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_scale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<i64>,
    /// Mode value; for lights this doubles as the lightMode discriminator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_mode: Option<LightMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_version: Option<String>,
}

impl ReportedState {
    /// Resolve the effective light mode: an explicit `lightMode` wins, then
    /// a `mode` key that parses as one, then temperature as the default.
    pub fn effective_light_mode(&self, explicit: Option<LightMode>) -> LightMode {
        if let Some(mode) = explicit {
            return mode;
        }
        if let Some(mode) = self.light_mode {
            return mode;
        }
        match self.mode.as_deref() {
            Some("hsb") => LightMode::Hsb,
            _ => LightMode::Temp,
        }
    }
}

/// A persisted shadow document: `desired` is written by the backend in
/// response to directives, `reported` only ever by the device itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShadowDocument {
    pub state: ShadowState,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowState {
    pub desired: Value,
    pub reported: ReportedState,
}
