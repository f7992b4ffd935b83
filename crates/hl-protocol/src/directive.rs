use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::template::Template;

/// The closed set of directive names the skill understands.
///
/// The original dispatch was a string-keyed handler map; here the enum makes
/// the match exhaustive and funnels everything else into `Unknown`, which the
/// engine answers with an `INVALID_DIRECTIVE` error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveName {
    TurnOn,
    TurnOff,
    SetBrightness,
    AdjustBrightness,
    SetPercentage,
    SetColor,
    SetColorTemperature,
    IncreaseColorTemperature,
    DecreaseColorTemperature,
    SetMode,
    SetRangeValue,
    AdjustRangeValue,
    Activate,
    Deactivate,
    SetTargetTemperature,
    AdjustTargetTemperature,
    ReportState,
    Discover,
    Unknown(String),
}

impl DirectiveName {
    pub fn parse(name: &str) -> Self {
        match name {
            "TurnOn" => Self::TurnOn,
            "TurnOff" => Self::TurnOff,
            "SetBrightness" => Self::SetBrightness,
            "AdjustBrightness" => Self::AdjustBrightness,
            "SetPercentage" => Self::SetPercentage,
            "SetColor" => Self::SetColor,
            "SetColorTemperature" => Self::SetColorTemperature,
            "IncreaseColorTemperature" => Self::IncreaseColorTemperature,
            "DecreaseColorTemperature" => Self::DecreaseColorTemperature,
            "SetMode" => Self::SetMode,
            "SetRangeValue" => Self::SetRangeValue,
            "AdjustRangeValue" => Self::AdjustRangeValue,
            "Activate" => Self::Activate,
            "Deactivate" => Self::Deactivate,
            "SetTargetTemperature" => Self::SetTargetTemperature,
            "AdjustTargetTemperature" => Self::AdjustTargetTemperature,
            "ReportState" => Self::ReportState,
            "Discover" => Self::Discover,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::TurnOn => "TurnOn",
            Self::TurnOff => "TurnOff",
            Self::SetBrightness => "SetBrightness",
            Self::AdjustBrightness => "AdjustBrightness",
            Self::SetPercentage => "SetPercentage",
            Self::SetColor => "SetColor",
            Self::SetColorTemperature => "SetColorTemperature",
            Self::IncreaseColorTemperature => "IncreaseColorTemperature",
            Self::DecreaseColorTemperature => "DecreaseColorTemperature",
            Self::SetMode => "SetMode",
            Self::SetRangeValue => "SetRangeValue",
            Self::AdjustRangeValue => "AdjustRangeValue",
            Self::Activate => "Activate",
            Self::Deactivate => "Deactivate",
            Self::SetTargetTemperature => "SetTargetTemperature",
            Self::AdjustTargetTemperature => "AdjustTargetTemperature",
            Self::ReportState => "ReportState",
            Self::Discover => "Discover",
            Self::Unknown(s) => s,
        }
    }
}

/// `directive.header` of an inbound Alexa Smart Home v3 event.
///
/// `messageId` and `payloadVersion` are optional so the sanitized
/// device-bound stub can omit them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveHeader {
    pub namespace: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_version: Option<String>,
    /// Instance for ModeController / RangeController directives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// Bearer token scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    #[serde(rename = "type")]
    pub scope_type: String,
    pub token: String,
}

/// Opaque routing context round-tripped by Alexa between discovery and
/// subsequent directives. Used for routing only, never for authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub template: Template,
    pub thing_id: String,
}

/// `directive.endpoint` of an inbound event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveEndpoint {
    pub endpoint_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie: Option<Cookie>,
}

/// A full inbound Alexa directive event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveEvent {
    pub directive: Directive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directive {
    pub header: DirectiveHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<DirectiveEndpoint>,
    #[serde(default)]
    pub payload: Value,
}

impl DirectiveEvent {
    pub fn name(&self) -> DirectiveName {
        DirectiveName::parse(&self.directive.header.name)
    }

    /// The `-R` response messageId convention: reuse the inbound id.
    pub fn response_message_id(&self) -> String {
        match &self.directive.header.message_id {
            Some(id) => format!("{id}-R"),
            None => "unknown-R".to_string(),
        }
    }

    pub fn correlation_token(&self) -> Option<&str> {
        self.directive.header.correlation_token.as_deref()
    }

    pub fn endpoint_id(&self) -> Option<&str> {
        self.directive.endpoint.as_ref().map(|e| e.endpoint_id.as_str())
    }

    pub fn cookie(&self) -> Option<&Cookie> {
        self.directive.endpoint.as_ref().and_then(|e| e.cookie.as_ref())
    }

    /// The device-bound copy of this event. The client must not see
    /// skill-internal correlation metadata: the header loses `messageId`
    /// and `payloadVersion`, the endpoint loses `scope` and `cookie`.
    pub fn sanitized(&self) -> DirectiveEvent {
        let mut stub = self.clone();
        stub.directive.header.message_id = None;
        stub.directive.header.payload_version = None;
        if let Some(endpoint) = &mut stub.directive.endpoint {
            endpoint.scope = None;
            endpoint.cookie = None;
        }
        stub
    }
}
