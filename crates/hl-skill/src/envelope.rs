//! Response envelope builder — the Alexa Smart Home v3 event shapes.
//!
//! Synchronous answers (error, deferred, scene, cached state report)
//! reuse the inbound messageId with a `-R` suffix; asynchronous events
//! pushed to the event gateway mint a fresh messageId and authenticate
//! with the user's bearer token inside the endpoint scope.

use serde_json::{Value, json};
use uuid::Uuid;

use hl_protocol::{CauseType, DirectiveEvent, Property, iso_now};

/// Alexa `ErrorResponse` payload types surfaced by the directive path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    ExpiredAuthorizationCredential,
    FirmwareOutOfDate,
    EndpointUnreachable,
    InvalidDirective,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExpiredAuthorizationCredential => "EXPIRED_AUTHORIZATION_CREDENTIAL",
            Self::FirmwareOutOfDate => "FIRMWARE_OUT_OF_DATE",
            Self::EndpointUnreachable => "ENDPOINT_UNREACHABLE",
            Self::InvalidDirective => "INVALID_DIRECTIVE",
        }
    }
}

pub fn error_response(
    event: &DirectiveEvent,
    error_type: ErrorType,
    message: &str,
    endpoint_id: Option<&str>,
) -> Value {
    let mut response = json!({
        "event": {
            "header": {
                "namespace": "Alexa",
                "name": "ErrorResponse",
                "messageId": event.response_message_id(),
                "payloadVersion": "3",
            },
            "payload": {
                "type": error_type.as_str(),
                "message": message,
            },
        },
    });

    if let Some(endpoint_id) = endpoint_id {
        response["endpoint"] = json!({ "endpointId": endpoint_id });
    }

    response
}

/// Generic deferred response promising an async follow-up within ~5s.
pub fn deferred_response(event: &DirectiveEvent) -> Value {
    json!({
        "event": {
            "header": {
                "namespace": "Alexa",
                "name": "DeferredResponse",
                "messageId": event.response_message_id(),
                "correlationToken": event.directive.header.correlation_token,
                "payloadVersion": "3",
            },
            "payload": {
                "estimatedDeferralInSeconds": 5,
            },
        },
    })
}

/// Immediate SceneController answer. A scene's actual effect is fully
/// asynchronous; Alexa is only told that activation began.
pub fn scene_response(event: &DirectiveEvent, activate: bool) -> Value {
    json!({
        "context": {},
        "event": {
            "header": {
                "messageId": event.response_message_id(),
                "correlationToken": event.directive.header.correlation_token,
                "namespace": "Alexa.SceneController",
                "name": if activate { "ActivationStarted" } else { "DeactivationStarted" },
                "payloadVersion": "3",
            },
            "endpoint": {
                "endpointId": event.endpoint_id(),
            },
            "payload": {
                "cause": { "type": "VOICE_INTERACTION" },
                "timestamp": iso_now(),
            },
        },
    })
}

/// Synchronous `StateReport` answered straight from the cache.
pub fn cached_state_report(event: &DirectiveEvent, properties: &[Property]) -> Value {
    json!({
        "event": {
            "header": {
                "namespace": "Alexa",
                "name": "StateReport",
                "messageId": event.response_message_id(),
                "correlationToken": event.directive.header.correlation_token,
                "payloadVersion": "3",
            },
            "endpoint": {
                "endpointId": event.endpoint_id(),
            },
            "payload": {},
        },
        "context": {
            "properties": properties,
        },
    })
}

fn async_event(
    name: &str,
    endpoint_id: &str,
    correlation_token: &str,
    access_token: &str,
    properties: &[Property],
) -> Value {
    let mut context_properties: Vec<Value> = properties
        .iter()
        .map(|p| serde_json::to_value(p).unwrap_or_default())
        .collect();
    context_properties.push(json!(Property::connectivity(true)));

    json!({
        "event": {
            "header": {
                "namespace": "Alexa",
                "name": name,
                "messageId": Uuid::new_v4().to_string(),
                "correlationToken": correlation_token,
                "payloadVersion": "3",
            },
            "endpoint": {
                "scope": {
                    "type": "BearerToken",
                    "token": access_token,
                },
                "endpointId": endpoint_id,
            },
            "payload": {},
        },
        "context": {
            "properties": context_properties,
        },
    })
}

/// Async correlated `Response` redeeming a deferred directive.
pub fn async_response(
    endpoint_id: &str,
    correlation_token: &str,
    access_token: &str,
    properties: &[Property],
) -> Value {
    async_event("Response", endpoint_id, correlation_token, access_token, properties)
}

/// Async correlated `StateReport` redeeming a deferred `ReportState`.
pub fn async_state_report(
    endpoint_id: &str,
    correlation_token: &str,
    access_token: &str,
    properties: &[Property],
) -> Value {
    async_event(
        "StateReport",
        endpoint_id,
        correlation_token,
        access_token,
        properties,
    )
}

/// Proactive `ChangeReport`. `changed` goes under
/// `event.payload.change.properties`, `unchanged` under
/// `context.properties` with a synthetic connectivity property appended.
pub fn change_report(
    endpoint_id: &str,
    access_token: &str,
    cause_type: CauseType,
    changed: &[Property],
    unchanged: &[Property],
) -> Value {
    let mut context_properties: Vec<Value> = unchanged
        .iter()
        .map(|p| serde_json::to_value(p).unwrap_or_default())
        .collect();
    context_properties.push(json!(Property::connectivity(true)));

    json!({
        "event": {
            "header": {
                "namespace": "Alexa",
                "name": "ChangeReport",
                "messageId": Uuid::new_v4().to_string(),
                "payloadVersion": "3",
            },
            "endpoint": {
                "scope": {
                    "type": "BearerToken",
                    "token": access_token,
                },
                "endpointId": endpoint_id,
            },
            "payload": {
                "change": {
                    "cause": { "type": cause_type },
                    "properties": changed,
                },
            },
        },
        "context": {
            "properties": context_properties,
        },
    })
}

/// Proactive `DoorbellPress` event.
pub fn doorbell_press(endpoint_id: &str, access_token: &str) -> Value {
    json!({
        "context": {},
        "event": {
            "header": {
                "namespace": "Alexa.DoorbellEventSource",
                "name": "DoorbellPress",
                "messageId": Uuid::new_v4().to_string(),
                "payloadVersion": "3",
            },
            "endpoint": {
                "scope": {
                    "type": "BearerToken",
                    "token": access_token,
                },
                "endpointId": endpoint_id,
            },
            "payload": {
                "cause": { "type": "PHYSICAL_INTERACTION" },
                "timestamp": iso_now(),
            },
        },
    })
}

/// Proactive discovery of new or updated endpoints.
pub fn add_or_update_report(endpoints: &[Value], access_token: &str) -> Value {
    json!({
        "event": {
            "header": {
                "namespace": "Alexa.Discovery",
                "name": "AddOrUpdateReport",
                "messageId": Uuid::new_v4().to_string(),
                "payloadVersion": "3",
            },
            "payload": {
                "endpoints": endpoints,
                "scope": {
                    "type": "BearerToken",
                    "token": access_token,
                },
            },
        },
    })
}

/// Proactive removal of endpoints.
pub fn delete_report(endpoint_ids: &[String], access_token: &str) -> Value {
    let endpoints: Vec<Value> = endpoint_ids
        .iter()
        .map(|id| json!({ "endpointId": id }))
        .collect();

    json!({
        "event": {
            "header": {
                "namespace": "Alexa.Discovery",
                "name": "DeleteReport",
                "messageId": Uuid::new_v4().to_string(),
                "payloadVersion": "3",
            },
            "payload": {
                "endpoints": endpoints,
                "scope": {
                    "type": "BearerToken",
                    "token": access_token,
                },
            },
        },
    })
}

/// Synchronous `Discover.Response`.
pub fn discover_response(event: &DirectiveEvent, endpoints: &[Value]) -> Value {
    json!({
        "event": {
            "header": {
                "namespace": "Alexa.Discovery",
                "name": "Discover.Response",
                "messageId": event.response_message_id(),
                "payloadVersion": "3",
            },
            "payload": {
                "endpoints": endpoints,
            },
        },
    })
}
