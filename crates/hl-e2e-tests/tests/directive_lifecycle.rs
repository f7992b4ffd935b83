//! E2E tests for the inbound directive lifecycle:
//! HTTP skill event → resolve → MQTT fan-out → deferred response →
//! backchannel redemption → proactive `Response` push.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use helpers::{
    ENDPOINT, THING, TestHarness, directive, directive_topic, shadow_update_topic,
};
use hl_protocol::{PowerState, ReportedState};

/// Full round trip: "turn on" → deferred response + device stub +
/// shadow delta, then the device redeems the correlation token and the
/// async `Response` reaches the gateway.
#[tokio::test]
async fn e2e_turn_on_full_lifecycle() {
    let h = TestHarness::new();
    h.connect_thing();
    h.register_device(ENDPOINT, "Hallway", hl_protocol::Template::Switch)
        .await;

    // 1. Alexa delivers the directive over HTTP
    let (status, response) = h.post_skill(directive("TurnOn", "SWITCH", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["event"]["header"]["name"], "DeferredResponse");
    assert_eq!(response["event"]["payload"]["estimatedDeferralInSeconds"], 5);

    // 2. The sanitized stub reached the device topic
    let stubs = h.channel.published_to(&directive_topic());
    assert_eq!(stubs.len(), 1);
    let stub = stubs[0].json();
    assert_eq!(stub["directive"]["header"]["name"], "TurnOn");
    assert_eq!(stub["directive"]["header"]["correlationToken"], "corr-1");
    assert!(stub["directive"]["header"].get("messageId").is_none());
    assert!(stub["directive"]["endpoint"].get("scope").is_none());
    assert!(stub["directive"]["endpoint"].get("cookie").is_none());

    // 3. The anticipated delta was written to the device shadow
    let updates = h.channel.published_to(&shadow_update_topic());
    assert_eq!(updates.len(), 1);
    let update = updates[0].json();
    assert_eq!(update["state"]["desired"]["powerState"], "ON");
    assert_eq!(update["source"], "alexa");
    assert_eq!(update["directive"], "TurnOn");

    // 4. The device confirms and redeems the correlation token
    let (status, body) = h
        .post_backchannel(json!({
            "rule": "changeReport",
            "thingId": THING,
            "endpointId": ENDPOINT,
            "causeType": "VOICE_INTERACTION",
            "correlationToken": "corr-1",
            "clientVersion": "2.14.0",
            "properties": [{
                "namespace": "Alexa.PowerController",
                "name": "powerState",
                "value": "ON",
                "timeOfSample": "2026-08-30T10:00:00.000Z",
                "uncertaintyInMilliseconds": 500,
                "changed": true
            }]
        }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["handled"], true);

    // 5. The async Response made it to the event gateway
    assert_eq!(h.gateway.pushed_names(), vec!["Response"]);
    let (region, pushed) = &h.gateway.pushed()[0];
    assert_eq!(region, "eu-west-1");
    assert_eq!(pushed["event"]["header"]["correlationToken"], "corr-1");
    assert_eq!(pushed["context"]["properties"][0]["value"], "ON");
}

/// Scene directives answer synchronously and skip the shadow delta.
#[tokio::test]
async fn e2e_scene_activation_answers_immediately() {
    let h = TestHarness::new();
    h.connect_thing();

    let (status, response) = h.post_skill(directive("Activate", "SCENE", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["event"]["header"]["name"], "ActivationStarted");
    assert_eq!(
        response["event"]["payload"]["cause"]["type"],
        "VOICE_INTERACTION"
    );
    assert_eq!(response["context"], json!({}));

    assert_eq!(h.channel.published_to(&directive_topic()).len(), 1);
    assert!(h.channel.published_to(&shadow_update_topic()).is_empty());
}

/// Turning on a dimmable light sitting at brightness 0 restores full
/// brightness in the same delta.
#[tokio::test]
async fn e2e_turn_on_restores_brightness() {
    let h = TestHarness::new();
    h.connect_thing();
    h.set_device_state(ReportedState {
        power_state: Some(PowerState::Off),
        brightness: Some(0),
        ..Default::default()
    });

    let (_, response) = h
        .post_skill(directive("TurnOn", "DIMMABLE_LIGHT_BULB", json!({})))
        .await;
    assert_eq!(response["event"]["header"]["name"], "DeferredResponse");

    let update = h.channel.published_to(&shadow_update_topic())[0].json();
    assert_eq!(update["state"]["desired"]["powerState"], "ON");
    assert_eq!(update["state"]["desired"]["brightness"], 100);
}

/// An outdated client is refused before the connectivity check runs.
#[tokio::test]
async fn e2e_outdated_client_rejected_as_firmware() {
    let h = TestHarness::new();
    h.connect_thing_version("2.0.0");

    let (status, response) = h.post_skill(directive("TurnOn", "SWITCH", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["event"]["header"]["name"], "ErrorResponse");
    assert_eq!(response["event"]["payload"]["type"], "FIRMWARE_OUT_OF_DATE");
    assert!(h.channel.published().is_empty());
}

/// A disconnected bridge makes every endpoint behind it unreachable.
#[tokio::test]
async fn e2e_disconnected_thing_unreachable() {
    let h = TestHarness::new();
    h.disconnect_thing();

    let (_, response) = h.post_skill(directive("TurnOff", "SWITCH", json!({}))).await;
    assert_eq!(response["event"]["payload"]["type"], "ENDPOINT_UNREACHABLE");
    assert!(h.channel.published().is_empty());
}

/// A token the profile service does not recognize is reported as an
/// expired credential, prompting Alexa to re-link.
#[tokio::test]
async fn e2e_unknown_token_expired_credential() {
    let h = TestHarness::new();
    h.connect_thing();

    let mut event = directive("TurnOn", "SWITCH", json!({}));
    event["directive"]["endpoint"]["scope"]["token"] = json!("not-a-token");

    let (status, response) = h.post_skill(event).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        response["event"]["payload"]["type"],
        "EXPIRED_AUTHORIZATION_CREDENTIAL"
    );
}

/// Directives the backend does not understand come back as
/// INVALID_DIRECTIVE instead of crashing the invocation.
#[tokio::test]
async fn e2e_unknown_directive_invalid() {
    let h = TestHarness::new();
    h.connect_thing();

    let (_, response) = h
        .post_skill(directive("SetVolume", "SWITCH", json!({ "volume": 10 })))
        .await;
    assert_eq!(response["event"]["payload"]["type"], "INVALID_DIRECTIVE");
    assert!(h.channel.published().is_empty());
}

/// Color directives force the lamp on and select the HSB mode.
#[tokio::test]
async fn e2e_set_color_forces_power_and_mode() {
    let h = TestHarness::new();
    h.connect_thing();

    let (_, response) = h
        .post_skill(directive(
            "SetColor",
            "COLOR_CHANGING_LIGHT_BULB",
            json!({ "color": { "hue": 120.0, "saturation": 0.5, "brightness": 0.8 } }),
        ))
        .await;
    assert_eq!(response["event"]["header"]["name"], "DeferredResponse");

    let update = h.channel.published_to(&shadow_update_topic())[0].json();
    let desired = &update["state"]["desired"];
    assert_eq!(desired["powerState"], "ON");
    assert_eq!(desired["lightMode"], "hsb");
    assert_eq!(desired["color"]["hue"], 120.0);
}
