//! Shared test harness for E2E integration tests.
//!
//! Wires the directive engine with in-memory collaborators and drives
//! it through the real Axum router, exercising the same code paths the
//! deployed backend runs.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use hl_mqtt_channel::MockChannel;
use hl_protocol::{ReportedState, ShadowDocument, ShadowState, Template};
use hl_skill::cache::MemoryPropsCache;
use hl_skill::gateway::{EventGateway, MockEventGateway};
use hl_skill::profile::MockProfileFetcher;
use hl_skill::registry::{DeviceRecord, DeviceRegistry, MemoryCredentialsStore, MemoryDeviceRegistry};
use hl_skill::shadow::MemoryShadowAccessor;
use hl_skill::{AppState, DirectiveEngine, SkillConfig, routes};

pub const THING: &str = "hlt-001";
pub const ENDPOINT: &str = "hld-a";
pub const USER: &str = "amzn1.account.AB12";
pub const SKILL_TOKEN: &str = "skill-token";
pub const GATEWAY_TOKEN: &str = "gateway-token";

/// End-to-end test harness: HTTP router + the injected collaborators.
pub struct TestHarness {
    pub router: Router,
    pub shadows: Arc<MemoryShadowAccessor>,
    pub channel: Arc<MockChannel>,
    pub cache: Arc<MemoryPropsCache>,
    pub gateway: Arc<MockEventGateway>,
    pub registry: Arc<MemoryDeviceRegistry>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_gateway(Arc::new(MockEventGateway::new()))
    }

    /// Build the harness around an alternative event gateway (e.g. the
    /// real HTTP client pointed at a wiremock server). The harness's
    /// `gateway` field then records nothing.
    pub fn with_event_gateway(gateway: Arc<dyn EventGateway>) -> Self {
        Self::build(gateway, Arc::new(MockEventGateway::new()))
    }

    fn with_gateway(gateway: Arc<MockEventGateway>) -> Self {
        Self::build(gateway.clone(), gateway)
    }

    fn build(gateway: Arc<dyn EventGateway>, mock_gateway: Arc<MockEventGateway>) -> Self {
        let shadows = Arc::new(MemoryShadowAccessor::new());
        let channel = Arc::new(MockChannel::new());
        let cache = Arc::new(MemoryPropsCache::new(Duration::from_secs(3600)));
        let registry = Arc::new(MemoryDeviceRegistry::new());
        let credentials = Arc::new(MemoryCredentialsStore::new());
        let profiles = Arc::new(MockProfileFetcher::new());

        profiles.insert(SKILL_TOKEN, USER);
        credentials.insert(USER, GATEWAY_TOKEN, "eu-west-1");

        let engine = DirectiveEngine::new(
            shadows.clone(),
            channel.clone(),
            cache.clone(),
            gateway,
            registry.clone(),
            credentials,
            profiles,
            SkillConfig::default(),
        );
        let router = routes::build_router(AppState::new(Arc::new(engine)));

        Self {
            router,
            shadows,
            channel,
            cache,
            gateway: mock_gateway,
            registry,
        }
    }

    /// Mark the bridge thing online with an accepted client version.
    pub fn connect_thing(&self) {
        self.connect_thing_version("2.14.0");
    }

    pub fn connect_thing_version(&self, version: &str) {
        self.shadows.put_thing_shadow(
            THING,
            ShadowDocument {
                state: ShadowState {
                    desired: json!({}),
                    reported: ReportedState {
                        connected: Some(true),
                        client_version: Some(version.to_string()),
                        ..Default::default()
                    },
                },
            },
        );
    }

    pub fn disconnect_thing(&self) {
        self.shadows.put_thing_shadow(
            THING,
            ShadowDocument {
                state: ShadowState {
                    desired: json!({}),
                    reported: ReportedState {
                        connected: Some(false),
                        client_version: Some("2.14.0".to_string()),
                        ..Default::default()
                    },
                },
            },
        );
    }

    pub fn set_device_state(&self, reported: ReportedState) {
        self.shadows.put_device_shadow(
            THING,
            ENDPOINT,
            ShadowDocument {
                state: ShadowState {
                    desired: json!({}),
                    reported,
                },
            },
        );
    }

    pub async fn register_device(&self, device_id: &str, friendly_name: &str, template: Template) {
        self.registry
            .upsert_device(DeviceRecord {
                device_id: device_id.to_string(),
                user_id: USER.to_string(),
                thing_id: THING.to_string(),
                friendly_name: friendly_name.to_string(),
                template,
            })
            .await
            .unwrap();
    }

    pub async fn post_skill(&self, event: Value) -> (StatusCode, Value) {
        self.post("/skill", event).await
    }

    pub async fn post_backchannel(&self, event: Value) -> (StatusCode, Value) {
        self.post("/backchannel", event).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}

/// An inbound directive event in the Alexa Smart Home v3 shape.
pub fn directive(name: &str, template: &str, payload: Value) -> Value {
    json!({
        "directive": {
            "header": {
                "namespace": "Alexa",
                "name": name,
                "messageId": "msg-1",
                "correlationToken": "corr-1",
                "payloadVersion": "3",
            },
            "endpoint": {
                "endpointId": ENDPOINT,
                "scope": { "type": "BearerToken", "token": SKILL_TOKEN },
                "cookie": { "template": template, "thingId": THING },
            },
            "payload": payload,
        }
    })
}

pub fn discover_event() -> Value {
    json!({
        "directive": {
            "header": {
                "namespace": "Alexa.Discovery",
                "name": "Discover",
                "messageId": "msg-1",
                "payloadVersion": "3",
            },
            "payload": {
                "scope": { "type": "BearerToken", "token": SKILL_TOKEN },
            },
        }
    })
}

pub fn directive_topic() -> String {
    format!("homelink/{THING}/{ENDPOINT}/directive")
}

pub fn shadow_update_topic() -> String {
    format!("homelink/{THING}/{ENDPOINT}/shadow/update")
}

pub fn service_topic() -> String {
    format!("homelink/{THING}/service")
}
