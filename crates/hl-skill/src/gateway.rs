//! Alexa event gateway client — proactive event delivery.
//!
//! The gateway is region-sharded; the user's skill region (captured at
//! account linking) selects the endpoint. Alexa acknowledges accepted
//! events with exactly HTTP 202, anything else is a failure.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::GatewayError;

#[async_trait]
pub trait EventGateway: Send + Sync {
    /// POST one event envelope, bearer-authenticated.
    async fn push(
        &self,
        region: &str,
        access_token: &str,
        event: &Value,
    ) -> Result<(), GatewayError>;
}

fn gateway_url(region: &str) -> Option<&'static str> {
    match region.to_lowercase().as_str() {
        "eu-west-1" => Some("https://api.eu.amazonalexa.com/v3/events"),
        "us-east-1" => Some("https://api.amazonalexa.com/v3/events"),
        "us-west-2" => Some("https://api.fe.amazonalexa.com/v3/events"),
        _ => None,
    }
}

/// HTTP client for the real event gateway.
pub struct AlexaEventGateway {
    client: reqwest::Client,
    /// Overrides the region-derived URL; used to point at a local stub.
    base_override: Option<String>,
}

impl AlexaEventGateway {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_override: None,
        }
    }

    pub fn with_base_url(base: impl Into<String>) -> Self {
        let mut gateway = Self::new();
        gateway.base_override = Some(base.into());
        gateway
    }
}

impl Default for AlexaEventGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventGateway for AlexaEventGateway {
    async fn push(
        &self,
        region: &str,
        access_token: &str,
        event: &Value,
    ) -> Result<(), GatewayError> {
        let url = match &self.base_override {
            Some(base) => format!("{base}/v3/events"),
            None => gateway_url(region)
                .ok_or_else(|| GatewayError::UnknownRegion(region.to_string()))?
                .to_string(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        let status = response.status();
        if status.as_u16() != 202 {
            tracing::warn!(%status, %url, "event gateway rejected event");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}

/// Recording gateway double for tests.
#[derive(Default)]
pub struct MockEventGateway {
    pushed: Mutex<Vec<(String, Value)>>,
    fail: Mutex<bool>,
}

impl MockEventGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent push fail with a rejected status.
    pub fn fail_next(&self) {
        *self.fail.lock().unwrap() = true;
    }

    pub fn pushed(&self) -> Vec<(String, Value)> {
        self.pushed.lock().unwrap().clone()
    }

    pub fn pushed_names(&self) -> Vec<String> {
        self.pushed
            .lock()
            .unwrap()
            .iter()
            .map(|(_, event)| {
                event["event"]["header"]["name"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }
}

#[async_trait]
impl EventGateway for MockEventGateway {
    async fn push(
        &self,
        region: &str,
        _access_token: &str,
        event: &Value,
    ) -> Result<(), GatewayError> {
        if *self.fail.lock().unwrap() {
            return Err(GatewayError::Rejected { status: 500 });
        }
        self.pushed
            .lock()
            .unwrap()
            .push((region.to_string(), event.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn region_map_covers_the_three_shards() {
        assert_eq!(
            gateway_url("eu-west-1"),
            Some("https://api.eu.amazonalexa.com/v3/events")
        );
        assert_eq!(
            gateway_url("US-EAST-1"),
            Some("https://api.amazonalexa.com/v3/events")
        );
        assert_eq!(
            gateway_url("us-west-2"),
            Some("https://api.fe.amazonalexa.com/v3/events")
        );
        assert_eq!(gateway_url("ap-southeast-2"), None);
    }

    #[tokio::test]
    async fn unknown_region_is_an_error() {
        let gateway = AlexaEventGateway::new();
        let err = gateway
            .push("ap-southeast-2", "tok", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::UnknownRegion(_)));
    }

    #[tokio::test]
    async fn accepts_only_http_202() {
        use wiremock::matchers::{bearer_token, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/events"))
            .and(bearer_token("tok"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = AlexaEventGateway::with_base_url(server.uri());
        gateway
            .push("eu-west-1", "tok", &json!({"event": {}}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_202_status_is_rejected() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/events"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let gateway = AlexaEventGateway::with_base_url(server.uri());
        let err = gateway
            .push("eu-west-1", "tok", &json!({"event": {}}))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { status: 200 }));
    }

    #[tokio::test]
    async fn mock_records_pushes_in_order() {
        let gateway = MockEventGateway::new();
        gateway
            .push("eu-west-1", "tok", &json!({"event": {"header": {"name": "ChangeReport"}}}))
            .await
            .unwrap();
        assert_eq!(gateway.pushed_names(), vec!["ChangeReport"]);
    }
}
