//! Shadow accessor — read access to thing- and device-level shadow
//! documents in the IoT data plane.
//!
//! The thing shadow carries bridge-level facts (connectivity, client
//! version); named per-endpoint shadows carry the device state the
//! projector works from. Both are read-only from the skill's side:
//! `desired` is written over MQTT, `reported` only by the device.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use aws_sdk_iotdataplane::Client as IotClient;

use hl_protocol::ShadowDocument;

use crate::error::ShadowError;

#[async_trait]
pub trait ShadowAccessor: Send + Sync {
    /// Fetch the unnamed (thing-level) shadow.
    async fn thing_shadow(&self, thing_id: &str) -> Result<ShadowDocument, ShadowError>;

    /// Fetch the named per-endpoint shadow.
    async fn device_shadow(
        &self,
        thing_id: &str,
        endpoint_id: &str,
    ) -> Result<ShadowDocument, ShadowError>;
}

/// Shadow accessor backed by the IoT data plane.
pub struct IotShadowAccessor {
    client: IotClient,
}

impl IotShadowAccessor {
    /// Create an accessor with a pre-built IoT data plane client.
    pub fn new(client: IotClient) -> Self {
        Self { client }
    }

    async fn fetch(
        &self,
        thing_id: &str,
        shadow_name: Option<&str>,
    ) -> Result<ShadowDocument, ShadowError> {
        let mut req = self.client.get_thing_shadow().thing_name(thing_id);
        if let Some(name) = shadow_name {
            req = req.shadow_name(name);
        }

        let output = req.send().await.map_err(|e| {
            let service_err = e.into_service_error();
            if service_err.is_resource_not_found_exception() {
                ShadowError::NotFound
            } else {
                ShadowError::Fetch(service_err.to_string())
            }
        })?;

        let payload = output.payload.ok_or(ShadowError::NotFound)?;
        serde_json::from_slice(&payload.into_inner())
            .map_err(|e| ShadowError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ShadowAccessor for IotShadowAccessor {
    async fn thing_shadow(&self, thing_id: &str) -> Result<ShadowDocument, ShadowError> {
        self.fetch(thing_id, None).await
    }

    async fn device_shadow(
        &self,
        thing_id: &str,
        endpoint_id: &str,
    ) -> Result<ShadowDocument, ShadowError> {
        self.fetch(thing_id, Some(endpoint_id)).await
    }
}

/// In-memory shadow store for tests and local runs.
#[derive(Default)]
pub struct MemoryShadowAccessor {
    shadows: Mutex<HashMap<String, ShadowDocument>>,
}

impl MemoryShadowAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(thing_id: &str, endpoint_id: Option<&str>) -> String {
        match endpoint_id {
            Some(endpoint) => format!("{thing_id}/{endpoint}"),
            None => thing_id.to_string(),
        }
    }

    pub fn put_thing_shadow(&self, thing_id: &str, doc: ShadowDocument) {
        self.shadows
            .lock()
            .unwrap()
            .insert(Self::key(thing_id, None), doc);
    }

    pub fn put_device_shadow(&self, thing_id: &str, endpoint_id: &str, doc: ShadowDocument) {
        self.shadows
            .lock()
            .unwrap()
            .insert(Self::key(thing_id, Some(endpoint_id)), doc);
    }

    pub fn remove_device_shadow(&self, thing_id: &str, endpoint_id: &str) {
        self.shadows
            .lock()
            .unwrap()
            .remove(&Self::key(thing_id, Some(endpoint_id)));
    }

    fn get(&self, key: &str) -> Result<ShadowDocument, ShadowError> {
        self.shadows
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or(ShadowError::NotFound)
    }
}

#[async_trait]
impl ShadowAccessor for MemoryShadowAccessor {
    async fn thing_shadow(&self, thing_id: &str) -> Result<ShadowDocument, ShadowError> {
        self.get(&Self::key(thing_id, None))
    }

    async fn device_shadow(
        &self,
        thing_id: &str,
        endpoint_id: &str,
    ) -> Result<ShadowDocument, ShadowError> {
        self.get(&Self::key(thing_id, Some(endpoint_id)))
    }
}
