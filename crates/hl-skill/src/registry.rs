//! Device registry and credential store seams.
//!
//! The registry is the backend's record of which endpoints each user has
//! discovered and which thing hosts them; the credential store holds the
//! per-user Alexa access token and skill region captured at account
//! linking. Both are external stores in production; in-memory
//! implementations back tests and local runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use hl_protocol::Template;

use crate::error::RegistryError;

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub device_id: String,
    pub user_id: String,
    pub thing_id: String,
    pub friendly_name: String,
    pub template: Template,
}

#[derive(Debug, Clone)]
pub struct UserAccount {
    pub is_blocked: bool,
    pub allowed_device_count: usize,
}

impl Default for UserAccount {
    fn default() -> Self {
        Self {
            is_blocked: false,
            allowed_device_count: 200,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub access_token: String,
    pub skill_region: String,
}

#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    async fn upsert_device(&self, record: DeviceRecord) -> Result<(), RegistryError>;

    async fn delete_device(
        &self,
        user_id: &str,
        thing_id: &str,
        device_id: &str,
    ) -> Result<(), RegistryError>;

    async fn devices_of_user(&self, user_id: &str) -> Result<Vec<DeviceRecord>, RegistryError>;

    /// Resolve the owning user of a thing, if any device of it has been
    /// discovered.
    async fn user_id_for_thing(&self, thing_id: &str) -> Result<Option<String>, RegistryError>;

    async fn user_account(&self, user_id: &str) -> Result<UserAccount, RegistryError>;

    /// Count devices the user connects through things other than the
    /// given one; used to apportion the per-user device allowance.
    async fn device_count_excluding_thing(
        &self,
        user_id: &str,
        thing_id: &str,
    ) -> Result<usize, RegistryError>;
}

#[async_trait]
pub trait CredentialsStore: Send + Sync {
    async fn credentials(&self, user_id: &str) -> Result<UserCredentials, RegistryError>;
}

/// Stable token binding a user to a thing, handed to the device on
/// provisioning and echoed on every change report so the backend can
/// skip a registry lookup. Format: `{userId}#{hex digest}`.
pub fn make_user_id_token(user_id: &str, thing_id: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{user_id}-{thing_id}-{secret}"));
    format!("{user_id}#{:x}", hasher.finalize())
}

/// Extract and verify the userId from a token; `None` if forged or
/// malformed.
pub fn verify_user_id_token(token: &str, thing_id: &str, secret: &str) -> Option<String> {
    let (user_id, _) = token.split_once('#')?;
    if token == make_user_id_token(user_id, thing_id, secret) {
        Some(user_id.to_string())
    } else {
        None
    }
}

#[derive(Default)]
pub struct MemoryDeviceRegistry {
    devices: Mutex<HashMap<String, DeviceRecord>>,
    accounts: Mutex<HashMap<String, UserAccount>>,
}

impl MemoryDeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_account(&self, user_id: &str, account: UserAccount) {
        self.accounts
            .lock()
            .unwrap()
            .insert(user_id.to_string(), account);
    }

    fn key(user_id: &str, thing_id: &str, device_id: &str) -> String {
        format!("{user_id}/{thing_id}/{device_id}")
    }
}

#[async_trait]
impl DeviceRegistry for MemoryDeviceRegistry {
    async fn upsert_device(&self, record: DeviceRecord) -> Result<(), RegistryError> {
        let key = Self::key(&record.user_id, &record.thing_id, &record.device_id);
        self.devices.lock().unwrap().insert(key, record);
        Ok(())
    }

    async fn delete_device(
        &self,
        user_id: &str,
        thing_id: &str,
        device_id: &str,
    ) -> Result<(), RegistryError> {
        self.devices
            .lock()
            .unwrap()
            .remove(&Self::key(user_id, thing_id, device_id));
        Ok(())
    }

    async fn devices_of_user(&self, user_id: &str) -> Result<Vec<DeviceRecord>, RegistryError> {
        Ok(self
            .devices
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn user_id_for_thing(&self, thing_id: &str) -> Result<Option<String>, RegistryError> {
        Ok(self
            .devices
            .lock()
            .unwrap()
            .values()
            .find(|d| d.thing_id == thing_id)
            .map(|d| d.user_id.clone()))
    }

    async fn user_account(&self, user_id: &str) -> Result<UserAccount, RegistryError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn device_count_excluding_thing(
        &self,
        user_id: &str,
        thing_id: &str,
    ) -> Result<usize, RegistryError> {
        Ok(self
            .devices
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.user_id == user_id && d.thing_id != thing_id)
            .count())
    }
}

#[derive(Default)]
pub struct MemoryCredentialsStore {
    credentials: Mutex<HashMap<String, UserCredentials>>,
}

impl MemoryCredentialsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user_id: &str, access_token: &str, skill_region: &str) {
        self.credentials.lock().unwrap().insert(
            user_id.to_string(),
            UserCredentials {
                access_token: access_token.to_string(),
                skill_region: skill_region.to_string(),
            },
        );
    }
}

#[async_trait]
impl CredentialsStore for MemoryCredentialsStore {
    async fn credentials(&self, user_id: &str) -> Result<UserCredentials, RegistryError> {
        self.credentials
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or_else(|| RegistryError::Storage(format!("no credentials for user {user_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips() {
        let token = make_user_id_token("amzn1.account.AB12", "hlt-001", "s3cret");
        assert_eq!(
            verify_user_id_token(&token, "hlt-001", "s3cret").as_deref(),
            Some("amzn1.account.AB12")
        );
    }

    #[test]
    fn token_bound_to_thing_and_secret() {
        let token = make_user_id_token("amzn1.account.AB12", "hlt-001", "s3cret");
        assert!(verify_user_id_token(&token, "hlt-002", "s3cret").is_none());
        assert!(verify_user_id_token(&token, "hlt-001", "other").is_none());
        assert!(verify_user_id_token("garbage", "hlt-001", "s3cret").is_none());
    }

    #[tokio::test]
    async fn registry_tracks_devices_per_user_and_thing() {
        let registry = MemoryDeviceRegistry::new();
        for (device, thing) in [("hld-a", "hlt-001"), ("hld-b", "hlt-001"), ("hld-c", "hlt-002")] {
            registry
                .upsert_device(DeviceRecord {
                    device_id: device.into(),
                    user_id: "u1".into(),
                    thing_id: thing.into(),
                    friendly_name: device.into(),
                    template: Template::Switch,
                })
                .await
                .unwrap();
        }

        assert_eq!(registry.devices_of_user("u1").await.unwrap().len(), 3);
        assert_eq!(
            registry.user_id_for_thing("hlt-002").await.unwrap(),
            Some("u1".to_string())
        );
        assert_eq!(
            registry
                .device_count_excluding_thing("u1", "hlt-001")
                .await
                .unwrap(),
            1
        );

        registry.delete_device("u1", "hlt-001", "hld-a").await.unwrap();
        assert_eq!(registry.devices_of_user("u1").await.unwrap().len(), 2);
    }
}
