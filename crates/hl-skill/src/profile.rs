//! Login-with-Amazon profile lookup.
//!
//! Every inbound directive carries a bearer token; resolving it to a
//! user profile both authenticates the request and yields the userId
//! that keys the device registry. A failed lookup is surfaced to Alexa
//! as `EXPIRED_AUTHORIZATION_CREDENTIAL`.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::ProfileError;

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    async fn fetch(&self, access_token: &str) -> Result<UserProfile, ProfileError>;
}

const PROFILE_URL: &str = "https://api.amazon.com/user/profile";

/// Profile fetcher against the real LWA endpoint.
pub struct AmazonProfileFetcher {
    client: reqwest::Client,
    url: String,
}

impl AmazonProfileFetcher {
    pub fn new() -> Self {
        Self::with_url(PROFILE_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
        }
    }
}

impl Default for AmazonProfileFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileFetcher for AmazonProfileFetcher {
    async fn fetch(&self, access_token: &str) -> Result<UserProfile, ProfileError> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProfileError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProfileError::Rejected {
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProfileError::Http(e.to_string()))
    }
}

/// Token-to-profile map for tests; unknown tokens are rejected with 401.
#[derive(Default)]
pub struct MockProfileFetcher {
    profiles: Mutex<HashMap<String, UserProfile>>,
}

impl MockProfileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, access_token: &str, user_id: &str) {
        self.profiles.lock().unwrap().insert(
            access_token.to_string(),
            UserProfile {
                user_id: user_id.to_string(),
                name: None,
                email: None,
            },
        );
    }
}

#[async_trait]
impl ProfileFetcher for MockProfileFetcher {
    async fn fetch(&self, access_token: &str) -> Result<UserProfile, ProfileError> {
        self.profiles
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or(ProfileError::Rejected { status: 401 })
    }
}
