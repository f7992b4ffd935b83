//! Skill backend configuration.

use serde::Deserialize;

/// Top-level backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SkillConfig {
    /// Listen address (e.g., "0.0.0.0").
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// AWS IoT data endpoint for shadow reads (IOT_ENDPOINT env var).
    pub iot_endpoint: Option<String>,
    /// State-report cache TTL in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Secret mixed into thing-bound user-id tokens (HASH_SECRET env var).
    #[serde(default = "default_token_secret")]
    pub token_secret: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_token_secret() -> String {
    "dev-secret".to_string()
}

impl SkillConfig {
    /// Load config from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = std::env::var("IOT_ENDPOINT") {
            config.iot_endpoint = Some(endpoint);
        }
        if let Ok(secret) = std::env::var("HASH_SECRET") {
            config.token_secret = secret;
        }
        if let Ok(port) = std::env::var("PORT")
            && let Ok(port) = port.parse()
        {
            config.port = port;
        }
        config
    }
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            iot_endpoint: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            token_secret: default_token_secret(),
        }
    }
}
