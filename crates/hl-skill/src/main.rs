//! Homelink skill backend — HTTP server plus MQTT bridge.
//!
//! Runs the Alexa-facing directive endpoint and, when a broker is
//! configured, the backchannel bridge against AWS IoT Core. Without
//! MQTT_BROKER_HOST set it runs fully in memory for local development.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use hl_mqtt_channel::{DevicePublish, MqttChannel, MqttConfig};
use hl_skill::cache::MemoryPropsCache;
use hl_skill::gateway::AlexaEventGateway;
use hl_skill::profile::AmazonProfileFetcher;
use hl_skill::registry::{MemoryCredentialsStore, MemoryDeviceRegistry};
use hl_skill::shadow::IotShadowAccessor;
use hl_skill::{AppState, DirectiveEngine, SkillConfig, bridge, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "hl-skill starting");

    let config = SkillConfig::from_env();

    let state = match std::env::var("MQTT_BROKER_HOST") {
        Ok(broker_host) => {
            let aws_config = aws_config::load_from_env().await;
            let mut iot_builder = aws_sdk_iotdataplane::config::Builder::from(&aws_config);
            if let Some(endpoint) = &config.iot_endpoint {
                iot_builder = iot_builder.endpoint_url(format!("https://{endpoint}"));
            }
            let iot_client = aws_sdk_iotdataplane::Client::from_conf(iot_builder.build());

            let mqtt_config = MqttConfig {
                broker_host,
                broker_port: 8883,
                client_id: format!("hl-skill-{}", uuid::Uuid::new_v4()),
                use_tls: true,
                client_cert_path: std::env::var("MQTT_CERT_PATH").unwrap_or_default(),
                client_key_path: std::env::var("MQTT_KEY_PATH").unwrap_or_default(),
                ca_cert_path: std::env::var("MQTT_CA_PATH").unwrap_or_default(),
                keepalive_secs: 30,
            };
            let (channel, eventloop) = MqttChannel::new(&mqtt_config)?;
            let channel = Arc::new(channel);
            channel.subscribe_backchannels().await?;

            let engine = DirectiveEngine::new(
                Arc::new(IotShadowAccessor::new(iot_client)),
                channel,
                Arc::new(MemoryPropsCache::new(Duration::from_secs(
                    config.cache_ttl_secs,
                ))),
                Arc::new(AlexaEventGateway::new()),
                Arc::new(MemoryDeviceRegistry::new()),
                Arc::new(MemoryCredentialsStore::new()),
                Arc::new(AmazonProfileFetcher::new()),
                config.clone(),
            );
            let state = AppState::new(Arc::new(engine));

            tokio::spawn(bridge::run(eventloop, state.clone()));
            state
        }
        Err(_) => {
            tracing::warn!("MQTT_BROKER_HOST not set — running fully in memory");
            AppState::in_memory(config.clone())
        }
    };

    let app = routes::build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
