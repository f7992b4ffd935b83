//! MQTT channel for AWS IoT Core communication.
//!
//! Provides the typed MQTT abstraction the skill backend publishes through:
//! - `Channel` trait for publish/subscribe (mockable in tests)
//! - `MqttChannel` with TLS (mTLS) for production
//! - `MockChannel` for testing without a broker

pub mod channel;
pub mod config;
pub mod error;
pub mod mock;
pub mod tls;

// Re-exports for convenience.
pub use channel::{Channel, DevicePublish, MqttChannel};
pub use config::MqttConfig;
pub use error::{MqttError, MqttResult};
pub use mock::MockChannel;
