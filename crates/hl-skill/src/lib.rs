//! Homelink skill backend — Alexa Smart Home directive engine.
//!
//! Receives Alexa directives over HTTP, fans control intents out to
//! bridge devices over MQTT, and turns device-originated backchannel
//! events into proactive Alexa reports.

pub mod bridge;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod profile;
pub mod projector;
pub mod registry;
pub mod reports;
pub mod resolver;
pub mod routes;
pub mod service;
pub mod shadow;
pub mod state;

pub use config::SkillConfig;
pub use engine::DirectiveEngine;
pub use state::AppState;
