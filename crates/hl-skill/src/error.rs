//! Error types for the skill backend's external collaborators.
//!
//! Alexa-visible protocol errors are *values* (`ErrorResponse` envelopes,
//! see `envelope::ErrorType`), never Rust errors. The types here cover the
//! integration seams: shadow store, event gateway, profile endpoint,
//! registry. Transient failures on these seams are logged with context and
//! degraded to a `false`/miss result at the caller, never propagated out of
//! a handler.

use thiserror::Error;

/// Shadow store failures. `NotFound` is ordinary (a thing that never
/// reported has no shadow) and callers treat it as "device unknown".
#[derive(Debug, Error)]
pub enum ShadowError {
    #[error("shadow not found")]
    NotFound,

    #[error("shadow fetch failed: {0}")]
    Fetch(String),

    #[error("shadow decode failed: {0}")]
    Decode(String),
}

/// Alexa event-gateway failures. Success is strictly HTTP 202.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no event gateway for region '{0}'")]
    UnknownRegion(String),

    #[error("event gateway request failed: {0}")]
    Http(String),

    #[error("event gateway rejected event with status {status}")]
    Rejected { status: u16 },
}

/// Amazon profile endpoint failures; all of them surface to Alexa as
/// `EXPIRED_AUTHORIZATION_CREDENTIAL`.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile request failed: {0}")]
    Http(String),

    #[error("access token rejected with status {status}")]
    Rejected { status: u16 },
}

/// Device/user registry failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry operation failed: {0}")]
    Storage(String),
}
