//! Inbound device backchannel endpoint.
//!
//! Device events normally arrive over MQTT via the bridge; this route
//! accepts the same payloads over HTTP for test harnesses and local
//! clients without a broker.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use hl_protocol::BackchannelEvent;

use crate::state::AppState;

/// POST /backchannel — one device event in, handled flag out.
pub async fn handle(
    State(state): State<AppState>,
    Json(event): Json<BackchannelEvent>,
) -> Json<Value> {
    let handled = state.engine.handle_backchannel(event).await;
    Json(json!({ "handled": handled }))
}
