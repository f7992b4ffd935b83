//! Inbound Alexa directive endpoint.

use axum::Json;
use axum::extract::State;
use serde_json::Value;

use crate::state::AppState;

/// POST /skill — one Alexa directive in, one response document out.
///
/// The engine never fails: protocol problems come back as Alexa
/// `ErrorResponse` envelopes with HTTP 200, matching how the skill
/// infrastructure consumes them.
pub async fn handle(State(state): State<AppState>, Json(event): Json<Value>) -> Json<Value> {
    Json(state.engine.handle_skill(event).await)
}
