//! CRM webhook route.

use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Json, Router};

use crate::auth::WebhookAuth;
use crate::error::Result;
use crate::handlers::{handle_signal, parse_signal, SignalAck};
use crate::AppState;

/// Create webhook routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/webhooks/crm", post(crm_webhook))
}

/// POST /webhooks/crm - Accept a change signal.
///
/// The body is decoded by hand so that any malformed payload is a 400.
async fn crm_webhook(
    State(state): State<AppState>,
    _auth: WebhookAuth,
    body: Bytes,
) -> Result<(StatusCode, Json<SignalAck>)> {
    let signal = parse_signal(&body)?;
    let ack = handle_signal(&state.jobs, signal)?;
    Ok((StatusCode::ACCEPTED, Json(ack)))
}
