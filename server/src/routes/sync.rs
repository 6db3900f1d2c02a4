//! Manual sync routes.

use axum::{
    extract::{Path, Query, State},
    routing::post,
    Json, Router,
};

use crate::auth::WebhookAuth;
use crate::error::Result;
use crate::handlers::{handle_replay, ReplayQuery, ReplayResponse};
use crate::AppState;

/// Create sync routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/sync/events/{event_id}", post(replay_handler))
}

/// POST /sync/events/{event_id} - Reconcile one event now and report what happened.
async fn replay_handler(
    State(state): State<AppState>,
    _auth: WebhookAuth,
    Path(event_id): Path<String>,
    Query(query): Query<ReplayQuery>,
) -> Result<Json<ReplayResponse>> {
    let response = handle_replay(&state.jobs, event_id, query).await?;
    Ok(Json(response))
}
