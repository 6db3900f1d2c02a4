//! Operator-triggered reconciliation of a single event.

use catalog_sync_engine::ChangeType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::sync::{JobSender, ReconcileOutcome, SyncJob};

/// Query parameters for a replay.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayQuery {
    /// Defaults to `Update`, which converges to whatever the source says.
    pub change_type: Option<ChangeType>,
}

/// Result of a replayed run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayResponse {
    pub event_id: String,
    #[serde(flatten)]
    pub outcome: ReconcileOutcome,
    pub finished_at: DateTime<Utc>,
}

/// Run a reconciliation through the worker and wait for it.
pub async fn handle_replay(
    jobs: &JobSender,
    event_id: String,
    query: ReplayQuery,
) -> Result<ReplayResponse> {
    if event_id.trim().is_empty() {
        return Err(AppError::BadRequest("event id is empty".to_string()));
    }
    let change = query.change_type.unwrap_or(ChangeType::Update);

    tracing::info!(event_id = %event_id, change = %change, "replaying event");
    let (job, reply) = SyncJob::with_reply(event_id.clone(), change);
    jobs.send(job)
        .map_err(|_| AppError::Internal("sync worker is not running".to_string()))?;

    let outcome = reply
        .await
        .map_err(|_| AppError::Internal("sync worker dropped the job".to_string()))??;

    Ok(ReplayResponse {
        event_id,
        outcome,
        finished_at: Utc::now(),
    })
}
