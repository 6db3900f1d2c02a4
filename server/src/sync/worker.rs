//! Background execution of accepted signals.

use super::{ReconcileOutcome, Reconciler, SyncError};
use crate::cms::{Sleeper, Transport};
use crate::crm::SourceOfRecord;
use crate::lock::CreateLock;
use catalog_sync_engine::{ChangeType, EntityId};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

pub type JobSender = mpsc::UnboundedSender<SyncJob>;
pub type JobReceiver = mpsc::UnboundedReceiver<SyncJob>;
pub type JobReply = oneshot::Sender<Result<ReconcileOutcome, SyncError>>;

/// A reconciliation request for one event.
#[derive(Debug)]
pub struct SyncJob {
    pub event_id: EntityId,
    pub change: ChangeType,
    pub received_at: DateTime<Utc>,
    /// Set when the submitter waits for the result.
    pub reply: Option<JobReply>,
}

impl SyncJob {
    pub fn new(event_id: impl Into<EntityId>, change: ChangeType) -> Self {
        Self {
            event_id: event_id.into(),
            change,
            received_at: Utc::now(),
            reply: None,
        }
    }

    /// A job whose result is delivered on the returned receiver.
    pub fn with_reply(
        event_id: impl Into<EntityId>,
        change: ChangeType,
    ) -> (Self, oneshot::Receiver<Result<ReconcileOutcome, SyncError>>) {
        let (tx, rx) = oneshot::channel();
        let job = Self {
            reply: Some(tx),
            ..Self::new(event_id, change)
        };
        (job, rx)
    }
}

/// Create the job queue.
pub fn job_queue() -> (JobSender, JobReceiver) {
    mpsc::unbounded_channel()
}

/// Run every job on its own task until all senders are gone.
///
/// Runs share nothing but the reconciler's handles, so jobs for different
/// events, and even for the same event, proceed independently.
pub async fn run_worker<T, S, C, L>(reconciler: Arc<Reconciler<T, S, C, L>>, mut jobs: JobReceiver)
where
    T: Transport + 'static,
    S: Sleeper + 'static,
    C: SourceOfRecord + 'static,
    L: CreateLock + 'static,
{
    tracing::info!("sync worker started");
    while let Some(job) = jobs.recv().await {
        let reconciler = Arc::clone(&reconciler);
        tokio::spawn(async move {
            execute(&reconciler, job).await;
        });
    }
    tracing::info!("job queue closed, sync worker stopping");
}

async fn execute<T, S, C, L>(reconciler: &Reconciler<T, S, C, L>, job: SyncJob)
where
    T: Transport,
    S: Sleeper,
    C: SourceOfRecord,
    L: CreateLock,
{
    let queued_ms = (Utc::now() - job.received_at).num_milliseconds();
    let result = reconciler.run(&job.event_id, job.change.clone()).await;

    match &result {
        Ok(outcome) => tracing::info!(
            event_id = %job.event_id,
            change = %job.change,
            outcome = outcome.name(),
            item_id = outcome.item_id(),
            queued_ms,
            "event reconciled"
        ),
        Err(err) => tracing::error!(
            event_id = %job.event_id,
            change = %job.change,
            action = err.action(),
            status = err.upstream_status(),
            error = %err,
            "reconciliation failed"
        ),
    }

    if let Some(reply) = job.reply {
        // The submitter may have gone away; the result is already logged.
        let _ = reply.send(result);
    }
}
