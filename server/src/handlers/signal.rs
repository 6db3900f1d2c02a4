//! Change-signal ingress.

use catalog_sync_engine::{ChangeSignal, Error};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::sync::{JobSender, SyncJob};

/// Acknowledgement returned to the CRM.
///
/// `accepted` says whether a reconciliation was queued, not whether it
/// succeeded: the signal is acknowledged before any work starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalAck {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SignalAck {
    fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    fn ignored(reason: String) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
        }
    }
}

/// Decode a raw signal body; anything that is not a signal is a bad request.
pub fn parse_signal(body: &[u8]) -> Result<ChangeSignal> {
    serde_json::from_slice(body)
        .map_err(|e| Error::InvalidPayload(format!("change signal: {e}")).into())
}

/// Queue a reconciliation for an event signal. Signals about other entities
/// are acknowledged and dropped.
pub fn handle_signal(jobs: &JobSender, signal: ChangeSignal) -> Result<SignalAck> {
    signal.validate()?;

    if !signal.is_event() {
        tracing::debug!(
            entity = %signal.entity_name,
            record_id = %signal.record_id,
            "ignoring signal for unsynchronized entity"
        );
        return Ok(SignalAck::ignored(format!(
            "entity {} is not synchronized",
            signal.entity_name
        )));
    }

    tracing::info!(
        event_id = %signal.record_id,
        change = %signal.change_type,
        "signal accepted"
    );
    jobs.send(SyncJob::new(signal.record_id, signal.change_type))
        .map_err(|_| AppError::Internal("sync worker is not running".to_string()))?;

    Ok(SignalAck::accepted())
}
