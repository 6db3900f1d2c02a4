//! What a reconciliation run did.

use catalog_sync_engine::{ItemId, NoopReason};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ReconcileOutcome {
    #[serde(rename_all = "camelCase")]
    Created { item_id: ItemId },
    #[serde(rename_all = "camelCase")]
    Updated { item_id: ItemId },
    #[serde(rename_all = "camelCase")]
    Unpublished { item_id: ItemId },
    #[serde(rename_all = "camelCase")]
    Deleted { item_id: ItemId },
    Skipped { reason: NoopReason },
    /// Another run holds the create-lock and is creating the item.
    LockContended,
}

impl ReconcileOutcome {
    pub fn item_id(&self) -> Option<&str> {
        match self {
            ReconcileOutcome::Created { item_id }
            | ReconcileOutcome::Updated { item_id }
            | ReconcileOutcome::Unpublished { item_id }
            | ReconcileOutcome::Deleted { item_id } => Some(item_id),
            ReconcileOutcome::Skipped { .. } | ReconcileOutcome::LockContended => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReconcileOutcome::Created { .. } => "created",
            ReconcileOutcome::Updated { .. } => "updated",
            ReconcileOutcome::Unpublished { .. } => "unpublished",
            ReconcileOutcome::Deleted { .. } => "deleted",
            ReconcileOutcome::Skipped { .. } => "skipped",
            ReconcileOutcome::LockContended => "lockContended",
        }
    }
}
