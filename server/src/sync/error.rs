//! Errors that end a reconciliation run.

use crate::cms::ApiError;
use crate::crm::SourceError;
use crate::lock::LockError;

/// Why a run stopped. Nothing is rolled back; the next signal for the same
/// event converges whatever was left half-done.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A CMS call failed while doing `action`.
    #[error("{action} failed: {source}")]
    Api {
        action: String,
        #[source]
        source: ApiError,
    },

    #[error("source-of-record query failed: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Lock(#[from] LockError),

    /// Mapped field data does not fit the CMS field table.
    #[error("field mapping rejected: {0}")]
    Mapping(#[from] catalog_sync_engine::Error),

    /// The plan asked for a write but no source entity was fetched.
    #[error("no source entity for event {0}")]
    MissingSource(String),
}

impl SyncError {
    /// Adapter for `map_err` that tags a CMS failure with what was being done.
    pub fn api(action: impl Into<String>) -> impl FnOnce(ApiError) -> SyncError {
        let action = action.into();
        move |source| SyncError::Api { action, source }
    }

    /// HTTP status of the failed CMS call, if there was one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            SyncError::Api { source, .. } => source.status(),
            SyncError::Source(SourceError::Http { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// The attempted action, for logs.
    pub fn action(&self) -> &str {
        match self {
            SyncError::Api { action, .. } => action,
            SyncError::Source(_) => "fetch source",
            SyncError::Lock(_) => "create-lock",
            SyncError::Mapping(_) => "map fields",
            SyncError::MissingSource(_) => "plan",
        }
    }
}
