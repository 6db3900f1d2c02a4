//! The create-lock: a short-lived claim on "I am creating this entity".
//!
//! Held only around the creation of a brand-new event item, so concurrent
//! runs for the same absent event create it once. Claims expire on their own
//! if a holder dies before releasing.

mod memory;
mod postgres;

pub use memory::*;
pub use postgres::*;

use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

/// Proof of one acquisition. Each claim gets a fresh token, so releasing
/// with a stale token never drops a newer holder's claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimToken(String);

impl ClaimToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Atomic set-if-absent with expiry, plus explicit release.
pub trait CreateLock: Send + Sync {
    /// Claim `key` for `ttl`. `None` when a live claim already exists.
    fn try_acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<Option<ClaimToken>, LockError>> + Send;

    /// Drop the claim on `key` made with `token`. A no-op when the claim
    /// expired and someone else has since taken the key.
    fn release(
        &self,
        key: &str,
        token: &ClaimToken,
    ) -> impl Future<Output = Result<(), LockError>> + Send;
}

/// Lock store failures.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("lock store error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Lock key for creating the event with source id `event_id`.
pub fn event_create_key(event_id: &str) -> String {
    format!("create:event:{event_id}")
}
