//! In-process create-lock for tests and single-instance development.

use super::{ClaimToken, CreateLock, LockError};
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Claim {
    token: ClaimToken,
    expires_at: Instant,
}

/// Claims kept in a shared map of key to token and expiry.
///
/// Only coordinates runs inside one process.
#[derive(Debug, Clone, Default)]
pub struct MemoryCreateLock {
    claims: Arc<DashMap<String, Claim>>,
}

impl MemoryCreateLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is currently claimed.
    #[cfg(test)]
    pub fn is_held(&self, key: &str) -> bool {
        self.claims
            .get(key)
            .is_some_and(|claim| claim.expires_at > Instant::now())
    }
}

impl CreateLock for MemoryCreateLock {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<Option<ClaimToken>, LockError> {
        let now = Instant::now();
        let token = ClaimToken::generate();
        let claim = Claim {
            token: token.clone(),
            expires_at: now + ttl,
        };

        let acquired = match self.claims.entry(key.to_string()) {
            Entry::Occupied(mut held) => {
                if held.get().expires_at <= now {
                    held.insert(claim);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(claim);
                true
            }
        };
        Ok(acquired.then_some(token))
    }

    async fn release(&self, key: &str, token: &ClaimToken) -> Result<(), LockError> {
        if self
            .claims
            .remove_if(key, |_, claim| claim.token == *token)
            .is_none()
        {
            tracing::warn!(key, "create-lock expired before release");
        }
        Ok(())
    }
}
