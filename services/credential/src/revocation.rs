//! Revocation injection point and an in-memory store.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Answers whether a token id has been revoked.
pub trait RevocationCheck: Send + Sync {
    /// Whether `token_id` is revoked.
    fn is_revoked(&self, token_id: &str) -> bool;
}

impl<F> RevocationCheck for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_revoked(&self, token_id: &str) -> bool {
        self(token_id)
    }
}

/// Revoked token ids, each kept until the token itself would have expired.
#[derive(Debug, Default)]
pub struct RevocationList {
    entries: RwLock<HashMap<String, i64>>,
}

impl RevocationList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Revoke `token_id`, whose token expires at `expires_at`.
    pub fn revoke(&self, token_id: impl Into<String>, expires_at: i64) {
        self.entries.write().insert(token_id.into(), expires_at);
    }

    /// Whether `token_id` is revoked.
    #[must_use]
    pub fn is_revoked(&self, token_id: &str) -> bool {
        self.entries.read().contains_key(token_id)
    }

    /// Drop entries for tokens that have expired at `now`. Returns how many.
    pub fn prune(&self, now: i64) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, expires_at| now < *expires_at);
        before - entries.len()
    }

    /// Number of tracked ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no id is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl RevocationCheck for RevocationList {
    fn is_revoked(&self, token_id: &str) -> bool {
        Self::is_revoked(self, token_id)
    }
}
