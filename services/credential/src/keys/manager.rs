//! Key Manager with copy-on-rotate key sets.
//!
//! Readers load the current [`KeySet`] through `ArcSwap` and never block.
//! Writers (rotation, registration, purge) are serialized by a mutex and
//! publish a brand-new set; a published set is never mutated.

use super::key::Key;
use super::source::KeySource;
use crate::clock::Clock;
use crate::error::CredentialError;
use crate::jwks::Jwks;
use crate::metrics;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// Immutable snapshot of registered keys.
#[derive(Debug, Default, Clone)]
pub struct KeySet {
    keys: HashMap<String, Arc<Key>>,
    active: Option<String>,
}

impl KeySet {
    /// The key designated for signing, regardless of its window.
    #[must_use]
    pub fn active_key(&self) -> Option<&Arc<Key>> {
        self.active.as_ref().and_then(|kid| self.keys.get(kid))
    }

    /// The active key, if it is usable for signing at `now`.
    ///
    /// # Errors
    ///
    /// `NoActiveKey` if none is designated or its window excludes `now`.
    pub fn signing_key_at(&self, now: i64) -> Result<Arc<Key>, CredentialError> {
        self.active_key()
            .filter(|key| key.can_sign() && key.is_valid_at(now))
            .cloned()
            .ok_or(CredentialError::NoActiveKey)
    }

    /// A key accepted for verification at `now`.
    ///
    /// A key registered ahead of its window is published in the JWKS but
    /// does not verify tokens until its window opens.
    ///
    /// # Errors
    ///
    /// `UnknownKey` if the id is not registered or `now` is outside its window.
    pub fn verification_key_at(&self, kid: &str, now: i64) -> Result<Arc<Key>, CredentialError> {
        self.keys
            .get(kid)
            .filter(|key| key.is_valid_at(now))
            .cloned()
            .ok_or_else(|| CredentialError::unknown_key(kid))
    }

    /// Number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no key is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Registered key ids, sorted.
    #[must_use]
    pub fn key_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over registered keys in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Key>> {
        self.keys.values()
    }

    fn has_expired(&self, now: i64) -> bool {
        self.keys.values().any(|key| key.is_expired_at(now))
    }

    /// Copy of this set without keys whose window closed, plus the purged ids.
    fn without_expired(&self, now: i64) -> (Self, Vec<String>) {
        let mut purged = Vec::new();
        let keys = self
            .keys
            .iter()
            .filter(|(kid, key)| {
                let expired = key.is_expired_at(now);
                if expired {
                    purged.push((*kid).clone());
                }
                !expired
            })
            .map(|(kid, key)| (kid.clone(), Arc::clone(key)))
            .collect::<HashMap<_, _>>();

        let active = self.active.clone().filter(|kid| keys.contains_key(kid));
        (Self { keys, active }, purged)
    }
}

/// Owns all key material for the process lifetime.
pub struct KeyManager {
    keys: ArcSwap<KeySet>,
    rotation: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl KeyManager {
    /// Create an empty manager. Signing fails with `NoActiveKey` until a key
    /// is rotated in.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            keys: ArcSwap::from_pointee(KeySet::default()),
            rotation: Mutex::new(()),
            clock,
        }
    }

    /// Create a manager seeded from a key source.
    ///
    /// Retired keys are registered for verification, then the active key is
    /// rotated in.
    ///
    /// # Errors
    ///
    /// Propagates source failures and `KeyRejected`.
    pub fn bootstrap(source: &dyn KeySource, clock: Arc<dyn Clock>) -> Result<Self, CredentialError> {
        let manager = Self::new(clock);
        let bundle = source.load(manager.clock.now())?;

        for key in bundle.retired {
            manager.add_verification_key(key)?;
        }
        manager.rotate(bundle.active)?;

        info!(keys = manager.snapshot().len(), "Key manager bootstrapped");
        Ok(manager)
    }

    /// Clock shared with the engines built on this manager.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Currently published key set.
    #[must_use]
    pub fn snapshot(&self) -> Arc<KeySet> {
        self.keys.load_full()
    }

    /// The active signing key.
    ///
    /// # Errors
    ///
    /// `NoActiveKey` if none is configured or it has left its window.
    pub fn current_signing_key(&self) -> Result<Arc<Key>, CredentialError> {
        self.current_signing_key_at(self.clock.now())
    }

    /// The active signing key as of `now`.
    ///
    /// # Errors
    ///
    /// `NoActiveKey` if none is configured or it has left its window.
    pub fn current_signing_key_at(&self, now: i64) -> Result<Arc<Key>, CredentialError> {
        let snapshot = self.keys.load();
        let result = snapshot.signing_key_at(now);
        if snapshot.has_expired(now) {
            self.try_purge(now);
        }
        result
    }

    /// A verification-capable key.
    ///
    /// # Errors
    ///
    /// `UnknownKey` if the id was never registered, or was rotated out and purged.
    pub fn key_for(&self, kid: &str) -> Result<Arc<Key>, CredentialError> {
        self.key_for_at(kid, self.clock.now())
    }

    /// A verification-capable key as of `now`.
    ///
    /// # Errors
    ///
    /// `UnknownKey` if the id was never registered, or was rotated out and purged.
    pub fn key_for_at(&self, kid: &str, now: i64) -> Result<Arc<Key>, CredentialError> {
        let snapshot = self.keys.load();
        let result = snapshot.verification_key_at(kid, now);
        if snapshot.has_expired(now) {
            self.try_purge(now);
        }
        result
    }

    /// Install `new_key` as the active signer.
    ///
    /// The previous active key stays registered for verification until its
    /// window closes. Expired keys are purged in the same step.
    ///
    /// # Errors
    ///
    /// `KeyRejected` if the key cannot sign, is outside its window, or its id
    /// is already registered.
    #[instrument(skip_all, fields(kid = %new_key.kid(), algorithm = %new_key.algorithm()))]
    pub fn rotate(&self, new_key: Key) -> Result<(), CredentialError> {
        let _guard = self.rotation.lock();
        let now = self.clock.now();

        let result = Self::admit(&new_key, now, true).and_then(|()| {
            let (mut next, purged) = self.keys.load().without_expired(now);
            if next.keys.contains_key(new_key.kid()) {
                return Err(CredentialError::key_rejected(
                    new_key.kid(),
                    "key id already registered",
                ));
            }

            let previous = next.active.replace(new_key.kid().to_string());
            next.keys
                .insert(new_key.kid().to_string(), Arc::new(new_key));
            self.publish(next, &purged);
            Ok(previous)
        });

        match result {
            Ok(previous) => {
                metrics::record_key_rotation("success");
                info!(previous = ?previous, "Signing key rotated");
                Ok(())
            }
            Err(e) => {
                metrics::record_key_rotation("rejected");
                Err(e)
            }
        }
    }

    /// Register a key for verification only. The active signer is unchanged.
    ///
    /// # Errors
    ///
    /// `KeyRejected` if the key's window has closed or its id is already registered.
    #[instrument(skip_all, fields(kid = %key.kid()))]
    pub fn add_verification_key(&self, key: Key) -> Result<(), CredentialError> {
        let _guard = self.rotation.lock();
        let now = self.clock.now();

        Self::admit(&key, now, false)?;
        let (mut next, purged) = self.keys.load().without_expired(now);
        if next.keys.contains_key(key.kid()) {
            return Err(CredentialError::key_rejected(
                key.kid(),
                "key id already registered",
            ));
        }

        next.keys.insert(key.kid().to_string(), Arc::new(key));
        self.publish(next, &purged);
        info!("Verification key registered");
        Ok(())
    }

    /// Remove every key whose window closed before `now`.
    ///
    /// Returns the purged key ids.
    pub fn purge_expired(&self) -> Vec<String> {
        let _guard = self.rotation.lock();
        let now = self.clock.now();
        let (next, purged) = self.keys.load().without_expired(now);
        if !purged.is_empty() {
            self.publish(next, &purged);
        }
        purged
    }

    /// Public verification keys as a JSON Web Key Set.
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        Jwks::from_key_set(&self.snapshot(), self.clock.now())
    }

    /// Opportunistic purge from the read path. Skipped while a writer holds
    /// the lock so that lookups never wait.
    fn try_purge(&self, now: i64) {
        if let Some(_guard) = self.rotation.try_lock() {
            let (next, purged) = self.keys.load().without_expired(now);
            if !purged.is_empty() {
                self.publish(next, &purged);
            }
        }
    }

    /// Caller must hold the rotation lock.
    fn publish(&self, next: KeySet, purged: &[String]) {
        if !purged.is_empty() {
            metrics::record_keys_purged(purged.len());
            info!(purged = ?purged, "Expired keys purged");
        }
        self.keys.store(Arc::new(next));
    }

    fn admit(key: &Key, now: i64, for_signing: bool) -> Result<(), CredentialError> {
        if key.is_expired_at(now) {
            return Err(CredentialError::key_rejected(key.kid(), "validity window has closed"));
        }
        if for_signing && !key.can_sign() {
            return Err(CredentialError::key_rejected(key.kid(), "key is verification-only"));
        }
        if for_signing && !key.is_valid_at(now) {
            return Err(CredentialError::key_rejected(key.kid(), "validity window has not opened"));
        }
        Ok(())
    }
}
