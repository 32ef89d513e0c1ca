//! Key sources: where initial key material enters the key manager.
//!
//! A source is consulted once at bootstrap. Later rotations are pushed into
//! the manager by the caller; the manager never fetches on its own.

use super::algorithm::SigningAlgorithm;
use super::key::{Key, ValidityWindow};
use crate::error::CredentialError;
use zeroize::Zeroizing;

/// Keys handed over at bootstrap.
#[derive(Debug)]
pub struct KeyBundle {
    /// Key installed as the active signer
    pub active: Key,
    /// Keys still accepted for verification only
    pub retired: Vec<Key>,
}

/// Supplies key material to the key manager.
pub trait KeySource: Send + Sync {
    /// Produce the key bundle for a manager bootstrapping at `now`.
    ///
    /// # Errors
    ///
    /// `KeyRejected` if the material is unusable.
    fn load(&self, now: i64) -> Result<KeyBundle, CredentialError>;
}

/// Retired key material, accepted for verification during a grace period.
///
/// Each entry carries its own algorithm: a key retired before an algorithm
/// change keeps the algorithm it signed with.
pub struct RetiredKey {
    kid: String,
    algorithm: SigningAlgorithm,
    material: Zeroizing<Vec<u8>>,
}

impl RetiredKey {
    /// Create a retired key entry.
    pub fn new(kid: impl Into<String>, algorithm: SigningAlgorithm, material: Vec<u8>) -> Self {
        Self {
            kid: kid.into(),
            algorithm,
            material: Zeroizing::new(material),
        }
    }

    fn to_key(&self, now: i64, grace_secs: i64) -> Result<Key, CredentialError> {
        Key::from_material(
            self.kid.clone(),
            self.algorithm,
            self.material.to_vec(),
            ValidityWindow::starting_at(now, grace_secs),
        )
    }
}

fn load_retired(
    retired: &[RetiredKey],
    now: i64,
    grace_secs: i64,
) -> Result<Vec<Key>, CredentialError> {
    retired.iter().map(|r| r.to_key(now, grace_secs)).collect()
}

/// Fixed material, typically decoded from configuration or a secret store.
pub struct StaticKeySource {
    kid: String,
    algorithm: SigningAlgorithm,
    material: Zeroizing<Vec<u8>>,
    validity_secs: i64,
    retired: Vec<RetiredKey>,
    retired_grace_secs: i64,
}

impl StaticKeySource {
    /// Create a source for one active key valid for `validity_secs` from bootstrap.
    pub fn new(
        kid: impl Into<String>,
        algorithm: SigningAlgorithm,
        material: Vec<u8>,
        validity_secs: i64,
    ) -> Self {
        Self {
            kid: kid.into(),
            algorithm,
            material: Zeroizing::new(material),
            validity_secs,
            retired: Vec::new(),
            retired_grace_secs: 0,
        }
    }

    /// Accept retired keys for `grace_secs` after bootstrap.
    ///
    /// The grace period should cover the lifetime of tokens already issued
    /// with those keys.
    #[must_use]
    pub fn with_retired(mut self, retired: Vec<RetiredKey>, grace_secs: i64) -> Self {
        self.retired = retired;
        self.retired_grace_secs = grace_secs;
        self
    }
}

impl KeySource for StaticKeySource {
    fn load(&self, now: i64) -> Result<KeyBundle, CredentialError> {
        let active = Key::from_material(
            self.kid.clone(),
            self.algorithm,
            self.material.to_vec(),
            ValidityWindow::starting_at(now, self.validity_secs),
        )?;

        let retired = load_retired(&self.retired, now, self.retired_grace_secs)?;

        Ok(KeyBundle { active, retired })
    }
}

/// Fresh random key on every load. Development and tests only: tokens do not
/// survive a restart.
pub struct GeneratedKeySource {
    kid: String,
    algorithm: SigningAlgorithm,
    validity_secs: i64,
    retired: Vec<RetiredKey>,
    retired_grace_secs: i64,
}

impl GeneratedKeySource {
    /// Create a generating source.
    pub fn new(kid: impl Into<String>, algorithm: SigningAlgorithm, validity_secs: i64) -> Self {
        Self {
            kid: kid.into(),
            algorithm,
            validity_secs,
            retired: Vec::new(),
            retired_grace_secs: 0,
        }
    }

    /// Accept retired keys for `grace_secs` after bootstrap.
    #[must_use]
    pub fn with_retired(mut self, retired: Vec<RetiredKey>, grace_secs: i64) -> Self {
        self.retired = retired;
        self.retired_grace_secs = grace_secs;
        self
    }
}

impl KeySource for GeneratedKeySource {
    fn load(&self, now: i64) -> Result<KeyBundle, CredentialError> {
        let active = Key::generate(
            self.kid.clone(),
            self.algorithm,
            ValidityWindow::starting_at(now, self.validity_secs),
        )?;

        let retired = load_retired(&self.retired, now, self.retired_grace_secs)?;

        Ok(KeyBundle { active, retired })
    }
}
