//! Signing keys and their validity windows.

use super::algorithm::SigningAlgorithm;
use crate::error::CredentialError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{DecodingKey, EncodingKey};
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{Ed25519KeyPair, KeyPair};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Length of a raw Ed25519 public key.
pub const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// Inclusive `[not_before, not_after]` window, in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    /// First second the key may be used
    pub not_before: i64,
    /// Last second the key may be used
    pub not_after: i64,
}

impl ValidityWindow {
    /// Create a window from explicit bounds.
    #[must_use]
    pub const fn new(not_before: i64, not_after: i64) -> Self {
        Self {
            not_before,
            not_after,
        }
    }

    /// Window opening at `now` and lasting `lifetime_secs`.
    #[must_use]
    pub const fn starting_at(now: i64, lifetime_secs: i64) -> Self {
        Self::new(now, now.saturating_add(lifetime_secs))
    }

    /// Whether `now` falls inside the window.
    #[must_use]
    pub const fn contains(&self, now: i64) -> bool {
        self.not_before <= now && now <= self.not_after
    }

    /// Whether the window has closed at `now`.
    #[must_use]
    pub const fn is_expired(&self, now: i64) -> bool {
        now > self.not_after
    }
}

enum KeyMaterial {
    Secret(Zeroizing<Vec<u8>>),
    Ed25519 {
        private_pkcs8: Option<Zeroizing<Vec<u8>>>,
        public: Vec<u8>,
    },
}

/// A signing or verification key.
///
/// Material is zeroized on drop and never exposed through `Debug`. Keys are
/// not `Clone`: once handed to the key manager they are shared as
/// `Arc<Key>` handles, never copied.
pub struct Key {
    kid: String,
    algorithm: SigningAlgorithm,
    material: KeyMaterial,
    window: ValidityWindow,
}

impl Key {
    /// Shared-secret key for one of the HMAC algorithms.
    ///
    /// # Errors
    ///
    /// `KeyRejected` if the algorithm is not HMAC, the secret is shorter than
    /// the digest size, or the id/window is invalid.
    pub fn hmac(
        kid: impl Into<String>,
        algorithm: SigningAlgorithm,
        secret: impl Into<Vec<u8>>,
        window: ValidityWindow,
    ) -> Result<Self, CredentialError> {
        let kid = kid.into();
        let secret = Zeroizing::new(secret.into());

        if !algorithm.is_symmetric() {
            return Err(CredentialError::key_rejected(
                kid,
                format!("{algorithm} is not a shared-secret algorithm"),
            ));
        }
        if secret.len() < algorithm.min_secret_len() {
            return Err(CredentialError::key_rejected(
                kid,
                format!(
                    "{algorithm} secret must be at least {} bytes, got {}",
                    algorithm.min_secret_len(),
                    secret.len()
                ),
            ));
        }

        Self::checked(kid, algorithm, KeyMaterial::Secret(secret), window)
    }

    /// Ed25519 signing key from a PKCS#8 document (v1 or v2).
    ///
    /// # Errors
    ///
    /// `KeyRejected` if the document does not parse.
    pub fn ed25519(
        kid: impl Into<String>,
        private_pkcs8: impl Into<Vec<u8>>,
        window: ValidityWindow,
    ) -> Result<Self, CredentialError> {
        let kid = kid.into();
        let private_pkcs8 = Zeroizing::new(private_pkcs8.into());

        let public = match Ed25519KeyPair::from_pkcs8_maybe_unchecked(&private_pkcs8) {
            Ok(pair) => pair.public_key().as_ref().to_vec(),
            Err(e) => {
                return Err(CredentialError::key_rejected(
                    kid,
                    format!("invalid Ed25519 PKCS#8 document: {e}"),
                ));
            }
        };

        Self::checked(
            kid,
            SigningAlgorithm::EdDSA,
            KeyMaterial::Ed25519 {
                private_pkcs8: Some(private_pkcs8),
                public,
            },
            window,
        )
    }

    /// Verification-only Ed25519 key from a raw 32-byte public key.
    ///
    /// # Errors
    ///
    /// `KeyRejected` if the key is not 32 bytes.
    pub fn ed25519_public(
        kid: impl Into<String>,
        public_key: impl Into<Vec<u8>>,
        window: ValidityWindow,
    ) -> Result<Self, CredentialError> {
        let kid = kid.into();
        let public = public_key.into();

        if public.len() != ED25519_PUBLIC_KEY_LEN {
            return Err(CredentialError::key_rejected(
                kid,
                format!(
                    "Ed25519 public key must be {ED25519_PUBLIC_KEY_LEN} bytes, got {}",
                    public.len()
                ),
            ));
        }

        Self::checked(
            kid,
            SigningAlgorithm::EdDSA,
            KeyMaterial::Ed25519 {
                private_pkcs8: None,
                public,
            },
            window,
        )
    }

    /// Build a key from raw material as supplied by a key source.
    ///
    /// For `EdDSA`, 32 bytes are treated as a public key and anything else as
    /// a PKCS#8 private document.
    ///
    /// # Errors
    ///
    /// `KeyRejected` if the material does not fit the algorithm.
    pub fn from_material(
        kid: impl Into<String>,
        algorithm: SigningAlgorithm,
        material: Vec<u8>,
        window: ValidityWindow,
    ) -> Result<Self, CredentialError> {
        match algorithm {
            SigningAlgorithm::EdDSA if material.len() == ED25519_PUBLIC_KEY_LEN => {
                Self::ed25519_public(kid, material, window)
            }
            SigningAlgorithm::EdDSA => Self::ed25519(kid, material, window),
            _ => Self::hmac(kid, algorithm, material, window),
        }
    }

    /// Generate a fresh signing key.
    ///
    /// # Errors
    ///
    /// `Encoding` if the system RNG fails; `KeyRejected` for an invalid id or window.
    pub fn generate(
        kid: impl Into<String>,
        algorithm: SigningAlgorithm,
        window: ValidityWindow,
    ) -> Result<Self, CredentialError> {
        let material = generate_material(algorithm)?;
        Self::from_material(kid, algorithm, material.to_vec(), window)
    }

    fn checked(
        kid: String,
        algorithm: SigningAlgorithm,
        material: KeyMaterial,
        window: ValidityWindow,
    ) -> Result<Self, CredentialError> {
        if kid.trim().is_empty() {
            return Err(CredentialError::key_rejected(kid, "key id must not be empty"));
        }
        if window.not_before > window.not_after {
            return Err(CredentialError::key_rejected(
                kid,
                "validity window closes before it opens",
            ));
        }

        Ok(Self {
            kid,
            algorithm,
            material,
            window,
        })
    }

    /// Key identifier, carried in the token header.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Algorithm this key signs with.
    #[must_use]
    pub const fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Validity window.
    #[must_use]
    pub const fn window(&self) -> ValidityWindow {
        self.window
    }

    /// Whether the key holds private material.
    #[must_use]
    pub const fn can_sign(&self) -> bool {
        match &self.material {
            KeyMaterial::Secret(_) => true,
            KeyMaterial::Ed25519 { private_pkcs8, .. } => private_pkcs8.is_some(),
        }
    }

    /// Whether the key may be used at `now`.
    #[must_use]
    pub const fn is_valid_at(&self, now: i64) -> bool {
        self.window.contains(now)
    }

    /// Whether the key's window has closed at `now`.
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        self.window.is_expired(now)
    }

    /// Raw public key for asymmetric keys.
    #[must_use]
    pub fn public_key(&self) -> Option<&[u8]> {
        match &self.material {
            KeyMaterial::Secret(_) => None,
            KeyMaterial::Ed25519 { public, .. } => Some(public),
        }
    }

    /// Sign `message`, returning the base64url signature segment.
    pub(crate) fn sign(&self, message: &[u8]) -> Result<String, CredentialError> {
        match &self.material {
            KeyMaterial::Secret(secret) => {
                let tag = hmac::sign(&self.hmac_key(secret)?, message);
                Ok(URL_SAFE_NO_PAD.encode(tag.as_ref()))
            }
            KeyMaterial::Ed25519 {
                private_pkcs8: Some(pkcs8),
                ..
            } => jsonwebtoken::crypto::sign(
                message,
                &EncodingKey::from_ed_der(pkcs8),
                self.algorithm.into(),
            )
            .map_err(|e| CredentialError::encoding(format!("signing failed: {e}"))),
            KeyMaterial::Ed25519 {
                private_pkcs8: None,
                ..
            } => Err(CredentialError::encoding(format!(
                "key {} is verification-only",
                self.kid
            ))),
        }
    }

    /// Check a base64url signature segment over `message`.
    ///
    /// Shared-secret signatures are recomputed and compared in constant time.
    pub(crate) fn verify(&self, message: &[u8], signature: &str) -> bool {
        match &self.material {
            KeyMaterial::Secret(secret) => {
                let Ok(provided) = URL_SAFE_NO_PAD.decode(signature) else {
                    return false;
                };
                let Ok(key) = self.hmac_key(secret) else {
                    return false;
                };
                let expected = hmac::sign(&key, message);
                let expected = expected.as_ref();

                // Length is public (fixed by the algorithm)
                if expected.len() != provided.len() {
                    return false;
                }
                expected.ct_eq(&provided).into()
            }
            KeyMaterial::Ed25519 { public, .. } => jsonwebtoken::crypto::verify(
                signature,
                message,
                &DecodingKey::from_ed_der(public),
                self.algorithm.into(),
            )
            .unwrap_or(false),
        }
    }

    fn hmac_key(&self, secret: &[u8]) -> Result<hmac::Key, CredentialError> {
        self.algorithm
            .hmac_algorithm()
            .map(|alg| hmac::Key::new(alg, secret))
            .ok_or_else(|| {
                CredentialError::encoding(format!("{} is not an HMAC algorithm", self.algorithm))
            })
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .field("window", &self.window)
            .field("can_sign", &self.can_sign())
            .field("material", &"[REDACTED]")
            .finish()
    }
}

/// Generate raw key material suitable for [`Key::from_material`].
///
/// HMAC algorithms get a random secret of the digest size; `EdDSA` gets a
/// PKCS#8 v2 document.
///
/// # Errors
///
/// `Encoding` if the system RNG fails.
pub fn generate_material(
    algorithm: SigningAlgorithm,
) -> Result<Zeroizing<Vec<u8>>, CredentialError> {
    let rng = SystemRandom::new();

    if algorithm.is_symmetric() {
        let mut secret = Zeroizing::new(vec![0u8; algorithm.min_secret_len()]);
        rng.fill(&mut secret)
            .map_err(|e| CredentialError::encoding(format!("secret generation failed: {e}")))?;
        return Ok(secret);
    }

    let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng)
        .map_err(|e| CredentialError::encoding(format!("keypair generation failed: {e}")))?;
    Ok(Zeroizing::new(pkcs8.as_ref().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn window() -> ValidityWindow {
        ValidityWindow::new(0, 10_000)
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let w = ValidityWindow::new(100, 200);
        assert!(!w.contains(99));
        assert!(w.contains(100));
        assert!(w.contains(200));
        assert!(!w.contains(201));
        assert!(!w.is_expired(200));
        assert!(w.is_expired(201));
    }

    #[test]
    fn test_window_starting_at_saturates() {
        let w = ValidityWindow::starting_at(i64::MAX - 5, 100);
        assert_eq!(w.not_after, i64::MAX);
    }

    #[test]
    fn test_hmac_key_rejects_short_secret() {
        let err = Key::hmac("k1", SigningAlgorithm::HS256, b"short".to_vec(), window())
            .expect_err("short secret must be rejected");
        assert!(matches!(err, CredentialError::KeyRejected { ref kid, .. } if kid == "k1"));
    }

    #[test]
    fn test_hmac_key_rejects_asymmetric_algorithm() {
        let result = Key::hmac("k1", SigningAlgorithm::EdDSA, SECRET.to_vec(), window());
        assert!(matches!(result, Err(CredentialError::KeyRejected { .. })));
    }

    #[test]
    fn test_key_rejects_empty_kid_and_inverted_window() {
        assert!(Key::hmac(" ", SigningAlgorithm::HS256, SECRET.to_vec(), window()).is_err());
        assert!(Key::hmac(
            "k1",
            SigningAlgorithm::HS256,
            SECRET.to_vec(),
            ValidityWindow::new(10, 5)
        )
        .is_err());
    }

    #[test]
    fn test_hmac_sign_verify() {
        let key = Key::hmac("k1", SigningAlgorithm::HS256, SECRET.to_vec(), window()).unwrap();
        let signature = key.sign(b"header.claims").unwrap();

        assert!(key.verify(b"header.claims", &signature));
        assert!(!key.verify(b"header.claimz", &signature));
        assert!(!key.verify(b"header.claims", "not base64!"));
        assert!(!key.verify(b"header.claims", ""));
    }

    #[test]
    fn test_hmac_signature_deterministic() {
        let key = Key::hmac("k1", SigningAlgorithm::HS512, vec![7u8; 64], window()).unwrap();
        assert_eq!(key.sign(b"data").unwrap(), key.sign(b"data").unwrap());
    }

    #[test]
    fn test_generated_ed25519_sign_verify() {
        let key = Key::generate("ed-1", SigningAlgorithm::EdDSA, window()).unwrap();
        assert!(key.can_sign());
        assert_eq!(key.public_key().map(<[u8]>::len), Some(ED25519_PUBLIC_KEY_LEN));

        let signature = key.sign(b"payload").unwrap();
        assert!(key.verify(b"payload", &signature));
        assert!(!key.verify(b"payload2", &signature));
    }

    #[test]
    fn test_ed25519_public_only_verifies_but_cannot_sign() {
        let signer = Key::generate("ed-1", SigningAlgorithm::EdDSA, window()).unwrap();
        let public = signer.public_key().unwrap().to_vec();
        let verifier = Key::ed25519_public("ed-1", public, window()).unwrap();

        assert!(!verifier.can_sign());
        let signature = signer.sign(b"payload").unwrap();
        assert!(verifier.verify(b"payload", &signature));
        assert!(matches!(verifier.sign(b"payload"), Err(CredentialError::Encoding(_))));
    }

    #[test]
    fn test_from_material_dispatch() {
        let material = generate_material(SigningAlgorithm::EdDSA).unwrap();
        let key =
            Key::from_material("ed", SigningAlgorithm::EdDSA, material.to_vec(), window()).unwrap();
        assert!(key.can_sign());

        let key = Key::from_material("ed", SigningAlgorithm::EdDSA, vec![1u8; 32], window()).unwrap();
        assert!(!key.can_sign());

        let key =
            Key::from_material("hs", SigningAlgorithm::HS384, vec![1u8; 48], window()).unwrap();
        assert_eq!(key.algorithm(), SigningAlgorithm::HS384);
    }

    #[test]
    fn test_invalid_pkcs8_rejected() {
        let result = Key::ed25519("ed", vec![0u8; 48], window());
        assert!(matches!(result, Err(CredentialError::KeyRejected { .. })));
    }

    #[test]
    fn test_generated_secret_lengths() {
        assert_eq!(generate_material(SigningAlgorithm::HS256).unwrap().len(), 32);
        assert_eq!(generate_material(SigningAlgorithm::HS512).unwrap().len(), 64);
    }

    #[test]
    fn test_debug_redacts_material() {
        let key = Key::hmac("k1", SigningAlgorithm::HS256, SECRET.to_vec(), window()).unwrap();
        let debug = format!("{key:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("0123456789abcdef"));
    }
}
