//! Issuance Engine: authenticated principal in, signed wire token out.

use crate::error::CredentialError;
use crate::keys::KeyManager;
use crate::metrics;
use crate::principal::Principal;
use crate::token::{ClaimSetBuilder, TokenCodec};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Mints tokens with the key manager's active signing key.
///
/// Stateless apart from its handles; safe to call from any number of threads.
#[derive(Clone)]
pub struct IssuanceEngine {
    keys: Arc<KeyManager>,
    codec: TokenCodec,
}

impl IssuanceEngine {
    /// Create an engine signing with `keys`.
    pub fn new(keys: Arc<KeyManager>) -> Self {
        Self {
            keys,
            codec: TokenCodec::new(),
        }
    }

    /// Use a custom codec (e.g. a different size limit).
    #[must_use]
    pub const fn with_codec(mut self, codec: TokenCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Issue a token for `principal` valid for `ttl` from now.
    ///
    /// Sub-second precision in `ttl` is dropped.
    ///
    /// # Errors
    ///
    /// `Encoding` if `ttl` is under one second or the claims cannot be
    /// encoded; `NoActiveKey` if no signing key is usable.
    #[instrument(skip_all, fields(ttl_secs = ttl.as_secs(), issuer = %issuer, audience = %audience))]
    pub fn issue(
        &self,
        principal: &Principal,
        ttl: Duration,
        issuer: &str,
        audience: &str,
    ) -> Result<String, CredentialError> {
        let ttl_seconds = i64::try_from(ttl.as_secs())
            .map_err(|_| CredentialError::encoding("ttl out of range"))?;
        if ttl_seconds == 0 {
            return Err(CredentialError::encoding("ttl must be at least one second"));
        }

        let now = self.keys.clock().now();
        let key = self.keys.current_signing_key_at(now)?;

        let claims = ClaimSetBuilder::new(issuer, audience, now)
            .subject(principal.id())
            .roles(principal.roles().clone())
            .ttl_seconds(ttl_seconds)
            .build()?;
        let token = self.codec.encode(&claims, &key)?;

        metrics::record_token_issued(key.algorithm().as_str());
        debug!(kid = %key.kid(), jti = %claims.jti, exp = claims.exp, "Token issued");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::keys::{Key, SigningAlgorithm, ValidityWindow};

    fn engine_at(now: i64) -> (Arc<KeyManager>, IssuanceEngine) {
        let keys = Arc::new(KeyManager::new(Arc::new(ManualClock::new(now))));
        keys.rotate(
            Key::hmac("k1", SigningAlgorithm::HS256, vec![5u8; 32], ValidityWindow::new(0, 100_000))
                .unwrap(),
        )
        .unwrap();
        let engine = IssuanceEngine::new(Arc::clone(&keys));
        (keys, engine)
    }

    #[test]
    fn test_issue_sets_time_claims() {
        let (keys, engine) = engine_at(1000);
        let alice = Principal::new("alice", ["user"]).unwrap();

        let wire = engine.issue(&alice, Duration::from_secs(3600), "svc", "api").unwrap();
        let key = keys.key_for("k1").unwrap();
        let claims = TokenCodec::new().verify_signature(&wire, &key).unwrap();

        assert_eq!(claims.iat, 1000);
        assert_eq!(claims.exp, 4600);
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iss, "svc");
        assert_eq!(claims.aud, "api");
        assert!(claims.has_role("user"));
    }

    #[test]
    fn test_issue_rejects_zero_ttl() {
        let (_, engine) = engine_at(1000);
        let alice = Principal::new("alice", Vec::<String>::new()).unwrap();

        for ttl in [Duration::ZERO, Duration::from_millis(999)] {
            assert!(matches!(
                engine.issue(&alice, ttl, "svc", "api"),
                Err(CredentialError::Encoding(_))
            ));
        }
    }

    #[test]
    fn test_issue_rejects_empty_issuer() {
        let (_, engine) = engine_at(1000);
        let alice = Principal::new("alice", Vec::<String>::new()).unwrap();
        assert!(matches!(
            engine.issue(&alice, Duration::from_secs(60), "", "api"),
            Err(CredentialError::Encoding(_))
        ));
    }

    #[test]
    fn test_issue_without_key_fails() {
        let keys = Arc::new(KeyManager::new(Arc::new(ManualClock::new(0))));
        let engine = IssuanceEngine::new(keys);
        let alice = Principal::new("alice", Vec::<String>::new()).unwrap();

        assert_eq!(
            engine.issue(&alice, Duration::from_secs(60), "svc", "api").unwrap_err(),
            CredentialError::NoActiveKey
        );
    }

    #[test]
    fn test_each_token_has_unique_jti() {
        let (_, engine) = engine_at(1000);
        let alice = Principal::new("alice", Vec::<String>::new()).unwrap();
        let codec = TokenCodec::new();

        let a = engine.issue(&alice, Duration::from_secs(60), "svc", "api").unwrap();
        let b = engine.issue(&alice, Duration::from_secs(60), "svc", "api").unwrap();
        assert_ne!(
            codec.decode(&a).unwrap().peek_claims().jti,
            codec.decode(&b).unwrap().peek_claims().jti
        );
    }
}
