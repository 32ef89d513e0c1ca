//! Verification Engine.
//!
//! Stages run in a fixed order and the first failure is returned:
//! structure, key resolution, signature, time window, issuer and audience,
//! revocation.

use crate::error::CredentialError;
use crate::keys::KeyManager;
use crate::metrics;
use crate::revocation::RevocationCheck;
use crate::token::{ClaimSet, TokenCodec};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Checks applied to a token after its signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationPolicy {
    /// Tolerated clock drift between issuer and verifier
    pub clock_skew: Duration,
    /// Required `iss`, if any
    pub expected_issuer: Option<String>,
    /// Required `aud`, if any
    pub expected_audience: Option<String>,
}

impl VerificationPolicy {
    /// Require `issuer`.
    #[must_use]
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.expected_issuer = Some(issuer.into());
        self
    }

    /// Require `audience`.
    #[must_use]
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.expected_audience = Some(audience.into());
        self
    }

    /// Tolerate `skew` of clock drift.
    #[must_use]
    pub const fn clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    fn skew_seconds(&self) -> i64 {
        i64::try_from(self.clock_skew.as_secs()).unwrap_or(i64::MAX)
    }

    fn check_time(&self, claims: &ClaimSet, now: i64) -> Result<(), CredentialError> {
        let skew = self.skew_seconds();
        if claims.is_expired_at(now, skew) {
            return Err(CredentialError::Expired {
                expired_at: claims.exp,
            });
        }
        if claims.is_premature_at(now, skew) {
            return Err(CredentialError::NotYetValid {
                valid_from: claims.iat,
            });
        }
        Ok(())
    }

    fn check_parties(&self, claims: &ClaimSet) -> Result<(), CredentialError> {
        if self
            .expected_issuer
            .as_deref()
            .is_some_and(|iss| iss != claims.iss)
        {
            return Err(CredentialError::IssuerMismatch);
        }
        if self
            .expected_audience
            .as_deref()
            .is_some_and(|aud| aud != claims.aud)
        {
            return Err(CredentialError::AudienceMismatch);
        }
        Ok(())
    }
}

/// Validates wire tokens against the key manager's key set.
#[derive(Clone)]
pub struct VerificationEngine {
    keys: Arc<KeyManager>,
    codec: TokenCodec,
    policy: VerificationPolicy,
    revocation: Option<Arc<dyn RevocationCheck>>,
}

impl VerificationEngine {
    /// Create an engine with the default policy (no skew, any issuer/audience).
    pub fn new(keys: Arc<KeyManager>) -> Self {
        Self {
            keys,
            codec: TokenCodec::new(),
            policy: VerificationPolicy::default(),
            revocation: None,
        }
    }

    /// Replace the policy.
    #[must_use]
    pub fn with_policy(mut self, policy: VerificationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Consult `revocation` after every other check passes.
    #[must_use]
    pub fn with_revocation(mut self, revocation: Arc<dyn RevocationCheck>) -> Self {
        self.revocation = Some(revocation);
        self
    }

    /// Use a custom codec.
    #[must_use]
    pub const fn with_codec(mut self, codec: TokenCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Active policy.
    #[must_use]
    pub const fn policy(&self) -> &VerificationPolicy {
        &self.policy
    }

    /// Verify `wire`, returning its claims.
    ///
    /// # Errors
    ///
    /// The kind of the first failing stage: `MalformedToken`, `UnknownKey`,
    /// `AlgorithmMismatch`, `SignatureMismatch`, `Expired`, `NotYetValid`,
    /// `IssuerMismatch`, `AudienceMismatch` or `Revoked`.
    #[instrument(skip_all)]
    pub fn verify(&self, wire: &str) -> Result<ClaimSet, CredentialError> {
        let result = self.run(wire);
        match &result {
            Ok(_) => metrics::record_verification_accepted(),
            Err(e) => metrics::record_verification_rejected(e.code()),
        }
        result
    }

    fn run(&self, wire: &str) -> Result<ClaimSet, CredentialError> {
        let now = self.keys.clock().now();

        let token = self.codec.decode(wire)?;
        let key = self.keys.key_for_at(token.kid(), now)?;
        let claims = token.verify(&key)?.into_claims();

        self.policy.check_time(&claims, now)?;
        self.policy.check_parties(&claims)?;

        if let Some(revocation) = &self.revocation {
            if revocation.is_revoked(&claims.jti) {
                return Err(CredentialError::Revoked);
            }
        }
        Ok(claims)
    }
}
