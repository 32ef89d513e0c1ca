//! Login and verification facade composing the engines.

use crate::auth::{Authenticator, StaticAuthenticator};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::CredentialError;
use crate::issuance::IssuanceEngine;
use crate::keys::{GeneratedKeySource, KeyManager, KeySource};
use crate::principal::Principal;
use crate::revocation::RevocationList;
use crate::token::{ClaimSet, TokenCodec};
use crate::verification::{VerificationEngine, VerificationPolicy};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Claims written into every token this service issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerSettings {
    /// `iss` claim
    pub issuer: String,
    /// `aud` claim
    pub audience: String,
    /// Token lifetime
    pub token_ttl: Duration,
}

/// Issues tokens to authenticated users and verifies them.
pub struct CredentialService {
    keys: Arc<KeyManager>,
    authenticator: Arc<dyn Authenticator>,
    issuance: IssuanceEngine,
    verification: VerificationEngine,
    revocations: Arc<RevocationList>,
    settings: IssuerSettings,
}

impl CredentialService {
    /// Compose a service.
    ///
    /// Verification requires the configured issuer and audience.
    pub fn new(
        keys: Arc<KeyManager>,
        authenticator: Arc<dyn Authenticator>,
        settings: IssuerSettings,
        clock_skew: Duration,
    ) -> Self {
        let revocations = Arc::new(RevocationList::new());
        let policy = VerificationPolicy::default()
            .issuer(settings.issuer.clone())
            .audience(settings.audience.clone())
            .clock_skew(clock_skew);

        Self {
            issuance: IssuanceEngine::new(Arc::clone(&keys)),
            verification: VerificationEngine::new(Arc::clone(&keys))
                .with_policy(policy)
                .with_revocation(revocations.clone()),
            keys,
            authenticator,
            revocations,
            settings,
        }
    }

    /// Build a service from configuration.
    ///
    /// Without configured key material a random key is generated, so tokens
    /// do not survive a restart.
    ///
    /// # Errors
    ///
    /// `KeyRejected` if the configured material is unusable.
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, CredentialError> {
        let source: Box<dyn KeySource> = match config.key_source() {
            Some(source) => Box::new(source),
            None => {
                warn!(
                    kid = %config.signing_key_id,
                    "No signing key configured, generating an ephemeral key"
                );
                Box::new(
                    GeneratedKeySource::new(
                        config.signing_key_id.clone(),
                        config.signing_algorithm,
                        config.key_validity_secs(),
                    )
                    .with_retired(config.retired(), config.retired_grace_secs()),
                )
            }
        };
        let keys = Arc::new(KeyManager::bootstrap(source.as_ref(), clock)?);

        let mut authenticator = StaticAuthenticator::new();
        if let Some(account) = &config.dev_account {
            authenticator = authenticator.with_account(
                account.username.clone(),
                account.password.clone(),
                account.roles.iter().cloned(),
            );
            info!("Static development account enabled");
        }

        Ok(Self::new(
            keys,
            Arc::new(authenticator),
            IssuerSettings {
                issuer: config.issuer.clone(),
                audience: config.audience.clone(),
                token_ttl: config.token_ttl,
            },
            config.clock_skew,
        ))
    }

    /// Authenticate and issue a token.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` on a rejected login, otherwise issuance errors.
    #[instrument(skip_all)]
    pub fn login(&self, username: &str, password: &SecretString) -> Result<String, CredentialError> {
        let principal = self.authenticator.authenticate(username, password)?;
        self.issue_for(&principal)
    }

    /// Issue a token for an already authenticated principal.
    ///
    /// # Errors
    ///
    /// `NoActiveKey` or `Encoding`.
    pub fn issue_for(&self, principal: &Principal) -> Result<String, CredentialError> {
        self.issuance.issue(
            principal,
            self.settings.token_ttl,
            &self.settings.issuer,
            &self.settings.audience,
        )
    }

    /// Verify a token issued by this service.
    ///
    /// # Errors
    ///
    /// Any verification failure kind.
    pub fn verify(&self, token: &str) -> Result<ClaimSet, CredentialError> {
        self.verification.verify(token)
    }

    /// Revoke a token this service accepts. Returns its token id.
    ///
    /// # Errors
    ///
    /// Any verification failure kind; an invalid token cannot be revoked.
    pub fn revoke(&self, token: &str) -> Result<String, CredentialError> {
        let claims = self.verify(token)?;
        self.revocations.revoke(claims.jti.clone(), claims.exp);
        info!(jti = %claims.jti, "Token revoked");
        Ok(claims.jti)
    }

    /// Drop revocation entries for tokens that have expired anyway.
    pub fn prune_revocations(&self) -> usize {
        self.revocations.prune(self.keys.clock().now())
    }

    /// Key manager, for rotation and JWKS export.
    #[must_use]
    pub const fn keys(&self) -> &Arc<KeyManager> {
        &self.keys
    }

    /// Issuance settings.
    #[must_use]
    pub const fn settings(&self) -> &IssuerSettings {
        &self.settings
    }

    /// Decode without verifying, for diagnostics.
    ///
    /// # Errors
    ///
    /// `MalformedToken`.
    pub fn inspect(&self, token: &str) -> Result<ClaimSet, CredentialError> {
        Ok(TokenCodec::new().decode(token)?.peek_claims().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::collections::HashMap;

    fn service(clock: Arc<ManualClock>) -> CredentialService {
        let vars = HashMap::from([
            ("CREDENTIAL_ISSUER".to_string(), "svc".to_string()),
            ("CREDENTIAL_DEV_USERNAME".to_string(), "user".to_string()),
            ("CREDENTIAL_DEV_PASSWORD".to_string(), "pass".to_string()),
            ("CREDENTIAL_DEV_ROLES".to_string(), "reader".to_string()),
        ]);
        let config = Config::from_vars(&vars).unwrap();
        CredentialService::from_config(&config, clock).unwrap()
    }

    #[test]
    fn test_login_then_verify() {
        let clock = Arc::new(ManualClock::new(1000));
        let service = service(clock.clone());

        let token = service.login("user", &SecretString::from("pass")).unwrap();
        clock.set(2000);
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.sub, "user");
        assert_eq!(claims.iss, "svc");
        assert_eq!(claims.aud, "api");
        assert_eq!(claims.exp, 4600);
        assert!(claims.has_role("reader"));
    }

    #[test]
    fn test_login_rejects_bad_password() {
        let service = service(Arc::new(ManualClock::new(1000)));
        assert_eq!(
            service.login("user", &SecretString::from("wrong")).unwrap_err(),
            CredentialError::InvalidCredentials
        );
    }

    #[test]
    fn test_revoke() {
        let clock = Arc::new(ManualClock::new(1000));
        let service = service(clock.clone());
        let token = service.login("user", &SecretString::from("pass")).unwrap();

        let jti = service.revoke(&token).unwrap();
        assert_eq!(service.inspect(&token).unwrap().jti, jti);
        assert_eq!(service.verify(&token).unwrap_err(), CredentialError::Revoked);
        assert!(service.revoke(&token).is_err());

        clock.set(4600);
        assert_eq!(service.prune_revocations(), 1);
    }

    #[test]
    fn test_tokens_from_other_issuer_rejected() {
        let clock = Arc::new(ManualClock::new(1000));
        let service = service(clock);
        let alice = Principal::new("alice", Vec::<String>::new()).unwrap();

        let foreign = IssuanceEngine::new(Arc::clone(service.keys()))
            .issue(&alice, Duration::from_secs(60), "elsewhere", "api")
            .unwrap();
        assert_eq!(service.verify(&foreign).unwrap_err(), CredentialError::IssuerMismatch);
    }

    #[test]
    fn test_generated_key_keeps_retired_keys() {
        use base64::{engine::general_purpose::STANDARD, Engine as _};

        let retired = format!("old:HS256={}", STANDARD.encode([3u8; 32]));
        let vars = HashMap::from([("CREDENTIAL_RETIRED_KEYS".to_string(), retired)]);
        let config = Config::from_vars(&vars).unwrap();
        let service =
            CredentialService::from_config(&config, Arc::new(ManualClock::new(1000))).unwrap();

        assert_eq!(service.keys().snapshot().key_ids(), vec!["old", "primary"]);
        assert_eq!(service.keys().key_for("old").unwrap().kid(), "old");
        assert_eq!(service.keys().current_signing_key().unwrap().kid(), "primary");
    }
}
