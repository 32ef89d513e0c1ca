//! Configuration for the credential core.
//!
//! Loaded from environment variables (with `.env` support) and validated
//! up front. `from_vars` takes an explicit map so tests never touch the
//! process environment.

use crate::keys::{RetiredKey, SigningAlgorithm, StaticKeySource};
use crate::observability::TracingConfig;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use secrecy::{ExposeSecret, SecretBox, SecretString};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable could not be parsed.
    #[error("Invalid {name}: {reason}")]
    Invalid {
        /// Variable name
        name: String,
        /// Parse failure
        reason: String,
    },

    /// Key material is not valid base64.
    #[error("Invalid base64 in {name}: {source}")]
    Base64 {
        /// Variable name
        name: String,
        /// Decode failure
        source: base64::DecodeError,
    },

    /// A variable that another variable depends on is missing.
    #[error("Missing required environment variable: {0}")]
    Missing(String),
}

/// Static development account, for deployments without a user directory.
#[derive(Debug)]
pub struct DevAccount {
    /// Login name
    pub username: String,
    /// Password
    pub password: SecretString,
    /// Granted roles
    pub roles: Vec<String>,
}

/// Verification-only key from `CREDENTIAL_RETIRED_KEYS`.
#[derive(Debug)]
pub struct RetiredKeyConfig {
    /// Key id carried by tokens it signed
    pub kid: String,
    /// Algorithm the key signed with
    pub algorithm: SigningAlgorithm,
    /// Shared secret, PKCS#8 document or raw Ed25519 public key
    pub material: SecretBox<Vec<u8>>,
}

/// Credential core configuration.
#[derive(Debug)]
pub struct Config {
    /// `iss` claim of issued tokens
    pub issuer: String,
    /// `aud` claim of issued tokens
    pub audience: String,
    /// Token lifetime
    pub token_ttl: Duration,
    /// Verification clock-skew tolerance
    pub clock_skew: Duration,
    /// Algorithm of the active signing key
    pub signing_algorithm: SigningAlgorithm,
    /// Id of the active signing key
    pub signing_key_id: String,
    /// Active key material; `None` means generate one at startup
    pub signing_key: Option<SecretBox<Vec<u8>>>,
    /// Validity window of the active key, from startup
    pub key_validity: Duration,
    /// Verification-only keys
    pub retired_keys: Vec<RetiredKeyConfig>,
    /// Optional static login account
    pub dev_account: Option<DevAccount>,
    /// Logging settings
    pub tracing: TracingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a map of variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let issuer = string_var(vars, "CREDENTIAL_ISSUER", "credential-core");
        let audience = string_var(vars, "CREDENTIAL_AUDIENCE", "api");
        let token_ttl = Duration::from_secs(parse_var(vars, "CREDENTIAL_TOKEN_TTL", 3600)?);
        if token_ttl.is_zero() {
            return Err(ConfigError::Invalid {
                name: "CREDENTIAL_TOKEN_TTL".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        let clock_skew = Duration::from_secs(parse_var(vars, "CREDENTIAL_CLOCK_SKEW", 0)?);

        let algorithm_name = string_var(vars, "CREDENTIAL_SIGNING_ALGORITHM", "HS256");
        let signing_algorithm = SigningAlgorithm::from_name_ignore_case(&algorithm_name)
            .ok_or_else(|| ConfigError::Invalid {
                name: "CREDENTIAL_SIGNING_ALGORITHM".to_string(),
                reason: format!("unsupported algorithm {algorithm_name}"),
            })?;
        let signing_key_id = string_var(vars, "CREDENTIAL_SIGNING_KEY_ID", "primary");
        let signing_key = vars
            .get("CREDENTIAL_SIGNING_KEY")
            .map(|value| decode_key("CREDENTIAL_SIGNING_KEY", value))
            .transpose()?;
        let key_validity =
            Duration::from_secs(parse_var(vars, "CREDENTIAL_KEY_VALIDITY", 7_776_000)?);
        if key_validity.is_zero() {
            return Err(ConfigError::Invalid {
                name: "CREDENTIAL_KEY_VALIDITY".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        let retired_keys = vars
            .get("CREDENTIAL_RETIRED_KEYS")
            .map(|value| parse_retired_keys(value))
            .transpose()?
            .unwrap_or_default();

        if let Some(key) = &signing_key {
            check_secret_len("CREDENTIAL_SIGNING_KEY", signing_algorithm, key)?;
        }
        for retired in &retired_keys {
            check_secret_len("CREDENTIAL_RETIRED_KEYS", retired.algorithm, &retired.material)?;
        }

        let dev_account = parse_dev_account(vars)?;

        let tracing = TracingConfig::default()
            .with_log_level(string_var(vars, "LOG_LEVEL", "info"))
            .with_json_output(parse_var(vars, "LOG_JSON", false)?);

        Ok(Self {
            issuer,
            audience,
            token_ttl,
            clock_skew,
            signing_algorithm,
            signing_key_id,
            signing_key,
            key_validity,
            retired_keys,
            dev_account,
            tracing,
        })
    }

    /// Key source for the configured material, or `None` if none was given.
    ///
    /// Retired keys stay verifiable for one token lifetime after startup.
    #[must_use]
    pub fn key_source(&self) -> Option<StaticKeySource> {
        let material = self.signing_key.as_ref()?;

        Some(
            StaticKeySource::new(
                self.signing_key_id.clone(),
                self.signing_algorithm,
                material.expose_secret().to_vec(),
                duration_secs(self.key_validity),
            )
            .with_retired(self.retired(), self.retired_grace_secs()),
        )
    }

    /// Retired keys, ready to hand to a key source.
    #[must_use]
    pub fn retired(&self) -> Vec<RetiredKey> {
        self.retired_keys
            .iter()
            .map(|r| RetiredKey::new(r.kid.clone(), r.algorithm, r.material.expose_secret().to_vec()))
            .collect()
    }

    /// How long retired keys stay accepted after startup: one token lifetime.
    #[must_use]
    pub fn retired_grace_secs(&self) -> i64 {
        duration_secs(self.token_ttl)
    }

    /// Active key validity in whole seconds.
    #[must_use]
    pub fn key_validity_secs(&self) -> i64 {
        duration_secs(self.key_validity)
    }
}

fn duration_secs(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

fn string_var(vars: &HashMap<String, String>, name: &str, default: &str) -> String {
    vars.get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Parse a variable with a default value.
fn parse_var<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match vars.get(name) {
        Some(val) => val.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn decode_key(name: &str, value: &str) -> Result<SecretBox<Vec<u8>>, ConfigError> {
    STANDARD
        .decode(value.trim())
        .map(|bytes| SecretBox::new(Box::new(bytes)))
        .map_err(|source| ConfigError::Base64 {
            name: name.to_string(),
            source,
        })
}

fn check_secret_len(
    name: &str,
    algorithm: SigningAlgorithm,
    material: &SecretBox<Vec<u8>>,
) -> Result<(), ConfigError> {
    let min = algorithm.min_secret_len();
    if algorithm.is_symmetric() && material.expose_secret().len() < min {
        return Err(ConfigError::Invalid {
            name: name.to_string(),
            reason: format!("{algorithm} secrets must be at least {min} bytes"),
        });
    }
    Ok(())
}

/// Parse `kid:ALG=base64,kid:ALG=base64`.
fn parse_retired_keys(value: &str) -> Result<Vec<RetiredKeyConfig>, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        name: "CREDENTIAL_RETIRED_KEYS".to_string(),
        reason,
    };

    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, material) = entry
                .split_once('=')
                .ok_or_else(|| invalid("expected kid:ALG=base64 entries".to_string()))?;
            let (kid, algorithm_name) = id
                .split_once(':')
                .map(|(kid, alg)| (kid.trim(), alg.trim()))
                .filter(|(kid, _)| !kid.is_empty())
                .ok_or_else(|| invalid("expected kid:ALG=base64 entries".to_string()))?;
            let algorithm = SigningAlgorithm::from_name_ignore_case(algorithm_name)
                .ok_or_else(|| invalid(format!("unsupported algorithm {algorithm_name} for {kid}")))?;

            Ok(RetiredKeyConfig {
                kid: kid.to_string(),
                algorithm,
                material: decode_key("CREDENTIAL_RETIRED_KEYS", material)?,
            })
        })
        .collect()
}

fn parse_dev_account(vars: &HashMap<String, String>) -> Result<Option<DevAccount>, ConfigError> {
    let Some(username) = vars.get("CREDENTIAL_DEV_USERNAME").filter(|u| !u.is_empty()) else {
        return Ok(None);
    };
    let password = vars
        .get("CREDENTIAL_DEV_PASSWORD")
        .ok_or_else(|| ConfigError::Missing("CREDENTIAL_DEV_PASSWORD".to_string()))?;
    let roles = vars
        .get("CREDENTIAL_DEV_ROLES")
        .map(|roles| {
            roles
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Ok(Some(DevAccount {
        username: username.clone(),
        password: SecretString::from(password.clone()),
        roles,
    }))
}
