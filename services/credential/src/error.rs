use thiserror::Error;

/// Failure kinds returned by every issuance, verification and key operation.
///
/// All kinds are terminal: retrying with the same input and the same clock
/// reading yields the same result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// No key is currently active for signing.
    #[error("No active signing key")]
    NoActiveKey,

    /// The token names a key that is not registered (or has been purged).
    #[error("Unknown key: {kid}")]
    UnknownKey {
        /// Key id declared by the token header
        kid: String,
    },

    /// Claims or key could not be turned into a wire token.
    #[error("Token encoding error: {0}")]
    Encoding(String),

    /// The wire token is structurally invalid.
    #[error("Malformed token: {reason}")]
    MalformedToken {
        /// What was wrong with the structure
        reason: String,
    },

    /// The recomputed signature does not match the token's signature.
    #[error("Token signature mismatch")]
    SignatureMismatch,

    /// The header algorithm differs from the resolved key's algorithm.
    #[error("Algorithm mismatch: key uses {expected}, token declares {found}")]
    AlgorithmMismatch {
        /// Algorithm of the resolved key
        expected: String,
        /// Algorithm declared by the token header
        found: String,
    },

    /// The token expiry has passed.
    #[error("Token expired at {expired_at}")]
    Expired {
        /// Expiry timestamp (Unix seconds)
        expired_at: i64,
    },

    /// The token was issued in the future relative to the verifier's clock.
    #[error("Token not valid before {valid_from}")]
    NotYetValid {
        /// Issued-at timestamp (Unix seconds)
        valid_from: i64,
    },

    /// The token id was reported revoked.
    #[error("Token revoked")]
    Revoked,

    /// The token was minted by an issuer the verifier does not accept.
    #[error("Issuer mismatch")]
    IssuerMismatch,

    /// The token targets an audience the verifier does not serve.
    #[error("Audience mismatch")]
    AudienceMismatch,

    /// A key was refused by the key manager.
    #[error("Key {kid} rejected: {reason}")]
    KeyRejected {
        /// Id of the refused key
        kid: String,
        /// Why the key was refused
        reason: String,
    },

    /// The authenticator refused the presented credentials.
    #[error("Invalid credentials")]
    InvalidCredentials,
}

impl CredentialError {
    /// Create an encoding error.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Create a malformed token error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedToken {
            reason: reason.into(),
        }
    }

    /// Create an unknown key error.
    pub fn unknown_key(kid: impl Into<String>) -> Self {
        Self::UnknownKey { kid: kid.into() }
    }

    /// Create a key rejection error.
    pub fn key_rejected(kid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::KeyRejected {
            kid: kid.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code for this failure kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoActiveKey => NO_ACTIVE_KEY,
            Self::UnknownKey { .. } => UNKNOWN_KEY,
            Self::Encoding(_) => TOKEN_ENCODING_ERROR,
            Self::MalformedToken { .. } => TOKEN_MALFORMED,
            Self::SignatureMismatch => TOKEN_SIGNATURE_MISMATCH,
            Self::AlgorithmMismatch { .. } => TOKEN_ALGORITHM_MISMATCH,
            Self::Expired { .. } => TOKEN_EXPIRED,
            Self::NotYetValid { .. } => TOKEN_NOT_YET_VALID,
            Self::Revoked => TOKEN_REVOKED,
            Self::IssuerMismatch => TOKEN_ISSUER_MISMATCH,
            Self::AudienceMismatch => TOKEN_AUDIENCE_MISMATCH,
            Self::KeyRejected { .. } => KEY_REJECTED,
            Self::InvalidCredentials => INVALID_CREDENTIALS,
        }
    }

    /// Whether the core would ever succeed by repeating the same call.
    ///
    /// Always `false`: every kind is a deterministic function of input,
    /// key set and time.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }

    /// Whether this failure rejects a presented token.
    ///
    /// Callers that want to avoid acting as an oracle can collapse every
    /// rejection into one external message while still recording `code()`.
    #[must_use]
    pub const fn is_token_rejection(&self) -> bool {
        matches!(
            self,
            Self::UnknownKey { .. }
                | Self::MalformedToken { .. }
                | Self::SignatureMismatch
                | Self::AlgorithmMismatch { .. }
                | Self::Expired { .. }
                | Self::NotYetValid { .. }
                | Self::Revoked
                | Self::IssuerMismatch
                | Self::AudienceMismatch
        )
    }
}

// Error codes surfaced to callers and used as metric labels
pub const NO_ACTIVE_KEY: &str = "NO_ACTIVE_KEY";
pub const UNKNOWN_KEY: &str = "UNKNOWN_KEY";
pub const TOKEN_ENCODING_ERROR: &str = "TOKEN_ENCODING_ERROR";
pub const TOKEN_MALFORMED: &str = "TOKEN_MALFORMED";
pub const TOKEN_SIGNATURE_MISMATCH: &str = "TOKEN_SIGNATURE_MISMATCH";
pub const TOKEN_ALGORITHM_MISMATCH: &str = "TOKEN_ALGORITHM_MISMATCH";
pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
pub const TOKEN_NOT_YET_VALID: &str = "TOKEN_NOT_YET_VALID";
pub const TOKEN_REVOKED: &str = "TOKEN_REVOKED";
pub const TOKEN_ISSUER_MISMATCH: &str = "TOKEN_ISSUER_MISMATCH";
pub const TOKEN_AUDIENCE_MISMATCH: &str = "TOKEN_AUDIENCE_MISMATCH";
pub const KEY_REJECTED: &str = "KEY_REJECTED";
pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
