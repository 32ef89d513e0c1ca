//! Compact wire format: `b64url(header).b64url(claims).b64url(signature)`.
//!
//! The signature covers the first two segments exactly as they appear on the
//! wire, so any textual change to a token invalidates it.

use super::claims::ClaimSet;
use super::header::TokenHeader;
use super::state::{Token, UnverifiedToken};
use crate::error::CredentialError;
use crate::keys::Key;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Largest wire token accepted or produced.
pub const MAX_TOKEN_BYTES: usize = 4096;

/// Encodes claim sets into signed wire tokens and back.
#[derive(Debug, Clone, Copy)]
pub struct TokenCodec {
    max_token_bytes: usize,
}

impl Default for TokenCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCodec {
    /// Codec with the default size limit.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_token_bytes: MAX_TOKEN_BYTES,
        }
    }

    /// Override the size limit.
    #[must_use]
    pub const fn with_max_token_bytes(mut self, max: usize) -> Self {
        self.max_token_bytes = max;
        self
    }

    /// Sign `claims` with `key`. Output is deterministic for a given input.
    ///
    /// # Errors
    ///
    /// `Encoding` if the claims break an invariant, the key cannot sign, or
    /// the token would exceed the size limit.
    pub fn encode(&self, claims: &ClaimSet, key: &Key) -> Result<String, CredentialError> {
        claims.validate().map_err(CredentialError::encoding)?;
        if !key.can_sign() {
            return Err(CredentialError::encoding(format!(
                "key {} is verification-only",
                key.kid()
            )));
        }

        let header = encode_segment(&TokenHeader::new(key.algorithm(), key.kid()))?;
        let payload = encode_segment(claims)?;
        let signing_input = format!("{header}.{payload}");
        let signature = key.sign(signing_input.as_bytes())?;
        let wire = format!("{signing_input}.{signature}");

        if wire.len() > self.max_token_bytes {
            return Err(CredentialError::encoding(format!(
                "token is {} bytes, limit is {}",
                wire.len(),
                self.max_token_bytes
            )));
        }
        Ok(wire)
    }

    /// Parse a wire token without checking its signature.
    ///
    /// # Errors
    ///
    /// `MalformedToken` if the token is oversized, does not have three
    /// segments, a segment is not base64url JSON, the algorithm is unknown,
    /// or the claims break an invariant.
    pub fn decode(&self, wire: &str) -> Result<UnverifiedToken, CredentialError> {
        if wire.len() > self.max_token_bytes {
            return Err(CredentialError::malformed(format!(
                "token exceeds {} bytes",
                self.max_token_bytes
            )));
        }

        let mut segments = wire.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(CredentialError::malformed("expected three segments"));
        };
        if signature_b64.is_empty() {
            return Err(CredentialError::malformed("missing signature"));
        }

        let header: TokenHeader = decode_segment(header_b64, "header")?;
        header.validate().map_err(CredentialError::malformed)?;
        let claims: ClaimSet = decode_segment(claims_b64, "claims")?;
        claims.validate().map_err(CredentialError::malformed)?;

        let signing_input_len = header_b64.len() + 1 + claims_b64.len();
        Ok(Token::new(wire.to_string(), signing_input_len, header, claims))
    }

    /// Decode `wire` and check its signature with `key`.
    ///
    /// # Errors
    ///
    /// `MalformedToken`, `AlgorithmMismatch` or `SignatureMismatch`.
    pub fn verify_signature(&self, wire: &str, key: &Key) -> Result<ClaimSet, CredentialError> {
        Ok(self.decode(wire)?.verify(key)?.into_claims())
    }
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, CredentialError> {
    let json = serde_json::to_vec(value)
        .map_err(|e| CredentialError::encoding(format!("serialization failed: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: DeserializeOwned>(segment: &str, what: &str) -> Result<T, CredentialError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| CredentialError::malformed(format!("{what} is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CredentialError::malformed(format!("invalid {what}: {e}")))
}
