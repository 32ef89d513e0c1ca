//! Type-state token wrapper.
//!
//! Claims of a parsed token can only be taken by value once its signature has
//! been checked against a resolved key.

use super::claims::ClaimSet;
use super::header::TokenHeader;
use crate::error::CredentialError;
use crate::keys::{Key, SigningAlgorithm};
use std::marker::PhantomData;

mod private {
    pub trait Sealed {}
}

/// Marker trait for token verification states.
pub trait TokenState: private::Sealed {
    /// Human-readable state name for debugging
    fn state_name() -> &'static str;
}

/// Parsed, signature not yet checked.
#[derive(Debug)]
pub struct Unverified;
impl private::Sealed for Unverified {}
impl TokenState for Unverified {
    fn state_name() -> &'static str {
        "Unverified"
    }
}

/// Signature checked against a known key.
#[derive(Debug)]
pub struct Verified;
impl private::Sealed for Verified {}
impl TokenState for Verified {
    fn state_name() -> &'static str {
        "Verified"
    }
}

/// A decoded wire token in state `S`.
#[derive(Debug)]
pub struct Token<S: TokenState> {
    raw: String,
    signing_input_len: usize,
    header: TokenHeader,
    claims: ClaimSet,
    _state: PhantomData<S>,
}

/// A token fresh from [`TokenCodec::decode`](super::TokenCodec::decode).
pub type UnverifiedToken = Token<Unverified>;

impl Token<Unverified> {
    pub(super) fn new(
        raw: String,
        signing_input_len: usize,
        header: TokenHeader,
        claims: ClaimSet,
    ) -> Self {
        Self {
            raw,
            signing_input_len,
            header,
            claims,
            _state: PhantomData,
        }
    }

    /// Key id declared by the header.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.header.kid
    }

    /// Algorithm declared by the header.
    #[must_use]
    pub const fn algorithm(&self) -> SigningAlgorithm {
        self.header.alg
    }

    /// Read claims without trusting them.
    #[must_use]
    pub const fn peek_claims(&self) -> &ClaimSet {
        &self.claims
    }

    /// Check the signature with `key`.
    ///
    /// # Errors
    ///
    /// `AlgorithmMismatch` if the header algorithm differs from the key's,
    /// otherwise `SignatureMismatch` if the signature does not verify.
    pub fn verify(self, key: &Key) -> Result<Token<Verified>, CredentialError> {
        if self.header.alg != key.algorithm() {
            return Err(CredentialError::AlgorithmMismatch {
                expected: key.algorithm().to_string(),
                found: self.header.alg.to_string(),
            });
        }

        let (signing_input, rest) = self.raw.split_at(self.signing_input_len);
        let signature = rest.strip_prefix('.').unwrap_or(rest);
        if !key.verify(signing_input.as_bytes(), signature) {
            return Err(CredentialError::SignatureMismatch);
        }

        Ok(Token {
            raw: self.raw,
            signing_input_len: self.signing_input_len,
            header: self.header,
            claims: self.claims,
            _state: PhantomData,
        })
    }
}

impl Token<Verified> {
    /// Verified claims.
    #[must_use]
    pub const fn claims(&self) -> &ClaimSet {
        &self.claims
    }

    /// Consume the token, keeping the claims.
    #[must_use]
    pub fn into_claims(self) -> ClaimSet {
        self.claims
    }

    /// Key id that signed this token.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.header.kid
    }
}

impl<S: TokenState> Token<S> {
    /// Current state name.
    #[must_use]
    pub fn state_name(&self) -> &'static str {
        S::state_name()
    }

    /// Original wire string.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Decoded header.
    #[must_use]
    pub const fn header(&self) -> &TokenHeader {
        &self.header
    }
}
