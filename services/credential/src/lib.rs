//! Credential Core library.
//!
//! Issues signed, expiring tokens for authenticated principals and verifies
//! them against a rotating key set.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod issuance;
pub mod jwks;
pub mod keys;
pub mod metrics;
pub mod observability;
pub mod principal;
pub mod revocation;
pub mod service;
pub mod token;
pub mod verification;

// Re-exports for convenience
pub use auth::{Authenticator, StaticAuthenticator};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigError, RetiredKeyConfig};
pub use error::CredentialError;
pub use issuance::IssuanceEngine;
pub use keys::{Key, KeyManager, SigningAlgorithm, ValidityWindow};
pub use principal::Principal;
pub use revocation::{RevocationCheck, RevocationList};
pub use service::{CredentialService, IssuerSettings};
pub use token::{ClaimSet, TokenCodec};
pub use verification::{VerificationEngine, VerificationPolicy};
