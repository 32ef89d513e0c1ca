//! Shared test utilities for credential-core.
//!
//! This crate provides:
//! - Proptest generators for principals, claims inputs and key material
//! - Fixtures with fixed clocks, secrets and accounts

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

pub use generators::*;
