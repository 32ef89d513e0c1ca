//! Claim sets and their signed wire representation.

mod builder;
mod claims;
mod codec;
mod header;
mod state;

pub use builder::ClaimSetBuilder;
pub use claims::ClaimSet;
pub use codec::{TokenCodec, MAX_TOKEN_BYTES};
pub use header::{TokenHeader, TOKEN_TYPE};
pub use state::{Token, TokenState, Unverified, UnverifiedToken, Verified};
