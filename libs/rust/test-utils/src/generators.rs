//! Shared proptest generators.
//!
//! Generators yield plain values (strings, durations, bytes) so that this
//! crate does not depend on the crate under test.

use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::time::Duration;

/// Generate principal identifiers (user names, emails, opaque ids).
pub fn principal_id_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9_]{2,20}",
        "[a-z0-9._%+-]{1,20}@[a-z0-9-]{1,20}\\.[a-z]{2,4}",
        "[a-f0-9]{32}",
    ]
}

/// Generate role sets, possibly empty.
pub fn roles_strategy() -> impl Strategy<Value = BTreeSet<String>> {
    btree_set("[a-z][a-z:_-]{1,15}", 0..6)
}

/// Generate issuer names.
pub fn issuer_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9-]{2,20}",
        "[a-z]{3,12}".prop_map(|host| format!("https://{host}.example.com")),
    ]
}

/// Generate audience names.
pub fn audience_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{1,20}"
}

/// Generate key ids.
pub fn key_id_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}"
}

/// Generate token id strings in UUID v4 form.
pub fn jti_strategy() -> impl Strategy<Value = String> {
    any::<u128>().prop_map(|bits| uuid::Builder::from_random_bytes(bits.to_le_bytes()).into_uuid().to_string())
}

/// Generate TTL values (1 second to 24 hours).
pub fn ttl_strategy() -> impl Strategy<Value = Duration> {
    (1u64..86_400).prop_map(Duration::from_secs)
}

/// Generate issue times (Unix seconds, 2001 to 2100).
pub fn timestamp_strategy() -> impl Strategy<Value = i64> {
    1_000_000_000i64..4_102_444_800
}

/// Generate shared secrets of at least `min_len` bytes.
pub fn secret_strategy(min_len: usize) -> impl Strategy<Value = Vec<u8>> {
    vec(any::<u8>(), min_len..=min_len + 32)
}

/// Generate HMAC algorithm names.
pub fn hmac_algorithm_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("HS256"), Just("HS384"), Just("HS512")]
}
