//! Prometheus metrics for the credential core.
//!
//! Counters are registered in the default registry on first use.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_int_counter, CounterVec, IntCounter};

/// Tokens issued counter.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "credential_tokens_issued_total",
        "Total number of tokens issued",
        &["algorithm"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Verification outcomes counter.
pub static VERIFICATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "credential_verifications_total",
        "Total number of token verifications",
        &["outcome", "reason"]
    )
    .expect("Failed to register verifications metric")
});

/// Key rotations counter.
pub static KEY_ROTATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "credential_key_rotations_total",
        "Total number of signing key rotations",
        &["status"]
    )
    .expect("Failed to register key_rotations metric")
});

/// Purged keys counter.
pub static KEYS_PURGED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "credential_keys_purged_total",
        "Total number of expired keys purged"
    )
    .expect("Failed to register keys_purged metric")
});

/// Record a token issuance.
pub fn record_token_issued(algorithm: &str) {
    TOKENS_ISSUED.with_label_values(&[algorithm]).inc();
}

/// Record an accepted token.
pub fn record_verification_accepted() {
    VERIFICATIONS.with_label_values(&["accepted", "none"]).inc();
}

/// Record a rejected token with the failure code as reason.
pub fn record_verification_rejected(reason: &str) {
    VERIFICATIONS.with_label_values(&["rejected", reason]).inc();
}

/// Record a rotation attempt.
pub fn record_key_rotation(status: &str) {
    KEY_ROTATIONS.with_label_values(&[status]).inc();
}

/// Record purged keys.
pub fn record_keys_purged(count: usize) {
    KEYS_PURGED.inc_by(u64::try_from(count).unwrap_or(u64::MAX));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_token_issued() {
        record_token_issued("HS256");
        let value = TOKENS_ISSUED.with_label_values(&["HS256"]).get();
        assert!(value > 0.0);
    }

    #[test]
    fn test_record_verification_rejected() {
        record_verification_rejected("TOKEN_EXPIRED");
        let value = VERIFICATIONS
            .with_label_values(&["rejected", "TOKEN_EXPIRED"])
            .get();
        assert!(value > 0.0);
    }

    #[test]
    fn test_record_keys_purged() {
        let before = KEYS_PURGED.get();
        record_keys_purged(3);
        assert!(KEYS_PURGED.get() >= before + 3);
    }
}
