//! Property-based tests for key rotation.
//!
//! Property 1: Tokens signed before a rotation verify until the old key's window closes
//! Property 2: New issuances use the rotated-in key
//! Property 3: Never-registered key ids are reported as unknown

use credential_core::token::TokenCodec;
use credential_core::{
    CredentialError, IssuanceEngine, Key, KeyManager, ManualClock, Principal, SigningAlgorithm,
    ValidityWindow, VerificationEngine,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use test_utils::fixtures::{AUDIENCE, ISSUER};
use test_utils::{key_id_strategy, principal_id_strategy, secret_strategy};

fn hmac_key(kid: &str, secret: Vec<u8>, window: ValidityWindow) -> Key {
    Key::hmac(kid, SigningAlgorithm::HS256, secret, window).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property 1 and 2: Rotation overlap
    #[test]
    fn prop_rotation_keeps_old_tokens_verifiable(
        (kid1, kid2) in (key_id_strategy(), key_id_strategy())
            .prop_filter("key ids must differ", |(a, b)| a != b),
        secret1 in secret_strategy(32),
        secret2 in secret_strategy(32),
        old_key_lifetime in 100i64..10_000,
        subject in principal_id_strategy(),
    ) {
        let t0 = 1_000;
        let clock = Arc::new(ManualClock::new(t0));
        let keys = Arc::new(KeyManager::new(clock.clone()));
        let issuance = IssuanceEngine::new(Arc::clone(&keys));
        let verification = VerificationEngine::new(Arc::clone(&keys));
        let principal = Principal::new(subject, Vec::<String>::new()).unwrap();
        let codec = TokenCodec::new();

        let k1_not_after = t0 + old_key_lifetime;
        keys.rotate(hmac_key(&kid1, secret1, ValidityWindow::new(t0, k1_not_after))).unwrap();
        let old_token = issuance
            .issue(&principal, Duration::from_secs(1_000_000), ISSUER, AUDIENCE)
            .unwrap();

        keys.rotate(hmac_key(&kid2, secret2, ValidityWindow::new(t0, i64::MAX))).unwrap();
        let new_token = issuance
            .issue(&principal, Duration::from_secs(60), ISSUER, AUDIENCE)
            .unwrap();

        let old_decoded = codec.decode(&old_token).unwrap();
        let new_decoded = codec.decode(&new_token).unwrap();
        prop_assert_eq!(old_decoded.kid(), kid1.as_str());
        prop_assert_eq!(new_decoded.kid(), kid2.as_str());
        prop_assert!(verification.verify(&old_token).is_ok());
        prop_assert!(verification.verify(&new_token).is_ok());

        clock.set(k1_not_after);
        prop_assert!(verification.verify(&old_token).is_ok(), "Old key valid through not_after");

        clock.set(k1_not_after + 1);
        prop_assert_eq!(
            verification.verify(&old_token).unwrap_err(),
            CredentialError::unknown_key(kid1.clone())
        );
        prop_assert!(!keys.snapshot().key_ids().contains(&kid1.as_str()), "Expired key purged");
    }

    /// Property 3: Unknown key ids
    #[test]
    fn prop_unregistered_kid_is_unknown(
        kid in key_id_strategy(),
        secret in secret_strategy(32),
    ) {
        let clock = Arc::new(ManualClock::new(1_000));
        let signer_keys = Arc::new(KeyManager::new(clock.clone()));
        signer_keys
            .rotate(hmac_key(&kid, secret, ValidityWindow::new(0, 100_000)))
            .unwrap();
        let token = IssuanceEngine::new(signer_keys)
            .issue(
                &Principal::new("alice", ["user"]).unwrap(),
                Duration::from_secs(60),
                ISSUER,
                AUDIENCE,
            )
            .unwrap();

        let verifier_keys = Arc::new(KeyManager::new(clock));
        let verification = VerificationEngine::new(verifier_keys);
        prop_assert_eq!(
            verification.verify(&token).unwrap_err(),
            CredentialError::unknown_key(kid)
        );
    }
}

#[test]
fn test_concurrent_verification_during_rotation() {
    let clock = Arc::new(ManualClock::new(1_000));
    let keys = Arc::new(KeyManager::new(clock));
    let window = ValidityWindow::new(0, 1_000_000);
    keys.rotate(hmac_key("k0", vec![0u8; 32], window)).unwrap();

    let issuance = IssuanceEngine::new(Arc::clone(&keys));
    let verification = VerificationEngine::new(Arc::clone(&keys));
    let principal = Principal::new("alice", ["user"]).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..200 {
                    let token = issuance
                        .issue(&principal, Duration::from_secs(600), ISSUER, AUDIENCE)
                        .unwrap();
                    let claims = verification.verify(&token).unwrap();
                    assert_eq!(claims.sub, "alice");
                }
            });
        }
        scope.spawn(|| {
            for i in 1..=40u8 {
                keys.rotate(hmac_key(&format!("k{i}"), vec![i; 32], window)).unwrap();
            }
        });
    });

    assert_eq!(keys.current_signing_key().unwrap().kid(), "k40");
    assert_eq!(keys.snapshot().len(), 41);
}
