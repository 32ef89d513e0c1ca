//! JSON Web Key Set export for asymmetric verification keys.

use crate::keys::{KeySet, SigningAlgorithm};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

/// A single public key in JWK form (RFC 8037 `OKP`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type
    pub kty: String,
    /// Key id, matching the token header `kid`
    pub kid: String,
    /// Intended use
    #[serde(rename = "use")]
    pub key_use: String,
    /// Algorithm
    pub alg: String,
    /// Curve
    pub crv: String,
    /// Base64url raw public key
    pub x: String,
}

impl Jwk {
    /// Ed25519 verification key.
    pub fn ed25519(kid: impl Into<String>, public_key: &[u8]) -> Self {
        Self {
            kty: "OKP".to_string(),
            kid: kid.into(),
            key_use: "sig".to_string(),
            alg: SigningAlgorithm::EdDSA.as_str().to_string(),
            crv: "Ed25519".to_string(),
            x: URL_SAFE_NO_PAD.encode(public_key),
        }
    }
}

/// Published key set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    /// Keys, sorted by id
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Public halves of every asymmetric key still accepted at `now`.
    ///
    /// Shared secrets have no public half and are never included.
    #[must_use]
    pub fn from_key_set(set: &KeySet, now: i64) -> Self {
        let mut keys: Vec<Jwk> = set
            .iter()
            .filter(|key| !key.is_expired_at(now))
            .filter_map(|key| key.public_key().map(|public| Jwk::ed25519(key.kid(), public)))
            .collect();
        keys.sort_by(|a, b| a.kid.cmp(&b.kid));
        Self { keys }
    }

    /// Look up a key by id.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }

    /// Serialize to JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::keys::{Key, KeyManager, ValidityWindow};
    use std::sync::Arc;

    #[test]
    fn test_jwk_fields() {
        let jwk = Jwk::ed25519("ed-1", &[0u8; 32]);
        let json = serde_json::to_value(&jwk).unwrap();

        assert_eq!(json["kty"], "OKP");
        assert_eq!(json["crv"], "Ed25519");
        assert_eq!(json["use"], "sig");
        assert_eq!(json["alg"], "EdDSA");
        assert_eq!(json["x"], "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");
    }

    #[test]
    fn test_jwks_excludes_shared_secrets() {
        let manager = KeyManager::new(Arc::new(ManualClock::new(100)));
        let window = ValidityWindow::new(0, 1000);

        manager
            .add_verification_key(Key::generate("ed-b", SigningAlgorithm::EdDSA, window).unwrap())
            .unwrap();
        manager
            .add_verification_key(Key::generate("ed-a", SigningAlgorithm::EdDSA, window).unwrap())
            .unwrap();
        manager
            .rotate(Key::generate("hs", SigningAlgorithm::HS256, window).unwrap())
            .unwrap();

        let jwks = manager.jwks();
        let kids: Vec<&str> = jwks.keys.iter().map(|k| k.kid.as_str()).collect();
        assert_eq!(kids, vec!["ed-a", "ed-b"]);
        assert!(jwks.find("hs").is_none());
    }

    #[test]
    fn test_jwks_json_round_trip() {
        let jwks = Jwks {
            keys: vec![Jwk::ed25519("k", &[7u8; 32])],
        };
        let parsed: Jwks = serde_json::from_str(&jwks.to_json()).unwrap();
        assert_eq!(parsed, jwks);
    }
}
