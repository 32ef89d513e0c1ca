use crate::keys::SigningAlgorithm;
use serde::{Deserialize, Serialize};

/// Token type written into every header.
pub const TOKEN_TYPE: &str = "JWT";

/// Token header: algorithm and key id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Signing algorithm
    pub alg: SigningAlgorithm,
    /// Signing key id
    pub kid: String,
    /// Token type, `JWT` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl TokenHeader {
    /// Header for a token signed with `alg` under key `kid`.
    pub fn new(alg: SigningAlgorithm, kid: impl Into<String>) -> Self {
        Self {
            alg,
            kid: kid.into(),
            typ: Some(TOKEN_TYPE.to_string()),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.kid.is_empty() {
            return Err("kid must not be empty");
        }
        match self.typ.as_deref() {
            None | Some(TOKEN_TYPE) => Ok(()),
            Some(_) => Err("unsupported token type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_json() {
        let header = TokenHeader::new(SigningAlgorithm::HS256, "k1");
        assert_eq!(
            serde_json::to_string(&header).unwrap(),
            r#"{"alg":"HS256","kid":"k1","typ":"JWT"}"#
        );
    }

    #[test]
    fn test_header_rejects_unknown_algorithm() {
        let result = serde_json::from_str::<TokenHeader>(r#"{"alg":"none","kid":"k1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_header_validation() {
        let header: TokenHeader = serde_json::from_str(r#"{"alg":"EdDSA","kid":"k1"}"#).unwrap();
        assert!(header.validate().is_ok());

        let header: TokenHeader =
            serde_json::from_str(r#"{"alg":"EdDSA","kid":"k1","typ":"at+jwt"}"#).unwrap();
        assert!(header.validate().is_err());

        let header: TokenHeader = serde_json::from_str(r#"{"alg":"EdDSA","kid":""}"#).unwrap();
        assert!(header.validate().is_err());
    }
}
