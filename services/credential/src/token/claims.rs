use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Signed payload describing who a token represents and for how long.
///
/// Field order is the serialization order.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet {
    /// Principal id
    pub sub: String,
    /// Roles and scopes
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiry (Unix seconds)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Unique token id
    pub jti: String,
}

impl ClaimSet {
    /// Check structural invariants, returning the first violation.
    ///
    /// # Errors
    ///
    /// A static description of the violated invariant.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.sub.is_empty() {
            return Err("sub must not be empty");
        }
        if self.iss.is_empty() {
            return Err("iss must not be empty");
        }
        if self.aud.is_empty() {
            return Err("aud must not be empty");
        }
        if self.jti.is_empty() {
            return Err("jti must not be empty");
        }
        if self.exp <= self.iat {
            return Err("exp must be after iat");
        }
        Ok(())
    }

    /// Whether the token has expired at `now`, allowing `skew` seconds of drift.
    #[must_use]
    pub const fn is_expired_at(&self, now: i64, skew: i64) -> bool {
        now >= self.exp.saturating_add(skew)
    }

    /// Whether the token was issued after `now`, allowing `skew` seconds of drift.
    #[must_use]
    pub const fn is_premature_at(&self, now: i64, skew: i64) -> bool {
        now.saturating_add(skew) < self.iat
    }

    /// Token lifetime in seconds.
    #[must_use]
    pub const fn ttl_seconds(&self) -> i64 {
        self.exp - self.iat
    }

    /// Whether the claims carry `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

impl fmt::Debug for ClaimSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimSet")
            .field("sub", &"[REDACTED]")
            .field("roles", &self.roles)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("jti", &self.jti)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> ClaimSet {
        ClaimSet {
            sub: "alice".to_string(),
            roles: BTreeSet::from(["user".to_string()]),
            iat: 1000,
            exp: 4600,
            iss: "svc".to_string(),
            aud: "api".to_string(),
            jti: "id-1".to_string(),
        }
    }

    #[test]
    fn test_validate() {
        assert!(claims().validate().is_ok());

        let mut c = claims();
        c.exp = c.iat;
        assert_eq!(c.validate(), Err("exp must be after iat"));

        let mut c = claims();
        c.iss.clear();
        assert!(c.validate().is_err());

        let mut c = claims();
        c.jti.clear();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_expiry_boundary() {
        let c = claims();
        assert!(!c.is_expired_at(4599, 0));
        assert!(c.is_expired_at(4600, 0));
        assert!(!c.is_expired_at(4600, 30));
        assert!(c.is_expired_at(4630, 30));
    }

    #[test]
    fn test_premature() {
        let c = claims();
        assert!(c.is_premature_at(999, 0));
        assert!(!c.is_premature_at(1000, 0));
        assert!(!c.is_premature_at(990, 10));
    }

    #[test]
    fn test_serialization_order() {
        let json = serde_json::to_string(&claims()).unwrap();
        assert_eq!(
            json,
            r#"{"sub":"alice","roles":["user"],"iat":1000,"exp":4600,"iss":"svc","aud":"api","jti":"id-1"}"#
        );
    }

    #[test]
    fn test_roles_default_to_empty() {
        let c: ClaimSet = serde_json::from_str(
            r#"{"sub":"a","iat":1,"exp":2,"iss":"i","aud":"a","jti":"j"}"#,
        )
        .unwrap();
        assert!(c.roles.is_empty());
    }

    #[test]
    fn test_debug_redacts_subject() {
        assert!(!format!("{:?}", claims()).contains("alice"));
    }
}
