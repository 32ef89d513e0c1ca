use super::claims::ClaimSet;
use crate::error::CredentialError;
use std::collections::BTreeSet;

/// Assembles a [`ClaimSet`] from an issuance request.
pub struct ClaimSetBuilder {
    issuer: String,
    audience: String,
    subject: Option<String>,
    roles: BTreeSet<String>,
    issued_at: i64,
    ttl_seconds: i64,
    jti: Option<String>,
}

impl ClaimSetBuilder {
    /// Start a claim set for `issuer` and `audience`, issued at `issued_at`.
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>, issued_at: i64) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            subject: None,
            roles: BTreeSet::new(),
            issued_at,
            ttl_seconds: 3600,
            jti: None,
        }
    }

    /// Set the principal id.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the roles.
    #[must_use]
    pub fn roles(mut self, roles: BTreeSet<String>) -> Self {
        self.roles = roles;
        self
    }

    /// Set the lifetime.
    #[must_use]
    pub const fn ttl_seconds(mut self, ttl: i64) -> Self {
        self.ttl_seconds = ttl;
        self
    }

    /// Use a fixed token id instead of a fresh UUID.
    #[must_use]
    pub fn jti(mut self, jti: impl Into<String>) -> Self {
        self.jti = Some(jti.into());
        self
    }

    /// Build and validate the claim set.
    ///
    /// # Errors
    ///
    /// `Encoding` if the subject is missing, the lifetime is not positive, or
    /// any claim invariant fails.
    pub fn build(self) -> Result<ClaimSet, CredentialError> {
        let sub = self
            .subject
            .ok_or_else(|| CredentialError::encoding("subject is required"))?;
        if self.ttl_seconds <= 0 {
            return Err(CredentialError::encoding("ttl must be positive"));
        }
        let exp = self
            .issued_at
            .checked_add(self.ttl_seconds)
            .ok_or_else(|| CredentialError::encoding("expiry overflows"))?;

        let claims = ClaimSet {
            sub,
            roles: self.roles,
            iat: self.issued_at,
            exp,
            iss: self.issuer,
            aud: self.audience,
            jti: self
                .jti
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        };
        claims.validate().map_err(CredentialError::encoding)?;
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_basic() {
        let claims = ClaimSetBuilder::new("svc", "api", 1000)
            .subject("alice")
            .ttl_seconds(3600)
            .build()
            .unwrap();

        assert_eq!(claims.iat, 1000);
        assert_eq!(claims.exp, 4600);
        assert_eq!(claims.iss, "svc");
        assert!(uuid::Uuid::parse_str(&claims.jti).is_ok());
    }

    #[test]
    fn test_builder_fresh_jti_per_build() {
        let a = ClaimSetBuilder::new("svc", "api", 0).subject("a").build().unwrap();
        let b = ClaimSetBuilder::new("svc", "api", 0).subject("a").build().unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_builder_missing_subject() {
        let result = ClaimSetBuilder::new("svc", "api", 0).build();
        assert!(matches!(result, Err(CredentialError::Encoding(_))));
    }

    #[test]
    fn test_builder_rejects_bad_input() {
        let zero_ttl = ClaimSetBuilder::new("svc", "api", 0).subject("a").ttl_seconds(0).build();
        assert!(zero_ttl.is_err());

        let empty_issuer = ClaimSetBuilder::new("", "api", 0).subject("a").build();
        assert!(empty_issuer.is_err());

        let overflow = ClaimSetBuilder::new("svc", "api", i64::MAX)
            .subject("a")
            .build();
        assert!(overflow.is_err());
    }
}
