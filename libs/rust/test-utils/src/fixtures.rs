//! Test fixtures with sample data.

use secrecy::{ExposeSecret, SecretString};

/// Issue time used across scenario tests.
pub const T0: i64 = 1000;

/// One hour, in seconds.
pub const ONE_HOUR: u64 = 3600;

/// Default issuer in scenario tests.
pub const ISSUER: &str = "svc";

/// Default audience in scenario tests.
pub const AUDIENCE: &str = "api";

/// 32-byte HS256 secret.
pub const HS256_SECRET: &[u8; 32] = b"0123456789abcdef0123456789abcdef";

/// A second, unrelated 32-byte secret.
pub const OTHER_SECRET: &[u8; 32] = b"fedcba9876543210fedcba9876543210";

/// Sample login account.
#[derive(Debug, Clone)]
pub struct SampleAccount {
    /// Username
    pub username: String,
    /// Password
    pub password: SecretString,
    /// Roles granted on login
    pub roles: Vec<String>,
}

impl SampleAccount {
    /// The classic `user` / `pass` development account.
    #[must_use]
    pub fn user() -> Self {
        Self {
            username: "user".to_string(),
            password: SecretString::from("pass"),
            roles: vec!["user".to_string()],
        }
    }

    /// An administrator account.
    #[must_use]
    pub fn admin() -> Self {
        Self {
            username: "admin".to_string(),
            password: SecretString::from("correct horse battery staple"),
            roles: vec!["admin".to_string(), "user".to_string()],
        }
    }

    /// Environment variables configuring this account as the dev login.
    #[must_use]
    pub fn env_vars(&self) -> Vec<(String, String)> {
        vec![
            ("CREDENTIAL_DEV_USERNAME".to_string(), self.username.clone()),
            (
                "CREDENTIAL_DEV_PASSWORD".to_string(),
                self.password.expose_secret().to_string(),
            ),
            ("CREDENTIAL_DEV_ROLES".to_string(), self.roles.join(",")),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_accounts() {
        assert_eq!(SampleAccount::user().password.expose_secret(), "pass");
        assert!(SampleAccount::admin().roles.contains(&"admin".to_string()));
    }

    #[test]
    fn test_env_vars() {
        let vars = SampleAccount::admin().env_vars();
        assert_eq!(vars[1].1, "correct horse battery staple");
        assert_eq!(vars[2].1, "admin,user");
    }

    #[test]
    fn test_secrets_differ() {
        assert_ne!(HS256_SECRET, OTHER_SECRET);
    }
}
