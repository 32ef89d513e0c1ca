//! Authenticator seam used by the login flow.

use crate::error::CredentialError;
use crate::principal::Principal;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{BTreeSet, HashMap};
use subtle::ConstantTimeEq;

/// Turns presented credentials into a principal.
pub trait Authenticator: Send + Sync {
    /// Authenticate `username` with `password`.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` when the pair is not accepted.
    fn authenticate(&self, username: &str, password: &SecretString)
        -> Result<Principal, CredentialError>;
}

struct Account {
    password: SecretString,
    roles: BTreeSet<String>,
}

/// Fixed account table for development and tests.
///
/// Unknown users and wrong passwords fail identically.
#[derive(Default)]
pub struct StaticAuthenticator {
    accounts: HashMap<String, Account>,
}

impl StaticAuthenticator {
    /// Empty table: every login fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account.
    #[must_use]
    pub fn with_account<I, S>(
        mut self,
        username: impl Into<String>,
        password: SecretString,
        roles: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accounts.insert(
            username.into(),
            Account {
                password,
                roles: roles.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl Authenticator for StaticAuthenticator {
    fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Principal, CredentialError> {
        let Some(account) = self.accounts.get(username) else {
            return Err(CredentialError::InvalidCredentials);
        };

        let expected = account.password.expose_secret().as_bytes();
        let provided = password.expose_secret().as_bytes();
        let matches: bool = expected.ct_eq(provided).into();
        if !matches {
            return Err(CredentialError::InvalidCredentials);
        }

        Principal::new(username, account.roles.iter().cloned())
    }
}
