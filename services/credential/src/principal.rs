use crate::error::CredentialError;
use std::collections::BTreeSet;
use std::fmt;

/// An authenticated subject, as handed over by the authenticator.
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    id: String,
    roles: BTreeSet<String>,
}

impl Principal {
    /// Create a principal. Duplicate roles collapse.
    ///
    /// # Errors
    ///
    /// `Encoding` if `id` is empty.
    pub fn new<I, S>(id: impl Into<String>, roles: I) -> Result<Self, CredentialError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        if id.is_empty() {
            return Err(CredentialError::encoding("principal id must not be empty"));
        }
        Ok(Self {
            id,
            roles: roles.into_iter().map(Into::into).collect(),
        })
    }

    /// Opaque principal identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Role and scope strings.
    #[must_use]
    pub const fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Whether the principal holds `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("id", &"[REDACTED]")
            .field("roles", &self.roles)
            .finish()
    }
}
