//! Signed-in user identity.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

/// Authenticated user as seen by the gallery.
///
/// Created at sign-in, removed at sign-out, persisted only for session
/// resumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user id; used as `Entry::author_id`.
    pub id: String,
    pub name: String,
    pub handle: String,
    /// Avatar image URL.
    pub avatar: String,
}

/// Sign-in input. Never persisted and never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Credentials;

    #[test]
    fn debug_output_redacts_password() {
        let credentials = Credentials::new("ada@example.com", "hunter22");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("ada@example.com"));
        assert!(!rendered.contains("hunter22"));
    }
}
