//! Offline identity provider.
//!
//! Accepts any well-formed email with a long-enough password and derives a
//! stable identity from the email, so the same account signs back in as the
//! same author. Credentials are inspected and dropped; nothing is stored.

use crate::model::identity::{Credentials, Identity};
use crate::remote::{AuthError, IdentityProvider};
use async_trait::async_trait;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

const MIN_PASSWORD_CHARS: usize = 6;
const AVATAR_BASE_URL: &str = "https://api.dicebear.com/7.x/avataaars/svg?seed=";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex")
});
static HANDLE_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid handle regex"));

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalIdentityProvider;

impl LocalIdentityProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let email = credentials.email.trim().to_lowercase();
        if !EMAIL_RE.is_match(&email) {
            return Err(AuthError::InvalidCredentials(
                "enter a valid email address".to_string(),
            ));
        }
        if credentials.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::InvalidCredentials(format!(
                "password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }

        let identity = derive_identity(&email);
        info!(
            "event=authenticate module=identity status=ok user_id={}",
            identity.id
        );
        Ok(identity)
    }
}

fn derive_identity(email: &str) -> Identity {
    let stable = Uuid::new_v5(&Uuid::NAMESPACE_OID, email.as_bytes()).simple().to_string();
    let local_part = email.split('@').next().unwrap_or(email);
    let handle = HANDLE_SEPARATOR_RE
        .replace_all(local_part, "_")
        .trim_matches('_')
        .to_string();
    let handle = if handle.is_empty() {
        format!("user_{}", &stable[..6])
    } else {
        handle
    };

    Identity {
        id: format!("u-{}", &stable[..10]),
        name: display_name(&handle),
        avatar: format!("{AVATAR_BASE_URL}{handle}"),
        handle,
    }
}

fn display_name(handle: &str) -> String {
    handle
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
