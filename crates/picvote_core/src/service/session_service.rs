//! Sign-in, sign-out and session resumption.
//!
//! # Invariants
//! - Only the resulting identity is persisted; credentials never are.
//! - A failed sign-in leaves any stored session untouched.

use crate::model::identity::{Credentials, Identity};
use crate::remote::{AuthError, IdentityProvider};
use crate::repo::kv_repo::{KeyValueStore, CURRENT_IDENTITY_KEY};
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum SessionError {
    /// Displayable authentication failure.
    Auth(AuthError),
    Store(RepoError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "failed to save session: {err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Auth(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<AuthError> for SessionError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

impl From<RepoError> for SessionError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

pub struct SessionService<P: IdentityProvider, S: KeyValueStore> {
    provider: P,
    store: S,
}

impl<P: IdentityProvider, S: KeyValueStore> SessionService<P, S> {
    pub fn new(provider: P, store: S) -> Self {
        Self { provider, store }
    }

    /// Authenticates and stores the identity for later resumption.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, SessionError> {
        let identity = match self.provider.authenticate(credentials).await {
            Ok(identity) => identity,
            Err(err) => {
                warn!(
                    "event=sign_in module=session status=error error={}",
                    err
                );
                return Err(err.into());
            }
        };
        self.store.set_json(CURRENT_IDENTITY_KEY, &identity)?;
        info!(
            "event=sign_in module=session status=ok user_id={}",
            identity.id
        );
        Ok(identity)
    }

    /// Forgets the stored identity. Signing out twice is not an error.
    pub fn sign_out(&self) -> Result<(), SessionError> {
        let removed = self.store.remove(CURRENT_IDENTITY_KEY)?;
        info!(
            "event=sign_out module=session status=ok had_session={}",
            removed
        );
        Ok(())
    }

    /// Returns the stored identity, if any.
    pub fn resume(&self) -> Result<Option<Identity>, SessionError> {
        Ok(self.store.get_json(CURRENT_IDENTITY_KEY)?)
    }
}
