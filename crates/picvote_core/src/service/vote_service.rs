//! Vote reconciler: optimistic local votes kept in step with the remote count.
//!
//! # Responsibility
//! - Apply a toggle to the owned gallery state immediately.
//! - Persist vote membership before the call returns.
//! - Hand the matching delta to the background sync queue.
//! - Re-align local counts with remote truth on demand.
//!
//! # Invariants
//! - At most one active vote per (user, entry).
//! - Local counts never go below zero.
//! - A failed membership write leaves the caller's state untouched.
//! - Remote failures never roll back local state; `refresh` corrects drift.

use crate::model::entry::EntryId;
use crate::model::state::{GalleryState, TransitionError};
use crate::model::vote::VoteMembership;
use crate::remote::{RemoteGallery, RemoteResult};
use crate::repo::kv_repo::{KeyValueStore, VOTE_MEMBERSHIP_KEY};
use crate::repo::{RepoError, RepoResult};
use crate::sync::vote_queue::VoteSyncQueue;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Vote toggle failure.
#[derive(Debug)]
pub enum VoteError {
    /// No identity present; the caller should prompt for sign-in.
    AuthenticationRequired,
    EntryNotFound(EntryId),
    /// Membership could not be made durable.
    Store(RepoError),
}

impl Display for VoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationRequired => write!(f, "sign in to vote"),
            Self::EntryNotFound(id) => write!(f, "entry not found: {id}"),
            Self::Store(err) => write!(f, "failed to save vote: {err}"),
        }
    }
}

impl Error for VoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransitionError> for VoteError {
    fn from(value: TransitionError) -> Self {
        match value {
            TransitionError::AuthenticationRequired => Self::AuthenticationRequired,
            TransitionError::EntryNotFound(id) => Self::EntryNotFound(id),
        }
    }
}

impl From<RepoError> for VoteError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Reads persisted membership; empty on first run.
pub fn load_membership<S: KeyValueStore>(store: &S) -> RepoResult<VoteMembership> {
    Ok(store
        .get_json::<VoteMembership>(VOTE_MEMBERSHIP_KEY)?
        .unwrap_or_default())
}

/// Owns the membership store and the sync queue for one client.
pub struct VoteReconciler<S: KeyValueStore> {
    store: S,
    queue: VoteSyncQueue,
}

impl<S: KeyValueStore> VoteReconciler<S> {
    pub fn new(store: S, queue: VoteSyncQueue) -> Self {
        Self { store, queue }
    }

    pub fn load_membership(&self) -> RepoResult<VoteMembership> {
        load_membership(&self.store)
    }

    /// Toggles the vote on `entry_id` and returns the next state.
    ///
    /// # Contract
    /// - Unauthenticated or unknown entry: error, nothing written.
    /// - Membership is durable when this returns `Ok`.
    /// - The remote increment is queued, not awaited.
    pub fn toggle_vote(
        &self,
        state: &GalleryState,
        entry_id: &str,
    ) -> Result<GalleryState, VoteError> {
        let transition = state.toggle_vote(entry_id)?;

        if let Err(err) = self
            .store
            .set_json(VOTE_MEMBERSHIP_KEY, &transition.state.membership)
        {
            error!(
                "event=vote_toggle module=vote status=error entry_id={} error_code=membership_write_failed error={}",
                entry_id, err
            );
            return Err(err.into());
        }

        info!(
            "event=vote_toggle module=vote status=ok entry_id={} delta={}",
            entry_id, transition.delta.delta
        );

        if let Err(err) = self.queue.enqueue(transition.delta) {
            // Local state stays optimistic; the next refresh realigns counts.
            error!(
                "event=vote_toggle module=vote status=error error_code=sync_enqueue_failed error={}",
                err
            );
        }

        Ok(transition.state)
    }

    /// Replaces local counts with the remote gallery's current values.
    ///
    /// Membership is preserved; remote truth wins for every count.
    pub async fn refresh(
        &self,
        state: &GalleryState,
        remote: &dyn RemoteGallery,
    ) -> RemoteResult<GalleryState> {
        let entries = remote.list_entries().await?;
        info!(
            "event=vote_refresh module=vote status=ok entry_count={}",
            entries.len()
        );
        Ok(state.with_remote_entries(entries))
    }

    pub fn queue(&self) -> &VoteSyncQueue {
        &self.queue
    }

    /// Waits for queued deltas to settle and stops the sync worker.
    pub async fn shutdown(self) {
        self.queue.shutdown().await;
    }
}
