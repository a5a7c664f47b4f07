//! Owned gallery state and its reducer-style transitions.
//!
//! # Responsibility
//! - Hold the local entry list, vote membership and identity as one value
//!   passed down to callers instead of ambient globals.
//! - Provide pure transitions that return a new state and leave the input
//!   untouched.
//!
//! # Invariants
//! - A failed transition never produces a partially updated state.
//! - Vote counts stay non-negative after every transition.

use crate::model::entry::{Entry, EntryId};
use crate::model::identity::Identity;
use crate::model::vote::{VoteDelta, VoteMembership};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors raised by state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// Voting requires a signed-in identity.
    AuthenticationRequired,
    EntryNotFound(EntryId),
}

impl Display for TransitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationRequired => write!(f, "sign in to vote"),
            Self::EntryNotFound(id) => write!(f, "entry not found: {id}"),
        }
    }
}

impl Error for TransitionError {}

/// Local view of the gallery for one client installation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GalleryState {
    pub entries: Vec<Entry>,
    pub membership: VoteMembership,
    pub identity: Option<Identity>,
}

/// Result of a vote toggle: the next state plus the delta to forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTransition {
    pub state: GalleryState,
    pub delta: VoteDelta,
}

impl GalleryState {
    pub fn new(
        entries: Vec<Entry>,
        membership: VoteMembership,
        identity: Option<Identity>,
    ) -> Self {
        Self {
            entries,
            membership,
            identity,
        }
    }

    pub fn entry(&self, entry_id: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.id == entry_id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Toggles the local user's vote on one entry.
    ///
    /// # Contract
    /// - Member entry: retraction, delta `-1`.
    /// - Non-member entry: new vote, delta `+1`.
    /// - The entry's count moves by the delta, floored at zero.
    pub fn toggle_vote(&self, entry_id: &str) -> Result<VoteTransition, TransitionError> {
        if !self.is_authenticated() {
            return Err(TransitionError::AuthenticationRequired);
        }
        let index = self
            .entries
            .iter()
            .position(|entry| entry.id == entry_id)
            .ok_or_else(|| TransitionError::EntryNotFound(entry_id.to_string()))?;

        let mut next = self.clone();
        let direction = next.membership.toggle(entry_id);
        let delta = VoteDelta::new(entry_id, direction);
        next.entries[index].apply_vote_delta(delta.delta);

        Ok(VoteTransition { state: next, delta })
    }

    /// Returns a state with `entry` placed at the front of the list.
    pub fn with_entry_prepended(&self, entry: Entry) -> Self {
        let mut next = self.clone();
        next.entries.insert(0, entry);
        next
    }

    /// Replaces local entries with authoritative remote ones.
    ///
    /// Remote truth wins for every count; membership is kept as-is.
    pub fn with_remote_entries(&self, entries: Vec<Entry>) -> Self {
        let mut next = self.clone();
        next.entries = entries;
        next
    }

    pub fn with_identity(&self, identity: Option<Identity>) -> Self {
        let mut next = self.clone();
        next.identity = identity;
        next
    }
}
