//! Local vote membership and vote deltas.
//!
//! # Invariants
//! - Membership is binary per entry: voted or not voted.
//! - A delta is always `+1` (new vote) or `-1` (retraction).

use crate::model::entry::EntryId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Entries the local user currently has an active vote on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteMembership {
    #[serde(default)]
    has_voted_for: BTreeSet<EntryId>,
}

impl VoteMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, entry_id: &str) -> bool {
        self.has_voted_for.contains(entry_id)
    }

    pub fn state_of(&self, entry_id: &str) -> VoteStatus {
        if self.contains(entry_id) {
            VoteStatus::Voted
        } else {
            VoteStatus::NotVoted
        }
    }

    /// Flips membership for one entry and returns the matching direction.
    pub fn toggle(&mut self, entry_id: &str) -> VoteDirection {
        if self.has_voted_for.remove(entry_id) {
            VoteDirection::Retract
        } else {
            self.has_voted_for.insert(entry_id.to_string());
            VoteDirection::Cast
        }
    }

    pub fn len(&self) -> usize {
        self.has_voted_for.len()
    }

    pub fn is_empty(&self) -> bool {
        self.has_voted_for.is_empty()
    }

    /// Voted entry ids in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &EntryId> {
        self.has_voted_for.iter()
    }
}

impl<S: Into<EntryId>> FromIterator<S> for VoteMembership {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            has_voted_for: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Per-entry vote state for the local user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteStatus {
    NotVoted,
    Voted,
}

/// Direction of one toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    /// `NotVoted -> Voted`.
    Cast,
    /// `Voted -> NotVoted`.
    Retract,
}

impl VoteDirection {
    pub fn delta(self) -> i64 {
        match self {
            Self::Cast => 1,
            Self::Retract => -1,
        }
    }
}

/// Increment to forward to the remote gallery after a toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteDelta {
    pub entry_id: EntryId,
    pub delta: i64,
}

impl VoteDelta {
    pub fn new(entry_id: impl Into<EntryId>, direction: VoteDirection) -> Self {
        Self {
            entry_id: entry_id.into(),
            delta: direction.delta(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{VoteDirection, VoteMembership, VoteStatus};

    #[test]
    fn toggle_flips_between_two_states() {
        let mut membership = VoteMembership::new();
        assert_eq!(membership.state_of("2"), VoteStatus::NotVoted);

        assert_eq!(membership.toggle("2"), VoteDirection::Cast);
        assert_eq!(membership.state_of("2"), VoteStatus::Voted);

        assert_eq!(membership.toggle("2"), VoteDirection::Retract);
        assert_eq!(membership.state_of("2"), VoteStatus::NotVoted);
        assert!(membership.is_empty());
    }

    #[test]
    fn serializes_as_voted_id_list() {
        let membership: VoteMembership = ["3", "1"].into_iter().collect();
        let json = serde_json::to_string(&membership).unwrap();
        assert_eq!(json, r#"{"has_voted_for":["1","3"]}"#);

        let restored: VoteMembership = serde_json::from_str("{}").unwrap();
        assert!(restored.is_empty());
    }
}
