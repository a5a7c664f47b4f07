//! Domain model for the photo contest.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep state transitions pure so they can be tested without storage.
//!
//! # Invariants
//! - Every entry is identified by a unique `EntryId`.
//! - Vote membership is binary per (user, entry).

pub mod entry;
pub mod identity;
pub mod state;
pub mod vote;
