//! Remote vote synchronization.
//!
//! # Responsibility
//! - Forward optimistic local vote deltas to the remote gallery.
//! - Make delivery failures observable instead of dropping them.
//!
//! # Invariants
//! - The remote count floors at zero, so deltas for one entry are applied
//!   in the order they were enqueued. Different entries sync independently.

pub mod retry;
pub mod vote_queue;

pub use retry::RetryPolicy;
pub use vote_queue::{SyncError, SyncOutcome, VoteSyncQueue};
