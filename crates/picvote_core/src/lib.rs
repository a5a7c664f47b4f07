//! Core logic for the PicVote photo contest.
//! Owns the gallery state, vote reconciliation and local persistence.

pub mod config;
pub mod db;
pub mod gallery;
pub mod logging;
pub mod model;
pub mod remote;
pub mod repo;
pub mod service;
pub mod sync;

pub use config::{AppConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, open_shared, open_shared_in_memory, SharedConnection};
pub use gallery::{GalleryQuery, ProfileSummary, SortOption};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::entry::{Category, CategoryFilter, Entry, EntryDraft, EntryId};
pub use model::identity::{Credentials, Identity};
pub use model::state::{GalleryState, TransitionError, VoteTransition};
pub use model::vote::{VoteDelta, VoteDirection, VoteMembership, VoteStatus};
pub use remote::{
    AnalysisSuggestion, AuthError, IdentityProvider, ImageAnalyzer, LocalGalleryService,
    LocalIdentityProvider, RemoteError, RemoteGallery,
};
pub use repo::kv_repo::{KeyValueStore, SqliteKeyValueStore};
pub use repo::{RepoError, RepoResult};
pub use service::session_service::{SessionError, SessionService};
pub use service::snapshot::{GallerySnapshot, SnapshotLoader};
pub use service::submission_service::{SubmissionError, SubmissionService};
pub use service::vote_service::{VoteError, VoteReconciler};
pub use sync::{RetryPolicy, SyncOutcome, VoteSyncQueue};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
