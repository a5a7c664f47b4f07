//! Startup snapshot: entries and session fetched together.
//!
//! # Invariants
//! - Both fetches run concurrently; `load` resolves only after both settle.
//! - Each half is independent: one failing does not discard the other.

use crate::model::entry::Entry;
use crate::model::identity::Identity;
use crate::model::state::GalleryState;
use crate::model::vote::VoteMembership;
use crate::remote::{RemoteError, RemoteGallery};
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;

/// Settled result of the startup fetches.
#[derive(Debug)]
pub struct GallerySnapshot {
    /// Empty when the entries fetch failed.
    pub entries: Vec<Entry>,
    pub identity: Option<Identity>,
    pub entries_error: Option<RemoteError>,
    pub identity_error: Option<RemoteError>,
}

impl GallerySnapshot {
    pub fn is_complete(&self) -> bool {
        self.entries_error.is_none() && self.identity_error.is_none()
    }

    /// Combines the snapshot with persisted membership into the initial state.
    pub fn into_state(self, membership: VoteMembership) -> GalleryState {
        GalleryState::new(self.entries, membership, self.identity)
    }
}

pub struct SnapshotLoader {
    remote: Arc<dyn RemoteGallery>,
}

impl SnapshotLoader {
    pub fn new(remote: Arc<dyn RemoteGallery>) -> Self {
        Self { remote }
    }

    /// Fetches entries and session concurrently; ready once both settle.
    pub async fn load(&self) -> GallerySnapshot {
        let started_at = Instant::now();
        let (entries, identity) =
            tokio::join!(self.remote.list_entries(), self.remote.get_session());

        let (entries, entries_error) = match entries {
            Ok(entries) => (entries, None),
            Err(err) => {
                warn!(
                    "event=snapshot_load module=snapshot status=error part=entries error={}",
                    err
                );
                (Vec::new(), Some(err))
            }
        };
        let (identity, identity_error) = match identity {
            Ok(identity) => (identity, None),
            Err(err) => {
                warn!(
                    "event=snapshot_load module=snapshot status=error part=session error={}",
                    err
                );
                (None, Some(err))
            }
        };

        info!(
            "event=snapshot_load module=snapshot status=ready duration_ms={} entry_count={} signed_in={}",
            started_at.elapsed().as_millis(),
            entries.len(),
            identity.is_some()
        );

        GallerySnapshot {
            entries,
            identity,
            entries_error,
            identity_error,
        }
    }
}
