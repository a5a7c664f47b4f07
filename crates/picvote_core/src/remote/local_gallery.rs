//! Local stand-in for the cloud gallery service.
//!
//! # Responsibility
//! - Serve the `RemoteGallery` contract from the local SQLite database.
//! - Keep blocking SQLite work off the async runtime via `spawn_blocking`.
//! - Optionally delay calls to mimic network latency.
//!
//! # Invariants
//! - Vote increments are floored at zero in storage.
//! - Session lookups read the same key the session service writes.

use crate::db::{lock, SharedConnection};
use crate::model::entry::Entry;
use crate::model::identity::Identity;
use crate::remote::{RemoteError, RemoteGallery, RemoteResult};
use crate::repo::gallery_repo::{GalleryRepository, SqliteGalleryRepository};
use crate::repo::kv_repo::{KeyValueStore, SqliteKeyValueStore, CURRENT_IDENTITY_KEY};
use crate::repo::RepoResult;
use async_trait::async_trait;
use log::{debug, warn};
use std::time::Duration;

/// Artificial delays applied before each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimulatedLatency {
    /// Applied to list and insert calls. Session lookups are never delayed.
    pub read_write: Duration,
    /// Applied to vote increments.
    pub vote: Duration,
}

impl SimulatedLatency {
    pub fn none() -> Self {
        Self::default()
    }

    /// Timings the hosted demo used to feel like a real network.
    pub fn demo() -> Self {
        Self {
            read_write: Duration::from_millis(800),
            vote: Duration::from_millis(300),
        }
    }
}

/// `RemoteGallery` backed by the local database.
#[derive(Clone)]
pub struct LocalGalleryService {
    conn: SharedConnection,
    store: SqliteKeyValueStore,
    latency: SimulatedLatency,
}

impl LocalGalleryService {
    pub fn new(conn: SharedConnection, latency: SimulatedLatency) -> Self {
        Self {
            store: SqliteKeyValueStore::new(conn.clone()),
            conn,
            latency,
        }
    }

    async fn with_repo<T, F>(&self, operation: &'static str, work: F) -> RemoteResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteGalleryRepository<'_>) -> RepoResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        let result = tokio::task::spawn_blocking(move || -> RepoResult<T> {
            let guard = lock(&conn)?;
            let repo = SqliteGalleryRepository::new(&guard);
            work(&repo)
        })
        .await
        .map_err(|err| {
            RemoteError::Unavailable(format!("{operation} worker failed: {err}"))
        })?;

        result.map_err(|err| {
            warn!(
                "event=remote_call module=remote status=error operation={} error={}",
                operation, err
            );
            RemoteError::from(err)
        })
    }
}

async fn simulate(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl RemoteGallery for LocalGalleryService {
    async fn list_entries(&self) -> RemoteResult<Vec<Entry>> {
        simulate(self.latency.read_write).await;
        let entries = self
            .with_repo("list_entries", |repo| repo.list_entries())
            .await?;
        debug!(
            "event=remote_call module=remote status=ok operation=list_entries count={}",
            entries.len()
        );
        Ok(entries)
    }

    async fn insert_entry(&self, entry: &Entry) -> RemoteResult<()> {
        simulate(self.latency.read_write).await;
        let entry = entry.clone();
        self.with_repo("insert_entry", move |repo| repo.insert_entry(&entry))
            .await
    }

    async fn increment_votes(&self, entry_id: &str, delta: i64) -> RemoteResult<()> {
        simulate(self.latency.vote).await;
        let id = entry_id.to_string();
        let votes = self
            .with_repo("increment_votes", move |repo| repo.increment_votes(&id, delta))
            .await?;
        debug!(
            "event=remote_call module=remote status=ok operation=increment_votes entry_id={} delta={} votes={}",
            entry_id, delta, votes
        );
        Ok(())
    }

    async fn get_session(&self) -> RemoteResult<Option<Identity>> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.get_json::<Identity>(CURRENT_IDENTITY_KEY))
            .await
            .map_err(|err| RemoteError::Unavailable(format!("get_session worker failed: {err}")))?
            .map_err(RemoteError::from)
    }
}

