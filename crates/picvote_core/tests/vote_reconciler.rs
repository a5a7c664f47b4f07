use async_trait::async_trait;
use picvote_core::db::open_shared_in_memory;
use picvote_core::model::entry::Entry;
use picvote_core::model::identity::Identity;
use picvote_core::model::state::GalleryState;
use picvote_core::model::vote::{VoteMembership, VoteStatus};
use picvote_core::remote::{LocalGalleryService, RemoteGallery, RemoteResult, SimulatedLatency};
use picvote_core::repo::kv_repo::{KeyValueStore, SqliteKeyValueStore, VOTE_MEMBERSHIP_KEY};
use picvote_core::service::vote_service::{VoteError, VoteReconciler};
use picvote_core::sync::{RetryPolicy, VoteSyncQueue};
use picvote_core::SharedConnection;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn identity() -> Identity {
    Identity {
        id: "u-voter".to_string(),
        name: "Voter".to_string(),
        handle: "voter".to_string(),
        avatar: String::new(),
    }
}

struct Harness {
    conn: SharedConnection,
    remote: Arc<LocalGalleryService>,
}

impl Harness {
    fn new() -> Self {
        let conn = open_shared_in_memory().unwrap();
        let remote = Arc::new(LocalGalleryService::new(
            conn.clone(),
            SimulatedLatency::none(),
        ));
        Self { conn, remote }
    }

    fn reconciler(&self) -> VoteReconciler<SqliteKeyValueStore> {
        let remote: Arc<dyn RemoteGallery> = self.remote.clone();
        VoteReconciler::new(
            SqliteKeyValueStore::new(self.conn.clone()),
            VoteSyncQueue::spawn(remote, RetryPolicy::no_retry()),
        )
    }

    async fn signed_in_state(
        &self,
        reconciler: &VoteReconciler<SqliteKeyValueStore>,
    ) -> GalleryState {
        GalleryState::new(
            self.remote.list_entries().await.unwrap(),
            reconciler.load_membership().unwrap(),
            Some(identity()),
        )
    }

    async fn remote_votes(&self, entry_id: &str) -> u64 {
        self.remote
            .list_entries()
            .await
            .unwrap()
            .into_iter()
            .find(|entry| entry.id == entry_id)
            .unwrap()
            .votes
    }
}

#[tokio::test]
async fn toggle_updates_local_state_and_remote_after_settle() {
    let harness = Harness::new();
    let reconciler = harness.reconciler();
    let state = harness.signed_in_state(&reconciler).await;

    let next = reconciler.toggle_vote(&state, "4").unwrap();
    assert_eq!(next.entry("4").unwrap().votes, 433);
    assert_eq!(next.membership.state_of("4"), VoteStatus::Voted);
    assert_eq!(state.entry("4").unwrap().votes, 432);

    reconciler.shutdown().await;
    assert_eq!(harness.remote_votes("4").await, 433);
}

#[tokio::test]
async fn membership_is_durable_before_sync_settles() {
    let harness = Harness::new();
    let reconciler = harness.reconciler();
    let state = harness.signed_in_state(&reconciler).await;

    reconciler.toggle_vote(&state, "2").unwrap();

    let reloaded = harness.reconciler().load_membership().unwrap();
    assert!(reloaded.contains("2"));
    reconciler.shutdown().await;
}

#[tokio::test]
async fn cast_then_retract_nets_to_zero_remotely() {
    let harness = Harness::new();
    let reconciler = harness.reconciler();
    let state = harness.signed_in_state(&reconciler).await;

    let voted = reconciler.toggle_vote(&state, "1").unwrap();
    let retracted = reconciler.toggle_vote(&voted, "1").unwrap();
    assert_eq!(retracted.entry("1").unwrap().votes, 1242);
    assert!(retracted.membership.is_empty());

    reconciler.shutdown().await;
    assert_eq!(harness.remote_votes("1").await, 1242);
    assert!(harness.reconciler().load_membership().unwrap().is_empty());
}

#[tokio::test]
async fn unauthenticated_toggle_changes_nothing() {
    let harness = Harness::new();
    let reconciler = harness.reconciler();
    let state = harness
        .signed_in_state(&reconciler)
        .await
        .with_identity(None);

    let err = reconciler.toggle_vote(&state, "3").unwrap_err();
    assert!(matches!(err, VoteError::AuthenticationRequired));
    assert_eq!(reconciler.queue().pending(), 0);

    reconciler.shutdown().await;
    assert_eq!(harness.remote_votes("3").await, 2105);
    assert!(harness.reconciler().load_membership().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_entry_is_rejected() {
    let harness = Harness::new();
    let reconciler = harness.reconciler();
    let state = harness.signed_in_state(&reconciler).await;

    let err = reconciler.toggle_vote(&state, "missing").unwrap_err();
    assert!(matches!(err, VoteError::EntryNotFound(id) if id == "missing"));
    reconciler.shutdown().await;
}

#[tokio::test]
async fn refresh_adopts_remote_counts_and_keeps_membership() {
    let harness = Harness::new();
    let reconciler = harness.reconciler();
    let state = harness.signed_in_state(&reconciler).await;
    let mut outcomes = reconciler.queue().subscribe();
    let voted = reconciler.toggle_vote(&state, "4").unwrap();
    assert!(outcomes.recv().await.unwrap().is_success());

    // Another client votes on the same entry meanwhile.
    harness.remote.increment_votes("4", 5).await.unwrap();

    let refreshed = reconciler
        .refresh(&voted, harness.remote.as_ref())
        .await
        .unwrap();
    assert!(refreshed.membership.contains("4"));
    assert_eq!(refreshed.entry("4").unwrap().votes, 438);

    reconciler.shutdown().await;
    assert_eq!(harness.remote_votes("4").await, 438);
}

/// Delays the first vote increment so later deltas could overtake it.
struct SlowFirstIncrement {
    inner: Arc<LocalGalleryService>,
    calls: AtomicU32,
}

#[async_trait]
impl RemoteGallery for SlowFirstIncrement {
    async fn list_entries(&self) -> RemoteResult<Vec<Entry>> {
        self.inner.list_entries().await
    }

    async fn insert_entry(&self, entry: &Entry) -> RemoteResult<()> {
        self.inner.insert_entry(entry).await
    }

    async fn increment_votes(&self, entry_id: &str, delta: i64) -> RemoteResult<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.inner.increment_votes(entry_id, delta).await
    }

    async fn get_session(&self) -> RemoteResult<Option<Identity>> {
        self.inner.get_session().await
    }
}

#[tokio::test]
async fn retract_then_revote_at_zero_keeps_remote_in_step() {
    let harness = Harness::new();
    harness
        .conn
        .lock()
        .unwrap()
        .execute("UPDATE gallery_entries SET votes = 0 WHERE id = '4';", [])
        .unwrap();
    let store = SqliteKeyValueStore::new(harness.conn.clone());
    let membership: VoteMembership = ["4"].into_iter().collect();
    store.set_json(VOTE_MEMBERSHIP_KEY, &membership).unwrap();

    let remote: Arc<dyn RemoteGallery> = Arc::new(SlowFirstIncrement {
        inner: harness.remote.clone(),
        calls: AtomicU32::new(0),
    });
    let reconciler = VoteReconciler::new(
        store,
        VoteSyncQueue::spawn(remote, RetryPolicy::no_retry()),
    );
    let state = harness.signed_in_state(&reconciler).await;
    assert_eq!(state.entry("4").unwrap().votes, 0);

    let retracted = reconciler.toggle_vote(&state, "4").unwrap();
    let revoted = reconciler.toggle_vote(&retracted, "4").unwrap();
    let local = revoted.entry("4").unwrap().votes;
    assert_eq!(local, 1);

    reconciler.shutdown().await;
    assert_eq!(harness.remote_votes("4").await, local);
}

#[tokio::test]
async fn outcomes_report_failed_deltas() {
    let harness = Harness::new();
    let reconciler = harness.reconciler();
    let mut state = harness.signed_in_state(&reconciler).await;
    let mut outcomes = reconciler.queue().subscribe();

    // Entry known locally but deleted from the gallery: the increment fails.
    harness
        .conn
        .lock()
        .unwrap()
        .execute("DELETE FROM gallery_entries WHERE id = '2';", [])
        .unwrap();
    state = reconciler.toggle_vote(&state, "2").unwrap();
    assert!(state.membership.contains("2"));

    reconciler.shutdown().await;
    let outcome = outcomes.recv().await.unwrap();
    assert_eq!(outcome.delta.entry_id, "2");
    assert!(!outcome.is_success());
    assert_eq!(outcome.attempts, 1);
}
