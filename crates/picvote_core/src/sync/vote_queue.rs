//! Background queue that forwards vote deltas to the remote gallery.
//!
//! # Responsibility
//! - Accept deltas without blocking the caller.
//! - Retry failed increments with bounded backoff.
//! - Publish one outcome per delta so callers can trigger reconciliation.
//!
//! # Invariants
//! - Every accepted delta settles exactly once (success or final failure).
//! - Deltas for the same entry settle one at a time in enqueue order,
//!   including retries, so a floored remote count matches the local one.
//! - Different entries settle concurrently; a delta in backoff only holds
//!   back later deltas for its own entry.
//! - `shutdown` returns only after every accepted delta has settled.

use crate::model::entry::EntryId;
use crate::model::vote::VoteDelta;
use crate::remote::RemoteGallery;
use crate::sync::retry::RetryPolicy;
use log::{error, info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};

const OUTCOME_CHANNEL_CAPACITY: usize = 256;

/// Queue-level failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The worker has stopped; the delta was not accepted.
    QueueClosed(VoteDelta),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QueueClosed(delta) => write!(
                f,
                "vote sync queue is closed; dropped delta {} for entry {}",
                delta.delta, delta.entry_id
            ),
        }
    }
}

impl Error for SyncError {}

/// Final result of forwarding one delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub delta: VoteDelta,
    /// Attempts made, including the successful one.
    pub attempts: u32,
    /// Last error message when every attempt failed.
    pub error: Option<String>,
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Handle to the running sync worker.
pub struct VoteSyncQueue {
    sender: mpsc::UnboundedSender<VoteDelta>,
    outcomes: broadcast::Sender<SyncOutcome>,
    pending: Arc<AtomicUsize>,
    worker: JoinHandle<()>,
}

impl VoteSyncQueue {
    /// Starts the worker on the current tokio runtime.
    pub fn spawn(remote: Arc<dyn RemoteGallery>, policy: RetryPolicy) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (outcomes, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);
        let pending = Arc::new(AtomicUsize::new(0));

        let worker = tokio::spawn(run_worker(
            receiver,
            remote,
            policy,
            outcomes.clone(),
            pending.clone(),
        ));

        Self {
            sender,
            outcomes,
            pending,
            worker,
        }
    }

    /// Hands one delta to the worker. Never waits on the remote call.
    pub fn enqueue(&self, delta: VoteDelta) -> Result<(), SyncError> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.sender.send(delta).map_err(|err| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            SyncError::QueueClosed(err.0)
        })
    }

    /// Receives outcomes for deltas settled after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncOutcome> {
        self.outcomes.subscribe()
    }

    /// Deltas accepted but not yet settled.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Stops accepting deltas and waits for in-flight ones to settle.
    pub async fn shutdown(self) {
        let Self { sender, worker, .. } = self;
        drop(sender);
        if let Err(err) = worker.await {
            error!(
                "event=vote_sync_shutdown module=sync status=error error={}",
                err
            );
        }
    }
}

/// Everything a lane needs to settle deltas for one entry.
#[derive(Clone)]
struct LaneContext {
    remote: Arc<dyn RemoteGallery>,
    policy: RetryPolicy,
    outcomes: broadcast::Sender<SyncOutcome>,
    pending: Arc<AtomicUsize>,
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<VoteDelta>,
    remote: Arc<dyn RemoteGallery>,
    policy: RetryPolicy,
    outcomes: broadcast::Sender<SyncOutcome>,
    pending: Arc<AtomicUsize>,
) {
    let context = LaneContext {
        remote,
        policy,
        outcomes,
        pending,
    };
    let mut lanes: HashMap<EntryId, mpsc::UnboundedSender<VoteDelta>> = HashMap::new();
    let mut running = JoinSet::new();
    loop {
        tokio::select! {
            next = receiver.recv() => match next {
                Some(delta) => route(delta, &mut lanes, &mut running, &context),
                None => break,
            },
            Some(joined) = running.join_next(), if !running.is_empty() => {
                log_join_failure(joined);
            }
        }
    }

    // Closing every lane lets each one drain its backlog and exit.
    lanes.clear();
    while let Some(joined) = running.join_next().await {
        log_join_failure(joined);
    }
    info!("event=vote_sync_shutdown module=sync status=ok");
}

/// Hands `delta` to its entry's lane, opening the lane on first use.
fn route(
    delta: VoteDelta,
    lanes: &mut HashMap<EntryId, mpsc::UnboundedSender<VoteDelta>>,
    running: &mut JoinSet<()>,
    context: &LaneContext,
) {
    let delta = match lanes.get(&delta.entry_id) {
        Some(lane) => match lane.send(delta) {
            Ok(()) => return,
            // The lane task died; reopen it below with this delta.
            Err(returned) => returned.0,
        },
        None => delta,
    };

    let (sender, receiver) = mpsc::unbounded_channel();
    let entry_id = delta.entry_id.clone();
    if sender.send(delta).is_err() {
        return;
    }
    running.spawn(run_lane(receiver, context.clone()));
    lanes.insert(entry_id, sender);
}

/// Settles one entry's deltas strictly in enqueue order.
async fn run_lane(mut receiver: mpsc::UnboundedReceiver<VoteDelta>, context: LaneContext) {
    while let Some(delta) = receiver.recv().await {
        settle(
            delta,
            context.remote.clone(),
            context.policy,
            context.outcomes.clone(),
            context.pending.clone(),
        )
        .await;
    }
}

fn log_join_failure(joined: Result<(), tokio::task::JoinError>) {
    if let Err(err) = joined {
        error!(
            "event=vote_sync module=sync status=error error_code=task_failed error={}",
            err
        );
    }
}

async fn settle(
    delta: VoteDelta,
    remote: Arc<dyn RemoteGallery>,
    policy: RetryPolicy,
    outcomes: broadcast::Sender<SyncOutcome>,
    pending: Arc<AtomicUsize>,
) {
    let max_attempts = policy.attempts();
    let mut attempt = 0;
    let error = loop {
        attempt += 1;
        match remote.increment_votes(&delta.entry_id, delta.delta).await {
            Ok(()) => break None,
            Err(err) if attempt < max_attempts => {
                let wait = policy.delay_after(attempt);
                warn!(
                    "event=vote_sync module=sync status=retry entry_id={} delta={} attempt={} wait_ms={} error={}",
                    delta.entry_id,
                    delta.delta,
                    attempt,
                    wait.as_millis(),
                    err
                );
                tokio::time::sleep(wait).await;
            }
            Err(err) => {
                error!(
                    "event=vote_sync module=sync status=error entry_id={} delta={} attempts={} error={}",
                    delta.entry_id, delta.delta, attempt, err
                );
                break Some(err.to_string());
            }
        }
    };

    pending.fetch_sub(1, Ordering::SeqCst);
    // No subscriber is fine: outcomes are advisory.
    let _ = outcomes.send(SyncOutcome {
        delta,
        attempts: attempt,
        error,
    });
}
