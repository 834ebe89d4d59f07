use crate::error::Result;
use crate::pod_state::{PodBatch, PodState, PodStateStore};
use parking_lot::Mutex;
use tracing::info;

/// Commits a finalized pod and hands back the next pod's starting batch.
///
/// `save_verified_pod` must complete before the first `generate_unverified_pod`
/// call for the new height (spec §5 ordering guarantee). The engine enforces
/// the ordering by calling them back to back under no lock; implementations
/// of this trait do not need to coordinate with each other beyond that.
pub trait PodLifecycle: Send + Sync {
    /// Persist the just-finalized pod and advance the store's height.
    /// Returns the new height.
    fn save_verified_pod(&self, store: &PodStateStore) -> Result<u64>;

    /// Produce the next pod's starting batch and install it on the store,
    /// resetting per-pod election bookkeeping (votes, app hash, proof).
    fn generate_unverified_pod(&self, store: &PodStateStore) -> Result<PodBatch>;
}

/// Reference implementation: keeps finalized pod history in memory and
/// fabricates the next batch from the previous height.
///
/// Real pod generation and proof computation are out of scope (spec §1) —
/// this stands in for the pipeline that would otherwise hand the engine a
/// freshly assembled batch of pending transactions.
#[derive(Default)]
pub struct InMemoryPodLifecycle {
    history: Mutex<Vec<PodState>>,
}

impl InMemoryPodLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalized pods in height order, oldest first.
    pub fn history(&self) -> Vec<PodState> {
        self.history.lock().clone()
    }
}

impl PodLifecycle for InMemoryPodLifecycle {
    fn save_verified_pod(&self, store: &PodStateStore) -> Result<u64> {
        let finalized = store.snapshot();
        self.history.lock().push(finalized.clone());
        let new_height = store.advance_height();
        info!(
            height = finalized.latest_pod_height,
            new_height, "saved verified pod"
        );
        Ok(new_height)
    }

    fn generate_unverified_pod(&self, store: &PodStateStore) -> Result<PodBatch> {
        let height = store.latest_pod_height();
        let batch = PodBatch {
            transaction_hashes: vec![format!("pod-{height}-tx-0")],
        };
        store.set_batch(batch.clone());
        info!(height, "generated next unverified pod");
        Ok(batch)
    }
}
