use crate::types::Address;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The batch of transactions a pod carries to the junction and the DA sink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodBatch {
    pub transaction_hashes: Vec<String>,
}

impl PodBatch {
    /// Concatenated bytes of every transaction hash, in order — the exact
    /// payload Stage 2 hands to the DA sink.
    pub fn da_payload(&self) -> Vec<u8> {
        self.transaction_hashes
            .iter()
            .flat_map(|h| h.as_bytes().to_vec())
            .collect()
    }
}

/// A single peer's pre-election vote. The voting path itself is dormant
/// (see spec §9 / Open Questions) — this field is populated but never
/// consulted by the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vote {
    pub peer: Address,
    pub vote: bool,
}

/// Process-wide mutable record of the current pod.
#[derive(Debug, Clone, Default)]
pub struct PodState {
    pub latest_pod_height: u64,
    pub batch: PodBatch,
    pub tracks_app_hash: Vec<u8>,
    pub master_track_app_hash: Vec<u8>,
    pub latest_pod_proof: Vec<u8>,
    pub votes: HashMap<Address, Vote>,
}

impl PodState {
    pub fn genesis(starting_height: u64) -> Self {
        Self {
            latest_pod_height: starting_height,
            ..Default::default()
        }
    }
}

/// Exclusive-access handle to the current `PodState`.
///
/// Every read and write goes through this type; no handler holds the guard
/// across a settlement-chain call or a gossip broadcast — read, release,
/// call, reacquire to mutate.
#[derive(Debug, Default)]
pub struct PodStateStore {
    inner: RwLock<PodState>,
}

impl PodStateStore {
    pub fn new(state: PodState) -> Self {
        Self {
            inner: RwLock::new(state),
        }
    }

    pub fn latest_pod_height(&self) -> u64 {
        self.inner.read().latest_pod_height
    }

    /// Snapshot the whole state for a read-mostly operation (DA payload
    /// assembly, app-hash inspection). Cheap clone, no lock held after return.
    pub fn snapshot(&self) -> PodState {
        self.inner.read().clone()
    }

    /// Replace the batch and reset per-pod election bookkeeping for the
    /// next height. Does not touch `latest_pod_height`.
    pub fn set_batch(&self, batch: PodBatch) {
        let mut guard = self.inner.write();
        guard.batch = batch;
        guard.votes.clear();
        guard.tracks_app_hash.clear();
        guard.latest_pod_proof.clear();
    }

    pub fn set_master_track_app_hash(&self, hash: Vec<u8>) {
        self.inner.write().master_track_app_hash = hash;
    }

    /// Advance the height by exactly one. Returns the new height.
    ///
    /// Must be called only from `PodLifecycle::save_verified_pod` so that
    /// invariant 1 (monotonic non-decreasing height) and invariant 2 (save
    /// precedes generate) hold by construction.
    pub fn advance_height(&self) -> u64 {
        let mut guard = self.inner.write();
        guard.latest_pod_height += 1;
        guard.latest_pod_height
    }
}
