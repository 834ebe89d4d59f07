use crate::error::{JunctionError, Result};
use serde::{Deserialize, Serialize};
use sequencer_core::Address;

/// Result of the on-chain VRF computation this node requested validation for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VrfRecord {
    pub is_verified: bool,
    pub selected_track_index: usize,
}

/// Result of a pod submission as recorded on the junction.
#[derive(Debug, Clone, PartialEq)]
pub struct PodRecord {
    pub is_verified: bool,
    pub pod_number: u64,
    pub app_hash: Vec<u8>,
}

/// Deterministic commitment the chain re-verifies against what the
/// requesting node submitted. Field order is fixed and `bincode`-encoded —
/// equal inputs must always produce equal bytes (spec §6, §8 round-trip law).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestCommitment {
    pub block_num: u64,
    pub station_id: String,
    pub upper_bound: u64,
    pub requester_address: Address,
}

impl RequestCommitment {
    /// Stage 1 always requests against block 1 of the current VRF round.
    pub fn for_validation(station_id: &str, upper_bound: u64, requester: Address) -> Self {
        Self {
            block_num: 1,
            station_id: station_id.to_string(),
            upper_bound,
            requester_address: requester,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| JunctionError::SerializeRequestCommitment(e.to_string()))
    }
}
