use crate::error::{CoreError, Result};
use crate::types::Address;

/// The current epoch's ordered node set plus this node's own identity.
///
/// Stable for the duration of one pod — changes only take effect between
/// pods (spec §3 invariant); this type carries no interior mutability on
/// purpose, so a change requires constructing a new `TrackRegistry`.
#[derive(Debug, Clone)]
pub struct TrackRegistry {
    tracks: Vec<Address>,
    my_address: Address,
    station_id: String,
}

impl TrackRegistry {
    pub fn new(tracks: Vec<Address>, my_address: Address, station_id: String) -> Result<Self> {
        if tracks.is_empty() {
            return Err(CoreError::EmptyTrackRegistry);
        }
        Ok(Self {
            tracks,
            my_address,
            station_id,
        })
    }

    pub fn tracks(&self) -> &[Address] {
        &self.tracks
    }

    pub fn my_address(&self) -> Address {
        self.my_address
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Resolve a VRF-selected index into the corresponding track address.
    pub fn track_at(&self, index: usize) -> Option<Address> {
        self.tracks.get(index).copied()
    }

    pub fn is_me(&self, addr: Address) -> bool {
        addr == self.my_address
    }

    /// All tracks except this node's own address — the pool Stage 2 draws
    /// the next verifier from.
    pub fn tracks_excluding_me(&self) -> Vec<Address> {
        self.tracks
            .iter()
            .copied()
            .filter(|a| *a != self.my_address)
            .collect()
    }
}
