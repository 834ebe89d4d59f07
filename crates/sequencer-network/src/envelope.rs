use crate::error::{NetworkError, Result};
use sequencer_core::Address;
use serde::{Deserialize, Serialize};

/// Gossip payload. Wire form is `{ "type": <tag>, "data": <payload> }`,
/// matching the `GossipData{Type, Data}` envelope the junction's gossip
/// handler emits and consumes — `serde`'s internally-tagged representation
/// is the idiomatic Rust equivalent of that discriminator-plus-bytes shape,
/// and makes `Encode ∘ Decode = identity` exactly the tag's own round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Envelope {
    #[serde(rename = "vrfInitiated")]
    VrfInitiated {
        pod_number: u64,
        selected_track_address: Address,
        vrf_initiator_address: Address,
    },
    #[serde(rename = "vrnValidated")]
    VrnValidated {
        pod_number: u64,
        selected_track_address: Address,
    },
    #[serde(rename = "podSubmitted")]
    PodSubmitted {
        pod_number: u64,
        selected_track_address: Address,
    },
    #[serde(rename = "podVerified")]
    PodVerified {
        pod_number: u64,
        verification_result: bool,
    },
}

impl Envelope {
    pub fn pod_number(&self) -> u64 {
        match self {
            Envelope::VrfInitiated { pod_number, .. } => *pod_number,
            Envelope::VrnValidated { pod_number, .. } => *pod_number,
            Envelope::PodSubmitted { pod_number, .. } => *pod_number,
            Envelope::PodVerified { pod_number, .. } => *pod_number,
        }
    }

    /// The address this stage elected, if any — `PodVerified` has none,
    /// since every node (not just one elected address) reacts to it.
    pub fn selected_track_address(&self) -> Option<Address> {
        match self {
            Envelope::VrfInitiated {
                selected_track_address,
                ..
            } => Some(*selected_track_address),
            Envelope::VrnValidated {
                selected_track_address,
                ..
            } => Some(*selected_track_address),
            Envelope::PodSubmitted {
                selected_track_address,
                ..
            } => Some(*selected_track_address),
            Envelope::PodVerified { .. } => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Envelope::VrfInitiated { .. } => "vrfInitiated",
            Envelope::VrnValidated { .. } => "vrnValidated",
            Envelope::PodSubmitted { .. } => "podSubmitted",
            Envelope::PodVerified { .. } => "podVerified",
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| NetworkError::Encode(e.to_string()))
    }

    /// Decode a wire envelope. An unrecognized `type` tag or malformed
    /// `data` surfaces as `NetworkError::Decode` — callers log and drop,
    /// per spec §4.1 step 1 and §6 ("unknown `type` values are ignored").
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| NetworkError::Decode(e.to_string()))
    }
}
