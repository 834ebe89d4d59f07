//! Stage 0 is triggered externally — originally by a vote-completion
//! handler that is itself out of scope for this core (spec §4.1,
//! "Initiation"). `PodProgressionEngine` only ever *consumes*
//! `VrfInitiated`; this function is the external collaborator that
//! produces the first one, kept separate from the engine so the engine's
//! own dispatch surface stays exactly the four stages the spec names.

use rand::seq::SliceRandom;
use sequencer_core::TrackRegistry;
use sequencer_junction::JunctionClient;
use sequencer_network::{Envelope, GossipBus};

/// Pick a random track as VRF verifier, call `init_vrf`, and broadcast
/// `VrfInitiated` for the registry's current pod height. Returns the
/// address chosen to validate the VRF.
pub async fn kick_off_vrf_round(
    registry: &TrackRegistry,
    pod_number: u64,
    junction: &dyn JunctionClient,
    gossip: &dyn GossipBus,
) -> sequencer_junction::Result<sequencer_core::Address> {
    let verifier = *registry
        .tracks()
        .choose(&mut rand::thread_rng())
        .expect("track registry is non-empty by construction");

    let (_ok, initiator) = junction
        .init_vrf(registry.len() as u64, registry.my_address())
        .await?;

    let envelope = Envelope::VrfInitiated {
        pod_number,
        selected_track_address: verifier,
        vrf_initiator_address: initiator,
    };
    let _ = gossip.broadcast(envelope).await;
    Ok(verifier)
}
