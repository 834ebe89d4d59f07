use crate::config::Config;
use sequencer_core::{InMemoryPodLifecycle, PodLifecycle, PodState, PodStateStore, TrackRegistry};
use sequencer_consensus::PodProgressionEngine;
use sequencer_da::{DaSink, MemoryDaSink};
use sequencer_junction::{JunctionClient, MockJunctionClient};
use sequencer_network::{ChannelGossipBus, GossipBus};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Binds every component the Pod Progression Engine depends on and exposes
/// the single entry point `main` drives: `run`.
///
/// The settlement-chain adapter and data-availability sink are in-memory
/// stand-ins (`MockJunctionClient`, `MemoryDaSink`) — wiring in a real RPC
/// client and DA backend is out of scope here (spec §1's Non-goals), but
/// both are behind trait objects so a production build only needs to swap
/// the two constructions below.
pub struct Engine {
    progression: Arc<PodProgressionEngine>,
}

impl Engine {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;

        let (tracks, my_address) = config.tracks.resolve()?;
        info!(
            station_id = %config.node.station_id,
            my_address = %my_address,
            track_count = tracks.len(),
            "assembling pod progression engine"
        );

        let registry = TrackRegistry::new(tracks.clone(), my_address, config.node.station_id.clone())?;
        let pod_state = Arc::new(PodStateStore::new(PodState::genesis(0)));
        let junction: Arc<dyn JunctionClient> = Arc::new(MockJunctionClient::new(tracks));
        let da: Arc<dyn DaSink> = Arc::new(MemoryDaSink::new());
        let gossip: Arc<dyn GossipBus> = Arc::new(ChannelGossipBus::new(my_address, 1024));
        let lifecycle: Arc<dyn PodLifecycle> = Arc::new(InMemoryPodLifecycle::new());

        let progression = Arc::new(
            PodProgressionEngine::new(registry, pod_state, junction, da, gossip, lifecycle)
                .with_poll_interval(Duration::from_secs(config.consensus.poll_interval_secs)),
        );

        Ok(Self { progression })
    }

    pub fn registry(&self) -> &TrackRegistry {
        self.progression.registry()
    }

    /// Drive the engine until its gossip bus closes. Never returns in
    /// normal operation; shutdown is triggered by dropping every gossip
    /// sender, which the caller controls.
    pub async fn run(self) -> anyhow::Result<()> {
        info!("pod progression engine running");
        self.progression.run().await;
        Ok(())
    }
}
