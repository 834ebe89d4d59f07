use crate::envelope::Envelope;
use crate::error::{NetworkError, Result};
use async_trait::async_trait;
use sequencer_core::Address;
use tokio::sync::broadcast;
use tracing::warn;

/// A delivered gossip message: who sent it (for logging only — the engine
/// never trusts the sender for the election check) and the decoded payload.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub sender: Address,
    pub envelope: Envelope,
}

/// Fire-and-forget, best-effort, eventually-consistent broadcast to every
/// current peer. No ordering guarantee between envelopes and no self-delivery
/// guarantee — the engine's height-alignment prologue and explicit
/// self-dispatch compensate for both (spec §4.3).
#[async_trait]
pub trait GossipBus: Send + Sync {
    async fn broadcast(&self, envelope: Envelope) -> Result<()>;

    /// Subscribe to inbound deliveries from peers. Each call returns an
    /// independent receiver; every subscriber sees every broadcast.
    fn subscribe(&self) -> broadcast::Receiver<Delivery>;
}

/// In-process stand-in for the real gossipsub fan-out (transport is out of
/// scope per spec §1). Broadcasts loop back to every local subscriber,
/// including the sender's own — mirroring an honest multi-peer mesh where
/// every other node, but never the sender, is expected to react; the engine
/// tags deliveries with `sender` so a subscriber can recognize and ignore
/// its own broadcasts if it wishes, though the Stage handlers here rely on
/// explicit self-dispatch instead (spec §4.1 step 5) and never on the bus
/// echoing.
pub struct ChannelGossipBus {
    local_address: Address,
    tx: broadcast::Sender<Delivery>,
}

impl ChannelGossipBus {
    pub fn new(local_address: Address, capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { local_address, tx }
    }

    /// Attach this bus to a shared channel so multiple `ChannelGossipBus`
    /// instances (one per simulated node) form a single mesh — used by
    /// integration tests running a multi-node fleet in one process.
    pub fn with_shared_channel(local_address: Address, tx: broadcast::Sender<Delivery>) -> Self {
        Self { local_address, tx }
    }

    pub fn sender_handle(&self) -> broadcast::Sender<Delivery> {
        self.tx.clone()
    }
}

#[async_trait]
impl GossipBus for ChannelGossipBus {
    async fn broadcast(&self, envelope: Envelope) -> Result<()> {
        let delivery = Delivery {
            sender: self.local_address,
            envelope,
        };
        self.tx.send(delivery).map_err(|_| {
            warn!("gossip broadcast had no subscribers");
            NetworkError::NoSubscribers
        })?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Delivery> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_is_received_by_subscriber() {
        let bus = ChannelGossipBus::new(Address::new([9u8; 20]), 16);
        let mut rx = bus.subscribe();

        let env = Envelope::PodVerified {
            pod_number: 1,
            verification_result: true,
        };
        bus.broadcast(env.clone()).await.unwrap();

        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.envelope, env);
        assert_eq!(delivery.sender, Address::new([9u8; 20]));
    }

    #[tokio::test]
    async fn shared_channel_fans_out_to_every_simulated_node() {
        let (tx, _rx) = broadcast::channel(16);
        let a = ChannelGossipBus::with_shared_channel(Address::new([1u8; 20]), tx.clone());
        let b = ChannelGossipBus::with_shared_channel(Address::new([2u8; 20]), tx);

        let mut rx_b = b.subscribe();
        a.broadcast(Envelope::PodVerified {
            pod_number: 3,
            verification_result: true,
        })
        .await
        .unwrap();

        let delivery = rx_b.recv().await.unwrap();
        assert_eq!(delivery.sender, Address::new([1u8; 20]));
    }
}
