// Gossip bus interface consumed by the Pod Progression Engine.
// Real transport (peer discovery, gossipsub fan-out) is out of scope —
// `ChannelGossipBus` stands in for it in-process.

pub mod envelope;
pub mod error;
pub mod gossip;

pub use envelope::Envelope;
pub use error::{NetworkError, Result};
pub use gossip::{ChannelGossipBus, Delivery, GossipBus};
