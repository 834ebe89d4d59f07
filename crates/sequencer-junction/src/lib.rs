// Junction (settlement-chain) client interface consumed by the engine.
// Signing, broadcasting, and querying the real chain are out of scope —
// `MockJunctionClient` stands in for them in tests and local development.

pub mod client;
pub mod error;
pub mod gas;
pub mod types;

pub use client::{CosmosJunctionClient, JunctionClient, MockJunctionClient};
pub use error::{JunctionError, Result};
pub use gas::{default_gas_fee, sample_gas_fee};
pub use types::{PodRecord, RequestCommitment, VrfRecord};
