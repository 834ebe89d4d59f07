// Sequencer core: shared types, pod state, and lifecycle hook.

pub mod error;
pub mod lifecycle;
pub mod pod_state;
pub mod registry;
pub mod types;

pub use error::{CoreError, Result};
pub use lifecycle::{InMemoryPodLifecycle, PodLifecycle};
pub use pod_state::{PodBatch, PodState, PodStateStore, Vote};
pub use registry::TrackRegistry;
pub use types::Address;
