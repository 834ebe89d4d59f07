// Data-availability sink interface consumed by Stage 2 of the engine.
// The real DA backend (chunking, erasure coding, remote upload) is out of
// scope — `MemoryDaSink` stands in for it in tests and local development.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DaError {
    #[error("DA submission failed: {0}")]
    SubmitFailed(String),
}

pub type Result<T> = std::result::Result<T, DaError>;

/// Opaque handle to a submitted DA blob, returned to the caller for
/// logging/audit purposes; the engine itself does not inspect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaHandle(pub String);

#[async_trait]
pub trait DaSink: Send + Sync {
    async fn submit_da(&self, bytes: Vec<u8>, pod_number: u64) -> Result<DaHandle>;
}

/// In-memory DA double keyed by pod number.
#[derive(Default)]
pub struct MemoryDaSink {
    blobs: Mutex<HashMap<u64, Vec<u8>>>,
}

impl MemoryDaSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pod_number: u64) -> Option<Vec<u8>> {
        self.blobs.lock().get(&pod_number).cloned()
    }
}

#[async_trait]
impl DaSink for MemoryDaSink {
    async fn submit_da(&self, bytes: Vec<u8>, pod_number: u64) -> Result<DaHandle> {
        let handle = DaHandle(format!("mockda-{pod_number}"));
        info!(pod_number, bytes = bytes.len(), handle = %handle.0, "submitted DA blob");
        self.blobs.lock().insert(pod_number, bytes);
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submitted_blob_is_retrievable_by_pod_number() {
        let sink = MemoryDaSink::new();
        let handle = sink.submit_da(b"abcd".to_vec(), 7).await.unwrap();
        assert_eq!(handle.0, "mockda-7");
        assert_eq!(sink.get(7), Some(b"abcd".to_vec()));
        assert_eq!(sink.get(8), None);
    }
}
