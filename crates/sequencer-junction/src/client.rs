use crate::error::{JunctionError, Result};
use crate::gas::default_gas_fee;
use crate::types::{PodRecord, RequestCommitment, VrfRecord};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use sequencer_core::Address;
use std::collections::HashMap;
use tracing::info;

/// Blocking settlement-chain capability consumed by the Pod Progression
/// Engine. Every call here is a network round-trip plus block confirmation
/// in the real implementation — handlers must never hold the pod-state
/// lock while awaiting one (spec §5).
#[async_trait]
pub trait JunctionClient: Send + Sync {
    /// Submit `MsgValidateVrf` on behalf of `requester` (Stage 1, step 1).
    async fn validate_vrf(&self, requester: Address) -> Result<()>;

    /// Read back the VRF outcome (Stage 1, step 2).
    async fn query_vrf(&self) -> Result<Option<VrfRecord>>;

    /// Submit the current pod (Stage 2, step 3).
    async fn submit_current_pod(&self, pod_number: u64) -> Result<()>;

    /// Submit `MsgVerifyPod` for the current pod (Stage 3, step 1).
    async fn verify_current_pod(&self, pod_number: u64) -> Result<()>;

    /// Read back a pod's verification status (Stage 3, step 2).
    async fn query_pod(&self, pod_number: u64) -> Result<Option<PodRecord>>;

    /// Stage 0 (out of engine scope, interface only): kick off a fresh VRF
    /// round. Returns whether the submission succeeded and the address of
    /// the node that should validate it.
    async fn init_vrf(&self, upper_bound: u64, initiator: Address) -> Result<(bool, Address)>;
}

/// In-memory junction double for tests and local development. Every call
/// "succeeds" after recording a fabricated transaction hash unless the
/// test has preloaded a failure, so scenarios like "VRF unverified"
/// (spec §8 scenario 4) can be driven deterministically.
pub struct MockJunctionClient {
    tracks: Vec<Address>,
    vrf_result: Mutex<Option<VrfRecord>>,
    pod_results: Mutex<HashMap<u64, PodRecord>>,
    tx_log: Mutex<Vec<String>>,
}

impl MockJunctionClient {
    pub fn new(tracks: Vec<Address>) -> Self {
        Self {
            tracks,
            vrf_result: Mutex::new(None),
            pod_results: Mutex::new(HashMap::new()),
            tx_log: Mutex::new(Vec::new()),
        }
    }

    /// Preload the VRF result that `query_vrf` will return after the next
    /// `validate_vrf` call.
    pub fn set_next_vrf_result(&self, record: VrfRecord) {
        *self.vrf_result.lock() = Some(record);
    }

    pub fn set_pod_result(&self, pod_number: u64, record: PodRecord) {
        self.pod_results.lock().insert(pod_number, record);
    }

    pub fn tx_log(&self) -> Vec<String> {
        self.tx_log.lock().clone()
    }

    fn record_tx(&self, label: &str) {
        let fee = default_gas_fee();
        let hash = format!("mocktx-{label}-{fee}");
        info!(tx_hash = %hash, "broadcast transaction");
        self.tx_log.lock().push(hash);
    }
}

#[async_trait]
impl JunctionClient for MockJunctionClient {
    async fn validate_vrf(&self, requester: Address) -> Result<()> {
        let rc = RequestCommitment::for_validation("mock-station", self.tracks.len() as u64, requester);
        let _ = rc.encode()?;
        self.record_tx("validate-vrf");
        Ok(())
    }

    async fn query_vrf(&self) -> Result<Option<VrfRecord>> {
        Ok(*self.vrf_result.lock())
    }

    async fn submit_current_pod(&self, pod_number: u64) -> Result<()> {
        self.record_tx(&format!("submit-pod-{pod_number}"));
        Ok(())
    }

    async fn verify_current_pod(&self, pod_number: u64) -> Result<()> {
        self.record_tx(&format!("verify-pod-{pod_number}"));
        Ok(())
    }

    async fn query_pod(&self, pod_number: u64) -> Result<Option<PodRecord>> {
        Ok(self.pod_results.lock().get(&pod_number).cloned())
    }

    async fn init_vrf(&self, _upper_bound: u64, _initiator: Address) -> Result<(bool, Address)> {
        self.record_tx("init-vrf");
        let mut rng = rand::thread_rng();
        let verifier = *self
            .tracks
            .choose(&mut rng)
            .expect("track list is non-empty");
        Ok((true, verifier))
    }
}

/// Placeholder for a real settlement-chain adapter (a `cosmrs`-backed
/// client, concretely). Exists so the trait's call sites have somewhere
/// non-mock to compile against; every method is unimplemented since the
/// real RPC integration is out of scope here.
pub struct CosmosJunctionClient {
    pub json_rpc_endpoint: String,
}

impl CosmosJunctionClient {
    pub fn new(json_rpc_endpoint: String) -> Self {
        Self { json_rpc_endpoint }
    }
}

#[async_trait]
impl JunctionClient for CosmosJunctionClient {
    async fn validate_vrf(&self, _requester: Address) -> Result<()> {
        Err(JunctionError::NotImplemented("CosmosJunctionClient::validate_vrf"))
    }

    async fn query_vrf(&self) -> Result<Option<VrfRecord>> {
        Err(JunctionError::NotImplemented("CosmosJunctionClient::query_vrf"))
    }

    async fn submit_current_pod(&self, _pod_number: u64) -> Result<()> {
        Err(JunctionError::NotImplemented("CosmosJunctionClient::submit_current_pod"))
    }

    async fn verify_current_pod(&self, _pod_number: u64) -> Result<()> {
        Err(JunctionError::NotImplemented("CosmosJunctionClient::verify_current_pod"))
    }

    async fn query_pod(&self, _pod_number: u64) -> Result<Option<PodRecord>> {
        Err(JunctionError::NotImplemented("CosmosJunctionClient::query_pod"))
    }

    async fn init_vrf(&self, _upper_bound: u64, _initiator: Address) -> Result<(bool, Address)> {
        Err(JunctionError::NotImplemented("CosmosJunctionClient::init_vrf"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    #[tokio::test]
    async fn query_vrf_returns_preloaded_result() {
        let client = MockJunctionClient::new(vec![addr(1), addr(2)]);
        client.set_next_vrf_result(VrfRecord {
            is_verified: true,
            selected_track_index: 1,
        });
        client.validate_vrf(addr(1)).await.unwrap();
        let record = client.query_vrf().await.unwrap().unwrap();
        assert!(record.is_verified);
        assert_eq!(record.selected_track_index, 1);
    }

    #[tokio::test]
    async fn query_vrf_defaults_to_none() {
        let client = MockJunctionClient::new(vec![addr(1)]);
        assert!(client.query_vrf().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn query_pod_returns_none_for_unknown_pod() {
        let client = MockJunctionClient::new(vec![addr(1)]);
        assert!(client.query_pod(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cosmos_client_stub_reports_not_implemented() {
        let client = CosmosJunctionClient::new("http://localhost:26657".to_string());
        assert!(matches!(
            client.query_vrf().await,
            Err(JunctionError::NotImplemented(_))
        ));
    }
}
