use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("VRF selected track index {0} is out of bounds for the track registry")]
    UnknownTrackIndex(usize),

    #[error("no verifier candidates available: track registry has only this node as a member")]
    NoVerifierCandidates,
}

pub type Result<T> = std::result::Result<T, ConsensusError>;
