use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("failed to encode envelope: {0}")]
    Encode(String),

    #[error("failed to decode envelope: {0}")]
    Decode(String),

    #[error("gossip bus has no subscribers")]
    NoSubscribers,

    #[error("gossip bus channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, NetworkError>;
