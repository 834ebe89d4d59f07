use thiserror::Error;

#[derive(Error, Debug)]
pub enum JunctionError {
    #[error("transaction broadcast failed: {0}")]
    TransactionFailed(String),

    #[error("failed to serialize request commitment: {0}")]
    SerializeRequestCommitment(String),

    #[error("query returned no record")]
    QueryEmpty,

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}

pub type Result<T> = std::result::Result<T, JunctionError>;
