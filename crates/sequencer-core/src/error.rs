use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("track registry has no tracks configured")]
    EmptyTrackRegistry,
}

pub type Result<T> = std::result::Result<T, CoreError>;
