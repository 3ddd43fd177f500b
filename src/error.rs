#[derive(thiserror::Error, Debug)]
pub enum TrainerError {
    #[error("invalid note: {0}")]
    InvalidNote(String),
    #[error("ledger serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, TrainerError>;
