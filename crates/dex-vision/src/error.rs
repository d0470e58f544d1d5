use thiserror::Error;

/// §4.3: network/transport/timeout errors are `Transient` (retryable);
/// content-filter/quota/model-not-found are `Fatal` (non-retryable).
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("transient vision error: {0}")]
    Transient(String),

    #[error("fatal vision error: {0}")]
    Fatal(String),
}

impl VisionError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, VisionError::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, VisionError>;
