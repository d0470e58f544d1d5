use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("invalid transform: {0}")]
    InvalidTransform(String),

    #[error("image too large: {0} bytes (max 20 MiB)")]
    TooLarge(usize),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ImageError>;
