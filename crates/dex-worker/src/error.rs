//! Error types for the job executor worker.

use std::fmt;

#[derive(Debug)]
pub enum WorkerError {
    Database(Box<sqlx::Error>),
    Image(dex_image::ImageError),
    Vision(dex_vision::VisionError),
    Taxonomy(dex_taxonomy::TaxonomyError),
    Blob(std::io::Error),
    Config(String),
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::Database(err) => write!(f, "database error: {}", err),
            WorkerError::Image(err) => write!(f, "image error: {}", err),
            WorkerError::Vision(err) => write!(f, "vision error: {}", err),
            WorkerError::Taxonomy(err) => write!(f, "taxonomy error: {}", err),
            WorkerError::Blob(err) => write!(f, "blob store error: {}", err),
            WorkerError::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl std::error::Error for WorkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkerError::Database(err) => Some(err.as_ref()),
            WorkerError::Image(err) => Some(err),
            WorkerError::Vision(err) => Some(err),
            WorkerError::Taxonomy(err) => Some(err),
            WorkerError::Blob(err) => Some(err),
            WorkerError::Config(_) => None,
        }
    }
}

impl From<sqlx::Error> for WorkerError {
    fn from(err: sqlx::Error) -> Self {
        WorkerError::Database(Box::new(err))
    }
}

impl From<dex_image::ImageError> for WorkerError {
    fn from(err: dex_image::ImageError) -> Self {
        WorkerError::Image(err)
    }
}

impl From<dex_vision::VisionError> for WorkerError {
    fn from(err: dex_vision::VisionError) -> Self {
        WorkerError::Vision(err)
    }
}

impl From<dex_taxonomy::TaxonomyError> for WorkerError {
    fn from(err: dex_taxonomy::TaxonomyError) -> Self {
        WorkerError::Taxonomy(err)
    }
}

impl From<std::io::Error> for WorkerError {
    fn from(err: std::io::Error) -> Self {
        WorkerError::Blob(err)
    }
}

pub type Result<T> = std::result::Result<T, WorkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = WorkerError::Config("missing DATABASE_URL".to_string());
        assert_eq!(format!("{}", err), "configuration error: missing DATABASE_URL");
    }
}
