//! Error type for the Reference Importer binary, following
//! `observing-ingester/src/error.rs`'s hand-rolled `Display`+`Error`+`From`
//! shape rather than `thiserror` (this crate is a binary, not a library).

use std::fmt;

#[derive(Debug)]
pub enum ImporterError {
    NoReleaseAvailable,
    Http(reqwest::Error),
    Zip(zip::result::ZipError),
    Csv(csv::Error),
    Io(std::io::Error),
    Database(sqlx::Error),
    Config(String),
    InvalidArchive(String),
}

impl fmt::Display for ImporterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImporterError::NoReleaseAvailable => {
                write!(f, "no base release with an available export was found")
            }
            ImporterError::Http(err) => write!(f, "HTTP error: {err}"),
            ImporterError::Zip(err) => write!(f, "zip error: {err}"),
            ImporterError::Csv(err) => write!(f, "CSV error: {err}"),
            ImporterError::Io(err) => write!(f, "I/O error: {err}"),
            ImporterError::Database(err) => write!(f, "database error: {err}"),
            ImporterError::Config(msg) => write!(f, "configuration error: {msg}"),
            ImporterError::InvalidArchive(msg) => write!(f, "invalid archive: {msg}"),
        }
    }
}

impl std::error::Error for ImporterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImporterError::Http(err) => Some(err),
            ImporterError::Zip(err) => Some(err),
            ImporterError::Csv(err) => Some(err),
            ImporterError::Io(err) => Some(err),
            ImporterError::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ImporterError {
    fn from(err: reqwest::Error) -> Self {
        ImporterError::Http(err)
    }
}

impl From<zip::result::ZipError> for ImporterError {
    fn from(err: zip::result::ZipError) -> Self {
        ImporterError::Zip(err)
    }
}

impl From<csv::Error> for ImporterError {
    fn from(err: csv::Error) -> Self {
        ImporterError::Csv(err)
    }
}

impl From<std::io::Error> for ImporterError {
    fn from(err: std::io::Error) -> Self {
        ImporterError::Io(err)
    }
}

impl From<sqlx::Error> for ImporterError {
    fn from(err: sqlx::Error) -> Self {
        ImporterError::Database(err)
    }
}

pub type Result<T> = std::result::Result<T, ImporterError>;
