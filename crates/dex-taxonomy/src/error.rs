//! Error types for the Taxonomy Reconciler

use std::fmt;

#[derive(Debug)]
pub enum TaxonomyError {
    Database(sqlx::Error),
}

impl fmt::Display for TaxonomyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for TaxonomyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(e) => Some(e),
        }
    }
}

impl From<sqlx::Error> for TaxonomyError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e)
    }
}

pub type Result<T> = std::result::Result<T, TaxonomyError>;
