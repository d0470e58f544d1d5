//! Environment-driven configuration, following `observing-ingester`'s
//! `load_config()` shape.

use crate::error::{ImporterError, Result};
use std::path::PathBuf;

pub struct ImporterConfig {
    pub database_url: String,
    pub api_base: String,
    pub download_dir: PathBuf,
}

impl ImporterConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| {
            ImporterError::Config("DATABASE_URL environment variable is required".to_string())
        })?;

        let api_base = std::env::var("CHECKLISTBANK_API_BASE")
            .unwrap_or_else(|_| "https://api.checklistbank.org".to_string());

        let download_dir = std::env::var("IMPORT_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./taxonomy_imports"));

        Ok(ImporterConfig { database_url, api_base, download_dir })
    }
}
