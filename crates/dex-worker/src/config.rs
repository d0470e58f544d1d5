//! Worker configuration, loaded from the environment.

use crate::error::{Result, WorkerError};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub vision_api_key: String,
    pub vision_base_url: Option<String>,
    pub blob_store_dir: PathBuf,
    pub poll_interval: Duration,
    pub port: u16,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| WorkerError::Config("DATABASE_URL environment variable is required".to_string()))?;

        let vision_api_key = std::env::var("VISION_API_KEY")
            .map_err(|_| WorkerError::Config("VISION_API_KEY environment variable is required".to_string()))?;

        let vision_base_url = std::env::var("VISION_API_BASE").ok();

        let blob_store_dir = std::env::var("BLOB_STORE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./blobs"));

        let poll_interval_secs: u64 = std::env::var("POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(2);

        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        Ok(WorkerConfig {
            database_url,
            vision_api_key,
            vision_base_url,
            blob_store_dir,
            poll_interval: Duration::from_secs(poll_interval_secs),
            port,
        })
    }
}
