//! dex-worker - Job Executor for the observation-to-catalog pipeline.
//!
//! Polls `analysis_jobs` for pending work and runs each through image
//! normalization, vision identification, and taxonomy reconciliation.

mod config;
mod error;
mod pipeline;
mod server;
mod types;

use crate::config::WorkerConfig;
use crate::error::{Result, WorkerError};
use crate::pipeline::run_one_pass;
use crate::server::{start_server, ServerState, SharedState};
use crate::types::RecentJob;
use dex_cache::Cache;
use dex_image::BlobStore;
use dex_vision::OpenAiVision;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env().add_directive("dex_worker=info".parse().map_err(|e| {
        WorkerError::Config(format!("invalid log directive: {e}"))
    })?);

    if std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false) {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting dex-worker...");

    let config = WorkerConfig::from_env()?;
    info!(port = config.port, poll_interval_secs = config.poll_interval.as_secs(), "loaded configuration");

    let pool = sqlx::PgPool::connect(&config.database_url).await?;
    dex_db::migrate::migrate(&pool).await?;

    let cache = Cache::default();
    let blobs = BlobStore::new(config.blob_store_dir.clone());
    let vision: Arc<dyn dex_vision::VisionProvider> = match &config.vision_base_url {
        Some(base) => Arc::new(OpenAiVision::with_base_url(config.vision_api_key.clone(), base.clone())),
        None => Arc::new(OpenAiVision::new(config.vision_api_key.clone())),
    };

    let state: SharedState = Arc::new(RwLock::new(ServerState::new()));

    let http_state = state.clone();
    let http_port = config.port;
    tokio::spawn(async move {
        if let Err(e) = start_server(http_state, http_port).await {
            error!("HTTP server error: {}", e);
        }
    });

    state.write().await.polling = true;
    let mut ticker = interval(config.poll_interval);
    loop {
        ticker.tick().await;
        let mut stats = state.read().await.stats.clone();
        match run_one_pass(&pool, &cache, &blobs, vision.as_ref(), &mut stats).await {
            Ok(Some(outcome)) => {
                let mut s = state.write().await;
                s.stats = stats;
                s.add_recent_job(RecentJob {
                    job_id: outcome.job_id,
                    outcome: outcome.outcome.to_string(),
                    detected_count: outcome.detected_count,
                    time: chrono::Utc::now(),
                });
            }
            Ok(None) => {}
            Err(e) => {
                error!("worker pass error: {}", e);
                state.write().await.stats.errors += 1;
            }
        }
    }
}
