//! dex-worker: Job Executor (C7) for the observation-to-catalog pipeline.
//!
//! Polls `analysis_jobs` for pending work, normalizes legacy raw images,
//! calls the Vision Client, reconciles detected entities against the
//! taxonomy corpus, and persists the result — with a health/stats HTTP
//! server alongside, shaped after `observing-ingester`.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod server;
pub mod types;

pub use config::WorkerConfig;
pub use error::{Result, WorkerError};
pub use pipeline::{run_one_pass, PassOutcome};
pub use server::{create_router, start_server, ServerState, SharedState};
pub use types::{RecentJob, WorkerStats};
