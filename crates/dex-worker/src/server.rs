//! HTTP server for health checks and a stats dashboard.
//!
//! Provides `/health`, `/api/stats`, and `/` (dashboard) endpoints, shaped
//! after `observing-ingester`'s server module with the firehose-specific
//! fields swapped for job-executor stats.

use crate::types::{RecentJob, WorkerStats};
use axum::{
    extract::State,
    response::{Html, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::info;

#[derive(Debug, Default)]
pub struct ServerState {
    pub polling: bool,
    pub started_at: DateTime<Utc>,
    pub stats: WorkerStats,
    pub recent_jobs: Vec<RecentJob>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            polling: false,
            started_at: Utc::now(),
            stats: WorkerStats::default(),
            recent_jobs: Vec::new(),
        }
    }

    pub fn add_recent_job(&mut self, job: RecentJob) {
        self.recent_jobs.insert(0, job);
        if self.recent_jobs.len() > 10 {
            self.recent_jobs.pop();
        }
    }
}

pub type SharedState = Arc<RwLock<ServerState>>;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    polling: bool,
}

#[derive(Serialize)]
struct StatsResponse {
    polling: bool,
    uptime: i64,
    stats: WorkerStats,
    #[serde(rename = "recentJobs")]
    recent_jobs: Vec<RecentJob>,
}

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health))
        .route("/api/stats", get(stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let state = state.read().await;
    Json(HealthResponse { status: "ok", polling: state.polling })
}

async fn stats(State(state): State<SharedState>) -> Json<StatsResponse> {
    let state = state.read().await;
    let uptime = (Utc::now() - state.started_at).num_seconds();

    Json(StatsResponse {
        polling: state.polling,
        uptime,
        stats: state.stats.clone(),
        recent_jobs: state.recent_jobs.clone(),
    })
}

async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>dex-worker</title>
  <style>
    body { font-family: monospace; padding: 1rem; }
    table { border-collapse: collapse; margin-bottom: 1rem; }
    td, th { text-align: left; padding: 0.25rem 1rem 0.25rem 0; }
    .connected { color: green; }
    .disconnected { color: red; }
    h2 { margin-top: 1rem; }
    .job { margin: 0.25rem 0; }
  </style>
</head>
<body>
  <h1>dex-worker</h1>

  <table>
    <tr><td>Status</td><td id="status">Loading...</td></tr>
    <tr><td>Uptime</td><td id="uptime">-</td></tr>
  </table>

  <h2>Stats</h2>
  <table>
    <tr><td>Completed</td><td id="completed">0</td></tr>
    <tr><td>Failed</td><td id="failed">0</td></tr>
    <tr><td>Retried</td><td id="retried">0</td></tr>
    <tr><td>Animals created</td><td id="animals">0</td></tr>
    <tr><td>Errors</td><td id="errors">0</td></tr>
  </table>

  <h2>Recent Jobs</h2>
  <div id="jobs">No jobs yet...</div>

  <script>
    function formatDuration(seconds) {
      const h = Math.floor(seconds / 3600);
      const m = Math.floor((seconds % 3600) / 60);
      const s = seconds % 60;
      if (h > 0) return h + 'h ' + m + 'm ' + s + 's';
      if (m > 0) return m + 'm ' + s + 's';
      return s + 's';
    }

    async function refresh() {
      try {
        const res = await fetch('/api/stats');
        const data = await res.json();

        const statusEl = document.getElementById('status');
        statusEl.textContent = data.polling ? 'Polling' : 'Idle';
        statusEl.className = data.polling ? 'connected' : 'disconnected';

        document.getElementById('uptime').textContent = formatDuration(data.uptime);
        document.getElementById('completed').textContent = data.stats.jobs_completed.toLocaleString();
        document.getElementById('failed').textContent = data.stats.jobs_failed.toLocaleString();
        document.getElementById('retried').textContent = data.stats.jobs_retried.toLocaleString();
        document.getElementById('animals').textContent = data.stats.animals_created.toLocaleString();
        document.getElementById('errors').textContent = data.stats.errors.toLocaleString();

        const jobsEl = document.getElementById('jobs');
        if (data.recentJobs.length === 0) {
          jobsEl.textContent = 'No jobs yet...';
        } else {
          jobsEl.innerHTML = data.recentJobs.map(j =>
            '<div class="job">' + new Date(j.time).toLocaleTimeString() + ' [' + j.outcome + '] ' + j.job_id + ' (' + j.detected_count + ' detected)</div>'
          ).join('');
        }
      } catch (err) {
        document.getElementById('status').textContent = 'Error';
        document.getElementById('status').className = 'disconnected';
      }
    }

    refresh();
    setInterval(refresh, 2000);
  </script>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn test_server_state_new() {
        let state = ServerState::new();
        assert!(!state.polling);
        assert_eq!(state.stats.jobs_completed, 0);
        assert!(state.recent_jobs.is_empty());
    }

    #[test]
    fn test_add_recent_job_prepends_and_limits_to_10() {
        let mut state = ServerState::new();
        for i in 0..15 {
            state.add_recent_job(RecentJob {
                job_id: uuid::Uuid::new_v4(),
                outcome: "completed".to_string(),
                detected_count: i,
                time: Utc::now(),
            });
        }
        assert_eq!(state.recent_jobs.len(), 10);
        assert_eq!(state.recent_jobs[0].detected_count, 14);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let state: SharedState = Arc::new(RwLock::new(ServerState::new()));
        let router = create_router(state);

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["polling"], false);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let state: SharedState = Arc::new(RwLock::new(ServerState::new()));
        {
            let mut s = state.write().await;
            s.stats.jobs_completed = 3;
            s.stats.jobs_failed = 1;
        }
        let router = create_router(state);

        let response = router
            .oneshot(Request::builder().uri("/api/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["stats"]["jobs_completed"], 3);
        assert_eq!(json["stats"]["jobs_failed"], 1);
    }

    #[tokio::test]
    async fn test_dashboard_endpoint() {
        let state: SharedState = Arc::new(RwLock::new(ServerState::new()));
        let router = create_router(state);

        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("dex-worker"));
    }
}
