mod auth;
mod config;
mod constants;
mod error;
mod routes;
mod state;
mod validation;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use config::Config;
use dex_cache::Cache;
use dex_image::BlobStore;
use state::AppState;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "dex_api=info".into()),
        )
        .json()
        .init();

    let config = Config::from_env();
    info!(port = config.port, "Starting dex-api");

    // Connect to database
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    dex_db::migrate::migrate(&pool).await.expect("Failed to run migrations");

    let state = AppState {
        pool,
        cache: Arc::new(Cache::default()),
        blobs: Arc::new(BlobStore::new(config.blob_store_dir.clone())),
        admin_user_ids: config.admin_user_ids.clone(),
    };

    // CORS
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    let app = Router::new()
        // Health
        .route("/health", get(routes::health::health))
        .nest(
            "/api/v1",
            Router::new()
                // Users / friend graph
                .route("/me", get(routes::friends::me))
                .route("/friends", get(routes::friends::list))
                .route("/friends/{friend_code}/request", post(routes::friends::send_request))
                .route("/friends/{user_id}/accept", post(routes::friends::accept))
                .route("/friends/{user_id}/reject", post(routes::friends::reject))
                // Image Normalizer / Conversion Store
                .route("/images/convert", post(routes::images::convert))
                .route("/images/convert/{id}/download", get(routes::images::download))
                // Job Executor
                .route("/vision/jobs", post(routes::vision::submit))
                .route("/vision/jobs/{id}", get(routes::vision::get))
                .route("/vision/jobs/{id}/select_animal", post(routes::vision::select_animal))
                .route("/vision/jobs/{id}/retry", post(routes::vision::retry))
                // Observation Recorder
                .route("/dex/entries", post(routes::dex::create))
                .route("/dex/entries/sync_entries", get(routes::dex::sync_entries))
                // Dynamic Taxonomic Tree Service
                .route("/graph/tree", get(routes::graph::get_tree))
                .route("/graph/tree/chunk/{x}/{y}", get(routes::graph::get_chunk))
                .route("/graph/tree/invalidate", post(routes::graph::invalidate))
                // Admin
                .route(
                    "/admin/animals/recalculate_creation_index",
                    post(routes::admin::recalculate_creation_index),
                ),
        )
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("Failed to bind");

    info!(port = config.port, "Listening");

    axum::serve(listener, app).await.expect("Server failed");
}
