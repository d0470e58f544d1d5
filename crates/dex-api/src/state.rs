use dex_cache::Cache;
use dex_image::BlobStore;
use sqlx::postgres::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub cache: Arc<Cache>,
    pub blobs: Arc<BlobStore>,
    pub admin_user_ids: Vec<Uuid>,
}

impl AppState {
    pub fn is_admin(&self, user_id: Uuid) -> bool {
        self.admin_user_ids.contains(&user_id)
    }
}
