//! Dynamic Taxonomic Tree Service HTTP surface: `GET /graph/tree`,
//! `GET /graph/tree/chunk/{x}/{y}`, `POST /graph/tree/invalidate` (spec §6).

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;
use dex_graph::{generate_chunks, ChunkedTree, ProjectInput, ProjectedTree, TreeMode};

#[derive(Deserialize)]
pub struct TreeQuery {
    #[serde(default = "default_mode")]
    mode: String,
    friend_ids: Option<String>,
}

fn default_mode() -> String {
    "personal".to_string()
}

fn parse_mode(s: &str) -> Result<TreeMode, AppError> {
    match s {
        "personal" => Ok(TreeMode::Personal),
        "friends" => Ok(TreeMode::Friends),
        "selected" => Ok(TreeMode::Selected),
        "global" => Ok(TreeMode::Global),
        other => Err(AppError::BadRequest(format!("unknown tree mode `{other}`"))),
    }
}

#[derive(Serialize)]
struct TreeResponse {
    hierarchy: dex_graph::Hierarchy,
    layout: dex_graph::Layout,
    chunks: ChunkedTree,
}

/// `GET /graph/tree?mode=personal|friends|selected|global&friend_ids=a,b,c`
pub async fn get_tree(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<TreeQuery>,
) -> Result<Response, AppError> {
    let mode = parse_mode(&query.mode)?;
    let scope_ids = query
        .friend_ids
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| Uuid::parse_str(s).ok())
        .collect();

    let input = ProjectInput {
        viewer: user.user_id,
        mode,
        scope_ids,
        is_admin: state.is_admin(user.user_id),
    };

    let (_key, ProjectedTree { hierarchy, layout }) =
        dex_graph::serve_tree(&state.pool, &state.cache, input).await?;
    let chunks = generate_chunks(&hierarchy, &layout);

    Ok(axum::Json(TreeResponse { hierarchy, layout, chunks }).into_response())
}

#[derive(Deserialize)]
pub struct ChunkQuery {
    #[serde(default = "default_mode")]
    mode: String,
    friend_ids: Option<String>,
}

/// `GET /graph/tree/chunk/{x}/{y}?mode=...`: re-derives (or serves from
/// cache) the scope's tree, then serves a single spatial chunk from it.
pub async fn get_chunk(
    user: AuthUser,
    State(state): State<AppState>,
    Path((x, y)): Path<(i64, i64)>,
    Query(query): Query<ChunkQuery>,
) -> Result<Response, AppError> {
    let mode = parse_mode(&query.mode)?;
    let scope_ids = query
        .friend_ids
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| Uuid::parse_str(s).ok())
        .collect();

    let input = ProjectInput {
        viewer: user.user_id,
        mode,
        scope_ids,
        is_admin: state.is_admin(user.user_id),
    };

    let (tree_key, tree) = dex_graph::serve_tree(&state.pool, &state.cache, input).await?;
    let content = dex_graph::serve_chunk(&state.cache, &tree_key, &tree, x, y).await;
    Ok(axum::Json(content).into_response())
}

#[derive(Deserialize)]
pub struct InvalidateRequest {
    scope: String,
}

/// `POST /graph/tree/invalidate`: `scope: "user"` flushes the caller's own
/// tree caches; `scope: "global"` requires admin and flushes everything.
pub async fn invalidate(
    user: AuthUser,
    State(state): State<AppState>,
    axum::Json(body): axum::Json<InvalidateRequest>,
) -> Result<Response, AppError> {
    match body.scope.as_str() {
        "user" => {
            state
                .cache
                .delete_prefix(&dex_cache::keys::tree_owner_prefix(&user.user_id.to_string()))
                .await;
            state.cache.delete(&dex_cache::keys::tree_friends(&user.user_id.to_string())).await;
        }
        "global" => {
            if !state.is_admin(user.user_id) {
                return Err(AppError::Forbidden("administrator access required".to_string()));
            }
            state.cache.delete_prefix("tree:").await;
        }
        other => return Err(AppError::BadRequest(format!("unknown invalidation scope `{other}`"))),
    }
    Ok(axum::Json(serde_json::json!({ "invalidated": true })).into_response())
}
