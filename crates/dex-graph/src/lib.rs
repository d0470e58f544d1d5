//! Dynamic Taxonomic Tree Service: Tree Projector (C9), Layout Engine
//! (C10), and Chunk Manager (C11).

mod chunk;
mod error;
mod hierarchy;
mod layout;
mod types;

pub use chunk::{generate_chunks, get_chunk, CHUNK_SIZE};
pub use error::{GraphError, Result};
pub use hierarchy::{build_hierarchy, resolve_scoped_users, ProjectInput, TreeMode};
pub use layout::layout as compute_layout;
pub use types::{
    CapturedByFriend, ChunkContent, ChunkMetadata, ChunkedTree, Edge, Hierarchy, HierarchyNode,
    Layout, NodeAnnotations, Position, ProjectedTree, WorldBounds, RANKS,
};

use dex_cache::Cache;
use std::time::Duration;

const TREE_CACHE_TTL_DEFAULT: Duration = Duration::from_secs(2 * 60);
const TREE_CACHE_TTL_GLOBAL: Duration = Duration::from_secs(5 * 60);

fn tree_cache_key(input: &ProjectInput) -> String {
    match input.mode {
        TreeMode::Personal => dex_cache::keys::tree_personal(&input.viewer.to_string()),
        TreeMode::Friends => dex_cache::keys::tree_friends(&input.viewer.to_string()),
        TreeMode::Selected => {
            let mut ids: Vec<String> = input.scope_ids.iter().map(ToString::to_string).collect();
            ids.push(input.viewer.to_string());
            ids.sort();
            ids.dedup();
            dex_cache::keys::tree_selected(&ids)
        }
        TreeMode::Global => dex_cache::keys::tree_global(),
    }
}

/// Builds (or serves from cache) the scope's hierarchy and layout in one
/// shot, keyed and TTL'd per spec §4.13.
pub async fn serve_tree(pool: &sqlx::PgPool, cache: &Cache, input: ProjectInput) -> Result<(String, ProjectedTree)> {
    let cache_key = tree_cache_key(&input);

    if let Some(cached) = cache.get::<ProjectedTree>(&cache_key).await {
        tracing::debug!(key = %cache_key, "tree cache hit");
        return Ok((cache_key, cached));
    }

    let scoped_users = resolve_scoped_users(pool, &input).await?;
    let viewer = input.viewer;
    let hierarchy = build_hierarchy(pool, &scoped_users, viewer).await?;
    tracing::debug!(nodes = hierarchy.nodes.len(), "hierarchy built, computing layout");
    let layout = compute_layout(&hierarchy);
    let projected = ProjectedTree { hierarchy, layout };

    let ttl = if matches!(input.mode, TreeMode::Global) {
        TREE_CACHE_TTL_GLOBAL
    } else {
        TREE_CACHE_TTL_DEFAULT
    };
    cache.set(&cache_key, &projected, ttl).await;

    Ok((cache_key, projected))
}

/// Serves a single chunk, using the cache entry under `{tree_key}:chunk:{x}:{y}`
/// when present, otherwise deriving it from the already-cached/just-built tree.
pub async fn serve_chunk(
    cache: &Cache,
    tree_key: &str,
    tree: &ProjectedTree,
    x: i64,
    y: i64,
) -> ChunkContent {
    let chunk_key = dex_cache::keys::tree_chunk(tree_key, x, y);
    if let Some(cached) = cache.get::<ChunkContent>(&chunk_key).await {
        return cached;
    }

    let content = get_chunk(&tree.hierarchy, &tree.layout, x, y);
    let ttl = if tree_key == dex_cache::keys::tree_global() {
        TREE_CACHE_TTL_GLOBAL
    } else {
        TREE_CACHE_TTL_DEFAULT
    };
    cache.set(&chunk_key, &content, ttl).await;
    content
}
