//! Shared types for the Dynamic Taxonomic Tree Service (C9–C11, §4.10–§4.12).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Rank order used to key virtual taxonomic nodes (spec §4.10).
pub const RANKS: &[&str] = &[
    "kingdom", "phylum", "class", "order", "family", "genus", "species",
];

pub const ROOT_ID: &str = "root";
pub const ROOT_NAME: &str = "Life";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeMode {
    Personal,
    Friends,
    Selected,
    Global,
}

impl TreeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TreeMode::Personal => "personal",
            TreeMode::Friends => "friends",
            TreeMode::Selected => "selected",
            TreeMode::Global => "global",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedByFriend {
    pub user_id: Uuid,
    pub friend_code: String,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeAnnotations {
    Animal {
        captured_by_viewer: bool,
        captured_by_friends: Vec<CapturedByFriend>,
        capture_count: i64,
    },
    Taxonomic {
        children_count: usize,
        animal_count: i64,
    },
}

/// A node in the unlaid-out hierarchy. `parent`/`sibling_index` are
/// populated for every node including animal leaves — the Layout Engine's
/// left-sibling lookups degrade silently if either is missing (§4.11's
/// correctness note).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: String,
    pub name: String,
    pub rank: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub sibling_index: usize,
    pub annotations: NodeAnnotations,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Hierarchy {
    pub nodes: BTreeMap<String, HierarchyNode>,
    pub edges: Vec<Edge>,
    pub root_id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub positions: BTreeMap<String, Position>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub chunk_x: i64,
    pub chunk_y: i64,
    pub node_count: usize,
    pub edge_count: usize,
    pub world_bounds: WorldBounds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkedTree {
    pub chunks: Vec<ChunkMetadata>,
    pub world_bounds: WorldBounds,
    pub chunk_size: i64,
    pub total_chunks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkContent {
    pub chunk_x: i64,
    pub chunk_y: i64,
    pub nodes: Vec<HierarchyNode>,
    pub edges: Vec<Edge>,
}

/// A fully assembled tree: hierarchy + positions, ready for chunking or
/// direct serving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectedTree {
    pub hierarchy: Hierarchy,
    pub layout: Layout,
}
