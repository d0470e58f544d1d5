//! Chunk Manager (C11, §4.12): tiles a laid-out tree into fixed-size
//! spatial chunks for progressive client loading.
//!
//! Grounded on `original_source/server/graph/layout/chunk_manager.py`'s
//! `ChunkManager` (world-bounds padding, floor-division chunk coords, edge
//! line-rasterization sampling); ported to integer chunk coordinates and a
//! `HashMap`-free Rust shape rather than Python's `defaultdict`.

use crate::types::{ChunkContent, ChunkMetadata, ChunkedTree, Edge, Hierarchy, HierarchyNode, Layout, WorldBounds};
use std::collections::{HashMap, HashSet};

pub const CHUNK_SIZE: i64 = 2048;

fn chunk_coords(x: f64, y: f64) -> (i64, i64) {
    ((x / CHUNK_SIZE as f64).floor() as i64, (y / CHUNK_SIZE as f64).floor() as i64)
}

fn world_bounds(layout: &Layout) -> WorldBounds {
    if layout.positions.is_empty() {
        return WorldBounds { min_x: 0.0, min_y: 0.0, max_x: 0.0, max_y: 0.0 };
    }

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for pos in layout.positions.values() {
        min_x = min_x.min(pos.x);
        max_x = max_x.max(pos.x);
        min_y = min_y.min(pos.y);
        max_y = max_y.max(pos.y);
    }

    let padding = CHUNK_SIZE as f64 * 0.1;
    WorldBounds {
        min_x: min_x - padding,
        min_y: min_y - padding,
        max_x: max_x + padding,
        max_y: max_y + padding,
    }
}

/// The set of chunks a straight edge between `(x1,y1)` and `(x2,y2)` passes
/// through, by sampling `2 * max(|dcx|, |dcy|) + 1` equally spaced points
/// and unioning their chunks (a conservative superset, per spec §4.12).
fn chunks_for_edge(x1: f64, y1: f64, x2: f64, y2: f64) -> HashSet<(i64, i64)> {
    let c1 = chunk_coords(x1, y1);
    let c2 = chunk_coords(x2, y2);
    if c1 == c2 {
        return HashSet::from([c1]);
    }

    let mut chunks = HashSet::from([c1, c2]);
    let num_samples = 2 * (c2.0 - c1.0).abs().max((c2.1 - c1.1).abs()) + 1;
    for i in 1..num_samples {
        let t = i as f64 / num_samples as f64;
        let x = x1 + (x2 - x1) * t;
        let y = y1 + (y2 - y1) * t;
        chunks.insert(chunk_coords(x, y));
    }
    chunks
}

/// Generates chunk metadata for the whole tree (used by the "overview" or
/// index response that precedes individual `GetChunk` calls).
pub fn generate_chunks(hierarchy: &Hierarchy, layout: &Layout) -> ChunkedTree {
    let mut node_counts: HashMap<(i64, i64), usize> = HashMap::new();
    let mut node_chunk: HashMap<&str, (i64, i64)> = HashMap::new();

    for (id, pos) in &layout.positions {
        let coords = chunk_coords(pos.x, pos.y);
        *node_counts.entry(coords).or_insert(0) += 1;
        node_chunk.insert(id.as_str(), coords);
    }

    let mut edge_counts: HashMap<(i64, i64), usize> = HashMap::new();
    for edge in &hierarchy.edges {
        let (Some(&source_chunk), Some(&target_chunk)) =
            (node_chunk.get(edge.source.as_str()), node_chunk.get(edge.target.as_str()))
        else {
            continue;
        };
        let source_pos = &layout.positions[&edge.source];
        let target_pos = &layout.positions[&edge.target];
        let crossed = if source_chunk == target_chunk {
            HashSet::from([source_chunk])
        } else {
            chunks_for_edge(source_pos.x, source_pos.y, target_pos.x, target_pos.y)
        };
        for coords in crossed {
            *edge_counts.entry(coords).or_insert(0) += 1;
        }
    }

    let mut all_coords: HashSet<(i64, i64)> = node_counts.keys().copied().collect();
    all_coords.extend(edge_counts.keys().copied());
    let mut sorted_coords: Vec<(i64, i64)> = all_coords.into_iter().collect();
    sorted_coords.sort();

    let chunks: Vec<ChunkMetadata> = sorted_coords
        .into_iter()
        .map(|(chunk_x, chunk_y)| {
            let world_x = (chunk_x * CHUNK_SIZE) as f64;
            let world_y = (chunk_y * CHUNK_SIZE) as f64;
            ChunkMetadata {
                chunk_x,
                chunk_y,
                node_count: *node_counts.get(&(chunk_x, chunk_y)).unwrap_or(&0),
                edge_count: *edge_counts.get(&(chunk_x, chunk_y)).unwrap_or(&0),
                world_bounds: WorldBounds {
                    min_x: world_x,
                    min_y: world_y,
                    max_x: world_x + CHUNK_SIZE as f64,
                    max_y: world_y + CHUNK_SIZE as f64,
                },
            }
        })
        .collect();

    ChunkedTree {
        total_chunks: chunks.len(),
        chunks,
        world_bounds: world_bounds(layout),
        chunk_size: CHUNK_SIZE,
    }
}

/// Returns the nodes falling in `(chunk_x, chunk_y)` and the edges that
/// cross it (spec §4.12's `GetChunk`).
pub fn get_chunk(hierarchy: &Hierarchy, layout: &Layout, chunk_x: i64, chunk_y: i64) -> ChunkContent {
    let target = (chunk_x, chunk_y);

    let nodes: Vec<HierarchyNode> = hierarchy
        .nodes
        .values()
        .filter(|node| {
            layout
                .positions
                .get(&node.id)
                .map(|pos| chunk_coords(pos.x, pos.y) == target)
                .unwrap_or(false)
        })
        .cloned()
        .collect();

    let edges: Vec<Edge> = hierarchy
        .edges
        .iter()
        .filter(|edge| {
            let (Some(source_pos), Some(target_pos)) =
                (layout.positions.get(&edge.source), layout.positions.get(&edge.target))
            else {
                return false;
            };
            chunks_for_edge(source_pos.x, source_pos.y, target_pos.x, target_pos.y).contains(&target)
        })
        .cloned()
        .collect();

    ChunkContent { chunk_x, chunk_y, nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeAnnotations, Position};

    fn node(id: &str) -> HierarchyNode {
        HierarchyNode {
            id: id.to_string(),
            name: id.to_string(),
            rank: "genus".to_string(),
            parent: None,
            children: Vec::new(),
            sibling_index: 0,
            annotations: NodeAnnotations::Taxonomic { children_count: 0, animal_count: 0 },
        }
    }

    #[test]
    fn nodes_in_same_chunk_are_grouped() {
        let mut hierarchy = Hierarchy::default();
        hierarchy.nodes.insert("a".into(), node("a"));
        hierarchy.nodes.insert("b".into(), node("b"));
        let mut layout = Layout { positions: Default::default() };
        layout.positions.insert("a".to_string(), Position { x: 10.0, y: 10.0 });
        layout.positions.insert("b".to_string(), Position { x: 20.0, y: 20.0 });

        let chunked = generate_chunks(&hierarchy, &layout);
        assert_eq!(chunked.total_chunks, 1);
        assert_eq!(chunked.chunks[0].node_count, 2);
    }

    #[test]
    fn edge_spanning_chunks_appears_in_both() {
        let mut hierarchy = Hierarchy::default();
        hierarchy.nodes.insert("a".into(), node("a"));
        hierarchy.nodes.insert("b".into(), node("b"));
        hierarchy.edges.push(Edge { source: "a".into(), target: "b".into() });

        let mut layout = Layout { positions: Default::default() };
        layout.positions.insert("a".to_string(), Position { x: 10.0, y: 10.0 });
        layout.positions.insert("b".to_string(), Position { x: 3000.0, y: 10.0 });

        let chunk_a = get_chunk(&hierarchy, &layout, 0, 0);
        let chunk_b = get_chunk(&hierarchy, &layout, 1, 0);
        assert_eq!(chunk_a.edges.len(), 1);
        assert_eq!(chunk_b.edges.len(), 1);
    }

    #[test]
    fn get_chunk_excludes_unrelated_chunk() {
        let mut hierarchy = Hierarchy::default();
        hierarchy.nodes.insert("a".into(), node("a"));
        let mut layout = Layout { positions: Default::default() };
        layout.positions.insert("a".to_string(), Position { x: 10.0, y: 10.0 });

        let far_chunk = get_chunk(&hierarchy, &layout, 5, 5);
        assert!(far_chunk.nodes.is_empty());
    }
}
