//! Layout Engine (C10, §4.11): Walker-Buchheim O(n) tree positioning.
//!
//! `original_source/server/graph/layout/reingold_tilford.py` implements a
//! simplified variant that only compares against the immediate left
//! sibling and never resolves overlap between non-adjacent subtrees —
//! the REDESIGN FLAGS item this module corrects. This is the full
//! Buchheim/Walker algorithm (apportion + thread + ancestor/change/shift),
//! run over an index-based arena since the source tree is read-only here.

use crate::types::{Hierarchy, Layout, Position};
use std::collections::HashMap;

const MIN_DISTANCE: f64 = 100.0;
const LEVEL_HEIGHT: f64 = 150.0;

#[derive(Debug, Clone)]
struct LayoutNode {
    id: String,
    parent: Option<usize>,
    children: Vec<usize>,
    sibling_index: usize,
    depth: usize,

    prelim: f64,
    modifier: f64,
    shift: f64,
    change: f64,
    thread: Option<usize>,
    ancestor: usize,
}

struct Arena {
    nodes: Vec<LayoutNode>,
}

impl Arena {
    fn leftmost_sibling(&self, i: usize) -> usize {
        let parent = self.nodes[i].parent;
        match parent {
            Some(p) => *self.nodes[p].children.first().unwrap(),
            None => i,
        }
    }

    fn left_sibling(&self, i: usize) -> Option<usize> {
        let idx = self.nodes[i].sibling_index;
        if idx == 0 {
            return None;
        }
        let parent = self.nodes[i].parent?;
        Some(self.nodes[parent].children[idx - 1])
    }

    fn left_most_child(&self, i: usize) -> Option<usize> {
        self.nodes[i].children.first().copied()
    }

    fn right_most_child(&self, i: usize) -> Option<usize> {
        self.nodes[i].children.last().copied()
    }

    /// `next_right`/`next_left`: the rightmost/leftmost of either the real
    /// children or the thread, whichever exists.
    fn next_right(&self, i: usize) -> Option<usize> {
        if !self.nodes[i].children.is_empty() {
            self.right_most_child(i)
        } else {
            self.nodes[i].thread
        }
    }

    fn next_left(&self, i: usize) -> Option<usize> {
        if !self.nodes[i].children.is_empty() {
            self.left_most_child(i)
        } else {
            self.nodes[i].thread
        }
    }
}

/// Builds the index arena from the hierarchy, rooted at `hierarchy.root_id`.
/// Node ordering within `children` follows `sibling_index` so left-sibling
/// lookups are correct regardless of the hierarchy's own insertion order.
fn build_arena(hierarchy: &Hierarchy) -> (Arena, HashMap<String, usize>) {
    let mut id_to_idx: HashMap<String, usize> = HashMap::new();
    let mut nodes: Vec<LayoutNode> = Vec::with_capacity(hierarchy.nodes.len());

    let mut order: Vec<&String> = hierarchy.nodes.keys().collect();
    order.sort_by_key(|id| (depth_of(hierarchy, id), hierarchy.nodes[*id].sibling_index));

    for id in &order {
        let idx = nodes.len();
        id_to_idx.insert((*id).clone(), idx);
        nodes.push(LayoutNode {
            id: (*id).clone(),
            parent: None,
            children: Vec::new(),
            sibling_index: hierarchy.nodes[*id].sibling_index,
            depth: depth_of(hierarchy, id),
            prelim: 0.0,
            modifier: 0.0,
            shift: 0.0,
            change: 0.0,
            thread: None,
            ancestor: idx,
        });
    }

    for (id, idx) in &id_to_idx {
        let node = &hierarchy.nodes[id];
        if let Some(parent_id) = &node.parent {
            let parent_idx = id_to_idx[parent_id];
            nodes[*idx].parent = Some(parent_idx);
        }
    }

    for (id, idx) in &id_to_idx {
        let node = &hierarchy.nodes[id];
        let mut child_indices: Vec<usize> = node.children.iter().map(|c| id_to_idx[c]).collect();
        child_indices.sort_by_key(|&c| nodes[c].sibling_index);
        nodes[*idx].children = child_indices;
    }

    for node in &mut nodes {
        node.ancestor = id_to_idx[&node.id];
    }

    (Arena { nodes }, id_to_idx)
}

fn depth_of(hierarchy: &Hierarchy, id: &str) -> usize {
    let mut depth = 0;
    let mut current = id;
    while let Some(parent) = &hierarchy.nodes[current].parent {
        depth += 1;
        current = parent;
    }
    depth
}

/// Moves the subtree rooted at `i` and all descendants right by `dist`.
fn move_subtree(arena: &mut Arena, from: usize, to: usize, dist: f64) {
    let from_children = arena.nodes[from].sibling_index;
    let to_children = arena.nodes[to].sibling_index;
    let subtrees = (to_children - from_children) as f64;
    if subtrees > 0.0 {
        arena.nodes[to].change -= dist / subtrees;
        arena.nodes[to].shift += dist;
        arena.nodes[from].change += dist / subtrees;
    }
    arena.nodes[to].prelim += dist;
    arena.nodes[to].modifier += dist;
}

/// Resolves overlap between the subtree ending at `right_sibling` (just
/// placed) and all subtrees to its left, by walking contour threads on
/// both sides (the heart of the Buchheim algorithm).
fn apportion(arena: &mut Arena, node: usize, default_ancestor: usize) -> usize {
    let mut default_ancestor = default_ancestor;
    let Some(left_sibling) = arena.left_sibling(node) else {
        return default_ancestor;
    };

    let mut vip = node; // inside right
    let mut vop = node; // outside right
    let mut vim = left_sibling; // inside left
    let mut vom = arena.leftmost_sibling(node); // outside left

    let mut sip = arena.nodes[vip].modifier;
    let mut sop = arena.nodes[vop].modifier;
    let mut sim = arena.nodes[vim].modifier;
    let mut som = arena.nodes[vom].modifier;

    while let (Some(next_r_vim), Some(next_l_vip)) = (arena.next_right(vim), arena.next_left(vip)) {
        vim = next_r_vim;
        vip = next_l_vip;
        vom = arena.next_left(vom).unwrap_or(vom);
        vop = arena.next_right(vop).unwrap_or(vop);
        arena.nodes[vop].ancestor = node;

        let shift = (arena.nodes[vim].prelim + sim) - (arena.nodes[vip].prelim + sip) + MIN_DISTANCE;
        if shift > 0.0 {
            let ancestor = ancestor_of(arena, vim, node, default_ancestor);
            move_subtree(arena, ancestor, node, shift);
            sip += shift;
            sop += shift;
        }

        sim += arena.nodes[vim].modifier;
        sip += arena.nodes[vip].modifier;
        som += arena.nodes[vom].modifier;
        sop += arena.nodes[vop].modifier;
    }

    if arena.next_right(vim).is_some() && arena.next_right(vop).is_none() {
        arena.nodes[vop].thread = arena.next_right(vim);
        arena.nodes[vop].modifier += sim - sop;
    }
    if arena.next_left(vip).is_some() && arena.next_left(vom).is_none() {
        arena.nodes[vom].thread = arena.next_left(vip);
        arena.nodes[vom].modifier += sip - som;
        default_ancestor = node;
    }

    default_ancestor
}

fn ancestor_of(arena: &Arena, vim: usize, node: usize, default_ancestor: usize) -> usize {
    let parent = arena.nodes[node].parent;
    match parent {
        Some(p) if arena.nodes[arena.nodes[vim].ancestor].parent == Some(p) => arena.nodes[vim].ancestor,
        _ => default_ancestor,
    }
}

/// Distributes accumulated `change`/`shift` across a node's children,
/// right to left, then returns the running shift/change totals reset.
fn execute_shifts(arena: &mut Arena, node: usize) {
    let mut shift = 0.0;
    let mut change = 0.0;
    let children = arena.nodes[node].children.clone();
    for &child in children.iter().rev() {
        arena.nodes[child].prelim += shift;
        arena.nodes[child].modifier += shift;
        change += arena.nodes[child].change;
        shift += arena.nodes[child].shift + change;
    }
}

fn first_walk(arena: &mut Arena, node: usize) {
    if arena.nodes[node].children.is_empty() {
        if let Some(left) = arena.left_sibling(node) {
            arena.nodes[node].prelim = arena.nodes[left].prelim + MIN_DISTANCE;
        } else {
            arena.nodes[node].prelim = 0.0;
        }
        return;
    }

    let children = arena.nodes[node].children.clone();
    let mut default_ancestor = children[0];
    for &child in &children {
        first_walk(arena, child);
        default_ancestor = apportion(arena, child, default_ancestor);
    }

    execute_shifts(arena, node);

    let first = *children.first().unwrap();
    let last = *children.last().unwrap();
    let midpoint = (arena.nodes[first].prelim + arena.nodes[last].prelim) / 2.0;

    if let Some(left) = arena.left_sibling(node) {
        arena.nodes[node].prelim = arena.nodes[left].prelim + MIN_DISTANCE;
        arena.nodes[node].modifier = arena.nodes[node].prelim - midpoint;
    } else {
        arena.nodes[node].prelim = midpoint;
    }
}

fn second_walk(arena: &Arena, node: usize, modsum: f64, positions: &mut HashMap<String, Position>) {
    let x = arena.nodes[node].prelim + modsum;
    let y = arena.nodes[node].depth as f64 * LEVEL_HEIGHT;
    positions.insert(arena.nodes[node].id.clone(), Position { x, y });

    for &child in &arena.nodes[node].children {
        second_walk(arena, child, modsum + arena.nodes[node].modifier, positions);
    }
}

/// Computes positions for every node in `hierarchy` in O(n).
pub fn layout(hierarchy: &Hierarchy) -> Layout {
    if hierarchy.nodes.is_empty() {
        return Layout { positions: Default::default() };
    }

    let (mut arena, id_to_idx) = build_arena(hierarchy);
    let root = id_to_idx[&hierarchy.root_id];

    first_walk(&mut arena, root);

    let mut positions = HashMap::new();
    second_walk(&arena, root, -arena.nodes[root].prelim, &mut positions);

    Layout { positions: positions.into_iter().collect() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edge, HierarchyNode, NodeAnnotations};

    fn taxonomic(id: &str, parent: Option<&str>, sibling_index: usize) -> HierarchyNode {
        HierarchyNode {
            id: id.to_string(),
            name: id.to_string(),
            rank: "genus".to_string(),
            parent: parent.map(str::to_string),
            children: Vec::new(),
            sibling_index,
            annotations: NodeAnnotations::Taxonomic { children_count: 0, animal_count: 0 },
        }
    }

    fn build(pairs: &[(&str, Option<&str>, usize)]) -> Hierarchy {
        let mut hierarchy = Hierarchy::default();
        hierarchy.root_id = "root".to_string();
        for (id, parent, sib) in pairs {
            hierarchy.nodes.insert((*id).to_string(), taxonomic(id, *parent, *sib));
            if let Some(p) = parent {
                hierarchy.edges.push(Edge { source: (*p).to_string(), target: (*id).to_string() });
                hierarchy.nodes.get_mut(*p).unwrap().children.push((*id).to_string());
            }
        }
        hierarchy
    }

    #[test]
    fn single_node_sits_at_origin() {
        let hierarchy = build(&[("root", None, 0)]);
        let layout = layout(&hierarchy);
        let pos = layout.positions.get("root").unwrap();
        assert_eq!(pos.y, 0.0);
    }

    #[test]
    fn siblings_are_separated_by_at_least_min_distance() {
        let hierarchy = build(&[
            ("root", None, 0),
            ("a", Some("root"), 0),
            ("b", Some("root"), 1),
            ("c", Some("root"), 2),
        ]);
        let layout = layout(&hierarchy);
        let xs: Vec<f64> = ["a", "b", "c"].iter().map(|id| layout.positions[*id].x).collect();
        assert!(xs[1] - xs[0] >= MIN_DISTANCE - 1e-6);
        assert!(xs[2] - xs[1] >= MIN_DISTANCE - 1e-6);
    }

    #[test]
    fn parent_is_centered_over_children() {
        let hierarchy = build(&[
            ("root", None, 0),
            ("a", Some("root"), 0),
            ("b", Some("root"), 1),
        ]);
        let layout = layout(&hierarchy);
        let expected = (layout.positions["a"].x + layout.positions["b"].x) / 2.0;
        assert!((layout.positions["root"].x - expected).abs() < 1e-6);
    }

    #[test]
    fn isomorphic_subtrees_produce_identical_relative_layouts() {
        let hierarchy = build(&[
            ("root", None, 0),
            ("l", Some("root"), 0),
            ("r", Some("root"), 1),
            ("l1", Some("l"), 0),
            ("l2", Some("l"), 1),
            ("r1", Some("r"), 0),
            ("r2", Some("r"), 1),
        ]);
        let layout = layout(&hierarchy);
        let l_width = layout.positions["l2"].x - layout.positions["l1"].x;
        let r_width = layout.positions["r2"].x - layout.positions["r1"].x;
        assert!((l_width - r_width).abs() < 1e-6);
    }

    #[test]
    fn deep_unbalanced_subtrees_do_not_overlap() {
        let hierarchy = build(&[
            ("root", None, 0),
            ("a", Some("root"), 0),
            ("b", Some("root"), 1),
            ("a1", Some("a"), 0),
            ("a2", Some("a"), 1),
            ("a3", Some("a"), 2),
            ("a1x", Some("a1"), 0),
        ]);
        let layout = layout(&hierarchy);
        assert!(layout.positions["b"].x >= layout.positions["a3"].x + MIN_DISTANCE - 1e-6);
    }
}
