//! Tree Projector (C9, §4.10): builds a taxonomic hierarchy from a
//! scope-filtered set of observations.
//!
//! Grounded on `original_source/server/graph/services_dynamic.py`'s
//! `DynamicTaxonomicTreeService` (rank-keyed virtual node construction,
//! animal-as-leaf attachment) and `original_source/server/graph/services.py`
//! (scope resolution by mode). The original attaches animal leaves without
//! setting `parent`/`sibling_index` in one code path — the named defect in
//! REDESIGN FLAGS — so this populates both for every node unconditionally.

use crate::error::{GraphError, Result};
use crate::types::{
    CapturedByFriend, Edge, Hierarchy, HierarchyNode, NodeAnnotations, ROOT_ID, ROOT_NAME,
};
use dex_db::CanonicalAnimalRow;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub use crate::types::TreeMode;

pub struct ProjectInput {
    pub viewer: Uuid,
    pub mode: TreeMode,
    pub scope_ids: Vec<Uuid>,
    pub is_admin: bool,
}

/// Resolves `scoped_users` per mode (§4.10).
pub async fn resolve_scoped_users(pool: &sqlx::PgPool, input: &ProjectInput) -> Result<Vec<Uuid>> {
    match input.mode {
        TreeMode::Personal => Ok(vec![input.viewer]),
        TreeMode::Friends => {
            let mut users = dex_db::friendships::accepted_friends(pool, input.viewer).await?;
            users.push(input.viewer);
            Ok(users)
        }
        TreeMode::Selected => {
            let friends = dex_db::friendships::accepted_friends(pool, input.viewer).await?;
            let friend_set: HashSet<Uuid> = friends.into_iter().collect();
            let mut users: Vec<Uuid> = input
                .scope_ids
                .iter()
                .copied()
                .filter(|id| friend_set.contains(id))
                .collect();
            users.push(input.viewer);
            Ok(users)
        }
        TreeMode::Global => {
            if !input.is_admin {
                return Err(GraphError::PermissionDenied);
            }
            Ok(dex_db::users::all_ids(pool).await?)
        }
    }
}

/// Non-empty `(rank, value)` pairs in rank order for an animal — ranks with
/// a null/empty value are simply skipped, not treated as chain breaks.
fn rank_values(animal: &CanonicalAnimalRow) -> Vec<(&'static str, &str)> {
    let candidates: [(&'static str, &Option<String>); 7] = [
        ("kingdom", &animal.kingdom),
        ("phylum", &animal.phylum),
        ("class", &animal.class),
        ("order", &animal.order_),
        ("family", &animal.family),
        ("genus", &animal.genus),
        ("species", &animal.species),
    ];
    candidates
        .into_iter()
        .filter_map(|(rank, v)| v.as_deref().filter(|s| !s.is_empty()).map(|s| (rank, s)))
        .collect()
}

fn ensure_root(hierarchy: &mut Hierarchy) {
    hierarchy.nodes.entry(ROOT_ID.to_string()).or_insert_with(|| HierarchyNode {
        id: ROOT_ID.to_string(),
        name: ROOT_NAME.to_string(),
        rank: "root".to_string(),
        parent: None,
        children: Vec::new(),
        sibling_index: 0,
        annotations: NodeAnnotations::Taxonomic { children_count: 0, animal_count: 0 },
    });
    hierarchy.root_id = ROOT_ID.to_string();
}

fn next_sibling_index(sibling_counts: &mut HashMap<String, usize>, parent_id: &str) -> usize {
    let counter = sibling_counts.entry(parent_id.to_string()).or_insert(0);
    let index = *counter;
    *counter += 1;
    index
}

fn add_child(hierarchy: &mut Hierarchy, parent_id: &str, child_id: &str) {
    if let Some(parent) = hierarchy.nodes.get_mut(parent_id) {
        parent.children.push(child_id.to_string());
    }
}

/// Walks a single animal's rank chain, creating any missing virtual nodes,
/// then attaches the animal as a leaf under the lowest non-empty rank node
/// (or directly under root if the animal has no populated ranks at all).
fn attach_animal_chain(
    hierarchy: &mut Hierarchy,
    sibling_counts: &mut HashMap<String, usize>,
    animal: &CanonicalAnimalRow,
) -> String {
    let chain = rank_values(animal);
    let mut path_key = String::new();
    let mut parent_id = ROOT_ID.to_string();

    for (rank, value) in &chain {
        path_key.push('|');
        path_key.push_str(value);
        let node_id = format!("{}:{}", rank, path_key);

        if !hierarchy.nodes.contains_key(&node_id) {
            let sibling_index = next_sibling_index(sibling_counts, &parent_id);
            hierarchy.nodes.insert(
                node_id.clone(),
                HierarchyNode {
                    id: node_id.clone(),
                    name: (*value).to_string(),
                    rank: (*rank).to_string(),
                    parent: Some(parent_id.clone()),
                    children: Vec::new(),
                    sibling_index,
                    annotations: NodeAnnotations::Taxonomic { children_count: 0, animal_count: 0 },
                },
            );
            hierarchy.edges.push(Edge { source: parent_id.clone(), target: node_id.clone() });
            add_child(hierarchy, &parent_id, &node_id);
        }
        parent_id = node_id;
    }

    parent_id
}

/// Builds the hierarchy for `scoped_users`, annotating animal leaves with
/// scoped capture info and taxonomic nodes with subtree counts.
pub async fn build_hierarchy(
    pool: &sqlx::PgPool,
    scoped_users: &[Uuid],
    viewer: Uuid,
) -> Result<Hierarchy> {
    let counts = dex_db::observations::scoped_animal_counts(pool, scoped_users).await?;
    let animal_ids: Vec<Uuid> = counts.iter().map(|(id, _)| *id).collect();
    let counts_map: HashMap<Uuid, i64> = counts.into_iter().collect();
    let animals = dex_db::canonical_animals::get_many(pool, &animal_ids).await?;

    let mut hierarchy = Hierarchy::default();
    ensure_root(&mut hierarchy);
    let mut sibling_counts: HashMap<String, usize> = HashMap::new();
    let mut user_cache: HashMap<Uuid, dex_db::UserRow> = HashMap::new();

    for animal in &animals {
        let attach_point = attach_animal_chain(&mut hierarchy, &mut sibling_counts, animal);
        let animal_node_id = format!("animal:{}", animal.animal_id);

        let observers = dex_db::observations::scoped_observers(pool, animal.animal_id, scoped_users).await?;
        let captured_by_viewer = observers.iter().any(|o| o.owner_user_id == viewer);

        let mut captured_by_friends = Vec::new();
        for obs in &observers {
            if obs.owner_user_id == viewer {
                continue;
            }
            let user = match user_cache.get(&obs.owner_user_id) {
                Some(u) => u.clone(),
                None => {
                    let Some(u) = dex_db::users::get(pool, obs.owner_user_id).await? else {
                        continue;
                    };
                    user_cache.insert(obs.owner_user_id, u.clone());
                    u
                }
            };
            captured_by_friends.push(CapturedByFriend {
                user_id: obs.owner_user_id,
                friend_code: user.friend_code.clone(),
                captured_at: obs.catch_date,
            });
        }

        let sibling_index = next_sibling_index(&mut sibling_counts, &attach_point);
        hierarchy.nodes.insert(
            animal_node_id.clone(),
            HierarchyNode {
                id: animal_node_id.clone(),
                name: animal.scientific_name.clone(),
                rank: "species".to_string(),
                parent: Some(attach_point.clone()),
                children: Vec::new(),
                sibling_index,
                annotations: NodeAnnotations::Animal {
                    captured_by_viewer,
                    captured_by_friends,
                    capture_count: *counts_map.get(&animal.animal_id).unwrap_or(&0),
                },
            },
        );
        hierarchy.edges.push(Edge { source: attach_point.clone(), target: animal_node_id.clone() });
        add_child(&mut hierarchy, &attach_point, &animal_node_id);
    }

    recompute_subtree_counts(&mut hierarchy);
    Ok(hierarchy)
}

/// Bottom-up pass filling `children_count`/`animal_count` on taxonomic
/// nodes, since they can't be known until the whole tree is built.
fn recompute_subtree_counts(hierarchy: &mut Hierarchy) {
    let ids: Vec<String> = hierarchy.nodes.keys().cloned().collect();
    let mut animal_counts: HashMap<String, i64> = HashMap::new();

    fn subtree_animal_count(
        hierarchy: &Hierarchy,
        id: &str,
        memo: &mut HashMap<String, i64>,
    ) -> i64 {
        if let Some(&cached) = memo.get(id) {
            return cached;
        }
        let node = &hierarchy.nodes[id];
        let total = match &node.annotations {
            NodeAnnotations::Animal { capture_count, .. } => *capture_count,
            NodeAnnotations::Taxonomic { .. } => node
                .children
                .iter()
                .map(|c| subtree_animal_count(hierarchy, c, memo))
                .sum(),
        };
        memo.insert(id.to_string(), total);
        total
    }

    for id in &ids {
        let total = subtree_animal_count(hierarchy, id, &mut animal_counts);
        animal_counts.insert(id.clone(), total);
    }

    for id in ids {
        let children_count = hierarchy.nodes[&id].children.len();
        if let Some(node) = hierarchy.nodes.get_mut(&id) {
            if let NodeAnnotations::Taxonomic { animal_count, children_count: cc } = &mut node.annotations {
                *cc = children_count;
                *animal_count = animal_counts[&id];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_animal(id: Uuid, kingdom: &str, phylum: &str, species: &str) -> CanonicalAnimalRow {
        CanonicalAnimalRow {
            animal_id: id,
            scientific_name: species.to_string(),
            kingdom: Some(kingdom.to_string()),
            phylum: Some(phylum.to_string()),
            class: None,
            order_: None,
            family: None,
            genus: None,
            species: Some(species.to_string()),
            creation_index: 1,
            created_by_user_id: None,
            verified: true,
            verification_method: None,
            taxonomy_id: None,
            taxonomy_confidence: Some(0.5),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn shared_prefix_reuses_virtual_nodes() {
        let mut hierarchy = Hierarchy::default();
        ensure_root(&mut hierarchy);
        let mut sibling_counts = HashMap::new();

        let a1 = blank_animal(Uuid::new_v4(), "Animalia", "Chordata", "Vulpes vulpes");
        let a2 = blank_animal(Uuid::new_v4(), "Animalia", "Chordata", "Canis lupus");

        attach_animal_chain(&mut hierarchy, &mut sibling_counts, &a1);
        attach_animal_chain(&mut hierarchy, &mut sibling_counts, &a2);

        let kingdom_nodes: Vec<_> = hierarchy.nodes.values().filter(|n| n.rank == "kingdom").collect();
        assert_eq!(kingdom_nodes.len(), 1);
        let phylum_nodes: Vec<_> = hierarchy.nodes.values().filter(|n| n.rank == "phylum").collect();
        assert_eq!(phylum_nodes.len(), 1);
        assert_eq!(phylum_nodes[0].children.len(), 0);
    }

    #[test]
    fn every_node_gets_a_sibling_index_and_parent() {
        let mut hierarchy = Hierarchy::default();
        ensure_root(&mut hierarchy);
        let mut sibling_counts = HashMap::new();
        let a1 = blank_animal(Uuid::new_v4(), "Animalia", "Chordata", "Vulpes vulpes");
        attach_animal_chain(&mut hierarchy, &mut sibling_counts, &a1);

        for (id, node) in &hierarchy.nodes {
            if id == ROOT_ID {
                continue;
            }
            assert!(node.parent.is_some(), "{id} missing parent");
        }
    }
}
