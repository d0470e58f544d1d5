//! Taxonomy Reconciler (C5, §4.5): six-stage matcher over the reference
//! corpus, synonym resolution, field repair, and a 1-hour cache.
//!
//! Grounded on `original_source/server/taxonomy/services.py`'s stage order
//! and synonym fallback chain; `spec.md` §4.5 is more precise than the
//! original and takes precedence where the two diverge.

use crate::error::Result;
use crate::types::{ReconcileInput, ReconcileOutput};
use dex_cache::Cache;
use dex_db::{CanonicalAnimalRow, ReferenceTaxonRow};
use std::time::Duration;

const TAXONOMY_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Collapses whitespace, strips a trailing `sp.`/`spp.`, capitalizes the
/// genus, lowercases the species — the normalization rule used both for
/// matching and for the cache key (§4.5 "Caching").
pub fn normalize_scientific_name(genus: &str, species: &str, subspecies: Option<&str>) -> String {
    let mut parts: Vec<String> = vec![genus.trim().to_string(), species.trim().to_string()];
    if let Some(sub) = subspecies {
        let sub = sub.trim();
        if !sub.is_empty() {
            parts.push(sub.to_string());
        }
    }
    let joined = parts.join(" ");
    let collapsed: String = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    let collapsed = collapsed
        .trim_end_matches("spp.")
        .trim_end_matches("sp.")
        .trim()
        .to_string();

    let mut words = collapsed.split(' ');
    let mut out = Vec::new();
    if let Some(first) = words.next() {
        out.push(capitalize(first));
    }
    for word in words {
        out.push(word.to_lowercase());
    }
    out.join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Runs the six-stage matcher (first match wins), resolves synonyms, repairs
/// missing fields, and upserts a Canonical Animal from the resolved taxon
/// (§4.5 output contract; the upsert itself follows §4.8).
pub async fn reconcile(
    pool: &sqlx::PgPool,
    cache: &Cache,
    input: ReconcileInput,
    created_by_user_id: Option<uuid::Uuid>,
) -> Result<ReconcileOutput> {
    let normalized = normalize_scientific_name(&input.genus, &input.species, input.subspecies.as_deref());
    let cache_key = dex_cache::keys::taxonomy(&normalized, "all");

    if let Some(cached) = cache.get::<CachedReconcileResult>(&cache_key).await {
        return Ok(from_cached(pool, cached).await?);
    }

    let matched = run_stages(pool, &input).await?;

    let Some(matched) = matched else {
        let output = ReconcileOutput {
            taxon: None,
            created_canonical_animal: false,
            message: "no matching reference taxon found".to_string(),
        };
        cache
            .set(
                &cache_key,
                &CachedReconcileResult { taxon_id: None, message: output.message.clone() },
                TAXONOMY_CACHE_TTL,
            )
            .await;
        return Ok(output);
    };

    let (resolved, message) = resolve_synonym(pool, matched).await?;
    repair_fields_if_needed(pool, &resolved).await?;

    let (_, created) = dex_db::canonical_animals::upsert(
        pool,
        dex_db::UpsertCanonicalAnimalParams {
            scientific_name: resolved.scientific_name.clone(),
            kingdom: resolved.kingdom.clone(),
            phylum: resolved.phylum.clone(),
            class: resolved.class.clone(),
            order: resolved.order_.clone(),
            family: resolved.family.clone(),
            genus: resolved.genus.clone(),
            species: resolved.species.clone(),
            created_by_user_id,
            verification_method: Some("taxonomy".to_string()),
            taxonomy_id: Some(resolved.taxon_id),
        },
        resolved.confidence_score,
        Some(input.cv_confidence),
    )
    .await?;

    cache
        .set(
            &cache_key,
            &CachedReconcileResult { taxon_id: Some(resolved.taxon_id), message: message.clone() },
            TAXONOMY_CACHE_TTL,
        )
        .await;

    Ok(ReconcileOutput {
        taxon: Some(resolved),
        created_canonical_animal: created,
        message,
    })
}

#[derive(serde::Serialize, serde::Deserialize)]
struct CachedReconcileResult {
    taxon_id: Option<uuid::Uuid>,
    message: String,
}

async fn from_cached(pool: &sqlx::PgPool, cached: CachedReconcileResult) -> Result<ReconcileOutput> {
    let taxon = match cached.taxon_id {
        Some(id) => dex_db::reference_taxa::get(pool, id).await?,
        None => None,
    };
    Ok(ReconcileOutput {
        created_canonical_animal: false,
        taxon,
        message: cached.message,
    })
}

/// The six stages in order; returns the first non-empty candidate list's
/// head (already ordered by source priority / completeness / confidence).
async fn run_stages(
    pool: &sqlx::PgPool,
    input: &ReconcileInput,
) -> Result<Option<ReferenceTaxonRow>> {
    let subspecies = input.subspecies.as_deref();

    let exact_field = dex_db::reference_taxa::exact_field_match(pool, &input.genus, &input.species, subspecies).await?;
    if let Some(top) = exact_field.into_iter().next() {
        return Ok(Some(top));
    }

    let sci_name = normalize_scientific_name(&input.genus, &input.species, subspecies);
    let exact_sci = dex_db::reference_taxa::exact_scientific_name_match(pool, &sci_name).await?;
    if let Some(top) = exact_sci.into_iter().next() {
        return Ok(Some(top));
    }

    if let Some(common) = &input.common_name {
        let exact_common = dex_db::reference_taxa::common_name_match(pool, common, false).await?;
        if let Some(top) = exact_common.into_iter().next() {
            return Ok(Some(top));
        }
    }

    let fuzzy_field = dex_db::reference_taxa::fuzzy_field_match(pool, &input.genus, &input.species).await?;
    if !fuzzy_field.is_empty() {
        return Ok(Some(pick_fuzzy_field_candidate(fuzzy_field, subspecies)));
    }

    let fuzzy_sci = dex_db::reference_taxa::fuzzy_scientific_name_match(pool, &sci_name).await?;
    if let Some(top) = fuzzy_sci.into_iter().next() {
        return Ok(Some(top));
    }

    if let Some(common) = &input.common_name {
        let fuzzy_common = dex_db::reference_taxa::common_name_match(pool, common, true).await?;
        if let Some(top) = fuzzy_common.into_iter().next() {
            return Ok(Some(top));
        }
    }

    Ok(None)
}

/// Stage 4's ranking: (a) exact subspecies match, (b) containment match
/// (either contains the other), (c) rows with no subspecies — keep the
/// first non-empty bucket, candidates within a bucket already ordered by
/// the query.
fn pick_fuzzy_field_candidate(
    candidates: Vec<ReferenceTaxonRow>,
    subspecies: Option<&str>,
) -> ReferenceTaxonRow {
    if let Some(sub) = subspecies {
        let sub_lower = sub.to_lowercase();

        if let Some(exact) = candidates
            .iter()
            .find(|c| c.subspecies.as_deref().map(|s| s.to_lowercase()) == Some(sub_lower.clone()))
        {
            return exact.clone();
        }

        if let Some(containment) = candidates.iter().find(|c| {
            c.subspecies
                .as_deref()
                .map(|s| {
                    let s_lower = s.to_lowercase();
                    s_lower.contains(&sub_lower) || sub_lower.contains(&s_lower)
                })
                .unwrap_or(false)
        }) {
            return containment.clone();
        }

        if let Some(no_sub) = candidates.iter().find(|c| {
            c.subspecies.as_deref().map(str::is_empty).unwrap_or(true)
        }) {
            return no_sub.clone();
        }
    }

    candidates.into_iter().next().expect("candidates non-empty")
}

/// Resolves a `status = synonym` match to its accepted taxon, per the
/// fallback chain in §4.5.
async fn resolve_synonym(
    pool: &sqlx::PgPool,
    matched: ReferenceTaxonRow,
) -> Result<(ReferenceTaxonRow, String)> {
    if matched.status != "synonym" {
        return Ok((matched, "matched directly".to_string()));
    }

    if let Some(accepted_id) = matched.accepted_name {
        if let Some(accepted) = dex_db::reference_taxa::get(pool, accepted_id).await? {
            return Ok((accepted, "resolved synonym via accepted_name".to_string()));
        }
    }

    if let Some(relation) = dex_db::name_relations::find_accepted_fallback(pool, matched.taxon_id).await? {
        if let Some(accepted) = dex_db::reference_taxa::get(pool, relation.related_name_taxon).await? {
            return Ok((accepted, "resolved synonym via name relation".to_string()));
        }
    }

    let parts: Vec<&str> = matched.scientific_name.split_whitespace().collect();
    if parts.len() >= 3 {
        if let (Some(first), Some(last)) = (parts.first(), parts.last()) {
            if let Some(accepted) = dex_db::reference_taxa::find_accepted_by_genus_species(pool, first, last).await? {
                return Ok((accepted, "resolved synonym via <first> <last> heuristic".to_string()));
            }
        }
    }

    let message = "kept as unresolved synonym".to_string();
    Ok((matched, message))
}

/// Field repair (§4.5): parses `scientific_name` into parts to fill empty
/// `genus`/`specific_epithet`/`infraspecific_epithet`.
async fn repair_fields_if_needed(pool: &sqlx::PgPool, taxon: &ReferenceTaxonRow) -> Result<()> {
    let needs_repair = taxon.genus.as_deref().unwrap_or("").is_empty()
        || taxon.specific_epithet.as_deref().unwrap_or("").is_empty();
    if !needs_repair {
        return Ok(());
    }

    let parts: Vec<&str> = taxon
        .scientific_name
        .split_whitespace()
        .filter(|p| !p.starts_with('('))
        .collect();
    let genus = parts.first().copied().unwrap_or("");
    let species = parts.get(1).copied().unwrap_or("");
    let infraspecific = taxon
        .infraspecific_epithet
        .as_deref()
        .filter(|s| !s.is_empty())
        .or_else(|| parts.get(2).copied());

    dex_db::reference_taxa::repair_fields(pool, taxon.taxon_id, genus, species, infraspecific).await?;
    Ok(())
}

/// Re-exported so callers can branch on the upsert's `created` flag without
/// importing `dex_db` directly.
pub type CanonicalAnimal = CanonicalAnimalRow;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_whitespace_and_case() {
        assert_eq!(normalize_scientific_name("  vulpes", "VULPES", None), "Vulpes vulpes");
    }

    #[test]
    fn strips_trailing_sp_and_spp() {
        assert_eq!(normalize_scientific_name("Canis", "sp.", None), "Canis");
        assert_eq!(normalize_scientific_name("Canis", "spp.", None), "Canis");
    }

    #[test]
    fn includes_subspecies_when_present() {
        assert_eq!(
            normalize_scientific_name("Canis", "lupus", Some("familiaris")),
            "Canis lupus familiaris"
        );
    }
}
