//! Normalization stage (spec §4.6 step 5): snapshot-first transform of raw
//! rows into Reference Taxa, Name Relations, and Common Names.
//!
//! Grounded on `col_importer.py::transform_record`/`normalize_data` (status
//! and nomenclatural-code maps, completeness score) and
//! `base.py::normalize_data`'s snapshot-then-batch shape — the exact defect
//! named in REDESIGN FLAGS (a live, mutating queryset re-visiting or
//! skipping rows) is avoided here by `dex_db::raw_rows::unprocessed_ids`
//! taking its snapshot before any row is marked processed.

use crate::error::Result;
use crate::staging::{NameRelationRecord, NameUsageRecord, VernacularNameRecord};
use dex_db::types::UpsertReferenceTaxonParams;
use dex_db::{common_names, name_relations, raw_rows, reference_taxa};
use std::collections::HashMap;
use uuid::Uuid;

const BATCH_SIZE: usize = 1000;
const SOURCE: &str = "col";
const SOURCE_PRIORITY: i32 = 0;

#[derive(Debug, Default)]
pub struct NormalizeStats {
    pub records_imported: u64,
    pub records_failed: u64,
}

fn map_status(col_status: &str) -> &'static str {
    match col_status.to_lowercase().as_str() {
        "accepted" => "accepted",
        "provisionally accepted" => "provisional",
        "synonym" => "synonym",
        "ambiguous synonym" => "ambiguous",
        "misapplied" => "misapplied",
        _ => "doubtful",
    }
}

fn map_code(col_code: &str) -> Option<String> {
    match col_code.to_lowercase().as_str() {
        "botanical" => Some("icn".to_string()),
        "zoological" => Some("iczn".to_string()),
        "virus" => Some("ictv".to_string()),
        "bacterial" => Some("icnp".to_string()),
        _ => None,
    }
}

fn parse_environment(raw: &str) -> Vec<String> {
    let mut envs = Vec::new();
    for part in raw.split(',') {
        let lowered = part.trim().to_lowercase();
        let mapped = match lowered.as_str() {
            "marine" | "brackish" => Some("marine"),
            "terrestrial" => Some("terrestrial"),
            "freshwater" => Some("freshwater"),
            _ => None,
        };
        if let Some(m) = mapped {
            if !envs.iter().any(|e: &String| e == m) {
                envs.push(m.to_string());
            }
        }
    }
    envs
}

fn completeness_score(record: &NameUsageRecord) -> f64 {
    let fields = [
        &record.kingdom,
        &record.phylum,
        &record.class_name,
        &record.order,
        &record.family,
        &record.genus,
    ];
    let populated = fields.iter().filter(|f| !f.is_empty()).count();
    populated as f64 / fields.len() as f64
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn transform(record: &NameUsageRecord) -> UpsertReferenceTaxonParams {
    UpsertReferenceTaxonParams {
        source: SOURCE.to_string(),
        source_priority: SOURCE_PRIORITY,
        source_taxon_id: record.col_id.clone(),
        scientific_name: record.scientific_name.clone(),
        authorship: non_empty(&record.authorship),
        rank: record.rank.clone(),
        kingdom: non_empty(&record.kingdom),
        phylum: non_empty(&record.phylum),
        class: non_empty(&record.class_name),
        order: non_empty(&record.order),
        family: non_empty(&record.family),
        subfamily: non_empty(&record.subfamily),
        tribe: non_empty(&record.tribe),
        genus: non_empty(&record.genus),
        subgenus: non_empty(&record.subgenus),
        species: non_empty(&record.species),
        subspecies: non_empty(&record.subspecies),
        generic_name: non_empty(&record.generic_name),
        specific_epithet: non_empty(&record.specific_epithet),
        infraspecific_epithet: non_empty(&record.infraspecific_epithet),
        status: map_status(&record.status).to_string(),
        extinct: record.extinct.eq_ignore_ascii_case("true"),
        environment: parse_environment(&record.environment),
        nomenclatural_code: map_code(&record.code),
        parent_source_id: non_empty(&record.parent_id),
        source_url: Some(format!("https://www.catalogueoflife.org/data/taxon/{}", record.col_id)),
        completeness_score: completeness_score(record),
        confidence_score: 1.0,
    }
}

/// Normalizes `name_usage` raw rows into Reference Taxa. Snapshots the
/// unprocessed row IDs once, then walks them in fixed batches — the queryset
/// that drives iteration never changes underfoot.
pub async fn normalize_name_usage(pool: &sqlx::PgPool, import_job_id: Uuid) -> Result<NormalizeStats> {
    let snapshot = raw_rows::unprocessed_ids(pool, import_job_id, "name_usage").await?;
    tracing::info!(count = snapshot.len(), "normalizing NameUsage rows");

    let mut stats = NormalizeStats::default();
    for chunk in snapshot.chunks(BATCH_SIZE) {
        let rows = raw_rows::get_batch(pool, chunk).await?;
        for row in rows {
            let record: NameUsageRecord = match serde_json::from_value(row.columns.clone()) {
                Ok(r) => r,
                Err(err) => {
                    stats.records_failed += 1;
                    raw_rows::mark_processed(pool, row.id, Some(&err.to_string())).await?;
                    continue;
                }
            };

            let params = transform(&record);
            match reference_taxa::upsert(pool, params, None).await {
                Ok(_) => {
                    stats.records_imported += 1;
                    raw_rows::mark_processed(pool, row.id, None).await?;
                }
                Err(err) => {
                    stats.records_failed += 1;
                    tracing::error!(col_id = %row.col_id, %err, "failed to normalize NameUsage row");
                    raw_rows::mark_processed(pool, row.id, Some(&err.to_string())).await?;
                }
            }
        }
    }

    tracing::info!(imported = stats.records_imported, failed = stats.records_failed, "NameUsage normalization complete");
    Ok(stats)
}

fn build_taxon_lookup() -> HashMap<String, Uuid> {
    // Populated lazily by `resolve_taxon` as rows reference new source IDs —
    // name-relation/vernacular rows normalize after all name_usage rows, so
    // every referenced taxon is already durable in `reference_taxa`.
    HashMap::new()
}

async fn resolve_taxon(
    pool: &sqlx::PgPool,
    cache: &mut HashMap<String, Uuid>,
    source_taxon_id: &str,
) -> Result<Option<Uuid>> {
    if let Some(id) = cache.get(source_taxon_id) {
        return Ok(Some(*id));
    }
    let found = reference_taxa::get_by_source(pool, SOURCE, source_taxon_id).await?;
    Ok(found.map(|t| {
        cache.insert(source_taxon_id.to_string(), t.taxon_id);
        t.taxon_id
    }))
}

pub async fn normalize_name_relations(pool: &sqlx::PgPool, import_job_id: Uuid) -> Result<NormalizeStats> {
    let snapshot = raw_rows::unprocessed_ids(pool, import_job_id, "name_relation").await?;
    tracing::info!(count = snapshot.len(), "normalizing NameRelation rows");

    let mut stats = NormalizeStats::default();
    let mut taxon_cache = build_taxon_lookup();

    for chunk in snapshot.chunks(BATCH_SIZE) {
        let rows = raw_rows::get_batch(pool, chunk).await?;
        for row in rows {
            let record: NameRelationRecord = match serde_json::from_value(row.columns.clone()) {
                Ok(r) => r,
                Err(_) => {
                    stats.records_failed += 1;
                    raw_rows::mark_processed(pool, row.id, Some("malformed row")).await?;
                    continue;
                }
            };

            let name_tax = resolve_taxon(pool, &mut taxon_cache, &record.name_id).await?;
            let related_tax = resolve_taxon(pool, &mut taxon_cache, &record.related_name_id).await?;

            match (name_tax, related_tax) {
                (Some(name_id), Some(related_id)) => {
                    name_relations::insert(pool, name_id, related_id, &record.relation_type).await?;
                    stats.records_imported += 1;
                }
                _ => {
                    // referenced IDs absent from reference_taxa — skip per spec §4.6 step 4
                }
            }
            raw_rows::mark_processed(pool, row.id, None).await?;
        }
    }

    tracing::info!(imported = stats.records_imported, "NameRelation normalization complete");
    Ok(stats)
}

fn parse_preferred(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "t")
}

pub async fn normalize_vernacular_names(pool: &sqlx::PgPool, import_job_id: Uuid) -> Result<NormalizeStats> {
    let snapshot = raw_rows::unprocessed_ids(pool, import_job_id, "vernacular_name").await?;
    tracing::info!(count = snapshot.len(), "normalizing VernacularName rows");

    let mut stats = NormalizeStats::default();
    let mut taxon_cache = build_taxon_lookup();

    for chunk in snapshot.chunks(BATCH_SIZE) {
        let rows = raw_rows::get_batch(pool, chunk).await?;
        for row in rows {
            let record: VernacularNameRecord = match serde_json::from_value(row.columns.clone()) {
                Ok(r) => r,
                Err(_) => {
                    stats.records_failed += 1;
                    raw_rows::mark_processed(pool, row.id, Some("malformed row")).await?;
                    continue;
                }
            };

            let Some(taxon_id) = resolve_taxon(pool, &mut taxon_cache, &record.taxon_id).await? else {
                raw_rows::mark_processed(pool, row.id, None).await?;
                continue;
            };

            let mut language = record.language.clone();
            if language.is_empty() {
                language = "en".to_string();
            }
            language.truncate(10);

            let mut country = record.country.clone();
            country.truncate(2);
            let country = country.to_uppercase();

            common_names::upsert(pool, taxon_id, &record.name, &language, &country, parse_preferred(&record.preferred))
                .await?;
            stats.records_imported += 1;
            raw_rows::mark_processed(pool, row.id, None).await?;
        }
    }

    tracing::info!(imported = stats.records_imported, "VernacularName normalization complete");
    Ok(stats)
}
