//! Staging parse stage (spec §4.6 step 4): parses the ColDP TSV files into
//! the raw reference row table, batched and with per-row error isolation.
//!
//! Grounded on `col_importer.py::_parse_nameusage`/`_parse_namerelation`/
//! `_parse_vernacular_names`. Rust's `csv` crate grows its field buffer
//! dynamically rather than enforcing a fixed limit, so the platform-maximum
//! field-size bump the original needs (`csv.field_size_limit`) has no Rust
//! counterpart to configure — oversized fields are simply handled.

use crate::error::Result;
use dex_db::raw_rows::{insert_batch, NewRawRow};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

const BATCH_SIZE: usize = 5000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NameUsageRecord {
    #[serde(rename = "col:ID", default)]
    pub col_id: String,
    #[serde(rename = "col:parentID", default)]
    pub parent_id: String,
    #[serde(rename = "col:status", default)]
    pub status: String,
    #[serde(rename = "col:rank", default)]
    pub rank: String,
    #[serde(rename = "col:scientificName", default)]
    pub scientific_name: String,
    #[serde(rename = "col:authorship", default)]
    pub authorship: String,
    #[serde(rename = "col:kingdom", default)]
    pub kingdom: String,
    #[serde(rename = "col:phylum", default)]
    pub phylum: String,
    #[serde(rename = "col:class", default)]
    pub class_name: String,
    #[serde(rename = "col:order", default)]
    pub order: String,
    #[serde(rename = "col:family", default)]
    pub family: String,
    #[serde(rename = "col:subfamily", default)]
    pub subfamily: String,
    #[serde(rename = "col:tribe", default)]
    pub tribe: String,
    #[serde(rename = "col:genus", default)]
    pub genus: String,
    #[serde(rename = "col:subgenus", default)]
    pub subgenus: String,
    #[serde(rename = "col:species", default)]
    pub species: String,
    #[serde(rename = "col:subspecies", default)]
    pub subspecies: String,
    #[serde(rename = "col:variety", default)]
    pub variety: String,
    #[serde(rename = "col:form", default)]
    pub form: String,
    #[serde(rename = "col:genericName", default)]
    pub generic_name: String,
    #[serde(rename = "col:specificEpithet", default)]
    pub specific_epithet: String,
    #[serde(rename = "col:infraspecificEpithet", default)]
    pub infraspecific_epithet: String,
    #[serde(rename = "col:code", default)]
    pub code: String,
    #[serde(rename = "col:extinct", default)]
    pub extinct: String,
    #[serde(rename = "col:environment", default)]
    pub environment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NameRelationRecord {
    #[serde(rename = "col:nameID", default)]
    pub name_id: String,
    #[serde(rename = "col:relatedNameID", default)]
    pub related_name_id: String,
    #[serde(rename = "col:type", default)]
    pub relation_type: String,
    #[serde(rename = "col:sourceID", default)]
    pub source_id: String,
    #[serde(rename = "col:referenceID", default)]
    pub reference_id: String,
    #[serde(rename = "col:page", default)]
    pub page: String,
    #[serde(rename = "col:remarks", default)]
    pub remarks: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VernacularNameRecord {
    #[serde(rename = "col:taxonID", default)]
    pub taxon_id: String,
    #[serde(rename = "col:name", default)]
    pub name: String,
    #[serde(rename = "col:language", default)]
    pub language: String,
    #[serde(rename = "col:country", default)]
    pub country: String,
    #[serde(rename = "col:preferred", default)]
    pub preferred: String,
}

#[derive(Debug, Default)]
pub struct StagingStats {
    pub records_read: u64,
    pub records_imported: u64,
    pub records_errored: u64,
}

async fn insert_with_fallback(
    pool: &sqlx::PgPool,
    import_job_id: Uuid,
    batch: &[NewRawRow],
    errored: &mut u64,
) -> Result<()> {
    if insert_batch(pool, import_job_id, batch).await.is_ok() {
        return Ok(());
    }

    tracing::warn!(rows = batch.len(), "bulk insert failed, retrying rows individually");
    for row in batch {
        if insert_batch(pool, import_job_id, std::slice::from_ref(row)).await.is_err() {
            *errored += 1;
        }
    }
    Ok(())
}

pub async fn parse_name_usage(
    pool: &sqlx::PgPool,
    import_job_id: Uuid,
    file_path: &Path,
) -> Result<StagingStats> {
    tracing::info!(path = %file_path.display(), "parsing NameUsage.tsv");
    let mut reader = csv::ReaderBuilder::new().delimiter(b'\t').from_path(file_path)?;

    let mut stats = StagingStats::default();
    let mut batch: Vec<NewRawRow> = Vec::with_capacity(BATCH_SIZE);

    for result in reader.deserialize::<NameUsageRecord>() {
        stats.records_read += 1;
        let record = match result {
            Ok(r) => r,
            Err(err) => {
                stats.records_errored += 1;
                tracing::error!(%err, "failed to parse NameUsage row");
                continue;
            }
        };

        let col_id = record.col_id.clone();
        let columns = serde_json::to_value(&record).unwrap_or(serde_json::Value::Null);
        batch.push(NewRawRow { source: "col".to_string(), row_kind: "name_usage".to_string(), col_id, columns });
        stats.records_imported += 1;

        if batch.len() >= BATCH_SIZE {
            insert_with_fallback(pool, import_job_id, &batch, &mut stats.records_errored).await?;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_with_fallback(pool, import_job_id, &batch, &mut stats.records_errored).await?;
    }

    tracing::info!(
        read = stats.records_read,
        imported = stats.records_imported,
        errored = stats.records_errored,
        "NameUsage.tsv parsing complete"
    );
    Ok(stats)
}

pub async fn parse_name_relation(
    pool: &sqlx::PgPool,
    import_job_id: Uuid,
    file_path: &Path,
) -> Result<StagingStats> {
    tracing::info!(path = %file_path.display(), "parsing NameRelation.tsv");
    let mut reader = csv::ReaderBuilder::new().delimiter(b'\t').from_path(file_path)?;

    let mut stats = StagingStats::default();
    let mut batch: Vec<NewRawRow> = Vec::with_capacity(BATCH_SIZE);

    for result in reader.deserialize::<NameRelationRecord>() {
        stats.records_read += 1;
        let record = match result {
            Ok(r) => r,
            Err(err) => {
                stats.records_errored += 1;
                tracing::error!(%err, "failed to parse NameRelation row");
                continue;
            }
        };

        if record.name_id.is_empty() || record.related_name_id.is_empty() || record.relation_type.is_empty() {
            continue;
        }

        let col_id = record.name_id.clone();
        let columns = serde_json::to_value(&record).unwrap_or(serde_json::Value::Null);
        batch.push(NewRawRow { source: "col".to_string(), row_kind: "name_relation".to_string(), col_id, columns });
        stats.records_imported += 1;

        if batch.len() >= BATCH_SIZE {
            insert_with_fallback(pool, import_job_id, &batch, &mut stats.records_errored).await?;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_with_fallback(pool, import_job_id, &batch, &mut stats.records_errored).await?;
    }

    tracing::info!(
        imported = stats.records_imported,
        errored = stats.records_errored,
        "NameRelation.tsv parsing complete"
    );
    Ok(stats)
}

pub async fn parse_vernacular_names(
    pool: &sqlx::PgPool,
    import_job_id: Uuid,
    file_path: &Path,
) -> Result<StagingStats> {
    tracing::info!(path = %file_path.display(), "parsing VernacularName.tsv");
    let mut reader = csv::ReaderBuilder::new().delimiter(b'\t').from_path(file_path)?;

    let mut stats = StagingStats::default();
    let mut batch: Vec<NewRawRow> = Vec::with_capacity(BATCH_SIZE);

    for result in reader.deserialize::<VernacularNameRecord>() {
        stats.records_read += 1;
        let record = match result {
            Ok(r) => r,
            Err(err) => {
                stats.records_errored += 1;
                tracing::error!(%err, "failed to parse VernacularName row");
                continue;
            }
        };

        if record.taxon_id.is_empty() || record.name.is_empty() {
            continue;
        }

        let col_id = record.taxon_id.clone();
        let columns = serde_json::to_value(&record).unwrap_or(serde_json::Value::Null);
        batch.push(NewRawRow { source: "col".to_string(), row_kind: "vernacular_name".to_string(), col_id, columns });
        stats.records_imported += 1;

        if batch.len() >= BATCH_SIZE {
            insert_with_fallback(pool, import_job_id, &batch, &mut stats.records_errored).await?;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_with_fallback(pool, import_job_id, &batch, &mut stats.records_errored).await?;
    }

    tracing::info!(
        imported = stats.records_imported,
        errored = stats.records_errored,
        "VernacularName.tsv parsing complete"
    );
    Ok(stats)
}
