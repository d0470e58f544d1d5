//! One worker pass over a single Analysis Job (C7, spec §4.7).
//!
//! Claims the oldest pending job, normalizes a legacy raw image if no
//! conversion is attached yet, runs the Vision Client, parses the
//! prediction, reconciles each detected entity against the taxonomy corpus,
//! and persists the result. Grounded on `observing-ingester`'s event-match
//! shape for the outer dispatch, with the step order taken from spec §4.7's
//! worker pass.

use crate::error::{Result, WorkerError};
use crate::types::WorkerStats;
use dex_cache::Cache;
use dex_db::{AnalysisJobRow, CompleteJobParams, CreateConversionParams, DetectedAnimal};
use dex_image::{BlobStore, TransformRequest};
use dex_taxonomy::{ReconcileInput, ReconcileOutput};
use dex_vision::{DetailLevel, VisionError, VisionProvider};
use sqlx::PgPool;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// A legacy job has no `normalized_bytes_ref` yet to guide MIME detection;
/// every raw image submitted through that path in practice is a JPEG.
const LEGACY_RAW_IMAGE_MIME: &str = "image/jpeg";

const CONVERSION_TTL: Duration = Duration::from_secs(60 * 10);
const MAX_RETRIES: i32 = 3;

pub struct PassOutcome {
    pub job_id: Uuid,
    pub outcome: &'static str,
    pub detected_count: usize,
}

/// Claims and runs one job. Returns `Ok(None)` if there was nothing pending.
pub async fn run_one_pass(
    pool: &PgPool,
    cache: &Cache,
    blobs: &BlobStore,
    vision: &dyn VisionProvider,
    stats: &mut WorkerStats,
) -> Result<Option<PassOutcome>> {
    let Some(job) = dex_db::jobs::claim_next_pending(pool).await? else {
        return Ok(None);
    };

    let job_id = job.job_id;
    match process_job(pool, cache, blobs, vision, job, stats).await {
        Ok(outcome) => Ok(Some(outcome)),
        Err(err) => {
            warn!(job_id = %job_id, error = %err, "worker pass failed");
            stats.errors += 1;
            dex_db::jobs::mark_failed(pool, job_id, &err.to_string()).await?;
            stats.jobs_failed += 1;
            Ok(Some(PassOutcome { job_id, outcome: "failed", detected_count: 0 }))
        }
    }
}

async fn process_job(
    pool: &PgPool,
    cache: &Cache,
    blobs: &BlobStore,
    vision: &dyn VisionProvider,
    mut job: AnalysisJobRow,
    stats: &mut WorkerStats,
) -> Result<PassOutcome> {
    if job.conversion_id.is_none() {
        let conv_id = normalize_legacy_image(pool, blobs, &job).await?;
        dex_db::jobs::attach_conversion(pool, job.job_id, conv_id).await?;
        job.conversion_id = Some(conv_id);
    }

    let conversion_id = job.conversion_id.expect("attached above");
    let conversion = dex_db::conversions::get(pool, conversion_id, job.user_id)
        .await?
        .ok_or_else(|| WorkerError::Config(format!("conversion {conversion_id} vanished before analysis")))?;

    let normalized_ref = Uuid::parse_str(&conversion.normalized_bytes_ref)
        .map_err(|e| WorkerError::Config(format!("invalid normalized_bytes_ref: {e}")))?;
    let image_bytes = blobs
        .get(normalized_ref)
        .await
        .ok_or_else(|| WorkerError::Config(format!("normalized image {normalized_ref} missing from blob store")))?;

    let detail = match job.detail_level.as_str() {
        "low" => DetailLevel::Low,
        "high" => DetailLevel::High,
        _ => DetailLevel::Auto,
    };

    let identification = match vision.identify(&image_bytes, &job.model_name, detail).await {
        Ok(identification) => identification,
        Err(VisionError::Transient(msg)) => {
            if job.retry_count >= MAX_RETRIES {
                dex_db::jobs::mark_failed(pool, job.job_id, &msg).await?;
                stats.jobs_failed += 1;
                return Ok(PassOutcome { job_id: job.job_id, outcome: "failed", detected_count: 0 });
            }
            let backoff = Duration::from_secs(60 * 2u64.pow(job.retry_count.max(0) as u32));
            dex_db::jobs::mark_retry_backoff(pool, job.job_id, backoff).await?;
            stats.jobs_retried += 1;
            info!(job_id = %job.job_id, backoff_secs = backoff.as_secs(), "vision call transiently failed, backing off");
            return Ok(PassOutcome { job_id: job.job_id, outcome: "retrying", detected_count: 0 });
        }
        Err(VisionError::Fatal(msg)) => {
            dex_db::jobs::mark_failed(pool, job.job_id, &msg).await?;
            stats.jobs_failed += 1;
            return Ok(PassOutcome { job_id: job.job_id, outcome: "failed", detected_count: 0 });
        }
    };

    let entities = dex_vision::parse(&identification.prediction);
    let mut detected = Vec::with_capacity(entities.len());
    for entity in &entities {
        let animal = reconcile_entity(pool, cache, entity, job.user_id).await?;
        if animal.is_new {
            stats.animals_created += 1;
        }
        detected.push(animal);
    }

    let identified_animal = detected.first().and_then(|d| d.animal_id);
    dex_db::jobs::complete(
        pool,
        CompleteJobParams {
            job_id: job.job_id,
            raw_response: identification.raw_response.to_string(),
            parsed_prediction: identification.prediction.clone(),
            detected_animals: detected.clone(),
            identified_animal,
            cost_usd: identification.cost_usd,
            processing_time: identification.processing_time.as_secs_f64(),
            input_tokens: identification.input_tokens as i32,
            output_tokens: identification.output_tokens as i32,
        },
    )
    .await?;

    stats.jobs_completed += 1;
    Ok(PassOutcome { job_id: job.job_id, outcome: "completed", detected_count: detected.len() })
}

async fn reconcile_entity(
    pool: &PgPool,
    cache: &Cache,
    entity: &dex_vision::DetectedEntity,
    user_id: Uuid,
) -> Result<DetectedAnimal> {
    let input = ReconcileInput {
        genus: entity.genus.clone(),
        species: entity.species.clone(),
        subspecies: entity.subspecies.clone(),
        common_name: entity.common_name.clone(),
        cv_confidence: entity.confidence,
    };

    let ReconcileOutput { taxon, created_canonical_animal, .. } =
        dex_taxonomy::reconcile(pool, cache, input, Some(user_id)).await?;

    let Some(taxon) = taxon else {
        return Ok(DetectedAnimal {
            scientific_name: format!("{} {}", entity.genus, entity.species),
            common_name: entity.common_name.clone(),
            confidence: entity.confidence,
            animal_id: None,
            is_new: false,
        });
    };

    let animal = dex_db::canonical_animals::get_by_scientific_name(pool, &taxon.scientific_name).await?;

    Ok(DetectedAnimal {
        scientific_name: taxon.scientific_name.clone(),
        common_name: entity.common_name.clone(),
        confidence: entity.confidence,
        animal_id: animal.map(|a| a.animal_id),
        is_new: created_canonical_animal,
    })
}

/// Normalizes a raw image submitted without an upfront conversion (the
/// legacy `raw_image_ref` path, spec §4.7 step 2) and stores the resulting
/// `image_conversions` row, returning its id.
async fn normalize_legacy_image(pool: &PgPool, blobs: &BlobStore, job: &AnalysisJobRow) -> Result<Uuid> {
    let raw_ref = job
        .raw_image_ref
        .as_deref()
        .ok_or_else(|| WorkerError::Config(format!("job {} has neither conversion_id nor raw_image_ref", job.job_id)))?;
    let raw_id = Uuid::parse_str(raw_ref).map_err(|e| WorkerError::Config(format!("invalid raw_image_ref: {e}")))?;
    let raw_bytes = blobs
        .get(raw_id)
        .await
        .ok_or_else(|| WorkerError::Config(format!("raw image {raw_id} missing from blob store")))?;

    let transform: TransformRequest = job
        .post_conversion_transformations
        .as_ref()
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    let processed = dex_image::process(&raw_bytes, LEGACY_RAW_IMAGE_MIME, &transform)?;
    let checksum = dex_image::checksum_hex(&processed.png_bytes);

    let normalized_id = Uuid::new_v4();
    blobs.put(normalized_id, &processed.png_bytes, "image/png").await?;

    let conv = dex_db::conversions::create(
        pool,
        CreateConversionParams {
            conv_id: Uuid::new_v4(),
            user_id: job.user_id,
            original_bytes_ref: raw_id.to_string(),
            normalized_bytes_ref: normalized_id.to_string(),
            original_format: processed.original_format.clone(),
            original_width: processed.original_dims.0 as i32,
            original_height: processed.original_dims.1 as i32,
            converted_width: processed.processed_dims.0 as i32,
            converted_height: processed.processed_dims.1 as i32,
            transformations_applied: serde_json::to_value(&processed.transformations_applied).unwrap_or(serde_json::json!([])),
            checksum,
            expires_at: chrono::Utc::now() + chrono::Duration::from_std(CONVERSION_TTL).unwrap(),
        },
    )
    .await?;

    dex_db::conversions::bind(pool, conv.conv_id).await?;
    Ok(conv.conv_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_raw_image_mime_is_jpeg() {
        assert_eq!(LEGACY_RAW_IMAGE_MIME, "image/jpeg");
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let backoffs: Vec<u64> = (0..MAX_RETRIES).map(|n| 60 * 2u64.pow(n as u32)).collect();
        assert_eq!(backoffs, vec![60, 120, 240]);
    }
}
