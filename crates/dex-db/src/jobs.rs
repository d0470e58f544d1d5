//! Analysis Job (C7) persistence.

use crate::types::{AnalysisJobRow, CreateJobParams, DetectedAnimal};
use uuid::Uuid;

pub async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateJobParams,
) -> Result<AnalysisJobRow, sqlx::Error> {
    sqlx::query_as::<_, AnalysisJobRow>(
        "INSERT INTO analysis_jobs (
            job_id, user_id, conversion_id, raw_image_ref, cv_method, model_name,
            detail_level, post_conversion_transformations
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *",
    )
    .bind(params.job_id)
    .bind(params.user_id)
    .bind(params.conversion_id)
    .bind(params.raw_image_ref)
    .bind(params.cv_method)
    .bind(params.model_name)
    .bind(params.detail_level)
    .bind(params.post_conversion_transformations)
    .fetch_one(executor)
    .await
}

pub async fn get(
    executor: impl sqlx::PgExecutor<'_>,
    job_id: Uuid,
) -> Result<Option<AnalysisJobRow>, sqlx::Error> {
    sqlx::query_as::<_, AnalysisJobRow>("SELECT * FROM analysis_jobs WHERE job_id = $1")
        .bind(job_id)
        .fetch_optional(executor)
        .await
}

/// Claims the oldest `pending` job and transitions it to `processing`, in
/// one statement so two worker instances can't claim the same row.
pub async fn claim_next_pending(
    executor: impl sqlx::PgExecutor<'_>,
) -> Result<Option<AnalysisJobRow>, sqlx::Error> {
    sqlx::query_as::<_, AnalysisJobRow>(
        "UPDATE analysis_jobs SET status = 'processing', updated_at = NOW()
         WHERE job_id = (
             SELECT job_id FROM analysis_jobs
             WHERE status = 'pending' AND (retry_after IS NULL OR retry_after <= NOW())
             ORDER BY created_at ASC
             FOR UPDATE SKIP LOCKED
             LIMIT 1
         )
         RETURNING *",
    )
    .fetch_optional(executor)
    .await
}

/// Reschedules a job after a `Transient` vision error (spec §4.7 step 3):
/// increments `retry_count` and pushes `retry_after` out by the caller's
/// backoff duration, leaving `status = pending` so `claim_next_pending`
/// picks it back up once the window elapses.
/// Binds a conversion onto a job whose image was submitted as a legacy raw
/// ref (spec §4.7 step 2, run once C1 has normalized it).
pub async fn attach_conversion(
    executor: impl sqlx::PgExecutor<'_>,
    job_id: Uuid,
    conversion_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE analysis_jobs SET conversion_id = $2, updated_at = NOW() WHERE job_id = $1")
        .bind(job_id)
        .bind(conversion_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn mark_retry_backoff(
    executor: impl sqlx::PgExecutor<'_>,
    job_id: Uuid,
    backoff: std::time::Duration,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE analysis_jobs
         SET status = 'pending', retry_count = retry_count + 1,
             retry_after = NOW() + make_interval(secs => $2), updated_at = NOW()
         WHERE job_id = $1",
    )
    .bind(job_id)
    .bind(backoff.as_secs_f64())
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn mark_failed(
    executor: impl sqlx::PgExecutor<'_>,
    job_id: Uuid,
    error_message: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE analysis_jobs
         SET status = 'failed', error_message = $2, updated_at = NOW()
         WHERE job_id = $1",
    )
    .bind(job_id)
    .bind(error_message)
    .execute(executor)
    .await?;
    Ok(())
}

pub struct CompleteJobParams {
    pub job_id: Uuid,
    pub raw_response: String,
    pub parsed_prediction: String,
    pub detected_animals: Vec<DetectedAnimal>,
    pub identified_animal: Option<Uuid>,
    pub cost_usd: f64,
    pub processing_time: f64,
    pub input_tokens: i32,
    pub output_tokens: i32,
}

pub async fn complete(
    executor: impl sqlx::PgExecutor<'_>,
    params: CompleteJobParams,
) -> Result<(), sqlx::Error> {
    let detected = serde_json::to_value(&params.detected_animals).unwrap_or(serde_json::json!([]));
    sqlx::query(
        "UPDATE analysis_jobs
         SET status = 'completed', raw_response = $2, parsed_prediction = $3,
             detected_animals = $4, identified_animal = $5, cost_usd = $6,
             processing_time = $7, input_tokens = $8, output_tokens = $9, updated_at = NOW()
         WHERE job_id = $1",
    )
    .bind(params.job_id)
    .bind(params.raw_response)
    .bind(params.parsed_prediction)
    .bind(detected)
    .bind(params.identified_animal)
    .bind(params.cost_usd)
    .bind(params.processing_time)
    .bind(params.input_tokens)
    .bind(params.output_tokens)
    .execute(executor)
    .await?;
    Ok(())
}

/// Client-initiated retry: only permitted when `status = failed`. Resets
/// status and clears `error_message` but preserves `retry_count` (spec §4.7).
pub async fn retry(
    executor: impl sqlx::PgExecutor<'_>,
    job_id: Uuid,
) -> Result<Option<AnalysisJobRow>, sqlx::Error> {
    sqlx::query_as::<_, AnalysisJobRow>(
        "UPDATE analysis_jobs
         SET status = 'pending', error_message = NULL, retry_after = NULL, updated_at = NOW()
         WHERE job_id = $1 AND status = 'failed'
         RETURNING *",
    )
    .bind(job_id)
    .fetch_optional(executor)
    .await
}

pub async fn select_animal(
    executor: impl sqlx::PgExecutor<'_>,
    job_id: Uuid,
    selected_index: i32,
    identified_animal: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE analysis_jobs
         SET selected_index = $2, identified_animal = $3, updated_at = NOW()
         WHERE job_id = $1",
    )
    .bind(job_id)
    .bind(selected_index)
    .bind(identified_animal)
    .execute(executor)
    .await?;
    Ok(())
}
