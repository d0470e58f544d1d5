//! Job Executor (C7) HTTP surface: `POST /vision/jobs` and friends (spec §6).
//!
//! The worker (`dex-worker`) is the only process that drives a job through
//! `processing`; this module only creates, reads, and re-queues jobs.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;
use dex_db::{AnalysisJobRow, CreateJobParams};

#[derive(Deserialize)]
pub struct SubmitJobRequest {
    conversion_id: Option<Uuid>,
    /// Base64-encoded raw image bytes, for the legacy path where no prior
    /// `/images/convert` call was made.
    image: Option<String>,
    post_conversion_transformations: Option<serde_json::Value>,
    cv_method: String,
    model_name: String,
    detail_level: String,
}

#[derive(Deserialize)]
pub struct SelectAnimalRequest {
    animal_index: Option<i32>,
    animal_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct JobResponse {
    job_id: Uuid,
    status: String,
    cv_method: String,
    model_name: String,
    detail_level: String,
    detected_animals: Vec<dex_db::DetectedAnimal>,
    selected_animal_index: Option<i32>,
    identified_animal: Option<Uuid>,
    cost_usd: Option<f64>,
    processing_time: Option<f64>,
    input_tokens: Option<i32>,
    output_tokens: Option<i32>,
    error_message: Option<String>,
    dex_compatible_url: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl JobResponse {
    fn from_row(row: AnalysisJobRow) -> Self {
        let dex_compatible_url = row
            .conversion_id
            .map(|id| format!("/api/v1/images/convert/{id}/download"));
        Self {
            job_id: row.job_id,
            status: row.status.clone(),
            cv_method: row.cv_method.clone(),
            model_name: row.model_name.clone(),
            detail_level: row.detail_level.clone(),
            detected_animals: row.detected_animals(),
            selected_animal_index: row.selected_index,
            identified_animal: row.identified_animal,
            cost_usd: row.cost_usd,
            processing_time: row.processing_time,
            input_tokens: row.input_tokens,
            output_tokens: row.output_tokens,
            error_message: row.error_message.clone(),
            dex_compatible_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `POST /vision/jobs`: exactly one of `conversion_id`/`image` is required.
pub async fn submit(
    user: AuthUser,
    State(state): State<AppState>,
    axum::Json(body): axum::Json<SubmitJobRequest>,
) -> Result<Response, AppError> {
    if body.conversion_id.is_some() == body.image.is_some() {
        return Err(AppError::BadRequest(
            "exactly one of `conversion_id` or `image` is required".to_string(),
        ));
    }

    let raw_image_ref = match &body.image {
        Some(b64) => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(b64)
                .map_err(|e| AppError::BadRequest(format!("invalid base64 `image`: {e}")))?;
            let raw_id = Uuid::new_v4();
            state.blobs.put(raw_id, &bytes, "application/octet-stream").await?;
            Some(raw_id.to_string())
        }
        None => None,
    };

    if let Some(conv_id) = body.conversion_id {
        dex_db::conversions::get(&state.pool, conv_id, user.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("conversion not found".to_string()))?;
    }

    let job = dex_db::jobs::create(
        &state.pool,
        CreateJobParams {
            job_id: Uuid::new_v4(),
            user_id: user.user_id,
            conversion_id: body.conversion_id,
            raw_image_ref,
            cv_method: body.cv_method,
            model_name: body.model_name,
            detail_level: body.detail_level,
            post_conversion_transformations: body.post_conversion_transformations,
        },
    )
    .await?;

    if body.conversion_id.is_some() {
        dex_db::conversions::bind(&state.pool, body.conversion_id.unwrap()).await?;
    }

    Ok((StatusCode::CREATED, axum::Json(JobResponse::from_row(job))).into_response())
}

/// `GET /vision/jobs/{id}`
pub async fn get(
    user: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let job = owned_job(&state, job_id, user.user_id).await?;
    Ok(axum::Json(JobResponse::from_row(job)).into_response())
}

/// `POST /vision/jobs/{id}/select_animal`
pub async fn select_animal(
    user: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    axum::Json(body): axum::Json<SelectAnimalRequest>,
) -> Result<Response, AppError> {
    let job = owned_job(&state, job_id, user.user_id).await?;
    let detected = job.detected_animals();
    if detected.is_empty() {
        return Err(AppError::BadRequest("job has no detected animals".to_string()));
    }

    let index = if let Some(idx) = body.animal_index {
        idx
    } else if let Some(animal_id) = body.animal_id {
        detected
            .iter()
            .position(|d| d.animal_id == Some(animal_id))
            .map(|i| i as i32)
            .ok_or_else(|| AppError::BadRequest("animal_id not among detected animals".to_string()))?
    } else {
        return Err(AppError::BadRequest("one of `animal_index` or `animal_id` is required".to_string()));
    };

    let entity = detected
        .get(index as usize)
        .ok_or_else(|| AppError::BadRequest("animal_index out of bounds".to_string()))?;
    let animal_id = entity
        .animal_id
        .ok_or_else(|| AppError::BadRequest("selected entity has no resolved animal".to_string()))?;

    dex_db::jobs::select_animal(&state.pool, job_id, index, animal_id).await?;
    let job = dex_db::jobs::get(&state.pool, job_id).await?.expect("just updated");
    Ok(axum::Json(JobResponse::from_row(job)).into_response())
}

/// `POST /vision/jobs/{id}/retry`: only permitted when `status = failed`.
pub async fn retry(
    user: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Response, AppError> {
    owned_job(&state, job_id, user.user_id).await?;
    let job = dex_db::jobs::retry(&state.pool, job_id)
        .await?
        .ok_or_else(|| AppError::Conflict("job is not in a failed state".to_string()))?;
    Ok(axum::Json(JobResponse::from_row(job)).into_response())
}

async fn owned_job(state: &AppState, job_id: Uuid, user_id: Uuid) -> Result<AnalysisJobRow, AppError> {
    let job = dex_db::jobs::get(&state.pool, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("job not found".to_string()))?;
    if job.user_id != user_id {
        return Err(AppError::NotFound("job not found".to_string()));
    }
    Ok(job)
}
