//! Image Normalizer (C1) / Conversion Store (C2) HTTP surface:
//! `POST /images/convert`, `GET /images/convert/{id}/download` (spec §6).

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::constants::CONVERSION_TTL_SECS;
use crate::error::AppError;
use crate::state::AppState;
use dex_db::CreateConversionParams;
use dex_image::TransformRequest;

#[derive(Serialize)]
struct ConvertMetadata {
    original_format: String,
    original_size: usize,
    converted_size: usize,
    transformations_applied: Vec<String>,
    checksum: String,
}

#[derive(Serialize)]
struct ConvertResponse {
    id: Uuid,
    download_url: String,
    metadata: ConvertMetadata,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// `POST /images/convert`: multipart body with an `image` field (binary)
/// and an optional `transformations` field (JSON-encoded `TransformRequest`).
pub async fn convert(
    user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut image_bytes: Option<Vec<u8>> = None;
    let mut declared_mime = "application/octet-stream".to_string();
    let mut transform = TransformRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("image") => {
                declared_mime = field.content_type().unwrap_or("application/octet-stream").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read image field: {e}")))?;
                image_bytes = Some(bytes.to_vec());
            }
            Some("transformations") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read transformations field: {e}")))?;
                if !text.trim().is_empty() {
                    transform = serde_json::from_str(&text)
                        .map_err(|e| AppError::BadRequest(format!("invalid transformations: {e}")))?;
                }
            }
            _ => {}
        }
    }

    let image_bytes = image_bytes.ok_or_else(|| AppError::BadRequest("missing `image` field".to_string()))?;
    let original_size = image_bytes.len();

    let processed = dex_image::process(&image_bytes, &declared_mime, &transform)?;
    let checksum = dex_image::checksum_hex(&processed.png_bytes);
    let converted_size = processed.png_bytes.len();

    let original_id = Uuid::new_v4();
    let normalized_id = Uuid::new_v4();
    state.blobs.put(original_id, &image_bytes, "application/octet-stream").await?;
    state.blobs.put(normalized_id, &processed.png_bytes, "image/png").await?;

    let now = Utc::now();
    let expires_at = now + chrono::Duration::from_std(std::time::Duration::from_secs(CONVERSION_TTL_SECS)).unwrap();

    let conv = dex_db::conversions::create(
        &state.pool,
        CreateConversionParams {
            conv_id: Uuid::new_v4(),
            user_id: user.user_id,
            original_bytes_ref: original_id.to_string(),
            normalized_bytes_ref: normalized_id.to_string(),
            original_format: processed.original_format.clone(),
            original_width: processed.original_dims.0 as i32,
            original_height: processed.original_dims.1 as i32,
            converted_width: processed.processed_dims.0 as i32,
            converted_height: processed.processed_dims.1 as i32,
            transformations_applied: serde_json::to_value(&processed.transformations_applied).unwrap_or(serde_json::json!([])),
            checksum: checksum.clone(),
            expires_at,
        },
    )
    .await?;

    let body = ConvertResponse {
        id: conv.conv_id,
        download_url: format!("/api/v1/images/convert/{}/download", conv.conv_id),
        metadata: ConvertMetadata {
            original_format: conv.original_format.clone(),
            original_size,
            converted_size,
            transformations_applied: processed.transformations_applied,
            checksum,
        },
        created_at: conv.created_at,
        expires_at: conv.expires_at,
    };

    Ok((StatusCode::CREATED, axum::Json(body)).into_response())
}

/// `GET /images/convert/{id}/download`: binary PNG stream, or 410 if expired.
pub async fn download(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let conv = dex_db::conversions::get(&state.pool, id, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("conversion not found".to_string()))?;

    if dex_db::conversions::is_expired(&conv) {
        return Err(AppError::Gone("conversion has expired".to_string()));
    }

    let normalized_id = Uuid::parse_str(&conv.normalized_bytes_ref)
        .map_err(|_| AppError::Internal("corrupt conversion reference".to_string()))?;
    let bytes = state
        .blobs
        .get(normalized_id)
        .await
        .ok_or_else(|| AppError::NotFound("converted image missing from blob store".to_string()))?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from(bytes))
        .unwrap())
}
