//! Conversion Store (C2) persistence: rows created by the Image Normalizer,
//! held with a TTL until bound to an analysis job.

use crate::types::{CreateConversionParams, ImageConversionRow};
use chrono::Utc;
use uuid::Uuid;

pub async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateConversionParams,
) -> Result<ImageConversionRow, sqlx::Error> {
    sqlx::query_as::<_, ImageConversionRow>(
        "INSERT INTO image_conversions (
            conv_id, user_id, original_bytes_ref, normalized_bytes_ref, original_format,
            original_width, original_height, converted_width, converted_height,
            transformations_applied, checksum, expires_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *",
    )
    .bind(params.conv_id)
    .bind(params.user_id)
    .bind(params.original_bytes_ref)
    .bind(params.normalized_bytes_ref)
    .bind(params.original_format)
    .bind(params.original_width)
    .bind(params.original_height)
    .bind(params.converted_width)
    .bind(params.converted_height)
    .bind(params.transformations_applied)
    .bind(params.checksum)
    .bind(params.expires_at)
    .fetch_one(executor)
    .await
}

/// Returns the conversion iff owned by `user_id`. Callers distinguish
/// "not found" from "expired" themselves using `expires_at`, matching the
/// `NotFound` vs. `Gone` split in spec §4.2.
pub async fn get(
    executor: impl sqlx::PgExecutor<'_>,
    conv_id: Uuid,
    user_id: Uuid,
) -> Result<Option<ImageConversionRow>, sqlx::Error> {
    sqlx::query_as::<_, ImageConversionRow>(
        "SELECT * FROM image_conversions WHERE conv_id = $1 AND user_id = $2",
    )
    .bind(conv_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Idempotent: binds the conversion, or is a no-op if already bound or gone.
/// Uses a plain UPDATE rather than select-for-update — Postgres's row-level
/// write lock on the UPDATE itself already serializes against a concurrent
/// `reap()` DELETE on the same row (spec §4.2's "transactional set-and-check").
pub async fn bind(executor: impl sqlx::PgExecutor<'_>, conv_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE image_conversions SET bound = TRUE WHERE conv_id = $1")
        .bind(conv_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Deletes expired-and-unbound rows, plus stale-and-never-bound rows older
/// than an hour (spec §4.2). Returns the number of rows removed.
pub async fn reap(executor: impl sqlx::PgExecutor<'_>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM image_conversions
         WHERE (NOT bound AND expires_at < NOW())
            OR (NOT bound AND created_at < NOW() - INTERVAL '1 hour')",
    )
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub fn is_expired(row: &ImageConversionRow) -> bool {
    row.expires_at < Utc::now()
}
