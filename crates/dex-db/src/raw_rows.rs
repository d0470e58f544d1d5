//! Raw Reference Row staging (C6 Staging Parse / Normalization).
//!
//! Normalization must snapshot the set of unprocessed row IDs before it
//! starts iterating and mutating them — iterating a live query while marking
//! rows processed is the "live-queryset mutation bug" named in REDESIGN
//! FLAGS (rows shift out from under a paginated/live cursor mid-walk).
//! `unprocessed_ids` + `get_batch` exist precisely so callers take the
//! snapshot-then-iterate shape by construction.

use crate::types::RawReferenceRowRecord;
use uuid::Uuid;

pub struct NewRawRow {
    pub source: String,
    pub row_kind: String,
    pub col_id: String,
    pub columns: serde_json::Value,
}

pub async fn insert_batch(
    pool: &sqlx::PgPool,
    import_job_id: Uuid,
    rows: &[NewRawRow],
) -> Result<u64, sqlx::Error> {
    let mut inserted = 0u64;
    for chunk in rows.chunks(5000) {
        let mut tx = pool.begin().await?;
        for row in chunk {
            sqlx::query(
                "INSERT INTO raw_reference_rows (id, import_job_id, source, row_kind, col_id, columns, is_processed)
                 VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, FALSE)",
            )
            .bind(import_job_id)
            .bind(&row.source)
            .bind(&row.row_kind)
            .bind(&row.col_id)
            .bind(&row.columns)
            .execute(&mut *tx)
            .await?;
            inserted += 1;
        }
        tx.commit().await?;
    }
    Ok(inserted)
}

/// Snapshot of unprocessed row IDs for a given import job and kind, taken
/// once before normalization begins iterating.
pub async fn unprocessed_ids(
    executor: impl sqlx::PgExecutor<'_>,
    import_job_id: Uuid,
    row_kind: &str,
) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT id FROM raw_reference_rows
         WHERE import_job_id = $1 AND row_kind = $2 AND NOT is_processed
         ORDER BY id ASC",
    )
    .bind(import_job_id)
    .bind(row_kind)
    .fetch_all(executor)
    .await
}

pub async fn get_batch(
    executor: impl sqlx::PgExecutor<'_>,
    ids: &[Uuid],
) -> Result<Vec<RawReferenceRowRecord>, sqlx::Error> {
    sqlx::query_as::<_, RawReferenceRowRecord>(
        "SELECT * FROM raw_reference_rows WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(executor)
    .await
}

/// Marks a row processed, appending an error message to `processing_errors`
/// when normalization of that row failed (per-row error isolation — one bad
/// row never aborts the batch).
pub async fn mark_processed(
    executor: impl sqlx::PgExecutor<'_>,
    id: Uuid,
    error: Option<&str>,
) -> Result<(), sqlx::Error> {
    match error {
        Some(msg) => {
            sqlx::query(
                "UPDATE raw_reference_rows
                 SET is_processed = TRUE,
                     processing_errors = processing_errors::jsonb || to_jsonb($2::text)
                 WHERE id = $1",
            )
            .bind(id)
            .bind(msg)
            .execute(executor)
            .await?;
        }
        None => {
            sqlx::query("UPDATE raw_reference_rows SET is_processed = TRUE WHERE id = $1")
                .bind(id)
                .execute(executor)
                .await?;
        }
    }
    Ok(())
}
