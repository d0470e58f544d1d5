//! Import Job (C6) persistence — tracks Reference Importer pipeline state.

use crate::types::ImportJobRow;
use uuid::Uuid;

pub async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    source: &str,
    version: Option<&str>,
) -> Result<ImportJobRow, sqlx::Error> {
    sqlx::query_as::<_, ImportJobRow>(
        "INSERT INTO import_jobs (id, source, version, status)
         VALUES (gen_random_uuid(), $1, $2, 'pending')
         RETURNING *",
    )
    .bind(source)
    .bind(version)
    .fetch_one(executor)
    .await
}

/// Import Jobs are exclusive per source (spec §5): refuses to start a new
/// job if an active (non-terminal) one exists for the same source.
pub async fn active_for_source(
    executor: impl sqlx::PgExecutor<'_>,
    source: &str,
) -> Result<Option<ImportJobRow>, sqlx::Error> {
    sqlx::query_as::<_, ImportJobRow>(
        "SELECT * FROM import_jobs
         WHERE source = $1 AND status NOT IN ('completed', 'failed', 'cancelled')
         ORDER BY created_at DESC LIMIT 1",
    )
    .bind(source)
    .fetch_optional(executor)
    .await
}

pub async fn get(
    executor: impl sqlx::PgExecutor<'_>,
    id: Uuid,
) -> Result<Option<ImportJobRow>, sqlx::Error> {
    sqlx::query_as::<_, ImportJobRow>("SELECT * FROM import_jobs WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn set_status(
    executor: impl sqlx::PgExecutor<'_>,
    id: Uuid,
    status: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE import_jobs SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn set_file_info(
    executor: impl sqlx::PgExecutor<'_>,
    id: Uuid,
    file_path: &str,
    file_size: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE import_jobs SET file_path = $2, file_size = $3, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(file_path)
    .bind(file_size)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn record_progress(
    executor: impl sqlx::PgExecutor<'_>,
    id: Uuid,
    records_total: i64,
    records_imported: i64,
    records_failed: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE import_jobs
         SET records_total = $2, records_imported = $3, records_failed = $4, updated_at = NOW()
         WHERE id = $1",
    )
    .bind(id)
    .bind(records_total)
    .bind(records_imported)
    .bind(records_failed)
    .execute(executor)
    .await?;
    Ok(())
}

/// Appends error messages to `error_log`, capping the stored list at 50 and
/// logging the remainder via `tracing::warn!` at the call site (see
/// SPEC_FULL.md's "import job error log cap").
pub async fn append_errors(
    executor: impl sqlx::PgExecutor<'_>,
    id: Uuid,
    messages: &[String],
) -> Result<(), sqlx::Error> {
    let truncated: Vec<&str> = messages.iter().take(50).map(String::as_str).collect();
    sqlx::query(
        "UPDATE import_jobs
         SET error_log = (error_log::jsonb || to_jsonb($2::text[]))::jsonb, updated_at = NOW()
         WHERE id = $1",
    )
    .bind(id)
    .bind(&truncated)
    .execute(executor)
    .await?;
    Ok(())
}
