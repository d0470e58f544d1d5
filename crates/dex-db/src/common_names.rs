//! Vernacular/common names attached to Reference Taxa.

use crate::types::CommonNameRow;
use uuid::Uuid;

pub async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    taxon: Uuid,
    name: &str,
    language: &str,
    country: &str,
    is_preferred: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO common_names (id, taxon, name, language, country, is_preferred)
         VALUES (gen_random_uuid(), $1, $2, $3, $4, $5)
         ON CONFLICT (taxon, name, language, country) DO UPDATE SET
             is_preferred = EXCLUDED.is_preferred OR common_names.is_preferred",
    )
    .bind(taxon)
    .bind(name)
    .bind(language)
    .bind(country)
    .bind(is_preferred)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn for_taxon(
    executor: impl sqlx::PgExecutor<'_>,
    taxon: Uuid,
) -> Result<Vec<CommonNameRow>, sqlx::Error> {
    sqlx::query_as::<_, CommonNameRow>(
        "SELECT * FROM common_names WHERE taxon = $1 ORDER BY is_preferred DESC",
    )
    .bind(taxon)
    .fetch_all(executor)
    .await
}
