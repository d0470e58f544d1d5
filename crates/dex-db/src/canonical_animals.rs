//! Canonical Animal Upsert (§4.8): the catalog's species-level records.

use crate::types::{CanonicalAnimalRow, UpsertCanonicalAnimalParams};
use uuid::Uuid;

pub async fn get(
    executor: impl sqlx::PgExecutor<'_>,
    animal_id: Uuid,
) -> Result<Option<CanonicalAnimalRow>, sqlx::Error> {
    sqlx::query_as::<_, CanonicalAnimalRow>(
        "SELECT animal_id, scientific_name, kingdom, phylum, class, \"order\", family, genus,
                species, creation_index, created_by_user_id, verified, verification_method,
                taxonomy_id, taxonomy_confidence, created_at, updated_at
         FROM canonical_animals WHERE animal_id = $1",
    )
    .bind(animal_id)
    .fetch_optional(executor)
    .await
}

/// Batch fetch, for the Tree Projector's per-animal hierarchy walk (spec
/// §4.10) — avoids one round-trip per observed animal.
pub async fn get_many(
    executor: impl sqlx::PgExecutor<'_>,
    animal_ids: &[Uuid],
) -> Result<Vec<CanonicalAnimalRow>, sqlx::Error> {
    sqlx::query_as::<_, CanonicalAnimalRow>(
        "SELECT animal_id, scientific_name, kingdom, phylum, class, \"order\", family, genus,
                species, creation_index, created_by_user_id, verified, verification_method,
                taxonomy_id, taxonomy_confidence, created_at, updated_at
         FROM canonical_animals WHERE animal_id = ANY($1)",
    )
    .bind(animal_ids)
    .fetch_all(executor)
    .await
}

pub async fn get_by_scientific_name(
    executor: impl sqlx::PgExecutor<'_>,
    scientific_name: &str,
) -> Result<Option<CanonicalAnimalRow>, sqlx::Error> {
    sqlx::query_as::<_, CanonicalAnimalRow>(
        "SELECT animal_id, scientific_name, kingdom, phylum, class, \"order\", family, genus,
                species, creation_index, created_by_user_id, verified, verification_method,
                taxonomy_id, taxonomy_confidence, created_at, updated_at
         FROM canonical_animals WHERE scientific_name = $1",
    )
    .bind(scientific_name)
    .fetch_optional(executor)
    .await
}

/// Upserts by `scientific_name`. On insert, assigns `creation_index =
/// max(existing) + 1`; a unique-violation on `creation_index` under
/// concurrent inserts is retried (spec §4.8's "contention surface").
/// `taxonomy_confidence = max(cv_confidence, taxon.confidence)`.
pub async fn upsert(
    pool: &sqlx::PgPool,
    params: UpsertCanonicalAnimalParams,
    taxon_confidence: f64,
    cv_confidence: Option<f64>,
) -> Result<(CanonicalAnimalRow, bool), sqlx::Error> {
    if let Some(existing) = get_by_scientific_name(pool, &params.scientific_name).await? {
        return Ok((existing, false));
    }

    let taxonomy_confidence = taxon_confidence.max(cv_confidence.unwrap_or(0.0));

    for attempt in 0..5 {
        let mut tx = pool.begin().await?;
        let result = sqlx::query_as::<_, CanonicalAnimalRow>(
            r#"INSERT INTO canonical_animals (
                animal_id, scientific_name, kingdom, phylum, class, "order", family, genus,
                species, creation_index, created_by_user_id, verified, verification_method,
                taxonomy_id, taxonomy_confidence
            ) VALUES (
                gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7, $8,
                (SELECT COALESCE(MAX(creation_index), 0) + 1 FROM canonical_animals),
                $9, TRUE, $10, $11, $12
            )
            ON CONFLICT (scientific_name) DO UPDATE SET scientific_name = EXCLUDED.scientific_name
            RETURNING animal_id, scientific_name, kingdom, phylum, class, "order", family, genus,
                      species, creation_index, created_by_user_id, verified, verification_method,
                      taxonomy_id, taxonomy_confidence, created_at, updated_at"#,
        )
        .bind(&params.scientific_name)
        .bind(&params.kingdom)
        .bind(&params.phylum)
        .bind(&params.class)
        .bind(&params.order)
        .bind(&params.family)
        .bind(&params.genus)
        .bind(&params.species)
        .bind(params.created_by_user_id)
        .bind(&params.verification_method)
        .bind(params.taxonomy_id)
        .bind(taxonomy_confidence)
        .fetch_one(&mut *tx)
        .await;

        match result {
            Ok(row) => {
                tx.commit().await?;
                return Ok((row, true));
            }
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some("23505") && attempt < 4 =>
            {
                tx.rollback().await.ok();
                continue;
            }
            Err(e) => return Err(e),
        }
    }

    unreachable!("creation_index contention exceeded retry budget")
}

/// Administrative recompaction: renumbers by `(creation_index asc, created_at
/// asc)` using a two-phase (negative sentinel, then final) renumber to avoid
/// uniqueness violations mid-transaction (spec §4.8/§9).
pub async fn recalculate_creation_index(pool: &sqlx::PgPool) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT animal_id FROM canonical_animals ORDER BY creation_index ASC, created_at ASC",
    )
    .fetch_all(&mut *tx)
    .await?;

    for (i, id) in ids.iter().enumerate() {
        let sentinel = -(i as i64) - 1;
        sqlx::query("UPDATE canonical_animals SET creation_index = $2 WHERE animal_id = $1")
            .bind(id)
            .bind(sentinel)
            .execute(&mut *tx)
            .await?;
    }

    for (i, id) in ids.iter().enumerate() {
        let final_index = (i as i64) + 1;
        sqlx::query("UPDATE canonical_animals SET creation_index = $2 WHERE animal_id = $1")
            .bind(id)
            .bind(final_index)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(ids.len() as u64)
}
