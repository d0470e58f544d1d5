//! Observation Recorder (C8) persistence.

use crate::types::{ObservationRow, RecordObservationParams, Visibility};
use chrono::Utc;
use uuid::Uuid;

#[derive(Debug)]
pub enum RecordError {
    Duplicate,
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RecordError {
    fn from(e: sqlx::Error) -> Self {
        RecordError::Database(e)
    }
}

/// Enforces `(owner, animal, catch_date)` uniqueness (spec §3); defaults
/// `catch_date` to now if unset. Does not itself invalidate caches — the
/// caller (the API layer, after the transaction commits) emits the
/// cache-invalidation event, per the post-commit-scheduling redesign (§9).
pub async fn record(
    executor: impl sqlx::PgExecutor<'_>,
    params: RecordObservationParams,
) -> Result<ObservationRow, RecordError> {
    let catch_date = params.catch_date.unwrap_or_else(Utc::now);

    let result = sqlx::query_as::<_, ObservationRow>(
        "INSERT INTO observations (
            observation_id, owner_user_id, animal_id, original_image_ref, processed_image_ref,
            image_checksum, lat, lon, location_name, notes, customizations, catch_date, visibility
        ) VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *",
    )
    .bind(params.owner_user_id)
    .bind(params.animal_id)
    .bind(params.original_image_ref)
    .bind(params.processed_image_ref)
    .bind(params.image_checksum)
    .bind(params.lat)
    .bind(params.lon)
    .bind(params.location_name)
    .bind(params.notes)
    .bind(params.customizations)
    .bind(catch_date)
    .bind(params.visibility.as_str())
    .fetch_one(executor)
    .await;

    match result {
        Ok(row) => Ok(row),
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
            Err(RecordError::Duplicate)
        }
        Err(e) => Err(RecordError::Database(e)),
    }
}

pub async fn get(
    executor: impl sqlx::PgExecutor<'_>,
    observation_id: Uuid,
) -> Result<Option<ObservationRow>, sqlx::Error> {
    sqlx::query_as::<_, ObservationRow>("SELECT * FROM observations WHERE observation_id = $1")
        .bind(observation_id)
        .fetch_optional(executor)
        .await
}

pub async fn delete(
    executor: impl sqlx::PgExecutor<'_>,
    observation_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM observations WHERE observation_id = $1")
        .bind(observation_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Applies the read-side visibility invariant (spec §6): visible iff
/// requester is owner, visibility is public, or visibility is friends and
/// requester is an accepted friend of the owner.
pub fn is_visible_to(row: &ObservationRow, requester: Uuid, is_accepted_friend: bool) -> bool {
    row.owner_user_id == requester
        || row.visibility == Visibility::Public.as_str()
        || (row.visibility == Visibility::Friends.as_str() && is_accepted_friend)
}

/// All distinct animal IDs observed by any of `scoped_users`, with each
/// animal's scoped observation count — the Tree Projector's animal fetch
/// (spec §4.10).
pub async fn scoped_animal_counts(
    executor: impl sqlx::PgExecutor<'_>,
    scoped_users: &[Uuid],
) -> Result<Vec<(Uuid, i64)>, sqlx::Error> {
    let rows: Vec<(Uuid, i64)> = sqlx::query_as(
        "SELECT animal_id, COUNT(*) FROM observations
         WHERE owner_user_id = ANY($1)
         GROUP BY animal_id",
    )
    .bind(scoped_users)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

/// Observers of an animal within `scoped_users`, for the
/// `captured_by_friends` node annotation.
pub async fn scoped_observers(
    executor: impl sqlx::PgExecutor<'_>,
    animal_id: Uuid,
    scoped_users: &[Uuid],
) -> Result<Vec<ObservationRow>, sqlx::Error> {
    sqlx::query_as::<_, ObservationRow>(
        "SELECT * FROM observations
         WHERE animal_id = $1 AND owner_user_id = ANY($2)
         ORDER BY catch_date ASC",
    )
    .bind(animal_id)
    .bind(scoped_users)
    .fetch_all(executor)
    .await
}

pub async fn updated_since(
    executor: impl sqlx::PgExecutor<'_>,
    owner_user_id: Uuid,
    since: Option<chrono::DateTime<Utc>>,
) -> Result<Vec<ObservationRow>, sqlx::Error> {
    match since {
        Some(ts) => {
            sqlx::query_as::<_, ObservationRow>(
                "SELECT * FROM observations WHERE owner_user_id = $1 AND updated_at > $2
                 ORDER BY updated_at ASC",
            )
            .bind(owner_user_id)
            .bind(ts)
            .fetch_all(executor)
            .await
        }
        None => {
            sqlx::query_as::<_, ObservationRow>(
                "SELECT * FROM observations WHERE owner_user_id = $1 ORDER BY updated_at ASC",
            )
            .bind(owner_user_id)
            .fetch_all(executor)
            .await
        }
    }
}
