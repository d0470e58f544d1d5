//! Observation Recorder (C8) HTTP surface: `POST /dex/entries`,
//! `GET /dex/entries/sync_entries` (spec §4.9, §6).

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::constants::{MAX_LOCATION_NAME_LENGTH, MAX_NOTES_LENGTH, SYNC_ALL_CACHE_TTL_SECS};
use crate::error::AppError;
use crate::state::AppState;
use dex_db::{ObservationRow, RecordObservationParams, Visibility};

#[derive(Deserialize)]
pub struct CreateEntryRequest {
    animal_id: Uuid,
    original_image_ref: Option<String>,
    processed_image_ref: Option<String>,
    image_checksum: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    location_name: Option<String>,
    notes: Option<String>,
    customizations: Option<serde_json::Value>,
    catch_date: Option<DateTime<Utc>>,
    #[serde(default)]
    visibility: String,
}

#[derive(Serialize)]
pub struct EntryResponse {
    observation_id: Uuid,
    owner_user_id: Uuid,
    animal_id: Uuid,
    dex_compatible_url: Option<String>,
    image_checksum: Option<String>,
    image_updated_at: DateTime<Utc>,
    lat: Option<f64>,
    lon: Option<f64>,
    location_name: Option<String>,
    notes: Option<String>,
    customizations: serde_json::Value,
    catch_date: DateTime<Utc>,
    visibility: String,
    is_favorite: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ObservationRow> for EntryResponse {
    fn from(row: ObservationRow) -> Self {
        let dex_compatible_url = row
            .processed_image_ref
            .as_ref()
            .and_then(|r| Uuid::parse_str(r).ok())
            .map(|id| format!("/api/v1/images/convert/{id}/download"));
        Self {
            observation_id: row.observation_id,
            owner_user_id: row.owner_user_id,
            animal_id: row.animal_id,
            dex_compatible_url,
            image_checksum: row.image_checksum.clone(),
            image_updated_at: row.updated_at,
            lat: row.lat,
            lon: row.lon,
            location_name: row.location_name.clone(),
            notes: row.notes.clone(),
            customizations: row.customizations.clone(),
            catch_date: row.catch_date,
            visibility: row.visibility.clone(),
            is_favorite: row.is_favorite,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn parse_visibility(s: &str) -> Result<Visibility, AppError> {
    match s {
        "" | "private" => Ok(Visibility::Private),
        "friends" => Ok(Visibility::Friends),
        "public" => Ok(Visibility::Public),
        other => Err(AppError::BadRequest(format!("unknown visibility `{other}`"))),
    }
}

/// `POST /dex/entries`: records an observation, then invalidates every tree
/// cache the owner appears in — their own plus each accepted friend's (spec
/// §4.9's post-commit cache-invalidation step).
pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    axum::Json(body): axum::Json<CreateEntryRequest>,
) -> Result<Response, AppError> {
    if let Some(notes) = &body.notes {
        crate::validation::validate_string_length(notes, 0, MAX_NOTES_LENGTH, "notes")?;
    }
    if let Some(name) = &body.location_name {
        crate::validation::validate_string_length(name, 0, MAX_LOCATION_NAME_LENGTH, "location_name")?;
    }
    let visibility = parse_visibility(&body.visibility)?;

    let row = dex_db::observations::record(
        &state.pool,
        RecordObservationParams {
            owner_user_id: user.user_id,
            animal_id: body.animal_id,
            original_image_ref: body.original_image_ref,
            processed_image_ref: body.processed_image_ref,
            image_checksum: body.image_checksum,
            lat: body.lat,
            lon: body.lon,
            location_name: body.location_name,
            notes: body.notes,
            customizations: body.customizations.unwrap_or_else(|| serde_json::json!({})),
            catch_date: body.catch_date,
            visibility,
        },
    )
    .await
    .map_err(|e| match e {
        dex_db::observations::RecordError::Duplicate => {
            AppError::Conflict("an observation for this animal on this catch date already exists".to_string())
        }
        dex_db::observations::RecordError::Database(e) => AppError::Database(e),
    })?;

    invalidate_owner_tree_caches(&state, user.user_id).await?;

    Ok((StatusCode::CREATED, axum::Json(EntryResponse::from(row))).into_response())
}

async fn invalidate_owner_tree_caches(state: &AppState, owner: Uuid) -> Result<(), AppError> {
    state
        .cache
        .delete_prefix(&dex_cache::keys::tree_owner_prefix(&owner.to_string()))
        .await;
    state.cache.delete(&dex_cache::keys::tree_friends(&owner.to_string())).await;
    state.cache.delete(&dex_cache::keys::tree_global()).await;

    let friends = dex_db::friendships::accepted_friends(&state.pool, owner).await?;
    for friend in friends {
        state
            .cache
            .delete(&dex_cache::keys::tree_friends(&friend.to_string()))
            .await;
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct SyncQuery {
    last_sync: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct SyncResponse {
    entries: Vec<EntryResponse>,
    synced_at: DateTime<Utc>,
}

/// `GET /dex/entries/sync_entries?last_sync=<ISO8601>`: incremental sync.
/// The unfiltered (`last_sync` absent) response is cached per user for
/// `SYNC_ALL_CACHE_TTL_SECS` since it's the expensive full-table case.
pub async fn sync_entries(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SyncQuery>,
) -> Result<Response, AppError> {
    if query.last_sync.is_none() {
        let cache_key = dex_cache::keys::dex_user_all(&user.user_id.to_string());
        if let Some(cached) = state.cache.get::<SyncResponse>(&cache_key).await {
            return Ok(axum::Json(cached).into_response());
        }

        let rows = dex_db::observations::updated_since(&state.pool, user.user_id, None).await?;
        let body = SyncResponse {
            entries: rows.into_iter().map(EntryResponse::from).collect(),
            synced_at: Utc::now(),
        };
        state
            .cache
            .set(cache_key, &body, Duration::from_secs(SYNC_ALL_CACHE_TTL_SECS))
            .await;
        return Ok(axum::Json(body).into_response());
    }

    let rows = dex_db::observations::updated_since(&state.pool, user.user_id, query.last_sync).await?;
    let body = SyncResponse {
        entries: rows.into_iter().map(EntryResponse::from).collect(),
        synced_at: Utc::now(),
    };
    Ok(axum::Json(body).into_response())
}
