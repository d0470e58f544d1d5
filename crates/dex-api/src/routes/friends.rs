//! Friend graph surface, supplementing the Tree Projector's `friends`/
//! `selected` scopes (spec §4.10 needs a way for callers to actually build a
//! friend list) — grounded on `dex_db::friendships`.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Serialize)]
struct FriendResponse {
    user_id: Uuid,
    friend_code: String,
}

#[derive(Serialize)]
struct MeResponse {
    user_id: Uuid,
    friend_code: String,
    created_at: DateTime<Utc>,
}

/// `GET /api/v1/me`: the caller's own profile, including their friend code.
pub async fn me(user: AuthUser, State(state): State<AppState>) -> Result<Response, AppError> {
    let row = dex_db::users::get(&state.pool, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;
    Ok(axum::Json(MeResponse {
        user_id: row.user_id,
        friend_code: row.friend_code,
        created_at: row.created_at,
    })
    .into_response())
}

/// `GET /api/v1/friends`: the caller's accepted friends.
pub async fn list(user: AuthUser, State(state): State<AppState>) -> Result<Response, AppError> {
    let ids = dex_db::friendships::accepted_friends(&state.pool, user.user_id).await?;
    let mut friends = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(row) = dex_db::users::get(&state.pool, id).await? {
            friends.push(FriendResponse { user_id: row.user_id, friend_code: row.friend_code });
        }
    }
    Ok(axum::Json(friends).into_response())
}

/// `POST /api/v1/friends/{friend_code}/request`: sends a friend request by
/// the target's friend code.
pub async fn send_request(
    user: AuthUser,
    State(state): State<AppState>,
    Path(friend_code): Path<String>,
) -> Result<Response, AppError> {
    let target = dex_db::users::get_by_friend_code(&state.pool, &friend_code)
        .await?
        .ok_or_else(|| AppError::NotFound("no user with that friend code".to_string()))?;
    if target.user_id == user.user_id {
        return Err(AppError::BadRequest("cannot friend yourself".to_string()));
    }
    let row = dex_db::friendships::send_request(&state.pool, user.user_id, target.user_id).await?;
    Ok(axum::Json(row).into_response())
}

/// `POST /api/v1/friends/{user_id}/accept`
pub async fn accept(
    user: AuthUser,
    State(state): State<AppState>,
    Path(from_user): Path<Uuid>,
) -> Result<Response, AppError> {
    let row = dex_db::friendships::set_status(&state.pool, from_user, user.user_id, "accepted")
        .await?
        .ok_or_else(|| AppError::NotFound("no pending request from that user".to_string()))?;
    Ok(axum::Json(row).into_response())
}

/// `POST /api/v1/friends/{user_id}/reject`
pub async fn reject(
    user: AuthUser,
    State(state): State<AppState>,
    Path(from_user): Path<Uuid>,
) -> Result<Response, AppError> {
    let row = dex_db::friendships::set_status(&state.pool, from_user, user.user_id, "rejected")
        .await?
        .ok_or_else(|| AppError::NotFound("no pending request from that user".to_string()))?;
    Ok(axum::Json(row).into_response())
}
