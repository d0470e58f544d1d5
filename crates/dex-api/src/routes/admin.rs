//! Administrative operations (spec §4.8/§9): gated on `AppState::is_admin`.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Serialize)]
struct RecalculateResponse {
    animals_renumbered: u64,
}

/// `POST /api/v1/admin/animals/recalculate_creation_index`: renumbers every
/// canonical animal's `creation_index` by `(creation_index, created_at)`
/// order, repairing any gaps left by the upsert's retry-on-conflict path.
pub async fn recalculate_creation_index(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    if !state.is_admin(user.user_id) {
        return Err(AppError::Forbidden("administrator access required".to_string()));
    }
    let animals_renumbered = dex_db::canonical_animals::recalculate_creation_index(&state.pool).await?;
    Ok(axum::Json(RecalculateResponse { animals_renumbered }).into_response())
}
