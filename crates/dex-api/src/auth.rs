use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::{Authorization, Bearer};
use axum_extra::headers::HeaderMapExt;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// User identity extracted from the bearer token. JWT issuance/verification
/// is out of scope (spec §1's "out of scope" list) — the token IS the
/// caller's `user_id`, auto-provisioned in `dex_db::users` on first use.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Axum extractor requiring `Authorization: Bearer <user_id>`.
///
/// ```ignore
/// async fn my_handler(user: AuthUser, ...) -> Result<..., AppError> { ... }
/// ```
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = bearer_user_id(parts).ok_or(AppError::Unauthorized)?;
        let user = dex_db::users::ensure_user(&state.pool, user_id).await?;
        Ok(AuthUser { user_id: user.user_id })
    }
}

fn bearer_user_id(parts: &Parts) -> Option<Uuid> {
    let auth: Authorization<Bearer> = parts.headers.typed_get()?;
    Uuid::parse_str(auth.token()).ok()
}
