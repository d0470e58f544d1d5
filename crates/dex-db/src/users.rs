//! User records. Users are created externally to the core (spec §3); this
//! module only supports lookups and the bootstrap insert used by tests and
//! by the API layer's bearer-token resolution.

use crate::types::UserRow;
use rand::Rng;
use uuid::Uuid;

/// Generate an 8-character uppercase alphanumeric friend code.
pub fn generate_friend_code() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| {
            let idx = rng.gen_range(0..ALPHABET.len());
            ALPHABET[idx] as char
        })
        .collect()
}

pub async fn ensure_user(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: Uuid,
) -> Result<UserRow, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (user_id, friend_code)
         VALUES ($1, $2)
         ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
         RETURNING user_id, friend_code, created_at",
    )
    .bind(user_id)
    .bind(generate_friend_code())
    .fetch_one(executor)
    .await
}

pub async fn get(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: Uuid,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        "SELECT user_id, friend_code, created_at FROM users WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn get_by_friend_code(
    executor: impl sqlx::PgExecutor<'_>,
    friend_code: &str,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        "SELECT user_id, friend_code, created_at FROM users WHERE friend_code = $1",
    )
    .bind(friend_code.to_uppercase())
    .fetch_optional(executor)
    .await
}

/// All user IDs, for the Tree Projector's `global` scope (spec §4.10).
pub async fn all_ids(executor: impl sqlx::PgExecutor<'_>) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar("SELECT user_id FROM users")
        .fetch_all(executor)
        .await
}
