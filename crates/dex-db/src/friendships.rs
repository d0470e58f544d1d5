//! Friendship records. Supplemented from `original_source/server/social/`:
//! spec.md's data model defines `Friendship` and the Tree Projector depends
//! on `accepted_friends(user)`, but full social CRUD is an explicit
//! Non-goal — this stays a minimal set-of-peers module (see SPEC_FULL.md).

use crate::types::FriendshipRow;
use uuid::Uuid;

pub async fn send_request(
    executor: impl sqlx::PgExecutor<'_>,
    from_user: Uuid,
    to_user: Uuid,
) -> Result<FriendshipRow, sqlx::Error> {
    sqlx::query_as::<_, FriendshipRow>(
        "INSERT INTO friendships (id, from_user, to_user, status)
         VALUES (gen_random_uuid(), $1, $2, 'pending')
         RETURNING *",
    )
    .bind(from_user)
    .bind(to_user)
    .fetch_one(executor)
    .await
}

pub async fn set_status(
    executor: impl sqlx::PgExecutor<'_>,
    from_user: Uuid,
    to_user: Uuid,
    status: &str,
) -> Result<Option<FriendshipRow>, sqlx::Error> {
    sqlx::query_as::<_, FriendshipRow>(
        "UPDATE friendships SET status = $3, updated_at = NOW()
         WHERE from_user = $1 AND to_user = $2
         RETURNING *",
    )
    .bind(from_user)
    .bind(to_user)
    .bind(status)
    .fetch_optional(executor)
    .await
}

/// Accepted friends of `user`, in either direction (friendship is
/// bidirectional once accepted — spec §3).
pub async fn accepted_friends(
    executor: impl sqlx::PgExecutor<'_>,
    user: Uuid,
) -> Result<Vec<Uuid>, sqlx::Error> {
    let ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT CASE WHEN from_user = $1 THEN to_user ELSE from_user END
         FROM friendships
         WHERE status = 'accepted' AND (from_user = $1 OR to_user = $1)",
    )
    .bind(user)
    .fetch_all(executor)
    .await?;
    Ok(ids)
}

pub async fn is_accepted_friend(
    executor: impl sqlx::PgExecutor<'_>,
    a: Uuid,
    b: Uuid,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM friendships
         WHERE status = 'accepted' AND ((from_user = $1 AND to_user = $2) OR (from_user = $2 AND to_user = $1))",
    )
    .bind(a)
    .bind(b)
    .fetch_one(executor)
    .await?;
    Ok(count > 0)
}
