use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Message row joined with the author's name. Messages are append-only;
/// there is no update or delete.
#[derive(Debug, Clone, FromRow)]
pub struct MessageWithUser {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub created_at: OffsetDateTime,
    pub user_name: String,
}

pub async fn list_for_event(db: &PgPool, event_id: Uuid) -> anyhow::Result<Vec<MessageWithUser>> {
    let rows = sqlx::query_as::<_, MessageWithUser>(
        "SELECT m.id, m.event_id, m.user_id, m.text, m.created_at, u.name AS user_name
         FROM messages m
         JOIN users u ON u.id = m.user_id
         WHERE m.event_id = $1
         ORDER BY m.created_at ASC",
    )
    .bind(event_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn insert(
    db: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
    text: &str,
) -> anyhow::Result<MessageWithUser> {
    let row = sqlx::query_as::<_, MessageWithUser>(
        "WITH inserted AS (
             INSERT INTO messages (event_id, user_id, text)
             VALUES ($1, $2, $3)
             RETURNING id, event_id, user_id, text, created_at
         )
         SELECT m.id, m.event_id, m.user_id, m.text, m.created_at, u.name AS user_name
         FROM inserted m
         JOIN users u ON u.id = m.user_id",
    )
    .bind(event_id)
    .bind(user_id)
    .bind(text)
    .fetch_one(db)
    .await?;
    Ok(row)
}
