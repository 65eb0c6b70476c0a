use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

/// Batch lookup so event lists resolve creator names in one query.
pub async fn names_by_ids(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<HashMap<Uuid, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(Uuid, String)> =
        sqlx::query_as("SELECT id, name FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(db)
            .await?;
    Ok(rows.into_iter().collect())
}

pub async fn get_settings(db: &PgPool, user_id: Uuid) -> anyhow::Result<(bool, bool, bool)> {
    let row: (bool, bool, bool) = sqlx::query_as(
        "SELECT notify_messages, notify_files, notify_rsvps FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update_settings(
    db: &PgPool,
    user_id: Uuid,
    notify_messages: Option<bool>,
    notify_files: Option<bool>,
    notify_rsvps: Option<bool>,
) -> anyhow::Result<(bool, bool, bool)> {
    let row: (bool, bool, bool) = sqlx::query_as(
        "UPDATE users
         SET notify_messages = COALESCE($2, notify_messages),
             notify_files = COALESCE($3, notify_files),
             notify_rsvps = COALESCE($4, notify_rsvps)
         WHERE id = $1
         RETURNING notify_messages, notify_files, notify_rsvps",
    )
    .bind(user_id)
    .bind(notify_messages)
    .bind(notify_files)
    .bind(notify_rsvps)
    .fetch_one(db)
    .await?;
    Ok(row)
}
