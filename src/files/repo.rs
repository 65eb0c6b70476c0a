use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct FileRecord {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    /// Key the storage provider needs to delete or re-fetch the object.
    pub provider_id: String,
    pub filename: String,
    pub uploaded_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct FileWithUser {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub provider_id: String,
    pub filename: String,
    pub uploaded_at: OffsetDateTime,
    pub user_name: String,
}

pub async fn insert(
    db: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
    url: &str,
    provider_id: &str,
    filename: &str,
) -> anyhow::Result<FileWithUser> {
    let row = sqlx::query_as::<_, FileWithUser>(
        "WITH inserted AS (
             INSERT INTO files (event_id, user_id, url, provider_id, filename)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, event_id, user_id, url, provider_id, filename, uploaded_at
         )
         SELECT f.id, f.event_id, f.user_id, f.url, f.provider_id, f.filename,
                f.uploaded_at, u.name AS user_name
         FROM inserted f
         JOIN users u ON u.id = f.user_id",
    )
    .bind(event_id)
    .bind(user_id)
    .bind(url)
    .bind(provider_id)
    .bind(filename)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn list_for_event(db: &PgPool, event_id: Uuid) -> anyhow::Result<Vec<FileWithUser>> {
    let rows = sqlx::query_as::<_, FileWithUser>(
        "SELECT f.id, f.event_id, f.user_id, f.url, f.provider_id, f.filename,
                f.uploaded_at, u.name AS user_name
         FROM files f
         JOIN users u ON u.id = f.user_id
         WHERE f.event_id = $1
         ORDER BY f.uploaded_at DESC",
    )
    .bind(event_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<FileRecord>> {
    let row = sqlx::query_as::<_, FileRecord>(
        "SELECT id, event_id, user_id, url, provider_id, filename, uploaded_at
         FROM files WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM files WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
