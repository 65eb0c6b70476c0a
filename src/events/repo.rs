use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Event record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub date: OffsetDateTime,
    pub creator_id: Uuid,
    pub created_at: OffsetDateTime,
}

const EVENT_COLUMNS: &str = "id, title, description, location, date, creator_id, created_at";

impl Event {
    pub async fn create(
        db: &PgPool,
        title: &str,
        description: Option<&str>,
        location: &str,
        date: OffsetDateTime,
        creator_id: Uuid,
    ) -> anyhow::Result<Event> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "INSERT INTO events (title, description, location, date, creator_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(title)
        .bind(description)
        .bind(location)
        .bind(date)
        .bind(creator_id)
        .fetch_one(db)
        .await?;
        Ok(event)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(event)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY date ASC"
        ))
        .fetch_all(db)
        .await?;
        Ok(events)
    }

    pub async fn list_by_creator(db: &PgPool, creator_id: Uuid) -> anyhow::Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE creator_id = $1 ORDER BY date ASC"
        ))
        .bind(creator_id)
        .fetch_all(db)
        .await?;
        Ok(events)
    }

    /// Events created by other users that `user_id` has not RSVP'd to yet.
    pub async fn list_unanswered_by_others(
        db: &PgPool,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE creator_id <> $1
               AND id NOT IN (SELECT event_id FROM rsvps WHERE user_id = $1)
             ORDER BY date ASC"
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(events)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        title: &str,
        description: Option<&str>,
        location: &str,
        date: OffsetDateTime,
    ) -> anyhow::Result<Event> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events
             SET title = $2, description = $3, location = $4, date = $5
             WHERE id = $1
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(location)
        .bind(date)
        .fetch_one(db)
        .await?;
        Ok(event)
    }

    /// RSVPs, messages and files go with the event via ON DELETE CASCADE;
    /// notifications keep a nulled event reference.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}
