use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// RSVP row joined with the responding user's public fields.
#[derive(Debug, Clone, FromRow)]
pub struct RsvpWithUser {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub user_name: String,
    pub user_email: String,
}

const RSVP_USER_SELECT: &str = "SELECT r.id, r.user_id, r.event_id, r.status,
        r.created_at, r.updated_at, u.name AS user_name, u.email AS user_email
 FROM rsvps r
 JOIN users u ON u.id = r.user_id";

/// Create-or-update keyed by the (user, event) uniqueness constraint. A
/// repeated RSVP overwrites the status instead of adding a row.
pub async fn upsert(
    db: &PgPool,
    user_id: Uuid,
    event_id: Uuid,
    status: &str,
) -> anyhow::Result<RsvpWithUser> {
    let rsvp = sqlx::query_as::<_, RsvpWithUser>(
        "WITH upserted AS (
             INSERT INTO rsvps (user_id, event_id, status)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, event_id)
             DO UPDATE SET status = EXCLUDED.status, updated_at = now()
             RETURNING id, user_id, event_id, status, created_at, updated_at
         )
         SELECT r.id, r.user_id, r.event_id, r.status, r.created_at, r.updated_at,
                u.name AS user_name, u.email AS user_email
         FROM upserted r
         JOIN users u ON u.id = r.user_id",
    )
    .bind(user_id)
    .bind(event_id)
    .bind(status)
    .fetch_one(db)
    .await?;
    Ok(rsvp)
}

pub async fn list_for_event(db: &PgPool, event_id: Uuid) -> anyhow::Result<Vec<RsvpWithUser>> {
    let rows = sqlx::query_as::<_, RsvpWithUser>(&format!(
        "{RSVP_USER_SELECT} WHERE r.event_id = $1 ORDER BY r.created_at ASC"
    ))
    .bind(event_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// One query for a whole page of events; callers group by event_id.
pub async fn list_for_events(db: &PgPool, event_ids: &[Uuid]) -> anyhow::Result<Vec<RsvpWithUser>> {
    let rows = sqlx::query_as::<_, RsvpWithUser>(&format!(
        "{RSVP_USER_SELECT} WHERE r.event_id = ANY($1) ORDER BY r.created_at ASC"
    ))
    .bind(event_ids)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Everyone who has expressed interest in the event, regardless of status.
pub async fn user_ids_for_event(db: &PgPool, event_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> =
        sqlx::query_as("SELECT user_id FROM rsvps WHERE event_id = $1 ORDER BY created_at ASC")
            .bind(event_id)
            .fetch_all(db)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// RSVP joined with its event and the event creator's name, for the
/// dashboard's "events I answered" list.
#[derive(Debug, Clone, FromRow)]
pub struct RsvpWithEvent {
    pub id: Uuid,
    pub event_id: Uuid,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub event_title: String,
    pub event_location: String,
    pub event_date: OffsetDateTime,
    pub creator_id: Uuid,
    pub creator_name: String,
}

pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<RsvpWithEvent>> {
    let rows = sqlx::query_as::<_, RsvpWithEvent>(
        "SELECT r.id, r.event_id, r.status, r.created_at,
                e.title AS event_title, e.location AS event_location, e.date AS event_date,
                e.creator_id, u.name AS creator_name
         FROM rsvps r
         JOIN events e ON e.id = r.event_id
         JOIN users u ON u.id = e.creator_id
         WHERE r.user_id = $1
         ORDER BY r.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed_user(db: &PgPool, name: &str) -> Uuid {
        let (id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, 'x') RETURNING id",
        )
        .bind(name)
        .bind(format!("{}@example.com", name.to_lowercase()))
        .fetch_one(db)
        .await
        .unwrap();
        id
    }

    async fn seed_event(db: &PgPool, creator_id: Uuid) -> Uuid {
        let (id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO events (title, location, date, creator_id)
             VALUES ('Launch', 'HQ', $1, $2) RETURNING id",
        )
        .bind(OffsetDateTime::now_utc())
        .bind(creator_id)
        .fetch_one(db)
        .await
        .unwrap();
        id
    }

    async fn row_count(db: &PgPool, user_id: Uuid, event_id: Uuid) -> i64 {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM rsvps WHERE user_id = $1 AND event_id = $2")
                .bind(user_id)
                .bind(event_id)
                .fetch_one(db)
                .await
                .unwrap();
        count
    }

    #[sqlx::test]
    async fn repeated_rsvp_overwrites_instead_of_duplicating(pool: PgPool) {
        let creator = seed_user(&pool, "Creator").await;
        let guest = seed_user(&pool, "Guest").await;
        let event_id = seed_event(&pool, creator).await;

        let first = upsert(&pool, guest, event_id, "pending").await.unwrap();
        let second = upsert(&pool, guest, event_id, "attending").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.status, "attending");
        assert_eq!(row_count(&pool, guest, event_id).await, 1);
    }

    #[sqlx::test]
    async fn different_users_keep_separate_rows(pool: PgPool) {
        let creator = seed_user(&pool, "Creator").await;
        let alice = seed_user(&pool, "Alice").await;
        let bob = seed_user(&pool, "Bob").await;
        let event_id = seed_event(&pool, creator).await;

        upsert(&pool, alice, event_id, "attending").await.unwrap();
        upsert(&pool, bob, event_id, "declined").await.unwrap();

        assert_eq!(row_count(&pool, alice, event_id).await, 1);
        assert_eq!(row_count(&pool, bob, event_id).await, 1);
        assert_eq!(user_ids_for_event(&pool, event_id).await.unwrap().len(), 2);
    }
}
