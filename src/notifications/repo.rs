use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Newly inserted notification row; display projections are filled in by the
/// writer from data it already holds.
#[derive(Debug, FromRow)]
pub struct InsertedNotification {
    pub id: Uuid,
    pub read: bool,
    pub created_at: OffsetDateTime,
}

pub async fn insert(
    db: &PgPool,
    recipient_id: Uuid,
    category: &str,
    text: &str,
    event_id: Uuid,
    actor_id: Option<Uuid>,
) -> anyhow::Result<InsertedNotification> {
    let row = sqlx::query_as::<_, InsertedNotification>(
        "INSERT INTO notifications (user_id, category, text, event_id, actor_id)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, read, created_at",
    )
    .bind(recipient_id)
    .bind(category)
    .bind(text)
    .bind(event_id)
    .bind(actor_id)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Inbox row with event and actor projections joined in. Either side may be
/// gone (deleted event, deleted user); the view shows null there.
#[derive(Debug, FromRow)]
pub struct InboxRow {
    pub id: Uuid,
    pub category: String,
    pub text: String,
    pub read: bool,
    pub created_at: OffsetDateTime,
    pub event_id: Option<Uuid>,
    pub event_title: Option<String>,
    pub actor_id: Option<Uuid>,
    pub actor_name: Option<String>,
}

pub async fn list_recent(db: &PgPool, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<InboxRow>> {
    let rows = sqlx::query_as::<_, InboxRow>(
        "SELECT n.id, n.category, n.text, n.read, n.created_at,
                n.event_id, e.title AS event_title,
                n.actor_id, a.name AS actor_name
         FROM notifications n
         LEFT JOIN events e ON e.id = n.event_id
         LEFT JOIN users a ON a.id = n.actor_id
         WHERE n.user_id = $1
         ORDER BY n.created_at DESC
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Scoped to the owner: marking someone else's notification matches zero
/// rows and reports success, so ids can't be probed.
pub async fn mark_read(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<u64> {
    let res = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}

pub async fn mark_all_read(db: &PgPool, user_id: Uuid) -> anyhow::Result<u64> {
    let res = sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND read = FALSE")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
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
             VALUES ('Launch', 'HQ', now(), $1) RETURNING id",
        )
        .bind(creator_id)
        .fetch_one(db)
        .await
        .unwrap();
        id
    }

    async fn unread_count(db: &PgPool, user_id: Uuid) -> i64 {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .fetch_one(db)
        .await
        .unwrap();
        count
    }

    #[sqlx::test]
    async fn mark_all_read_leaves_other_users_untouched(pool: PgPool) {
        let alice = seed_user(&pool, "Alice").await;
        let bob = seed_user(&pool, "Bob").await;
        let event_id = seed_event(&pool, alice).await;

        insert(&pool, alice, "message", "a", event_id, None).await.unwrap();
        insert(&pool, alice, "file", "b", event_id, None).await.unwrap();
        insert(&pool, bob, "message", "c", event_id, None).await.unwrap();

        let touched = mark_all_read(&pool, alice).await.unwrap();

        assert_eq!(touched, 2);
        assert_eq!(unread_count(&pool, alice).await, 0);
        assert_eq!(unread_count(&pool, bob).await, 1);
    }

    #[sqlx::test]
    async fn mark_read_on_a_foreign_id_matches_nothing(pool: PgPool) {
        let alice = seed_user(&pool, "Alice").await;
        let bob = seed_user(&pool, "Bob").await;
        let event_id = seed_event(&pool, alice).await;

        let row = insert(&pool, bob, "rsvp", "c", event_id, None).await.unwrap();

        assert_eq!(mark_read(&pool, alice, row.id).await.unwrap(), 0);
        assert_eq!(unread_count(&pool, bob).await, 1);

        assert_eq!(mark_read(&pool, bob, row.id).await.unwrap(), 1);
        assert_eq!(unread_count(&pool, bob).await, 0);
    }
}
