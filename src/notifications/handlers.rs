use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{dto::UserRef, AuthUser},
    error::ApiError,
    state::AppState,
};

use super::dto::{EventRef, NotificationCategory, NotificationView};
use super::repo;

const INBOX_PAGE_SIZE: i64 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/read/:id", post(mark_read))
        .route("/notifications/read-all", post(mark_all_read))
}

#[instrument(skip(state))]
pub async fn list_notifications(
    State(state): State<AppState>,
    actor: AuthUser,
) -> Result<Json<Vec<NotificationView>>, ApiError> {
    let rows = repo::list_recent(&state.db, actor.id, INBOX_PAGE_SIZE).await?;
    let views = rows
        .into_iter()
        .map(|r| {
            let category = match r.category.as_str() {
                "file" => NotificationCategory::File,
                "rsvp" => NotificationCategory::Rsvp,
                _ => NotificationCategory::Message,
            };
            NotificationView {
                id: r.id,
                category,
                text: r.text,
                read: r.read,
                created_at: r.created_at,
                event: match (r.event_id, r.event_title) {
                    (Some(id), Some(title)) => Some(EventRef { id, title }),
                    _ => None,
                },
                actor: match (r.actor_id, r.actor_name) {
                    (Some(id), Some(name)) => Some(UserRef { id, name }),
                    _ => None,
                },
            }
        })
        .collect();
    Ok(Json(views))
}

#[instrument(skip(state))]
pub async fn mark_read(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    // Foreign or unknown ids match zero rows; that is still a success so
    // responses don't leak which ids exist.
    repo::mark_read(&state.db, actor.id, id).await?;
    Ok(Json(json!({ "success": true })))
}

#[instrument(skip(state))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    actor: AuthUser,
) -> Result<Json<Value>, ApiError> {
    repo::mark_all_read(&state.db, actor.id).await?;
    Ok(Json(json!({ "success": true })))
}
