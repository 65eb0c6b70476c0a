use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{dto::UserRef, AuthUser},
    error::ApiError,
    events::repo::Event,
    notifications::{fanout, NotificationCategory},
    realtime::{Dispatcher, WsOutboundEvent},
    state::AppState,
};

use super::dto::{CreateMessageRequest, MessageResponse};
use super::repo::{self, MessageWithUser};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages/:event_id", get(list_messages))
        .route("/messages", post(create_message))
}

fn to_response(row: MessageWithUser) -> MessageResponse {
    MessageResponse {
        id: row.id,
        event_id: row.event_id,
        user_id: row.user_id,
        text: row.text,
        created_at: row.created_at,
        user: UserRef {
            id: row.user_id,
            name: row.user_name,
        },
    }
}

#[instrument(skip(state))]
pub async fn list_messages(
    State(state): State<AppState>,
    _actor: AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let rows = repo::list_for_event(&state.db, event_id).await?;
    Ok(Json(rows.into_iter().map(to_response).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_message(
    State(state): State<AppState>,
    actor: AuthUser,
    Json(payload): Json<CreateMessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let event_id = payload
        .event_id
        .ok_or_else(|| ApiError::validation("eventId is required"))?;
    let text = payload
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::validation("text is required"))?;

    if Event::find_by_id(&state.db, event_id).await?.is_none() {
        return Err(ApiError::NotFound("Event"));
    }

    let row = repo::insert(&state.db, event_id, actor.id, text).await?;
    let response = to_response(row);

    // Live push to everyone viewing the event page, then the best-effort
    // notification fan-out. Neither can fail the send itself.
    let payload = WsOutboundEvent::ReceiveMessage(
        serde_json::to_value(&response).map_err(anyhow::Error::from)?,
    );
    state.realtime.publish_to_event(event_id, &payload).await;

    fanout::spawn(
        state.clone(),
        event_id,
        UserRef {
            id: actor.id,
            name: actor.name,
        },
        NotificationCategory::Message,
    );

    Ok(Json(response))
}
