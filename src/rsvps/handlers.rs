use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use crate::{
    auth::{dto::UserRef, AuthUser},
    error::ApiError,
    events::repo::Event,
    notifications::{fanout, NotificationCategory},
    realtime::{Dispatcher, WsOutboundEvent},
    state::AppState,
};

use super::dto::{RsvpRequest, RsvpResponse, RsvpUpdate};
use super::repo;

pub fn router() -> Router<AppState> {
    Router::new().route("/rsvps", post(rsvp_event))
}

#[instrument(skip(state, payload))]
pub async fn rsvp_event(
    State(state): State<AppState>,
    actor: AuthUser,
    Json(payload): Json<RsvpRequest>,
) -> Result<Json<RsvpResponse>, ApiError> {
    let (event_id, status) = match (payload.event_id, payload.status) {
        (Some(e), Some(s)) => (e, s),
        _ => return Err(ApiError::validation("eventId and status are required")),
    };

    if Event::find_by_id(&state.db, event_id).await?.is_none() {
        return Err(ApiError::NotFound("Event"));
    }

    let row = repo::upsert(&state.db, actor.id, event_id, status.as_str()).await?;

    // Dashboards everywhere refresh on any RSVP change, so this goes to
    // every connection rather than the event channel.
    let update = RsvpUpdate {
        event_id,
        user_id: row.user_id,
        status: row.status.clone(),
        user: UserRef {
            id: row.user_id,
            name: row.user_name.clone(),
        },
    };
    let payload = WsOutboundEvent::RsvpUpdated(
        serde_json::to_value(&update).map_err(anyhow::Error::from)?,
    );
    state.realtime.broadcast(&payload).await;

    fanout::spawn(
        state.clone(),
        event_id,
        UserRef {
            id: actor.id,
            name: actor.name,
        },
        NotificationCategory::Rsvp,
    );

    Ok(Json(RsvpResponse {
        id: row.id,
        event_id: row.event_id,
        user_id: row.user_id,
        status: row.status,
        created_at: row.created_at,
        updated_at: row.updated_at,
        user: UserRef {
            id: row.user_id,
            name: row.user_name,
        },
        email: row.user_email,
    }))
}
