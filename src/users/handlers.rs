use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{PublicUser, UserRef},
        repo::User,
        AuthUser,
    },
    error::ApiError,
    events::{handlers::load_event_responses, repo::Event},
    rsvps,
    state::AppState,
};

use super::dto::{
    AnsweredEvent, DashboardResponse, DashboardRsvp, SettingsResponse, UpdateSettingsRequest,
};
use super::repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/dashboard", get(dashboard))
        .route("/users/settings", get(get_settings))
        .route("/users/settings", put(update_settings))
}

#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    actor: AuthUser,
) -> Result<Json<DashboardResponse>, ApiError> {
    let user = User::find_by_id(&state.db, actor.id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let my_events = Event::list_by_creator(&state.db, actor.id).await?;
    let my_events = load_event_responses(&state, my_events).await?;

    let my_rsvps = rsvps::repo::list_for_user(&state.db, actor.id)
        .await?
        .into_iter()
        .map(|r| DashboardRsvp {
            id: r.id,
            status: r.status,
            created_at: r.created_at,
            event: AnsweredEvent {
                id: r.event_id,
                title: r.event_title,
                location: r.event_location,
                date: r.event_date,
                creator: UserRef {
                    id: r.creator_id,
                    name: r.creator_name,
                },
            },
        })
        .collect();

    let other_events = Event::list_unanswered_by_others(&state.db, actor.id).await?;
    let other_events = load_event_responses(&state, other_events).await?;

    Ok(Json(DashboardResponse {
        user: PublicUser {
            id: user.id,
            name: user.name,
            email: user.email,
        },
        my_events,
        my_rsvps,
        other_events,
    }))
}

#[instrument(skip(state))]
pub async fn get_settings(
    State(state): State<AppState>,
    actor: AuthUser,
) -> Result<Json<SettingsResponse>, ApiError> {
    let (notify_messages, notify_files, notify_rsvps) =
        repo::get_settings(&state.db, actor.id).await?;
    Ok(Json(SettingsResponse {
        notify_messages,
        notify_files,
        notify_rsvps,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_settings(
    State(state): State<AppState>,
    actor: AuthUser,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let (notify_messages, notify_files, notify_rsvps) = repo::update_settings(
        &state.db,
        actor.id,
        payload.notify_messages,
        payload.notify_files,
        payload.notify_rsvps,
    )
    .await?;
    Ok(Json(SettingsResponse {
        notify_messages,
        notify_files,
        notify_rsvps,
    }))
}
