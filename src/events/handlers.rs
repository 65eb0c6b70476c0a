use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{dto::UserRef, AuthUser},
    error::ApiError,
    rsvps::repo::RsvpWithUser,
    state::AppState,
    users,
};

use super::dto::{CreateEventRequest, EventResponse, EventRsvp, UpdateEventRequest};
use super::repo::Event;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event))
        .route("/events", get(list_events))
        .route("/events/:id", get(get_event))
        .route("/events/:id", put(update_event))
        .route("/events/:id", delete(delete_event))
}

/// Join events with their creators' names and grouped RSVPs into the
/// response shape.
pub(crate) fn assemble(
    events: Vec<Event>,
    creator_names: &HashMap<Uuid, String>,
    rsvps: Vec<RsvpWithUser>,
) -> Vec<EventResponse> {
    let mut by_event: HashMap<Uuid, Vec<RsvpWithUser>> = HashMap::new();
    for rsvp in rsvps {
        by_event.entry(rsvp.event_id).or_default().push(rsvp);
    }

    events
        .into_iter()
        .map(|event| {
            let event_rsvps: Vec<EventRsvp> = by_event
                .remove(&event.id)
                .unwrap_or_default()
                .into_iter()
                .map(|r| EventRsvp {
                    id: r.id,
                    user_id: r.user_id,
                    status: r.status,
                    user: UserRef {
                        id: r.user_id,
                        name: r.user_name,
                    },
                })
                .collect();
            let attending_count = event_rsvps
                .iter()
                .filter(|r| r.status == "attending")
                .count();
            let creator = UserRef {
                id: event.creator_id,
                name: creator_names
                    .get(&event.creator_id)
                    .cloned()
                    .unwrap_or_default(),
            };
            EventResponse {
                id: event.id,
                title: event.title,
                description: event.description,
                location: event.location,
                date: event.date,
                creator,
                rsvps: event_rsvps,
                attending_count,
            }
        })
        .collect()
}

pub(crate) async fn load_event_responses(
    state: &AppState,
    events: Vec<Event>,
) -> Result<Vec<EventResponse>, ApiError> {
    let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
    let creator_ids: Vec<Uuid> = events.iter().map(|e| e.creator_id).collect();
    let creator_names = users::repo::names_by_ids(&state.db, &creator_ids).await?;
    let rsvps = crate::rsvps::repo::list_for_events(&state.db, &event_ids).await?;
    Ok(assemble(events, &creator_names, rsvps))
}

fn validated(
    title: Option<String>,
    location: Option<String>,
    date: Option<OffsetDateTime>,
) -> Result<(String, String, OffsetDateTime), ApiError> {
    match (
        title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
        location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()),
        date,
    ) {
        (Some(t), Some(l), Some(d)) => Ok((t, l, d)),
        _ => Err(ApiError::validation(
            "Title, location, and date are required",
        )),
    }
}

#[instrument(skip(state, payload))]
pub async fn create_event(
    State(state): State<AppState>,
    actor: AuthUser,
    Json(payload): Json<CreateEventRequest>,
) -> Result<Json<EventResponse>, ApiError> {
    let (title, location, date) = validated(payload.title, payload.location, payload.date)?;

    let event = Event::create(
        &state.db,
        &title,
        payload.description.as_deref(),
        &location,
        date,
        actor.id,
    )
    .await?;

    info!(event_id = %event.id, creator_id = %actor.id, "event created");
    Ok(Json(EventResponse {
        id: event.id,
        title: event.title,
        description: event.description,
        location: event.location,
        date: event.date,
        creator: UserRef {
            id: actor.id,
            name: actor.name,
        },
        rsvps: Vec::new(),
        attending_count: 0,
    }))
}

#[instrument(skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventResponse>>, ApiError> {
    let events = Event::list_all(&state.db).await?;
    Ok(Json(load_event_responses(&state, events).await?))
}

#[instrument(skip(state))]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventResponse>, ApiError> {
    let event = Event::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Event"))?;
    let mut responses = load_event_responses(&state, vec![event]).await?;
    Ok(Json(responses.remove(0)))
}

#[instrument(skip(state, payload))]
pub async fn update_event(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<Json<EventResponse>, ApiError> {
    let existing = Event::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Event"))?;
    if existing.creator_id != actor.id {
        return Err(ApiError::Forbidden);
    }

    let (title, location, date) = validated(payload.title, payload.location, payload.date)?;
    let updated = Event::update(
        &state.db,
        id,
        &title,
        payload.description.as_deref(),
        &location,
        date,
    )
    .await?;

    let mut responses = load_event_responses(&state, vec![updated]).await?;
    Ok(Json(responses.remove(0)))
}

#[instrument(skip(state))]
pub async fn delete_event(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let existing = Event::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Event"))?;
    if existing.creator_id != actor.id {
        return Err(ApiError::Forbidden);
    }

    Event::delete(&state.db, id).await?;
    info!(event_id = %id, "event deleted");
    Ok(Json(json!({ "message": "Event deleted successfully" })))
}
