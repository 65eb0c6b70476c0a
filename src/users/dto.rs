use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::dto::{PublicUser, UserRef};
use crate::events::dto::EventResponse;

/// Compact event projection for the "events I answered" list.
#[derive(Debug, Serialize)]
pub struct AnsweredEvent {
    pub id: Uuid,
    pub title: String,
    pub location: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub creator: UserRef,
}

#[derive(Debug, Serialize)]
pub struct DashboardRsvp {
    pub id: Uuid,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub event: AnsweredEvent,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub user: PublicUser,
    /// Events the user created, with all their RSVPs.
    pub my_events: Vec<EventResponse>,
    /// Events the user answered, newest response first.
    pub my_rsvps: Vec<DashboardRsvp>,
    /// Events by other users still awaiting an answer.
    pub other_events: Vec<EventResponse>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub notify_messages: bool,
    pub notify_files: bool,
    pub notify_rsvps: bool,
}

/// Omitted flags keep their current value.
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub notify_messages: Option<bool>,
    pub notify_files: Option<bool>,
    pub notify_rsvps: Option<bool>,
}
