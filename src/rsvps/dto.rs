use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::dto::UserRef;

/// The three statuses an RSVP can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsvpStatus {
    Pending,
    Attending,
    Declined,
}

impl RsvpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RsvpStatus::Pending => "pending",
            RsvpStatus::Attending => "attending",
            RsvpStatus::Declined => "declined",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RsvpRequest {
    pub event_id: Option<Uuid>,
    pub status: Option<RsvpStatus>,
}

#[derive(Debug, Serialize)]
pub struct RsvpResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub user: UserRef,
    pub email: String,
}

/// Lightweight live update broadcast to every connection on any RSVP change.
#[derive(Debug, Serialize)]
pub struct RsvpUpdate {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub user: UserRef,
}
