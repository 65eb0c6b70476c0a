use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::dto::UserRef;

/// What kind of activity a notification is about. Each category has a
/// matching per-user opt-out flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Message,
    File,
    Rsvp,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Message => "message",
            NotificationCategory::File => "file",
            NotificationCategory::Rsvp => "rsvp",
        }
    }

    /// Column on `users` holding the opt-in flag for this category.
    pub fn preference_column(&self) -> &'static str {
        match self {
            NotificationCategory::Message => "notify_messages",
            NotificationCategory::File => "notify_files",
            NotificationCategory::Rsvp => "notify_rsvps",
        }
    }
}

/// Minimal event projection embedded in a notification.
#[derive(Debug, Clone, Serialize)]
pub struct EventRef {
    pub id: Uuid,
    pub title: String,
}

/// A notification as delivered to its recipient, both over the inbox
/// endpoint and the live user channel.
#[derive(Debug, Serialize)]
pub struct NotificationView {
    pub id: Uuid,
    pub category: NotificationCategory,
    pub text: String,
    pub read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub event: Option<EventRef>,
    pub actor: Option<UserRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&NotificationCategory::Message).unwrap(),
            "\"message\""
        );
        assert_eq!(NotificationCategory::Rsvp.as_str(), "rsvp");
    }

    #[test]
    fn every_category_maps_to_its_flag_column() {
        assert_eq!(
            NotificationCategory::Message.preference_column(),
            "notify_messages"
        );
        assert_eq!(
            NotificationCategory::File.preference_column(),
            "notify_files"
        );
        assert_eq!(
            NotificationCategory::Rsvp.preference_column(),
            "notify_rsvps"
        );
    }

    #[test]
    fn view_serializes_nested_projections() {
        let view = NotificationView {
            id: Uuid::new_v4(),
            category: NotificationCategory::Message,
            text: "Alice sent a message in \"Launch\"".into(),
            read: false,
            created_at: OffsetDateTime::now_utc(),
            event: Some(EventRef {
                id: Uuid::new_v4(),
                title: "Launch".into(),
            }),
            actor: Some(UserRef {
                id: Uuid::new_v4(),
                name: "Alice".into(),
            }),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["category"], "message");
        assert_eq!(json["read"], false);
        assert_eq!(json["event"]["title"], "Launch");
        assert_eq!(json["actor"]["name"], "Alice");
    }
}
