use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Frames sent by connected clients. Wire shape is `{"event": ..., "data": ...}`,
/// mirroring what the web client emits.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WsInboundEvent {
    JoinEvent { event_id: Uuid },
    LeaveEvent { event_id: Uuid },
    JoinUser { user_id: Uuid },
    TypingStart { event_id: Uuid, user: String },
    TypingStop { event_id: Uuid, user: String },
}

/// Frames pushed to connected clients, same envelope as inbound.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WsOutboundEvent {
    /// New chat message, pushed to the event channel.
    ReceiveMessage(Value),
    /// New shared file, pushed to the event channel.
    FileUploaded(Value),
    FileDeleted { file_id: Uuid, event_id: Uuid },
    /// Persisted notification, pushed to the recipient's user channel.
    Notification(Value),
    /// RSVP change, broadcast to every connection so dashboards refresh.
    #[serde(rename = "rsvpUpdated")]
    RsvpUpdated(Value),
    TypingStart { event_id: Uuid, user: String },
    TypingStop { event_id: Uuid, user: String },
}
