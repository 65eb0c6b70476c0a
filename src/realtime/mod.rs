use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::Message;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use tracing::error;
use uuid::Uuid;

pub mod events;
pub mod ws;

pub use events::{WsInboundEvent, WsOutboundEvent};

/// Publish side of the realtime layer. Handlers depend on this trait rather
/// than on the registry so tests can swap in a recording double.
///
/// Delivery is at-most-once and best effort: publishing to a channel with no
/// subscribers, or to a session whose socket died, is a silent no-op. There
/// is no offline queue; a reconnecting client re-fetches over HTTP.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Deliver to every session subscribed to `event_<event_id>`.
    async fn publish_to_event(&self, event_id: Uuid, payload: &WsOutboundEvent);
    /// Same, but skipping one session (typing relays exclude the sender).
    async fn publish_to_event_except(
        &self,
        event_id: Uuid,
        skip_session: Uuid,
        payload: &WsOutboundEvent,
    );
    /// Deliver to all of one user's sessions (`user_<user_id>`).
    async fn publish_to_user(&self, user_id: Uuid, payload: &WsOutboundEvent);
    /// Deliver to every connected session.
    async fn broadcast(&self, payload: &WsOutboundEvent);
}

struct Session {
    tx: UnboundedSender<Message>,
    events: HashSet<Uuid>,
    user: Option<Uuid>,
}

/// The one piece of shared mutable state outside the database: which sessions
/// are connected and which channels each has joined. Safe for concurrent
/// subscribe/unsubscribe/publish; per-session order is FIFO via the mpsc
/// channel feeding each socket.
#[derive(Default, Clone)]
pub struct ChannelRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session and hand back the receiving end its socket
    /// task should drain.
    pub async fn connect(&self) -> (Uuid, UnboundedReceiver<Message>) {
        let (tx, rx) = unbounded_channel();
        let session_id = Uuid::new_v4();
        self.inner.write().await.insert(
            session_id,
            Session {
                tx,
                events: HashSet::new(),
                user: None,
            },
        );
        (session_id, rx)
    }

    pub async fn disconnect(&self, session_id: Uuid) {
        self.inner.write().await.remove(&session_id);
    }

    /// Idempotent: joining a channel twice is a no-op.
    pub async fn join_event(&self, session_id: Uuid, event_id: Uuid) {
        if let Some(s) = self.inner.write().await.get_mut(&session_id) {
            s.events.insert(event_id);
        }
    }

    pub async fn leave_event(&self, session_id: Uuid, event_id: Uuid) {
        if let Some(s) = self.inner.write().await.get_mut(&session_id) {
            s.events.remove(&event_id);
        }
    }

    /// Bind the session to its user channel.
    pub async fn join_user(&self, session_id: Uuid, user_id: Uuid) {
        if let Some(s) = self.inner.write().await.get_mut(&session_id) {
            s.user = Some(user_id);
        }
    }

    async fn publish_where<F>(&self, payload: &WsOutboundEvent, keep: F)
    where
        F: Fn(Uuid, &Session) -> bool,
    {
        let text = match serde_json::to_string(payload) {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, "failed to serialize outbound frame");
                return;
            }
        };
        let mut guard = self.inner.write().await;
        // Sessions whose socket task is gone fail to send; drop them here.
        guard.retain(|id, s| {
            if !keep(*id, s) {
                return true;
            }
            s.tx.send(Message::Text(text.clone())).is_ok()
        });
    }
}

#[async_trait]
impl Dispatcher for ChannelRegistry {
    async fn publish_to_event(&self, event_id: Uuid, payload: &WsOutboundEvent) {
        self.publish_where(payload, |_, s| s.events.contains(&event_id))
            .await;
    }

    async fn publish_to_event_except(
        &self,
        event_id: Uuid,
        skip_session: Uuid,
        payload: &WsOutboundEvent,
    ) {
        self.publish_where(payload, |id, s| {
            id != skip_session && s.events.contains(&event_id)
        })
        .await;
    }

    async fn publish_to_user(&self, user_id: Uuid, payload: &WsOutboundEvent) {
        self.publish_where(payload, |_, s| s.user == Some(user_id))
            .await;
    }

    async fn broadcast(&self, payload: &WsOutboundEvent) {
        self.publish_where(payload, |_, _| true).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn frame(data: &str) -> WsOutboundEvent {
        WsOutboundEvent::ReceiveMessage(json!({ "text": data }))
    }

    fn decode(msg: Message) -> Value {
        match msg {
            Message::Text(t) => serde_json::from_str(&t).unwrap(),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn publish_to_event_reaches_only_subscribers() {
        let reg = ChannelRegistry::new();
        let event_id = Uuid::new_v4();
        let (viewer, mut viewer_rx) = reg.connect().await;
        let (_bystander, mut bystander_rx) = reg.connect().await;
        reg.join_event(viewer, event_id).await;

        reg.publish_to_event(event_id, &frame("hi")).await;

        let got = decode(viewer_rx.recv().await.unwrap());
        assert_eq!(got["data"]["text"], "hi");
        assert!(bystander_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn join_is_idempotent_one_delivery_per_session() {
        let reg = ChannelRegistry::new();
        let event_id = Uuid::new_v4();
        let (session, mut rx) = reg.connect().await;
        reg.join_event(session, event_id).await;
        reg.join_event(session, event_id).await;

        reg.publish_to_event(event_id, &frame("once")).await;

        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_to_empty_channel_is_a_noop() {
        let reg = ChannelRegistry::new();
        // No sessions at all; must not panic or error.
        reg.publish_to_event(Uuid::new_v4(), &frame("void")).await;
        reg.publish_to_user(Uuid::new_v4(), &frame("void")).await;
    }

    #[tokio::test]
    async fn user_channel_reaches_all_of_that_users_sessions_only() {
        let reg = ChannelRegistry::new();
        let user_id = Uuid::new_v4();
        let (phone, mut phone_rx) = reg.connect().await;
        let (laptop, mut laptop_rx) = reg.connect().await;
        let (stranger, mut stranger_rx) = reg.connect().await;
        reg.join_user(phone, user_id).await;
        reg.join_user(laptop, user_id).await;
        reg.join_user(stranger, Uuid::new_v4()).await;

        reg.publish_to_user(user_id, &frame("private")).await;

        assert!(phone_rx.recv().await.is_some());
        assert!(laptop_rx.recv().await.is_some());
        assert!(stranger_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn typing_relay_excludes_the_sender() {
        let reg = ChannelRegistry::new();
        let event_id = Uuid::new_v4();
        let (typist, mut typist_rx) = reg.connect().await;
        let (reader, mut reader_rx) = reg.connect().await;
        reg.join_event(typist, event_id).await;
        reg.join_event(reader, event_id).await;

        let typing = WsOutboundEvent::TypingStart {
            event_id,
            user: "Alice".into(),
        };
        reg.publish_to_event_except(event_id, typist, &typing).await;

        assert!(reader_rx.recv().await.is_some());
        assert!(typist_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn per_session_delivery_preserves_publish_order() {
        let reg = ChannelRegistry::new();
        let event_id = Uuid::new_v4();
        let (session, mut rx) = reg.connect().await;
        reg.join_event(session, event_id).await;

        for i in 0..5 {
            reg.publish_to_event(event_id, &frame(&i.to_string())).await;
        }
        for i in 0..5 {
            let got = decode(rx.recv().await.unwrap());
            assert_eq!(got["data"]["text"], i.to_string());
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_every_connection() {
        let reg = ChannelRegistry::new();
        let (_a, mut a_rx) = reg.connect().await;
        let (_b, mut b_rx) = reg.connect().await;

        reg.broadcast(&WsOutboundEvent::RsvpUpdated(json!({ "status": "attending" })))
            .await;

        assert!(a_rx.recv().await.is_some());
        assert!(b_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn dead_sessions_are_dropped_on_publish() {
        let reg = ChannelRegistry::new();
        let event_id = Uuid::new_v4();
        let (session, rx) = reg.connect().await;
        reg.join_event(session, event_id).await;
        drop(rx);

        reg.publish_to_event(event_id, &frame("gone")).await;
        assert!(reg.inner.read().await.is_empty());
    }

    #[tokio::test]
    async fn disconnect_tears_down_membership() {
        let reg = ChannelRegistry::new();
        let event_id = Uuid::new_v4();
        let (session, _rx) = reg.connect().await;
        reg.join_event(session, event_id).await;
        reg.disconnect(session).await;

        assert!(reg.inner.read().await.is_empty());
    }
}
