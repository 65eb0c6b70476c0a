use axum::{
    extract::{
        ws::{Message, WebSocket},
        FromRef, Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{claims::Claims, jwt::JwtKeys},
    error::ApiError,
    state::AppState,
};

use super::{Dispatcher, WsInboundEvent, WsOutboundEvent};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

/// Authenticate before upgrading; browsers cannot set headers on websocket
/// requests, so the token may ride in the `token` query parameter instead.
#[instrument(skip(state, ws, query, headers))]
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let token = query
        .token
        .or_else(|| {
            headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string)
        })
        .ok_or(ApiError::Unauthorized)?;

    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_access(&token)
        .map_err(|_| ApiError::Unauthorized)?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, claims)))
}

async fn handle_socket(socket: WebSocket, state: AppState, claims: Claims) {
    let (session_id, mut outbound) = state.realtime.connect().await;
    info!(session_id = %session_id, user_id = %claims.sub, "websocket connected");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            frame = outbound.recv() => {
                match frame {
                    Some(msg) => {
                        if sink.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&state, session_id, &claims, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(session_id = %session_id, error = %e, "websocket read error");
                        break;
                    }
                }
            }
        }
    }

    state.realtime.disconnect(session_id).await;
    info!(session_id = %session_id, "websocket disconnected");
}

async fn handle_frame(state: &AppState, session_id: Uuid, claims: &Claims, text: &str) {
    let event: WsInboundEvent = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            debug!(session_id = %session_id, error = %e, "ignoring malformed frame");
            return;
        }
    };

    match event {
        WsInboundEvent::JoinEvent { event_id } => {
            state.realtime.join_event(session_id, event_id).await;
        }
        WsInboundEvent::LeaveEvent { event_id } => {
            state.realtime.leave_event(session_id, event_id).await;
        }
        WsInboundEvent::JoinUser { user_id } => {
            // A session may only bind the user channel of its own token.
            if user_id == claims.sub {
                state.realtime.join_user(session_id, user_id).await;
            } else {
                warn!(session_id = %session_id, claimed = %user_id, "rejected foreign user channel join");
            }
        }
        WsInboundEvent::TypingStart { event_id, user } => {
            state
                .realtime
                .publish_to_event_except(
                    event_id,
                    session_id,
                    &WsOutboundEvent::TypingStart { event_id, user },
                )
                .await;
        }
        WsInboundEvent::TypingStop { event_id, user } => {
            state
                .realtime
                .publish_to_event_except(
                    event_id,
                    session_id,
                    &WsOutboundEvent::TypingStop { event_id, user },
                )
                .await;
        }
    }
}
