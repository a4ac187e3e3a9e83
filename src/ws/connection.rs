//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding topic-filtered events.
//! When the connection closes, every session it had joined is left so
//! viewer counts drain even for clients that vanish without a `leave`.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::domain::event::session_topic;
use crate::domain::{CallerIdentity, SessionId, StreamEvent, UserId};
use crate::error::GatewayError;
use crate::service::SessionService;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them to the session
///   service.
/// - Forwards matching events from the [`broadcast::Receiver`] to the
///   client.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<StreamEvent>,
    session_service: Arc<SessionService>,
    identity: Option<CallerIdentity>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();
    let mut joined: HashSet<SessionId> = HashSet::new();
    // Anonymous viewers still count toward viewer totals; they get an
    // ephemeral ID for the lifetime of the connection.
    let viewer_id = identity.as_ref().map_or_else(UserId::new, |i| i.user_id);

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(
                            &text,
                            &session_service,
                            identity.as_ref(),
                            viewer_id,
                            &mut subs,
                            &mut joined,
                        )
                        .await;
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            // Event from EventBus
            event = event_rx.recv() => {
                match event {
                    Ok(stream_event) => {
                        if subs.matches(&stream_event.topic()) {
                            let msg = WsMessage {
                                id: uuid::Uuid::new_v4().to_string(),
                                msg_type: WsMessageType::Event,
                                timestamp: chrono::Utc::now(),
                                payload: serde_json::to_value(&stream_event).unwrap_or_default(),
                            };
                            let json = serde_json::to_string(&msg).unwrap_or_default();
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    // Drain viewer counts for sessions this connection had joined.
    for session_id in joined {
        session_service.leave(session_id, viewer_id).await;
    }
    tracing::debug!("ws connection closed");
}

/// Handles a text message from the client, returning an optional JSON
/// response. Validation-skipped chat/tip commands get no response at all.
async fn handle_text_message(
    text: &str,
    service: &SessionService,
    identity: Option<&CallerIdentity>,
    viewer_id: UserId,
    subs: &mut SubscriptionManager,
    joined: &mut HashSet<SessionId>,
) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return error_response(String::new(), 400, "malformed JSON");
    };
    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload.clone()) else {
        return error_response(msg.id, 404, "unknown command");
    };

    match command {
        WsCommand::Join { session_id } => {
            let session_id = SessionId::from_uuid(session_id);
            match service.join(session_id, viewer_id).await {
                Ok(count) => {
                    subs.subscribe([session_topic(session_id)]);
                    joined.insert(session_id);
                    response(
                        msg.id,
                        serde_json::json!({
                            "joined": true,
                            "session_id": session_id,
                            "viewer_count": count,
                        }),
                    )
                }
                Err(e) => gateway_error_response(msg.id, &e),
            }
        }
        WsCommand::Leave { session_id } => {
            let session_id = SessionId::from_uuid(session_id);
            if joined.remove(&session_id) {
                service.leave(session_id, viewer_id).await;
            }
            // Topic membership is dropped regardless of whether the
            // session still exists.
            subs.unsubscribe([session_topic(session_id).as_str()]);
            response(
                msg.id,
                serde_json::json!({ "left": true, "session_id": session_id }),
            )
        }
        WsCommand::Chat { session_id, text } => {
            let session_id = SessionId::from_uuid(session_id);
            match service.send_chat(session_id, identity, &text).await {
                Ok(Some(message)) => response(
                    msg.id,
                    serde_json::json!({ "sent": true, "message_id": message.id }),
                ),
                Ok(None) => None,
                Err(e) => gateway_error_response(msg.id, &e),
            }
        }
        WsCommand::Tip {
            session_id,
            amount,
            currency,
            proof_signature,
        } => {
            let session_id = SessionId::from_uuid(session_id);
            let amount = amount.as_deref().and_then(|a| Decimal::from_str(a).ok());
            let currency = currency.unwrap_or_else(|| "SOL".to_string());
            match service
                .send_tip(
                    session_id,
                    identity,
                    amount,
                    &currency,
                    proof_signature.as_deref(),
                )
                .await
            {
                Ok(Some(message)) => response(
                    msg.id,
                    serde_json::json!({ "sent": true, "message_id": message.id }),
                ),
                Ok(None) => None,
                Err(e) => gateway_error_response(msg.id, &e),
            }
        }
        WsCommand::Subscribe { topics } => {
            subs.subscribe(topics);
            response(
                msg.id,
                serde_json::json!({
                    "count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            )
        }
        WsCommand::Unsubscribe { topics } => {
            subs.unsubscribe(topics.iter().map(String::as_str));
            response(
                msg.id,
                serde_json::json!({ "remaining_count": subs.count() }),
            )
        }
    }
}

fn response(id: String, payload: serde_json::Value) -> Option<String> {
    let msg = WsMessage {
        id,
        msg_type: WsMessageType::Response,
        timestamp: chrono::Utc::now(),
        payload,
    };
    serde_json::to_string(&msg).ok()
}

fn error_response(id: String, code: u32, message: &str) -> Option<String> {
    let err = WsMessage {
        id,
        msg_type: WsMessageType::Error,
        timestamp: chrono::Utc::now(),
        payload: serde_json::json!({
            "code": code,
            "message": message,
        }),
    };
    serde_json::to_string(&err).ok()
}

fn gateway_error_response(id: String, error: &GatewayError) -> Option<String> {
    let err = WsMessage {
        id,
        msg_type: WsMessageType::Error,
        timestamp: chrono::Utc::now(),
        payload: serde_json::json!({
            "code": error.error_code(),
            "message": error.to_string(),
        }),
    };
    serde_json::to_string(&err).ok()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::EventBus;
    use crate::persistence::StreamStore;
    use crate::persistence::memory::MemoryStore;

    fn make_service() -> Arc<SessionService> {
        let store: Arc<dyn StreamStore> = Arc::new(MemoryStore::new());
        Arc::new(SessionService::new(store, EventBus::new(1000)))
    }

    fn command_json(payload: serde_json::Value) -> String {
        serde_json::to_string(&WsMessage {
            id: "req-1".to_string(),
            msg_type: WsMessageType::Command,
            timestamp: chrono::Utc::now(),
            payload,
        })
        .unwrap_or_default()
    }

    #[tokio::test]
    async fn malformed_json_returns_error_envelope() {
        let service = make_service();
        let mut subs = SubscriptionManager::new();
        let mut joined = HashSet::new();

        let resp = handle_text_message(
            "not json",
            &service,
            None,
            UserId::new(),
            &mut subs,
            &mut joined,
        )
        .await;
        let Some(resp) = resp else {
            panic!("expected error response");
        };
        assert!(resp.contains("\"type\":\"error\""));
        assert!(resp.contains("malformed JSON"));
    }

    #[tokio::test]
    async fn join_unknown_session_returns_gateway_error() {
        let service = make_service();
        let mut subs = SubscriptionManager::new();
        let mut joined = HashSet::new();

        let text = command_json(serde_json::json!({
            "command": "join",
            "session_id": uuid::Uuid::new_v4(),
        }));
        let resp = handle_text_message(
            &text,
            &service,
            None,
            UserId::new(),
            &mut subs,
            &mut joined,
        )
        .await;
        let Some(resp) = resp else {
            panic!("expected error response");
        };
        assert!(resp.contains("2001"));
        assert!(joined.is_empty());
    }

    #[tokio::test]
    async fn join_live_session_subscribes_topic() {
        let service = make_service();
        let mut subs = SubscriptionManager::new();
        let mut joined = HashSet::new();

        let Ok(session) = service
            .create_session(None, UserId::new(), "late night set")
            .await
        else {
            panic!("create failed");
        };
        let Ok(_) = service.start_session(session.id).await else {
            panic!("start failed");
        };

        let text = command_json(serde_json::json!({
            "command": "join",
            "session_id": session.id,
        }));
        let resp = handle_text_message(
            &text,
            &service,
            None,
            UserId::new(),
            &mut subs,
            &mut joined,
        )
        .await;
        let Some(resp) = resp else {
            panic!("expected join response");
        };
        assert!(resp.contains("\"joined\":true"));
        assert!(subs.matches(&session_topic(session.id)));
        assert!(joined.contains(&session.id));
    }

    #[tokio::test]
    async fn skipped_chat_gets_no_response() {
        let service = make_service();
        let mut subs = SubscriptionManager::new();
        let mut joined = HashSet::new();

        // Anonymous caller: silently skipped, no response at all.
        let text = command_json(serde_json::json!({
            "command": "chat",
            "session_id": uuid::Uuid::new_v4(),
            "text": "hello",
        }));
        let resp = handle_text_message(
            &text,
            &service,
            None,
            UserId::new(),
            &mut subs,
            &mut joined,
        )
        .await;
        assert!(resp.is_none());
    }
}
