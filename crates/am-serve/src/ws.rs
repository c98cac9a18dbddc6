use crate::{build_marketplace, AppState};
use am_core::types::{Actor, RequestId, User};
use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::str::FromStr;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use ulid::Ulid;

#[derive(Debug, Deserialize)]
struct SocketMessage {
    #[serde(rename = "type")]
    kind: String,
    token: Option<String>,
    request_id: Option<String>,
    content: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(stream: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(Utf8Bytes::from(text))).await.is_err() {
                break;
            }
        }
    });

    let client_id = format!("client_{}", Ulid::new());
    let mut authenticated: Option<User> = None;
    let mut feed_task: Option<tokio::task::JoinHandle<()>> = None;

    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else {
            continue;
        };
        let parsed: Result<SocketMessage, _> = serde_json::from_str(&text);
        let Ok(message) = parsed else {
            let _ = tx.send(error_payload("invalid_message"));
            continue;
        };

        if message.kind == "auth" {
            let user = message
                .token
                .as_deref()
                .and_then(|token| resolve_user(&state, token));
            match user {
                Some(user) => {
                    authenticated = Some(user);
                    if feed_task.is_none() {
                        feed_task = Some(spawn_feed_forwarder(&state, tx.clone()));
                    }
                    let _ = tx.send(serde_json::json!({ "type": "auth_ok" }).to_string());
                }
                None => {
                    let _ = tx.send(error_payload("auth_failed"));
                    break;
                }
            }
            continue;
        }

        let Some(user) = authenticated.as_ref() else {
            let _ = tx.send(error_payload("auth_required"));
            continue;
        };

        match message.kind.as_str() {
            "join_room" => {
                let Some(room) = message.request_id.as_deref() else {
                    let _ = tx.send(error_payload("invalid_payload"));
                    continue;
                };
                if RequestId::from_str(room).is_err() {
                    let _ = tx.send(error_payload("invalid_payload"));
                    continue;
                }
                state.rooms.join(room, &client_id, tx.clone()).await;
            }
            "send_message" => {
                let (Some(room), Some(content)) =
                    (message.request_id.as_deref(), message.content.clone())
                else {
                    let _ = tx.send(error_payload("invalid_payload"));
                    continue;
                };
                let Ok(request_id) = RequestId::from_str(room) else {
                    let _ = tx.send(error_payload("invalid_payload"));
                    continue;
                };
                // Durable append first; only a persisted message is
                // broadcast. A failed fan-out is not retried -- the message
                // is already on disk and shows up on the next history fetch.
                match persist_message(&state, user, &request_id, content) {
                    Ok(stored) => {
                        let payload = serde_json::json!({
                            "type": "new_message",
                            "message": stored,
                        })
                        .to_string();
                        let _ = state.rooms.broadcast(room, &payload).await;
                    }
                    Err(code) => {
                        let _ = tx.send(error_payload(code));
                    }
                }
            }
            _ => {
                let _ = tx.send(error_payload("unknown_type"));
            }
        }
    }

    state.rooms.disconnect(&client_id).await;
    if let Some(task) = feed_task {
        task.abort();
    }
}

fn resolve_user(state: &AppState, token: &str) -> Option<User> {
    let market = build_marketplace(state).ok()?;
    market.auth().resolve(token).ok()
}

fn persist_message(
    state: &AppState,
    user: &User,
    request_id: &RequestId,
    content: String,
) -> Result<am_core::types::Message, &'static str> {
    let market = build_marketplace(state).map_err(|_| "message_failed")?;
    market
        .messages()
        .post(&Actor::of(user), request_id, content)
        .map_err(|err| match err {
            am_core::MarketError::Message(am_core::error::MessageError::RequestNotFound) => {
                "request_not_found"
            }
            _ => "message_failed",
        })
}

/// Forwards global feed events (request acceptances) to this client for as
/// long as it stays connected. Lagging just skips ahead; the client is
/// expected to re-fetch the open list after any gap.
fn spawn_feed_forwarder(
    state: &AppState,
    tx: mpsc::UnboundedSender<String>,
) -> tokio::task::JoinHandle<()> {
    let bus = state.bus.clone();
    tokio::spawn(async move {
        let mut feed = bus.subscribe();
        loop {
            match feed.recv().await {
                Ok(event) => {
                    let Ok(json) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if tx.send(json).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn error_payload(code: &str) -> String {
    serde_json::json!({ "type": "error", "code": code }).to_string()
}
