//! WebSocket endpoints. Each namespace authenticates on upgrade, registers
//! the socket, then pumps JSON events tagged by `type` until the client
//! goes away.

pub mod chat;
pub mod code;
pub mod coffee;
pub mod registry;
#[cfg(test)]
pub(crate) mod test_support;

pub use registry::{ConnectionId, ConnectionRegistry, Outbox, RoomRegistry};

use std::future::Future;

use axum::{
    extract::ws::{Message, WebSocket},
    http::HeaderMap,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;
use zoro_database::User;

use crate::extract::session_token;
use crate::{ApiError, AppState};

pub fn create_websocket_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(chat::chat_socket))
        .route("/ws/code", get(code::code_socket))
        .route("/ws/coffee-break", get(coffee::coffee_socket))
}

#[derive(Debug, Deserialize)]
pub struct SocketQuery {
    token: Option<String>,
}

/// Browsers cannot set headers on a WebSocket handshake, so `?token=` is
/// accepted alongside the usual bearer header and cookie.
pub(crate) async fn socket_user(
    state: &AppState,
    query: &SocketQuery,
    headers: &HeaderMap,
) -> Result<User, ApiError> {
    let token = match query.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => token.to_string(),
        None => session_token(headers)?
            .ok_or_else(|| ApiError::unauthorized("authentication required"))?,
    };
    let (user, _) = state.authenticate(&token).await?;
    Ok(user)
}

#[derive(Serialize)]
struct ErrorEvent<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    message: &'a str,
}

pub(crate) fn send_error(outbox: &Outbox, message: &str) {
    outbox.send(&ErrorEvent {
        kind: "error",
        message,
    });
}

/// Runs one socket: a writer task drains `outbound` into the sink while the
/// reader parses frames into `E` and hands them to `on_event`. Handler
/// errors and unparseable frames become `error` events on this socket only.
pub(crate) async fn pump<E, F, Fut>(
    socket: WebSocket,
    outbox: Outbox,
    mut outbound: mpsc::UnboundedReceiver<String>,
    user: &User,
    mut on_event: F,
) where
    E: DeserializeOwned,
    F: FnMut(E) -> Fut,
    Fut: Future<Output = Result<(), ApiError>>,
{
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_frame(&text, &outbox, user, &mut on_event).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(user = %user.public_id, error = %err, "socket read failed");
                break;
            }
        }
    }

    writer.abort();
}

/// Parses one text frame and runs it through `on_event`, reporting failures
/// back to the sender as an `error` event.
pub(crate) async fn handle_frame<E, F, Fut>(text: &str, outbox: &Outbox, user: &User, on_event: &mut F)
where
    E: DeserializeOwned,
    F: FnMut(E) -> Fut,
    Fut: Future<Output = Result<(), ApiError>>,
{
    match serde_json::from_str::<E>(text) {
        Ok(event) => {
            if let Err(err) = on_event(event).await {
                debug!(user = %user.public_id, status = %err.status, error = %err.message, "socket event rejected");
                send_error(outbox, &err.message);
            }
        }
        Err(err) => {
            debug!(user = %user.public_id, error = %err, "unparseable socket event");
            send_error(outbox, &format!("invalid event: {err}"));
        }
    }
}
