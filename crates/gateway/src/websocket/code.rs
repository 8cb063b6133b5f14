//! Collaborative editor namespace (`/ws/code`). Rooms are keyed by the code
//! session's public id; edits are persisted before they are relayed.

use axum::{
    extract::{ws::WebSocket, Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use zoro_chats::CodeSessionView;
use zoro_database::User;

use super::{pump, socket_user, ConnectionId, Outbox, SocketQuery};
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum CodeClientEvent {
    JoinSession {
        session_id: String,
    },
    CodeChange {
        session_id: String,
        content: String,
        #[serde(default)]
        language: Option<String>,
    },
    CursorMove {
        session_id: String,
        line: u32,
        column: u32,
    },
    LeaveSession {
        session_id: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum CodeServerEvent {
    Hello {
        user_id: String,
    },
    SessionJoined {
        session: CodeSessionView,
        participants: Vec<String>,
    },
    UserJoined {
        session_id: String,
        user_id: String,
    },
    CodeUpdate {
        session_id: String,
        content: String,
        language: String,
        updated_by: String,
        updated_at: String,
    },
    CursorUpdate {
        session_id: String,
        user_id: String,
        line: u32,
        column: u32,
    },
    UserLeft {
        session_id: String,
        user_id: String,
    },
}

pub async fn code_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<SocketQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user = socket_user(&state, &query, &headers).await?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

async fn handle_socket(socket: WebSocket, state: AppState, user: User) {
    let (outbox, outbound) = Outbox::channel();
    let (connection, _) = state
        .realtime()
        .code
        .register(user.id, &user.public_id, outbox.clone())
        .await;
    info!(user = %user.public_id, connection, "code socket connected");

    outbox.send(&CodeServerEvent::Hello {
        user_id: user.public_id.clone(),
    });

    pump(socket, outbox.clone(), outbound, &user, |event| {
        handle_event(&state, &user, &outbox, event)
    })
    .await;

    disconnect(&state, &user, connection).await;
    info!(user = %user.public_id, connection, "code socket disconnected");
}

/// After the user's last code socket closes, takes them out of every room
/// and tells the rooms.
async fn disconnect(state: &AppState, user: &User, connection: ConnectionId) {
    let realtime = state.realtime();
    if realtime.code.unregister(user.id, connection).await {
        for session_id in realtime.code_rooms.leave_all(user.id).await {
            announce_left(state, user, session_id).await;
        }
    }
}

async fn handle_event(
    state: &AppState,
    user: &User,
    outbox: &Outbox,
    event: CodeClientEvent,
) -> Result<(), ApiError> {
    let sessions = &state.services().code_sessions;
    let realtime = state.realtime();

    match event {
        CodeClientEvent::JoinSession { session_id } => {
            let session = sessions.join(user, &session_id).await?;
            let fresh = realtime.code_rooms.join(&session_id, user.id).await;

            let mut participants = Vec::new();
            for member in realtime.code_rooms.members(&session_id).await {
                if let Some(public_id) = realtime.code.public_id(member).await {
                    participants.push(public_id);
                }
            }
            outbox.send(&CodeServerEvent::SessionJoined {
                session,
                participants,
            });

            if fresh {
                let joined = CodeServerEvent::UserJoined {
                    session_id: session_id.clone(),
                    user_id: user.public_id.clone(),
                };
                send_to_room(state, &session_id, Some(user.id), &joined).await;
            }
        }
        CodeClientEvent::CodeChange {
            session_id,
            content,
            language,
        } => {
            require_room(state, user, &session_id).await?;
            let session = sessions
                .update_content(user, &session_id, &content, language.as_deref())
                .await?;
            broadcast_update(state, user, &session).await;
        }
        CodeClientEvent::CursorMove {
            session_id,
            line,
            column,
        } => {
            require_room(state, user, &session_id).await?;
            let cursor = CodeServerEvent::CursorUpdate {
                session_id: session_id.clone(),
                user_id: user.public_id.clone(),
                line,
                column,
            };
            send_to_room(state, &session_id, Some(user.id), &cursor).await;
        }
        CodeClientEvent::LeaveSession { session_id } => {
            if realtime.code_rooms.leave(&session_id, user.id).await {
                announce_left(state, user, session_id).await;
            }
        }
    }

    Ok(())
}

async fn require_room(state: &AppState, user: &User, session_id: &str) -> Result<(), ApiError> {
    if state.realtime().code_rooms.contains(session_id, user.id).await {
        Ok(())
    } else {
        Err(ApiError::forbidden("join the session first"))
    }
}

async fn send_to_room(state: &AppState, session_id: &str, except: Option<i64>, event: &CodeServerEvent) {
    let realtime = state.realtime();
    let members = realtime.code_rooms.members(session_id).await;
    let targets = members.into_iter().filter(|id| Some(*id) != except);
    realtime.code.send_to_users(targets, event).await;
}

async fn announce_left(state: &AppState, user: &User, session_id: String) {
    let left = CodeServerEvent::UserLeft {
        session_id: session_id.clone(),
        user_id: user.public_id.clone(),
    };
    send_to_room(state, &session_id, None, &left).await;
}

/// Relays a saved edit to everyone else in the session's room. REST saves go
/// through here too so open editors stay in sync.
pub async fn broadcast_update(state: &AppState, editor: &User, session: &CodeSessionView) {
    let update = CodeServerEvent::CodeUpdate {
        session_id: session.id.clone(),
        content: session.content.clone(),
        language: session.language.clone(),
        updated_by: editor.public_id.clone(),
        updated_at: session.updated_at.clone(),
    };
    send_to_room(state, &session.id, Some(editor.id), &update).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::test_support::{SocketFixture, TestSocket};
    use axum::http::StatusCode;
    use serde_json::json;
    use zoro_chats::CreateCodeSessionRequest;

    async fn session_for(fixture: &SocketFixture, owner: &User) -> CodeSessionView {
        fixture
            .state
            .services()
            .code_sessions
            .create(
                owner,
                CreateCodeSessionRequest {
                    title: "Parser spike".into(),
                    language: "rust".into(),
                    content: "fn main() {}".into(),
                },
            )
            .await
            .unwrap()
    }

    fn join(session: &CodeSessionView) -> CodeClientEvent {
        CodeClientEvent::JoinSession {
            session_id: session.id.clone(),
        }
    }

    #[tokio::test]
    async fn joining_announces_the_newcomer_to_the_room() {
        let fixture = SocketFixture::new().await;
        let state = &fixture.state;
        let alice = fixture.user("alice").await;
        let bob = fixture.user("bob").await;
        let session = session_for(&fixture, &alice).await;
        let mut alice_socket = TestSocket::open(&state.realtime().code, &alice).await;
        let mut bob_socket = TestSocket::open(&state.realtime().code, &bob).await;

        handle_event(state, &alice, &alice_socket.outbox, join(&session)).await.unwrap();
        let joined = alice_socket.drain();
        assert_eq!(joined[0]["type"], "session-joined");
        assert_eq!(joined[0]["participants"], json!([alice.public_id]));

        handle_event(state, &bob, &bob_socket.outbox, join(&session)).await.unwrap();
        let joined = bob_socket.drain();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0]["session"]["content"], "fn main() {}");
        assert_eq!(
            joined[0]["participants"],
            json!([alice.public_id, bob.public_id])
        );
        assert_eq!(
            alice_socket.drain(),
            vec![json!({"type": "user-joined", "sessionId": session.id, "userId": bob.public_id})]
        );

        // joining again is quiet for the others
        handle_event(state, &bob, &bob_socket.outbox, join(&session)).await.unwrap();
        assert!(alice_socket.drain().is_empty());
    }

    #[tokio::test]
    async fn edits_are_saved_and_relayed_to_everyone_else() {
        let fixture = SocketFixture::new().await;
        let state = &fixture.state;
        let alice = fixture.user("alice").await;
        let bob = fixture.user("bob").await;
        let session = session_for(&fixture, &alice).await;
        let mut alice_socket = TestSocket::open(&state.realtime().code, &alice).await;
        let mut bob_socket = TestSocket::open(&state.realtime().code, &bob).await;

        let change = || CodeClientEvent::CodeChange {
            session_id: session.id.clone(),
            content: "fn main() { run(); }".into(),
            language: None,
        };
        let err = handle_event(state, &bob, &bob_socket.outbox, change())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        handle_event(state, &alice, &alice_socket.outbox, join(&session)).await.unwrap();
        handle_event(state, &bob, &bob_socket.outbox, join(&session)).await.unwrap();
        alice_socket.drain();
        bob_socket.drain();

        handle_event(state, &bob, &bob_socket.outbox, change()).await.unwrap();
        let updates = alice_socket.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0]["type"], "code-update");
        assert_eq!(updates[0]["content"], "fn main() { run(); }");
        assert_eq!(updates[0]["language"], "rust");
        assert_eq!(updates[0]["updatedBy"], bob.public_id.as_str());
        assert!(bob_socket.drain().is_empty());

        let saved = state
            .services()
            .code_sessions
            .get(&alice, &session.id)
            .await
            .unwrap();
        assert_eq!(saved.content, "fn main() { run(); }");

        let cursor = CodeClientEvent::CursorMove {
            session_id: session.id.clone(),
            line: 3,
            column: 7,
        };
        handle_event(state, &alice, &alice_socket.outbox, cursor).await.unwrap();
        assert_eq!(
            bob_socket.drain(),
            vec![json!({
                "type": "cursor-update",
                "sessionId": session.id,
                "userId": alice.public_id,
                "line": 3,
                "column": 7
            })]
        );
        assert!(alice_socket.drain().is_empty());
    }

    #[tokio::test]
    async fn leaving_or_disconnecting_tells_the_room() {
        let fixture = SocketFixture::new().await;
        let state = &fixture.state;
        let alice = fixture.user("alice").await;
        let bob = fixture.user("bob").await;
        let session = session_for(&fixture, &alice).await;
        let mut alice_socket = TestSocket::open(&state.realtime().code, &alice).await;
        let bob_socket = TestSocket::open(&state.realtime().code, &bob).await;

        handle_event(state, &alice, &alice_socket.outbox, join(&session)).await.unwrap();
        handle_event(state, &bob, &bob_socket.outbox, join(&session)).await.unwrap();
        alice_socket.drain();

        let leave = CodeClientEvent::LeaveSession {
            session_id: session.id.clone(),
        };
        handle_event(state, &bob, &bob_socket.outbox, leave).await.unwrap();
        assert_eq!(alice_socket.types(), vec!["user-left"]);
        assert!(!state.realtime().code_rooms.contains(&session.id, bob.id).await);

        handle_event(state, &bob, &bob_socket.outbox, join(&session)).await.unwrap();
        alice_socket.drain();

        disconnect(state, &bob, bob_socket.connection).await;
        assert_eq!(
            alice_socket.drain(),
            vec![json!({"type": "user-left", "sessionId": session.id, "userId": bob.public_id})]
        );
        assert_eq!(state.realtime().code_rooms.members(&session.id).await, vec![alice.id]);
    }

    #[test]
    fn client_events_use_kebab_case_tags() {
        let event: CodeClientEvent = serde_json::from_value(json!({
            "type": "cursor-move",
            "sessionId": "s1",
            "line": 4,
            "column": 12
        }))
        .unwrap();
        assert!(matches!(
            event,
            CodeClientEvent::CursorMove { line: 4, column: 12, .. }
        ));

        let change: CodeClientEvent = serde_json::from_value(json!({
            "type": "code-change",
            "sessionId": "s1",
            "content": "fn main() {}"
        }))
        .unwrap();
        assert!(matches!(change, CodeClientEvent::CodeChange { language: None, .. }));
    }

    #[test]
    fn server_events_carry_camel_case_fields() {
        let event = CodeServerEvent::UserLeft {
            session_id: "s1".into(),
            user_id: "u1".into(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "user-left", "sessionId": "s1", "userId": "u1"})
        );
    }
}
