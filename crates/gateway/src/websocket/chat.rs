//! Main chat namespace (`/ws`): direct and group messages, typing
//! indicators, read receipts and presence.

use axum::{
    extract::{ws::WebSocket, Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use zoro_chats::{GroupMessageView, MessageView, SendDirectMessage, SendGroupMessage};
use zoro_database::{MessageType, User};

use super::{pump, socket_user, ConnectionId, Outbox, SocketQuery};
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ChatClientEvent {
    SendMessage {
        recipient_id: String,
        content: String,
        #[serde(default)]
        message_type: MessageType,
    },
    GroupMessage {
        group_id: String,
        content: String,
        #[serde(default)]
        message_type: MessageType,
    },
    Typing {
        #[serde(default)]
        recipient_id: Option<String>,
        #[serde(default)]
        group_id: Option<String>,
        #[serde(default = "typing_default")]
        is_typing: bool,
    },
    MarkRead {
        partner_id: String,
    },
    GetOnlineUsers,
}

fn typing_default() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ChatServerEvent {
    Hello {
        user_id: String,
    },
    OnlineUsers {
        user_ids: Vec<String>,
    },
    UserOnline {
        user_id: String,
    },
    UserOffline {
        user_id: String,
    },
    ReceiveMessage {
        message: MessageView,
    },
    MessageSent {
        message: MessageView,
    },
    ReceiveGroupMessage {
        message: GroupMessageView,
    },
    Typing {
        user_id: String,
        group_id: Option<String>,
        is_typing: bool,
    },
    MessagesRead {
        reader_id: String,
        count: u64,
    },
    Notification {
        title: String,
        link: Option<String>,
    },
}

pub async fn chat_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<SocketQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user = socket_user(&state, &query, &headers).await?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

async fn handle_socket(socket: WebSocket, state: AppState, user: User) {
    let registry = state.realtime().chat.clone();
    let (outbox, outbound) = Outbox::channel();
    let (connection, first) = registry
        .register(user.id, &user.public_id, outbox.clone())
        .await;
    info!(user = %user.public_id, connection, "chat socket connected");

    outbox.send(&ChatServerEvent::Hello {
        user_id: user.public_id.clone(),
    });
    outbox.send(&ChatServerEvent::OnlineUsers {
        user_ids: registry.online_users().await,
    });
    if first {
        let online = ChatServerEvent::UserOnline {
            user_id: user.public_id.clone(),
        };
        registry.broadcast(&online, Some(user.id)).await;
    }

    pump(socket, outbox.clone(), outbound, &user, |event| {
        handle_event(&state, &user, &outbox, event)
    })
    .await;

    disconnect(&state, &user, connection).await;
    info!(user = %user.public_id, connection, "chat socket disconnected");
}

/// Drops the connection and announces the user offline once their last tab
/// is gone.
async fn disconnect(state: &AppState, user: &User, connection: ConnectionId) {
    let registry = &state.realtime().chat;
    if registry.unregister(user.id, connection).await {
        let offline = ChatServerEvent::UserOffline {
            user_id: user.public_id.clone(),
        };
        registry.broadcast(&offline, None).await;
    }
}

async fn handle_event(
    state: &AppState,
    user: &User,
    outbox: &Outbox,
    event: ChatClientEvent,
) -> Result<(), ApiError> {
    let services = state.services();
    let registry = &state.realtime().chat;

    match event {
        ChatClientEvent::SendMessage {
            recipient_id,
            content,
            message_type,
        } => {
            let request = SendDirectMessage {
                recipient_id,
                content,
                message_type,
            };
            let message = services.messages.send_direct(user, request).await?;
            deliver_direct(state, user, &message).await;
        }
        ChatClientEvent::GroupMessage {
            group_id,
            content,
            message_type,
        } => {
            let request = SendGroupMessage {
                content,
                message_type,
            };
            let message = services.groups.send_message(user, &group_id, request).await?;
            deliver_group(state, user, &message).await;
        }
        ChatClientEvent::Typing {
            recipient_id,
            group_id,
            is_typing,
        } => {
            let event = ChatServerEvent::Typing {
                user_id: user.public_id.clone(),
                group_id: group_id.clone(),
                is_typing,
            };
            match (recipient_id, group_id) {
                (_, Some(group_id)) => {
                    let members = services.groups.member_user_ids(user, &group_id).await?;
                    let others = members.into_iter().filter(|id| *id != user.id);
                    registry.send_to_users(others, &event).await;
                }
                (Some(recipient_id), None) => {
                    let recipient = services.messages.find_user(&recipient_id).await?;
                    registry.send_to_user(recipient.id, &event).await;
                }
                (None, None) => {
                    return Err(ApiError::bad_request(
                        "typing needs a recipientId or groupId",
                    ));
                }
            }
        }
        ChatClientEvent::MarkRead { partner_id } => {
            let count = services.messages.mark_read(user, &partner_id).await?;
            if count > 0 {
                let partner = services.messages.find_user(&partner_id).await?;
                let receipt = ChatServerEvent::MessagesRead {
                    reader_id: user.public_id.clone(),
                    count,
                };
                registry.send_to_user(partner.id, &receipt).await;
            }
        }
        ChatClientEvent::GetOnlineUsers => {
            outbox.send(&ChatServerEvent::OnlineUsers {
                user_ids: registry.online_users().await,
            });
        }
    }

    Ok(())
}

/// Pushes a stored direct message to the recipient and to every open tab of
/// the sender.
pub async fn deliver_direct(state: &AppState, sender: &User, message: &MessageView) {
    let registry = &state.realtime().chat;
    let sent = ChatServerEvent::MessageSent {
        message: message.clone(),
    };
    registry.send_to_user(sender.id, &sent).await;

    match state.services().messages.find_user(&message.recipient_id).await {
        Ok(recipient) => {
            let received = ChatServerEvent::ReceiveMessage {
                message: message.clone(),
            };
            registry.send_to_user(recipient.id, &received).await;
        }
        Err(err) => warn!(message = %message.id, error = %err, "recipient lookup failed"),
    }
}

/// Pushes a stored group message to every online member, the sender included.
pub async fn deliver_group(state: &AppState, sender: &User, message: &GroupMessageView) {
    match state
        .services()
        .groups
        .member_user_ids(sender, &message.group_id)
        .await
    {
        Ok(members) => {
            let event = ChatServerEvent::ReceiveGroupMessage {
                message: message.clone(),
            };
            state.realtime().chat.send_to_users(members, &event).await;
        }
        Err(err) => warn!(group = %message.group_id, error = %err, "group fan-out failed"),
    }
}

/// Live nudge accompanying a stored notification. Offline users pick the
/// notification up from their inbox instead.
pub async fn push_notification(state: &AppState, user_id: &str, title: String, link: Option<String>) {
    match state.services().messages.find_user(user_id).await {
        Ok(user) => {
            let event = ChatServerEvent::Notification { title, link };
            state.realtime().chat.send_to_user(user.id, &event).await;
        }
        Err(err) => warn!(user = user_id, error = %err, "notification push skipped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::handle_frame;
    use crate::websocket::test_support::{SocketFixture, TestSocket};
    use serde_json::json;
    use zoro_chats::CreateGroupRequest;

    fn direct(to: &User, content: &str) -> ChatClientEvent {
        ChatClientEvent::SendMessage {
            recipient_id: to.public_id.clone(),
            content: content.to_string(),
            message_type: MessageType::Text,
        }
    }

    #[tokio::test]
    async fn direct_message_reaches_sender_and_recipient() {
        let fixture = SocketFixture::new().await;
        let state = &fixture.state;
        let alice = fixture.user("alice").await;
        let bob = fixture.user("bob").await;
        let carol = fixture.user("carol").await;
        let registry = &state.realtime().chat;
        let mut alice_socket = TestSocket::open(registry, &alice).await;
        let mut bob_socket = TestSocket::open(registry, &bob).await;
        let mut carol_socket = TestSocket::open(registry, &carol).await;

        handle_event(state, &alice, &alice_socket.outbox, direct(&bob, "lunch?"))
            .await
            .unwrap();

        let sent = alice_socket.drain();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["type"], "messageSent");
        assert_eq!(sent[0]["message"]["content"], "lunch?");

        let received = bob_socket.drain();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["type"], "receiveMessage");
        assert_eq!(received[0]["message"]["sender_id"], alice.public_id.as_str());
        assert!(carol_socket.drain().is_empty());
    }

    #[tokio::test]
    async fn group_message_reaches_every_member_only() {
        let fixture = SocketFixture::new().await;
        let state = &fixture.state;
        let alice = fixture.user("alice").await;
        let bob = fixture.user("bob").await;
        let carol = fixture.user("carol").await;
        let outsider = fixture.user("dave").await;
        let group = state
            .services()
            .groups
            .create_group(
                &alice,
                CreateGroupRequest {
                    name: "Platform".into(),
                    description: None,
                    member_ids: vec![bob.public_id.clone(), carol.public_id.clone()],
                },
            )
            .await
            .unwrap();

        let registry = &state.realtime().chat;
        let mut alice_socket = TestSocket::open(registry, &alice).await;
        let mut bob_socket = TestSocket::open(registry, &bob).await;
        let mut carol_socket = TestSocket::open(registry, &carol).await;
        let mut outsider_socket = TestSocket::open(registry, &outsider).await;

        let event = ChatClientEvent::GroupMessage {
            group_id: group.group.id.clone(),
            content: "deploy at 5".into(),
            message_type: MessageType::Text,
        };
        handle_event(state, &alice, &alice_socket.outbox, event).await.unwrap();

        for socket in [&mut alice_socket, &mut bob_socket, &mut carol_socket] {
            let events = socket.drain();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0]["type"], "receiveGroupMessage");
            assert_eq!(events[0]["message"]["content"], "deploy at 5");
        }
        assert!(outsider_socket.drain().is_empty());

        let typing = ChatClientEvent::Typing {
            recipient_id: None,
            group_id: Some(group.group.id.clone()),
            is_typing: true,
        };
        handle_event(state, &bob, &bob_socket.outbox, typing).await.unwrap();
        assert_eq!(alice_socket.types(), vec!["typing"]);
        assert_eq!(carol_socket.types(), vec!["typing"]);
        assert!(bob_socket.drain().is_empty());
        assert!(outsider_socket.drain().is_empty());

        let intruding = ChatClientEvent::GroupMessage {
            group_id: group.group.id.clone(),
            content: "hi".into(),
            message_type: MessageType::Text,
        };
        assert!(handle_event(state, &outsider, &outsider_socket.outbox, intruding)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn direct_typing_goes_to_the_recipient() {
        let fixture = SocketFixture::new().await;
        let state = &fixture.state;
        let alice = fixture.user("alice").await;
        let bob = fixture.user("bob").await;
        let registry = &state.realtime().chat;
        let mut alice_socket = TestSocket::open(registry, &alice).await;
        let mut bob_socket = TestSocket::open(registry, &bob).await;

        let typing = ChatClientEvent::Typing {
            recipient_id: Some(bob.public_id.clone()),
            group_id: None,
            is_typing: false,
        };
        handle_event(state, &alice, &alice_socket.outbox, typing).await.unwrap();

        let events = bob_socket.drain();
        assert_eq!(
            events,
            vec![json!({
                "type": "typing",
                "userId": alice.public_id,
                "groupId": null,
                "isTyping": false
            })]
        );
        assert!(alice_socket.drain().is_empty());

        let aimless = ChatClientEvent::Typing {
            recipient_id: None,
            group_id: None,
            is_typing: true,
        };
        let err = handle_event(state, &alice, &alice_socket.outbox, aimless)
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn mark_read_sends_a_receipt_to_the_partner() {
        let fixture = SocketFixture::new().await;
        let state = &fixture.state;
        let alice = fixture.user("alice").await;
        let bob = fixture.user("bob").await;
        let registry = &state.realtime().chat;
        let mut alice_socket = TestSocket::open(registry, &alice).await;
        let mut bob_socket = TestSocket::open(registry, &bob).await;

        for text in ["one", "two"] {
            handle_event(state, &alice, &alice_socket.outbox, direct(&bob, text))
                .await
                .unwrap();
        }
        alice_socket.drain();
        bob_socket.drain();

        let read = ChatClientEvent::MarkRead {
            partner_id: alice.public_id.clone(),
        };
        handle_event(state, &bob, &bob_socket.outbox, read).await.unwrap();
        assert_eq!(
            alice_socket.drain(),
            vec![json!({"type": "messagesRead", "readerId": bob.public_id, "count": 2})]
        );
        assert!(bob_socket.drain().is_empty());

        let again = ChatClientEvent::MarkRead {
            partner_id: alice.public_id.clone(),
        };
        handle_event(state, &bob, &bob_socket.outbox, again).await.unwrap();
        assert!(alice_socket.drain().is_empty());
    }

    #[tokio::test]
    async fn rejected_and_unparseable_frames_become_error_events() {
        let fixture = SocketFixture::new().await;
        let state = &fixture.state;
        let alice = fixture.user("alice").await;
        let mut socket = TestSocket::open(&state.realtime().chat, &alice).await;
        let outbox = socket.outbox.clone();

        let mut on_event = |event| handle_event(state, &alice, &outbox, event);
        let to_self = json!({
            "type": "sendMessage",
            "recipientId": alice.public_id,
            "content": "talking to myself"
        })
        .to_string();
        handle_frame(&to_self, &outbox, &alice, &mut on_event).await;
        handle_frame(r#"{"type":"shout"}"#, &outbox, &alice, &mut on_event).await;

        let events = socket.drain();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|event| event["type"] == "error"));
        assert!(events[1]["message"]
            .as_str()
            .unwrap()
            .starts_with("invalid event"));
    }

    #[tokio::test]
    async fn last_tab_closing_announces_offline() {
        let fixture = SocketFixture::new().await;
        let state = &fixture.state;
        let alice = fixture.user("alice").await;
        let bob = fixture.user("bob").await;
        let registry = &state.realtime().chat;
        let first_tab = TestSocket::open(registry, &alice).await;
        let second_tab = TestSocket::open(registry, &alice).await;
        let mut bob_socket = TestSocket::open(registry, &bob).await;

        disconnect(state, &alice, first_tab.connection).await;
        assert!(bob_socket.drain().is_empty());
        assert!(registry.is_online(alice.id).await);

        disconnect(state, &alice, second_tab.connection).await;
        assert_eq!(
            bob_socket.drain(),
            vec![json!({"type": "userOffline", "userId": alice.public_id})]
        );
    }

    #[test]
    fn client_events_use_camel_case() {
        let event: ChatClientEvent = serde_json::from_value(json!({
            "type": "sendMessage",
            "recipientId": "u2",
            "content": "hi"
        }))
        .unwrap();
        match event {
            ChatClientEvent::SendMessage {
                recipient_id,
                message_type,
                ..
            } => {
                assert_eq!(recipient_id, "u2");
                assert_eq!(message_type, MessageType::Text);
            }
            other => panic!("unexpected event {other:?}"),
        }

        let typing: ChatClientEvent =
            serde_json::from_value(json!({"type": "typing", "groupId": "g1"})).unwrap();
        assert!(matches!(
            typing,
            ChatClientEvent::Typing { is_typing: true, group_id: Some(_), .. }
        ));
    }

    #[test]
    fn unknown_event_types_fail_to_parse() {
        let parsed = serde_json::from_value::<ChatClientEvent>(json!({"type": "shout"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn server_events_are_tagged() {
        let event = ChatServerEvent::UserOnline {
            user_id: "u1".into(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "userOnline", "userId": "u1"})
        );

        let receipt = ChatServerEvent::MessagesRead {
            reader_id: "u2".into(),
            count: 3,
        };
        assert_eq!(
            serde_json::to_value(&receipt).unwrap(),
            json!({"type": "messagesRead", "readerId": "u2", "count": 3})
        );
    }
}
