//! Coffee Break namespace (`/ws/coffee-break`): waiting room, random
//! pairing and an ephemeral chat that nobody stores.

use std::time::Duration;

use axum::{
    extract::{ws::WebSocket, Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use zoro_chats::{JoinOutcome, Pairing, UserSummary};
use zoro_database::{User, UserRepository};

use super::{pump, socket_user, ConnectionId, Outbox, SocketQuery};
use crate::{ApiError, AppState};

const MAX_COFFEE_MESSAGE_CHARS: usize = 1_000;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum CoffeeClientEvent {
    JoinWaitingRoom,
    LeaveWaitingRoom,
    CoffeeMessage { content: String },
    EndBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndReason {
    Ended,
    Timeout,
    PartnerLeft,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum CoffeeServerEvent {
    Hello {
        user_id: String,
    },
    Waiting {
        waiting: usize,
    },
    Matched {
        room_id: String,
        partner: UserSummary,
        started_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    },
    LeftWaitingRoom,
    CoffeeMessage {
        room_id: String,
        from: String,
        content: String,
        sent_at: DateTime<Utc>,
    },
    BreakEnded {
        room_id: String,
        reason: EndReason,
    },
}

pub async fn coffee_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<SocketQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user = socket_user(&state, &query, &headers).await?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

async fn handle_socket(socket: WebSocket, state: AppState, user: User) {
    let registry = state.realtime().coffee.clone();
    let (outbox, outbound) = Outbox::channel();
    let (connection, _) = registry
        .register(user.id, &user.public_id, outbox.clone())
        .await;
    info!(user = %user.public_id, connection, "coffee socket connected");

    outbox.send(&CoffeeServerEvent::Hello {
        user_id: user.public_id.clone(),
    });

    pump(socket, outbox.clone(), outbound, &user, |event| {
        handle_event(&state, &user, &outbox, event)
    })
    .await;

    disconnect(&state, &user, connection).await;
    info!(user = %user.public_id, connection, "coffee socket disconnected");
}

/// Once the user's last coffee socket closes they leave the queue, and a
/// running break ends with `partner-left` for the other side.
async fn disconnect(state: &AppState, user: &User, connection: ConnectionId) {
    let registry = &state.realtime().coffee;
    if !registry.unregister(user.id, connection).await {
        return;
    }

    let matcher = state.coffee_break();
    matcher.leave(user.id);
    if let Some(pairing) = matcher.end_for_user(user.id) {
        if let Some(partner) = pairing.partner_of(user.id) {
            let ended = CoffeeServerEvent::BreakEnded {
                room_id: pairing.room_id.clone(),
                reason: EndReason::PartnerLeft,
            };
            registry.send_to_user(partner, &ended).await;
        }
    }
}

async fn handle_event(
    state: &AppState,
    user: &User,
    outbox: &Outbox,
    event: CoffeeClientEvent,
) -> Result<(), ApiError> {
    let matcher = state.coffee_break();

    match event {
        CoffeeClientEvent::JoinWaitingRoom => match matcher.join(user.id, Utc::now()) {
            JoinOutcome::Waiting => {
                outbox.send(&CoffeeServerEvent::Waiting {
                    waiting: matcher.waiting_count(),
                });
            }
            JoinOutcome::Matched(pairing) => announce_match(state, &pairing).await?,
        },
        CoffeeClientEvent::LeaveWaitingRoom => {
            matcher.leave(user.id);
            outbox.send(&CoffeeServerEvent::LeftWaitingRoom);
        }
        CoffeeClientEvent::CoffeeMessage { content } => {
            let content = content.trim();
            if content.is_empty() {
                return Err(ApiError::bad_request("message cannot be empty"));
            }
            if content.chars().count() > MAX_COFFEE_MESSAGE_CHARS {
                return Err(ApiError::bad_request(format!(
                    "message exceeds {MAX_COFFEE_MESSAGE_CHARS} characters"
                )));
            }

            let now = Utc::now();
            let pairing = matcher
                .pairing_for(user.id)
                .ok_or_else(|| ApiError::bad_request("not in a coffee break"))?;
            if pairing.is_expired(now) {
                if let Some(pairing) = matcher.end(&pairing.room_id) {
                    notify_ended(state, &pairing, EndReason::Timeout).await;
                }
                return Err(ApiError::bad_request("coffee break is over"));
            }

            let message = CoffeeServerEvent::CoffeeMessage {
                room_id: pairing.room_id.clone(),
                from: user.public_id.clone(),
                content: content.to_string(),
                sent_at: now,
            };
            state
                .realtime()
                .coffee
                .send_to_users(pairing.users, &message)
                .await;
        }
        CoffeeClientEvent::EndBreak => {
            let pairing = matcher
                .end_for_user(user.id)
                .ok_or_else(|| ApiError::bad_request("not in a coffee break"))?;
            notify_ended(state, &pairing, EndReason::Ended).await;
        }
    }

    Ok(())
}

/// Tells each side of a fresh pairing who they were matched with.
async fn announce_match(state: &AppState, pairing: &Pairing) -> Result<(), ApiError> {
    let users = UserRepository::new(state.db_pool().clone());
    let [first, second] = pairing.users;
    let (Some(first_user), Some(second_user)) = (
        users.find_by_id(first).await.map_err(database_error)?,
        users.find_by_id(second).await.map_err(database_error)?,
    ) else {
        state.coffee_break().end(&pairing.room_id);
        return Err(ApiError::not_found("coffee break partner no longer exists"));
    };

    let registry = &state.realtime().coffee;
    for (recipient, partner) in [(first, &second_user), (second, &first_user)] {
        let matched = CoffeeServerEvent::Matched {
            room_id: pairing.room_id.clone(),
            partner: UserSummary::from(partner),
            started_at: pairing.started_at,
            ends_at: pairing.ends_at,
        };
        registry.send_to_user(recipient, &matched).await;
    }
    Ok(())
}

fn database_error(err: zoro_database::DatabaseError) -> ApiError {
    warn!(error = %err, "coffee break lookup failed");
    ApiError::internal_server_error("database error")
}

async fn notify_ended(state: &AppState, pairing: &Pairing, reason: EndReason) {
    let ended = CoffeeServerEvent::BreakEnded {
        room_id: pairing.room_id.clone(),
        reason,
    };
    state
        .realtime()
        .coffee
        .send_to_users(pairing.users, &ended)
        .await;
}

/// Periodically closes pairings whose time ran out. Runs until the handle is
/// aborted.
pub fn spawn_expiry_sweeper(state: AppState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            end_expired(&state, Utc::now()).await;
        }
    })
}

/// Ends every pairing that ran out by `now` and tells both sides.
async fn end_expired(state: &AppState, now: DateTime<Utc>) -> usize {
    let expired = state.coffee_break().sweep_expired(now);
    if !expired.is_empty() {
        debug!(count = expired.len(), "coffee breaks timed out");
    }
    for pairing in &expired {
        notify_ended(state, pairing, EndReason::Timeout).await;
    }
    expired.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::test_support::{SocketFixture, TestSocket};
    use serde_json::{json, Value};

    struct Paired {
        fixture: SocketFixture,
        alice: User,
        bob: User,
        alice_socket: TestSocket,
        bob_socket: TestSocket,
        room_id: String,
    }

    async fn paired(fixture: SocketFixture) -> Paired {
        let state = &fixture.state;
        let alice = fixture.user("alice").await;
        let bob = fixture.user("bob").await;
        let mut alice_socket = TestSocket::open(&state.realtime().coffee, &alice).await;
        let mut bob_socket = TestSocket::open(&state.realtime().coffee, &bob).await;

        handle_event(state, &alice, &alice_socket.outbox, CoffeeClientEvent::JoinWaitingRoom)
            .await
            .unwrap();
        assert_eq!(alice_socket.drain(), vec![json!({"type": "waiting", "waiting": 1})]);

        handle_event(state, &bob, &bob_socket.outbox, CoffeeClientEvent::JoinWaitingRoom)
            .await
            .unwrap();
        let to_alice = alice_socket.drain();
        let to_bob = bob_socket.drain();
        assert_eq!(to_alice.len(), 1);
        assert_eq!(to_bob.len(), 1);
        assert_eq!(to_alice[0]["type"], "matched");
        assert_eq!(to_alice[0]["partner"]["id"], bob.public_id.as_str());
        assert_eq!(to_bob[0]["partner"]["id"], alice.public_id.as_str());
        assert_eq!(to_alice[0]["roomId"], to_bob[0]["roomId"]);
        let room_id = to_alice[0]["roomId"].as_str().unwrap().to_string();

        Paired {
            fixture,
            alice,
            bob,
            alice_socket,
            bob_socket,
            room_id,
        }
    }

    fn ended(room_id: &str, reason: &str) -> Value {
        json!({"type": "break-ended", "roomId": room_id, "reason": reason})
    }

    #[tokio::test]
    async fn messages_reach_only_the_pair() {
        let mut pair = paired(SocketFixture::new().await).await;
        let state = &pair.fixture.state;
        let carol = pair.fixture.user("carol").await;
        let mut carol_socket = TestSocket::open(&state.realtime().coffee, &carol).await;

        let message = CoffeeClientEvent::CoffeeMessage {
            content: "  how's your week?  ".into(),
        };
        handle_event(state, &pair.alice, &pair.alice_socket.outbox, message)
            .await
            .unwrap();

        for socket in [&mut pair.alice_socket, &mut pair.bob_socket] {
            let events = socket.drain();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0]["type"], "coffee-message");
            assert_eq!(events[0]["content"], "how's your week?");
            assert_eq!(events[0]["from"], pair.alice.public_id.as_str());
            assert_eq!(events[0]["roomId"], pair.room_id.as_str());
        }
        assert!(carol_socket.drain().is_empty());

        let stray = CoffeeClientEvent::CoffeeMessage {
            content: "anyone?".into(),
        };
        assert!(handle_event(state, &carol, &carol_socket.outbox, stray).await.is_err());

        let blank = CoffeeClientEvent::CoffeeMessage { content: "   ".into() };
        assert!(handle_event(state, &pair.bob, &pair.bob_socket.outbox, blank).await.is_err());
        let long = CoffeeClientEvent::CoffeeMessage {
            content: "x".repeat(MAX_COFFEE_MESSAGE_CHARS + 1),
        };
        assert!(handle_event(state, &pair.bob, &pair.bob_socket.outbox, long).await.is_err());
    }

    #[tokio::test]
    async fn ending_the_break_tells_both_sides() {
        let mut pair = paired(SocketFixture::new().await).await;
        let state = &pair.fixture.state;

        handle_event(state, &pair.bob, &pair.bob_socket.outbox, CoffeeClientEvent::EndBreak)
            .await
            .unwrap();

        let expected = vec![ended(&pair.room_id, "ended")];
        assert_eq!(pair.alice_socket.drain(), expected);
        assert_eq!(pair.bob_socket.drain(), expected);
        assert!(state.coffee_break().pairing_for(pair.alice.id).is_none());

        let again = handle_event(state, &pair.bob, &pair.bob_socket.outbox, CoffeeClientEvent::EndBreak).await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn disconnecting_leaves_the_partner_a_note() {
        let mut pair = paired(SocketFixture::new().await).await;
        let state = &pair.fixture.state;

        disconnect(state, &pair.bob, pair.bob_socket.connection).await;

        assert_eq!(pair.alice_socket.drain(), vec![ended(&pair.room_id, "partner-left")]);
        assert!(pair.bob_socket.drain().is_empty());
        assert!(state.coffee_break().pairing_for(pair.alice.id).is_none());
    }

    #[tokio::test]
    async fn disconnecting_while_waiting_leaves_the_queue() {
        let fixture = SocketFixture::new().await;
        let state = &fixture.state;
        let alice = fixture.user("alice").await;
        let socket = TestSocket::open(&state.realtime().coffee, &alice).await;

        handle_event(state, &alice, &socket.outbox, CoffeeClientEvent::JoinWaitingRoom)
            .await
            .unwrap();
        assert_eq!(state.coffee_break().waiting_count(), 1);

        disconnect(state, &alice, socket.connection).await;
        assert_eq!(state.coffee_break().waiting_count(), 0);
    }

    #[tokio::test]
    async fn sweeper_times_out_finished_breaks() {
        let mut pair = paired(SocketFixture::new().await).await;
        let state = &pair.fixture.state;

        assert_eq!(end_expired(state, Utc::now()).await, 0);
        assert!(pair.alice_socket.drain().is_empty());

        let later = Utc::now() + chrono::Duration::minutes(10);
        assert_eq!(end_expired(state, later).await, 1);

        let expected = vec![ended(&pair.room_id, "timeout")];
        assert_eq!(pair.alice_socket.drain(), expected);
        assert_eq!(pair.bob_socket.drain(), expected);
    }

    #[tokio::test]
    async fn messages_after_expiry_end_the_break() {
        let fixture = SocketFixture::with_config(|config| config.coffee_break.duration_seconds = 1).await;
        let mut pair = paired(fixture).await;
        let state = &pair.fixture.state;

        tokio::time::sleep(Duration::from_millis(1_100)).await;

        let late = CoffeeClientEvent::CoffeeMessage {
            content: "still there?".into(),
        };
        let err = handle_event(state, &pair.alice, &pair.alice_socket.outbox, late)
            .await
            .unwrap_err();
        assert_eq!(err.message, "coffee break is over");

        let expected = vec![ended(&pair.room_id, "timeout")];
        assert_eq!(pair.alice_socket.drain(), expected);
        assert_eq!(pair.bob_socket.drain(), expected);
    }

    #[test]
    fn unit_client_events_parse_from_tag_alone() {
        let event: CoffeeClientEvent =
            serde_json::from_value(json!({"type": "join-waiting-room"})).unwrap();
        assert!(matches!(event, CoffeeClientEvent::JoinWaitingRoom));

        let message: CoffeeClientEvent =
            serde_json::from_value(json!({"type": "coffee-message", "content": "hey"})).unwrap();
        assert!(matches!(message, CoffeeClientEvent::CoffeeMessage { .. }));
    }

    #[test]
    fn break_ended_reports_reason_in_kebab_case() {
        let event = CoffeeServerEvent::BreakEnded {
            room_id: "coffee-1".into(),
            reason: EndReason::PartnerLeft,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "break-ended", "roomId": "coffee-1", "reason": "partner-left"})
        );
    }
}
