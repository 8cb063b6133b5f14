//! Live socket bookkeeping. A user may hold several connections (one per
//! tab); events addressed to a user fan out to all of them.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error};

pub type ConnectionId = u64;

/// Sending half of one socket. Events are serialized once and queued for the
/// socket's writer task; a closed socket silently drops them.
#[derive(Clone, Debug)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<String>,
}

impl Outbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send<T: Serialize>(&self, event: &T) -> bool {
        match serde_json::to_string(event) {
            Ok(text) => self.send_text(text),
            Err(err) => {
                error!(error = %err, "failed to serialize socket event");
                false
            }
        }
    }

    fn send_text(&self, text: String) -> bool {
        self.tx.send(text).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

struct UserConnections {
    public_id: String,
    outboxes: Vec<(ConnectionId, Outbox)>,
}

#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    users: Arc<RwLock<HashMap<i64, UserConnections>>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection. Returns its id and whether it is the user's
    /// first live connection.
    pub async fn register(&self, user_id: i64, public_id: &str, outbox: Outbox) -> (ConnectionId, bool) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut users = self.users.write().await;
        let entry = users.entry(user_id).or_insert_with(|| UserConnections {
            public_id: public_id.to_string(),
            outboxes: Vec::new(),
        });
        entry.outboxes.push((id, outbox));
        debug!(user_id, connection = id, live = entry.outboxes.len(), "socket registered");
        (id, entry.outboxes.len() == 1)
    }

    /// Removes a connection. Returns true when the user has no connections left.
    pub async fn unregister(&self, user_id: i64, connection: ConnectionId) -> bool {
        let mut users = self.users.write().await;
        let Some(entry) = users.get_mut(&user_id) else {
            return false;
        };
        entry.outboxes.retain(|(id, _)| *id != connection);
        if entry.outboxes.is_empty() {
            users.remove(&user_id);
            return true;
        }
        false
    }

    pub async fn is_online(&self, user_id: i64) -> bool {
        self.users.read().await.contains_key(&user_id)
    }

    pub async fn public_id(&self, user_id: i64) -> Option<String> {
        self.users
            .read()
            .await
            .get(&user_id)
            .map(|entry| entry.public_id.clone())
    }

    pub async fn online_users(&self) -> Vec<String> {
        let mut online: Vec<String> = self
            .users
            .read()
            .await
            .values()
            .map(|entry| entry.public_id.clone())
            .collect();
        online.sort();
        online
    }

    pub async fn connection_count(&self) -> usize {
        self.users
            .read()
            .await
            .values()
            .map(|entry| entry.outboxes.len())
            .sum()
    }

    /// Delivers `event` to every connection of `user_id`. Returns the number
    /// of sockets that accepted it.
    pub async fn send_to_user<T: Serialize>(&self, user_id: i64, event: &T) -> usize {
        self.send_to_users([user_id], event).await
    }

    pub async fn send_to_users<T, I>(&self, user_ids: I, event: &T) -> usize
    where
        T: Serialize,
        I: IntoIterator<Item = i64>,
    {
        let Some(text) = serialize(event) else {
            return 0;
        };
        let users = self.users.read().await;
        let mut delivered = 0;
        let mut seen = HashSet::new();
        for user_id in user_ids {
            if !seen.insert(user_id) {
                continue;
            }
            if let Some(entry) = users.get(&user_id) {
                delivered += entry
                    .outboxes
                    .iter()
                    .filter(|(_, outbox)| outbox.send_text(text.clone()))
                    .count();
            }
        }
        delivered
    }

    /// Delivers `event` to everyone online, optionally skipping one user.
    pub async fn broadcast<T: Serialize>(&self, event: &T, except: Option<i64>) -> usize {
        let Some(text) = serialize(event) else {
            return 0;
        };
        self.users
            .read()
            .await
            .iter()
            .filter(|(user_id, _)| Some(**user_id) != except)
            .flat_map(|(_, entry)| entry.outboxes.iter())
            .filter(|(_, outbox)| outbox.send_text(text.clone()))
            .count()
    }
}

fn serialize<T: Serialize>(event: &T) -> Option<String> {
    serde_json::to_string(event)
        .map_err(|err| error!(error = %err, "failed to serialize socket event"))
        .ok()
}

/// Named rooms of users, e.g. everyone editing one code session.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<String, HashSet<i64>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn join(&self, room: &str, user_id: i64) -> bool {
        self.rooms
            .write()
            .await
            .entry(room.to_string())
            .or_default()
            .insert(user_id)
    }

    pub async fn leave(&self, room: &str, user_id: i64) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(members) = rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(&user_id);
        if members.is_empty() {
            rooms.remove(room);
        }
        removed
    }

    /// Removes the user from every room and returns the rooms they were in.
    pub async fn leave_all(&self, user_id: i64) -> Vec<String> {
        let mut rooms = self.rooms.write().await;
        let mut left = Vec::new();
        rooms.retain(|room, members| {
            if members.remove(&user_id) {
                left.push(room.clone());
            }
            !members.is_empty()
        });
        left
    }

    pub async fn contains(&self, room: &str, user_id: i64) -> bool {
        self.rooms
            .read()
            .await
            .get(room)
            .map(|members| members.contains(&user_id))
            .unwrap_or(false)
    }

    pub async fn members(&self, room: &str) -> Vec<i64> {
        let mut members: Vec<i64> = self
            .rooms
            .read()
            .await
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();
        members.sort_unstable();
        members
    }
}
