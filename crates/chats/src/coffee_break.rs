//! Coffee Break: random one-on-one pairing from a waiting room.
//!
//! State is process-local. Users queue in arrival order and are paired with
//! the oldest waiter; a pairing expires after a fixed duration.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pairing {
    pub room_id: String,
    pub users: [i64; 2],
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl Pairing {
    pub fn partner_of(&self, user_id: i64) -> Option<i64> {
        match self.users {
            [a, b] if a == user_id => Some(b),
            [a, b] if b == user_id => Some(a),
            _ => None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.ends_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Waiting,
    Matched(Pairing),
}

#[derive(Default)]
struct State {
    queue: VecDeque<i64>,
    pairings: HashMap<String, Pairing>,
    by_user: HashMap<i64, String>,
}

impl State {
    fn remove_pairing(&mut self, room_id: &str) -> Option<Pairing> {
        let pairing = self.pairings.remove(room_id)?;
        for user in pairing.users {
            self.by_user.remove(&user);
        }
        Some(pairing)
    }
}

pub struct CoffeeBreakMatcher {
    state: Mutex<State>,
    duration: Duration,
}

impl CoffeeBreakMatcher {
    pub fn new(duration_seconds: u64) -> Self {
        let seconds = i64::try_from(duration_seconds).unwrap_or(i64::MAX).max(1);
        Self {
            state: Mutex::new(State::default()),
            duration: Duration::seconds(seconds),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queues `user_id` or pairs them with the oldest waiter. Joining while
    /// already waiting keeps the original place; joining while paired
    /// returns the live pairing.
    pub fn join(&self, user_id: i64, now: DateTime<Utc>) -> JoinOutcome {
        let mut state = self.lock();

        if let Some(room) = state.by_user.get(&user_id).cloned() {
            match state.pairings.get(&room) {
                Some(pairing) if !pairing.is_expired(now) => {
                    return JoinOutcome::Matched(pairing.clone());
                }
                _ => {
                    state.remove_pairing(&room);
                }
            }
        }

        if state.queue.contains(&user_id) {
            return JoinOutcome::Waiting;
        }

        let Some(partner) = state.queue.pop_front() else {
            state.queue.push_back(user_id);
            debug!(user_id, "joined coffee break waiting room");
            return JoinOutcome::Waiting;
        };

        let pairing = Pairing {
            room_id: format!("coffee-{}", Uuid::new_v4()),
            users: [partner, user_id],
            started_at: now,
            ends_at: now + self.duration,
        };
        state.by_user.insert(partner, pairing.room_id.clone());
        state.by_user.insert(user_id, pairing.room_id.clone());
        state.pairings.insert(pairing.room_id.clone(), pairing.clone());

        info!(room = %pairing.room_id, first = partner, second = user_id, "coffee break matched");
        JoinOutcome::Matched(pairing)
    }

    /// Leaves the waiting room. Returns whether the user was queued.
    pub fn leave(&self, user_id: i64) -> bool {
        let mut state = self.lock();
        let before = state.queue.len();
        state.queue.retain(|&queued| queued != user_id);
        before != state.queue.len()
    }

    pub fn end(&self, room_id: &str) -> Option<Pairing> {
        let ended = self.lock().remove_pairing(room_id);
        if let Some(pairing) = &ended {
            info!(room = %pairing.room_id, "coffee break ended");
        }
        ended
    }

    /// Ends whatever pairing the user is in, e.g. when their socket closes.
    pub fn end_for_user(&self, user_id: i64) -> Option<Pairing> {
        let mut state = self.lock();
        let room = state.by_user.get(&user_id).cloned()?;
        state.remove_pairing(&room)
    }

    pub fn partner_of(&self, user_id: i64) -> Option<i64> {
        let state = self.lock();
        let room = state.by_user.get(&user_id)?;
        state.pairings.get(room)?.partner_of(user_id)
    }

    pub fn pairing_for(&self, user_id: i64) -> Option<Pairing> {
        let state = self.lock();
        let room = state.by_user.get(&user_id)?;
        state.pairings.get(room).cloned()
    }

    /// Drops pairings whose time is up and returns them so callers can
    /// tell both participants.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<Pairing> {
        let mut state = self.lock();
        let expired: Vec<String> = state
            .pairings
            .values()
            .filter(|pairing| pairing.is_expired(now))
            .map(|pairing| pairing.room_id.clone())
            .collect();

        expired
            .iter()
            .filter_map(|room| state.remove_pairing(room))
            .collect()
    }

    pub fn waiting_count(&self) -> usize {
        self.lock().queue.len()
    }
}
