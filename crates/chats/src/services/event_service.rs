//! Team calendar events. Anyone may read; only site admins write.

use tracing::info;
use zoro_database::{
    now_timestamp, Event, EventRepository, NewEvent, SqlitePool, UpdateEvent, User,
};

use crate::types::{ChatError, ChatResult, CreateEventRequest};
use crate::utils::Validator;

const MAX_TITLE_CHARS: usize = 200;
const DEFAULT_UPCOMING: i64 = 20;

#[derive(Clone)]
pub struct EventService {
    events: EventRepository,
}

fn require_admin(user: &User) -> ChatResult<()> {
    if !user.is_admin() {
        return Err(ChatError::permission_denied("admin role required"));
    }
    Ok(())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl EventService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            events: EventRepository::new(pool),
        }
    }

    async fn event(&self, public_id: &str) -> ChatResult<Event> {
        self.events
            .find_by_public_id(public_id)
            .await?
            .ok_or_else(|| ChatError::not_found(format!("event {public_id}")))
    }

    fn check_order(starts_at: &str, ends_at: Option<&str>) -> ChatResult<()> {
        // stored timestamps share one fixed-width UTC format, so they order lexically
        if let Some(ends_at) = ends_at {
            if ends_at < starts_at {
                return Err(ChatError::validation("event cannot end before it starts"));
            }
        }
        Ok(())
    }

    pub async fn create(&self, user: &User, request: CreateEventRequest) -> ChatResult<Event> {
        require_admin(user)?;

        let title = Validator::sanitize_string(&request.title, "title", MAX_TITLE_CHARS)?;
        let starts_at = Validator::timestamp(&request.starts_at, "starts_at")?;
        let ends_at = request
            .ends_at
            .as_deref()
            .map(|value| Validator::timestamp(value, "ends_at"))
            .transpose()?;
        Self::check_order(&starts_at, ends_at.as_deref())?;

        let event = self
            .events
            .create(&NewEvent {
                title,
                description: optional_text(request.description),
                location: optional_text(request.location),
                starts_at,
                ends_at,
                created_by: user.id,
            })
            .await?;

        info!(event_id = %event.public_id, starts_at = %event.starts_at, "event created");
        Ok(event)
    }

    pub async fn update(
        &self,
        user: &User,
        event_id: &str,
        mut update: UpdateEvent,
    ) -> ChatResult<Event> {
        require_admin(user)?;
        let existing = self.event(event_id).await?;

        if let Some(title) = update.title.as_deref() {
            update.title = Some(Validator::sanitize_string(title, "title", MAX_TITLE_CHARS)?);
        }
        update.starts_at = update
            .starts_at
            .as_deref()
            .map(|value| Validator::timestamp(value, "starts_at"))
            .transpose()?;
        update.ends_at = update
            .ends_at
            .as_deref()
            .map(|value| Validator::timestamp(value, "ends_at"))
            .transpose()?;

        let starts_at = update.starts_at.as_deref().unwrap_or(&existing.starts_at);
        let ends_at = update.ends_at.as_deref().or(existing.ends_at.as_deref());
        Self::check_order(starts_at, ends_at)?;

        Ok(self.events.update(existing.id, &update).await?)
    }

    pub async fn delete(&self, user: &User, event_id: &str) -> ChatResult<()> {
        require_admin(user)?;
        let event = self.event(event_id).await?;
        self.events.delete(event.id).await?;
        info!(event_id, "event deleted");
        Ok(())
    }

    /// Events starting from now, soonest first.
    pub async fn upcoming(&self, limit: Option<i64>) -> ChatResult<Vec<Event>> {
        let limit = limit.unwrap_or(DEFAULT_UPCOMING).clamp(1, 100);
        Ok(self.events.upcoming(&now_timestamp(), limit).await?)
    }

    pub async fn all(&self) -> ChatResult<Vec<Event>> {
        Ok(self.events.list().await?)
    }
}
