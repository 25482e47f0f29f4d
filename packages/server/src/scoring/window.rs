use chrono::{DateTime, Utc};
use sea_orm::*;
use serde::Serialize;

use crate::entity::{challenge, event};

/// Where the current instant falls relative to the configured events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventMode {
    Active,
    Upcoming,
    None,
}

#[derive(Debug, Clone)]
pub struct EventContext {
    pub event: Option<event::Model>,
    pub mode: EventMode,
}

/// `starts_at <= now <= ends_at`. Both bounds are inclusive.
pub fn is_within(now: DateTime<Utc>, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> bool {
    starts_at <= now && now <= ends_at
}

/// The event whose window contains `now`. Overlapping events are resolved in favour of the
/// latest `starts_at`, then the highest id.
pub fn find_active(events: &[event::Model], now: DateTime<Utc>) -> Option<&event::Model> {
    events
        .iter()
        .filter(|e| is_within(now, e.starts_at, e.ends_at))
        .max_by_key(|e| (e.starts_at, e.id))
}

/// The earliest event that has not started yet.
pub fn find_upcoming(events: &[event::Model], now: DateTime<Utc>) -> Option<&event::Model> {
    events
        .iter()
        .filter(|e| e.starts_at > now)
        .min_by_key(|e| (e.starts_at, e.id))
}

/// Active event if any, otherwise the next upcoming one, otherwise none.
pub fn resolve(events: &[event::Model], now: DateTime<Utc>) -> EventContext {
    if let Some(active) = find_active(events, now) {
        return EventContext {
            event: Some(active.clone()),
            mode: EventMode::Active,
        };
    }
    match find_upcoming(events, now) {
        Some(next) => EventContext {
            event: Some(next.clone()),
            mode: EventMode::Upcoming,
        },
        None => EventContext {
            event: None,
            mode: EventMode::None,
        },
    }
}

/// A challenge accepts competitive submissions only inside its own window and its
/// event's window.
pub fn is_challenge_open(
    challenge: &challenge::Model,
    event: &event::Model,
    now: DateTime<Utc>,
) -> bool {
    is_within(now, challenge.starts_at, challenge.ends_at)
        && is_within(now, event.starts_at, event.ends_at)
}

/// Strictly after `ends_at`. The last instant of the window still counts as running.
pub fn has_ended(event: &event::Model, now: DateTime<Utc>) -> bool {
    now > event.ends_at
}

/// `[inner_start, inner_end]` lies inside `[outer_start, outer_end]`.
pub fn contains_window(
    outer: (DateTime<Utc>, DateTime<Utc>),
    inner: (DateTime<Utc>, DateTime<Utc>),
) -> bool {
    outer.0 <= inner.0 && inner.1 <= outer.1
}

/// Load events and resolve the active-or-upcoming context.
pub async fn resolve_event_context<C: ConnectionTrait>(
    db: &C,
    now: DateTime<Utc>,
) -> Result<EventContext, DbErr> {
    let events = event::Entity::find().all(db).await?;
    Ok(resolve(&events, now))
}

/// Load events and return only the one running at `now`.
pub async fn active_event<C: ConnectionTrait>(
    db: &C,
    now: DateTime<Utc>,
) -> Result<Option<event::Model>, DbErr> {
    let events = event::Entity::find().all(db).await?;
    Ok(find_active(&events, now).cloned())
}
