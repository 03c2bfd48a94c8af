//! Event de-duplication window.
//!
//! Remembers which event identities are currently "active" so the router can
//! tell a fresh motion apart from an update to one it has already acted on.
//!
//! Eviction policy:
//! - every entry expires `ttl` after it was first seen (the notification's
//!   `expires_in`);
//! - the capacity is soft: an insert may push the window one past its
//!   capacity, and the next classification pass drops the least recently
//!   seen entries until it is back within bounds. The id being classified is
//!   never the one dropped.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::id::EventId;
use crate::time::Timestamp;

/// Soft bound on remembered event identities.
pub const DEFAULT_CAPACITY: usize = 20;

/// Result of [`EventDeduplicator::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// First sighting within the window; the id is now recorded.
    New,
    /// The id is already in the window.
    Repeat,
}

/// One remembered event identity. Only its sighting bookkeeping changes
/// after insertion; the expiry stays anchored on the first sighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupEntry {
    pub event_id: EventId,
    pub inserted_at: Timestamp,
    pub last_seen: Timestamp,
    pub ttl: Duration,
    expires_at: Timestamp,
    // sighting order, breaks ties between equal `last_seen`
    seen_seq: u64,
}

impl DedupEntry {
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

/// Bounded, TTL-aware set of active event identities.
#[derive(Debug)]
pub struct EventDeduplicator {
    entries: HashMap<EventId, DedupEntry>,
    capacity: usize,
    next_seq: u64,
}

impl Default for EventDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventDeduplicator {
    /// Create a window holding roughly `capacity` identities (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            next_seq: 0,
        }
    }

    /// Classify `event_id`, recording it when it is new.
    ///
    /// Expired entries are purged and capacity pressure is relieved before
    /// the lookup, so an id whose window has lapsed counts as new again.
    pub fn classify(&mut self, event_id: &EventId, ttl: Duration, now: Timestamp) -> Classification {
        self.purge_expired(now);
        self.relieve_pressure(event_id);
        let seen_seq = self.next_seq;
        self.next_seq += 1;
        if let Some(entry) = self.entries.get_mut(event_id) {
            entry.last_seen = entry.last_seen.max(now);
            entry.seen_seq = seen_seq;
            return Classification::Repeat;
        }

        let delta = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let expires_at = now
            .checked_add_signed(delta)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let entry = DedupEntry {
            event_id: event_id.clone(),
            inserted_at: now,
            last_seen: now,
            ttl,
            expires_at,
            seen_seq,
        };
        self.entries.insert(event_id.clone(), entry);
        Classification::New
    }

    /// Forget `event_id`. Returns whether it was present.
    pub fn evict(&mut self, event_id: &EventId) -> bool {
        self.entries.remove(event_id).is_some()
    }

    /// Drop every entry whose TTL has elapsed. Returns how many were dropped.
    pub fn purge_expired(&mut self, now: Timestamp) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    #[must_use]
    pub fn contains(&self, event_id: &EventId) -> bool {
        self.entries.contains_key(event_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the window has reached its soft capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    fn relieve_pressure(&mut self, keep: &EventId) {
        while self.entries.len() > self.capacity {
            let stalest = self
                .entries
                .values()
                .filter(|entry| &entry.event_id != keep)
                .min_by_key(|entry| (entry.last_seen, entry.seen_seq))
                .map(|entry| entry.event_id.clone());
            match stalest {
                Some(id) => {
                    self.entries.remove(&id);
                }
                None => break,
            }
        }
    }
}
