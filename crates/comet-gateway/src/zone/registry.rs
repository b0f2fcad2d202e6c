//! Sharded session registry
//!
//! Each [`Zone`] is one independently locked map from routing id to session.
//! [`Zones`] selects the shard from the id's zone bits, so a given id always
//! lands in the same shard.

use super::RoutingId;
use crate::connection::{CloseReason, Session};
use crate::protocol::Proto;
use crate::stats::Stats;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Result of routing a push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushOutcome {
    /// Queued on the session's outbound channel
    Delivered,
    /// The session exists but could not take the unit
    Dropped,
    /// No session is registered under the id
    UnknownId,
}

/// Per-shard counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoneStats {
    pub id: u8,
    pub add: u64,
    pub remove: u64,
    pub current: u64,
}

/// One shard of the registry
#[derive(Debug)]
pub struct Zone {
    id: u8,
    sessions: RwLock<HashMap<RoutingId, Arc<Session>>>,
    added: AtomicU64,
    removed: AtomicU64,
}

impl Zone {
    #[must_use]
    pub fn new(id: u8, capacity: usize) -> Self {
        Self {
            id,
            sessions: RwLock::new(HashMap::with_capacity(capacity)),
            added: AtomicU64::new(0),
            removed: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Register a session, evicting any other session under the same id
    ///
    /// The evicted session is closed and returned.
    pub fn put(&self, session: Arc<Session>) -> Option<Arc<Session>> {
        let id = session.id();
        let old = self.sessions.write().insert(id, Arc::clone(&session));
        self.added.fetch_add(1, Ordering::Relaxed);

        let old = old.filter(|old| !Arc::ptr_eq(old, &session))?;
        self.removed.fetch_add(1, Ordering::Relaxed);
        old.close(CloseReason::Evicted);
        tracing::info!(id = %id, zone = self.id, "evicted previous session");
        Some(old)
    }

    #[must_use]
    pub fn get(&self, id: RoutingId) -> Option<Arc<Session>> {
        self.sessions.read().get(&id).cloned()
    }

    /// Remove whatever is stored under `id`; absent ids are a no-op
    pub fn delete(&self, id: RoutingId) -> Option<Arc<Session>> {
        let removed = self.sessions.write().remove(&id);
        if removed.is_some() {
            self.removed.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Remove `session` only if it is still the registered one
    pub fn remove_session(&self, session: &Arc<Session>) -> bool {
        let mut sessions = self.sessions.write();
        match sessions.get(&session.id()) {
            Some(current) if Arc::ptr_eq(current, session) => {
                sessions.remove(&session.id());
                drop(sessions);
                self.removed.fetch_add(1, Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }

    /// Route a server push to the session registered under `id`
    pub fn push_to(&self, id: RoutingId, proto: Proto) -> PushOutcome {
        let sessions = self.sessions.read();
        let Some(session) = sessions.get(&id) else {
            tracing::debug!(id = %id, "push to unknown id");
            return PushOutcome::UnknownId;
        };
        match session.push(proto) {
            Ok(()) => PushOutcome::Delivered,
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "push dropped");
                PushOutcome::Dropped
            }
        }
    }

    /// Close every registered session
    ///
    /// A session put concurrently may be missed.
    pub fn close_all(&self) -> usize {
        let sessions = self.sessions.read();
        for session in sessions.values() {
            session.close(CloseReason::Shutdown);
        }
        sessions.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> ZoneStats {
        let add = self.added.load(Ordering::Relaxed);
        let remove = self.removed.load(Ordering::Relaxed);
        ZoneStats {
            id: self.id,
            add,
            remove,
            current: add.saturating_sub(remove),
        }
    }
}

/// The full set of shards
#[derive(Debug)]
pub struct Zones {
    zones: Vec<Zone>,
    stats: Arc<Stats>,
}

impl Zones {
    /// Create `num` shards (clamped to 1..=256)
    #[must_use]
    pub fn new(num: usize, capacity: usize, stats: Arc<Stats>) -> Self {
        let num = num.clamp(1, usize::from(u8::MAX) + 1);
        let zones = (0..num).map(|id| Zone::new(id as u8, capacity)).collect();
        Self { zones, stats }
    }

    /// Shard for `id`, if its zone bits name an existing shard
    #[must_use]
    pub fn zone(&self, id: RoutingId) -> Option<&Zone> {
        self.zones.get(usize::from(id.zone()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Register a session; returns false when its id names no shard
    pub fn put(&self, session: Arc<Session>) -> bool {
        match self.zone(session.id()) {
            Some(zone) => {
                zone.put(session);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn get(&self, id: RoutingId) -> Option<Arc<Session>> {
        self.zone(id)?.get(id)
    }

    pub fn delete(&self, id: RoutingId) -> Option<Arc<Session>> {
        self.zone(id)?.delete(id)
    }

    pub fn remove_session(&self, session: &Arc<Session>) -> bool {
        self.zone(session.id())
            .is_some_and(|zone| zone.remove_session(session))
    }

    /// Route a server push; failures are logged and counted, never propagated
    pub fn push_to(&self, id: RoutingId, proto: Proto) -> PushOutcome {
        let Some(zone) = self.zone(id) else {
            tracing::debug!(id = %id, "push to id outside the zone range");
            return PushOutcome::UnknownId;
        };

        let outcome = zone.push_to(id, proto);
        match outcome {
            PushOutcome::Delivered => self.stats.push_succeed(),
            PushOutcome::Dropped => self.stats.push_failed(),
            PushOutcome::UnknownId => {}
        }
        outcome
    }

    /// Close every registered session in every shard
    pub fn close_all(&self) -> usize {
        self.zones.iter().map(Zone::close_all).sum()
    }

    /// Sessions currently registered
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.zones.iter().map(Zone::len).sum()
    }

    #[must_use]
    pub fn stats(&self) -> Vec<ZoneStats> {
        self.zones.iter().map(Zone::stats).collect()
    }
}
