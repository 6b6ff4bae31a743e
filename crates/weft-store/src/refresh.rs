//! Auto-refresh scheduling.
//!
//! A component with `autoRefresh` enabled names a query to re-run on a fixed
//! interval. The store keeps one passive entry per component — there are no
//! intrinsic timers; the host pumps [`RefreshScheduler::due`] from its own
//! tick and re-runs the returned query ids. Entries are cancelled when the
//! owning component is removed, and re-registered (with a fresh deadline)
//! when the interval changes.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use weft_core::id::EntityId;

/// Poll intervals are clamped to at least one second.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
struct RefreshEntry {
    query: EntityId,
    interval: Duration,
    next_due: Instant,
}

#[derive(Debug, Default)]
pub struct RefreshScheduler {
    entries: HashMap<EntityId, RefreshEntry>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update the poll for `component`. An unchanged
    /// query/interval pair keeps its current deadline; any change resets it.
    pub fn register(
        &mut self,
        component: EntityId,
        query: EntityId,
        interval: Duration,
        now: Instant,
    ) {
        let interval = interval.max(MIN_REFRESH_INTERVAL);
        if let Some(existing) = self.entries.get(&component)
            && existing.query == query
            && existing.interval == interval
        {
            return;
        }
        self.entries.insert(
            component,
            RefreshEntry {
                query,
                interval,
                next_due: now + interval,
            },
        );
    }

    pub fn cancel(&mut self, component: EntityId) {
        self.entries.remove(&component);
    }

    pub fn is_scheduled(&self, component: EntityId) -> bool {
        self.entries.contains_key(&component)
    }

    /// Query ids due at `now`. Each returned entry's deadline advances by its
    /// interval, so a missed tick fires once rather than bursting.
    pub fn due(&mut self, now: Instant) -> Vec<EntityId> {
        let mut due = Vec::new();
        for entry in self.entries.values_mut() {
            if now >= entry.next_due {
                due.push(entry.query);
                entry.next_due = now + entry.interval;
            }
        }
        due
    }
}
