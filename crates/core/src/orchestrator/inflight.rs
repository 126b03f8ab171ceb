//! Per-key in-flight registry.
//!
//! Callers resolving the same key past the fast tier serialize on one async
//! mutex per key. The first holder does the work and publishes its outcome
//! into the slot; callers that joined before that outcome was published take
//! it instead of repeating the work. Outcomes published before a caller
//! joined are ignored, so a long run of overlapping requests never replays an
//! old failure. The entry is removed when the last holder drops its slot.

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug)]
struct Flight<T> {
    outcome: Mutex<Option<(u64, T)>>,
    published: AtomicU64,
}

impl<T> Default for Flight<T> {
    fn default() -> Self {
        Self { outcome: Mutex::new(None), published: AtomicU64::new(0) }
    }
}

#[derive(Debug)]
pub(crate) struct InFlight<T> {
    slots: DashMap<String, Arc<Flight<T>>>,
}

impl<T> Default for InFlight<T> {
    fn default() -> Self {
        Self { slots: DashMap::new() }
    }
}

impl<T> InFlight<T> {
    pub(crate) fn slot(&self, key: &str) -> Slot<'_, T> {
        let flight = self.slots.entry(key.to_string()).or_default().clone();
        let joined_at = flight.published.load(Ordering::SeqCst);
        Slot { registry: self, key: key.to_string(), flight, joined_at }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

pub(crate) struct Slot<'a, T> {
    registry: &'a InFlight<T>,
    key: String,
    flight: Arc<Flight<T>>,
    joined_at: u64,
}

impl<T> Slot<'_, T> {
    pub(crate) async fn lock(&self) -> FlightGuard<'_, T> {
        FlightGuard { outcome: self.flight.outcome.lock().await, flight: &self.flight, joined_at: self.joined_at }
    }
}

impl<T> Drop for Slot<'_, T> {
    fn drop(&mut self) {
        // The registry holds one reference and this slot holds another.
        self.registry
            .slots
            .remove_if(&self.key, |_, flight| Arc::strong_count(flight) <= 2);
    }
}

/// Exclusive access to a key's in-flight state.
pub(crate) struct FlightGuard<'a, T> {
    outcome: MutexGuard<'a, Option<(u64, T)>>,
    flight: &'a Flight<T>,
    joined_at: u64,
}

impl<T> FlightGuard<'_, T> {
    /// Outcome published after this caller joined, if any.
    pub(crate) fn shared(&self) -> Option<&T> {
        self.outcome
            .as_ref()
            .filter(|(seq, _)| *seq > self.joined_at)
            .map(|(_, outcome)| outcome)
    }

    /// Make `outcome` available to callers already waiting on this key.
    pub(crate) fn publish(&mut self, outcome: T) {
        let seq = self.flight.published.fetch_add(1, Ordering::SeqCst) + 1;
        *self.outcome = Some((seq, outcome));
    }
}
