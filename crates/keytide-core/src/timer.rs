//! Timer-callback registry.
//!
//! Callbacks are registered with a period and identified by the [`TimerId`]
//! handed back at registration. The owner of the registry (the core state)
//! pulls due entries one at a time with [`TimerRegistry::take_due`], runs the
//! callback with exclusive access to itself, then hands it back through
//! [`TimerRegistry::restore`]. Due entries come out by ascending fire time,
//! ties broken by registration order.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

/// Opaque handle of a registered timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What a callback wants done with its registration after it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Fire again one period after this firing.
    Continue,
    /// Switch to a new period, measured from this firing. 0 disables.
    Reschedule(u32),
    /// Remove the registration.
    Cancel,
}

/// Boxed timer callback operating on context `C`.
pub type TimerCallback<C> = Box<dyn FnMut(&mut C, TimerId) -> TimerAction + Send>;

struct TimerEntry<C> {
    period_ms: u32,
    last_fire: u64,
    next_fire: u64,
    order: u64,
    generation: u64,
    callback: Option<TimerCallback<C>>,
}

/// A callback checked out of the registry for execution.
pub struct DueTimer<C> {
    pub id: TimerId,
    pub fire_time: u64,
    generation: u64,
    callback: TimerCallback<C>,
}

impl<C> DueTimer<C> {
    /// Run the callback against `context`.
    pub fn run(&mut self, context: &mut C) -> TimerAction {
        (self.callback)(context, self.id)
    }
}

pub struct TimerRegistry<C> {
    entries: BTreeMap<TimerId, TimerEntry<C>>,
    next_id: u64,
    next_order: u64,
}

impl<C> Default for TimerRegistry<C> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
            next_order: 0,
        }
    }
}

impl<C> fmt::Debug for TimerRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("registered", &self.entries.len())
            .finish()
    }
}

impl<C> TimerRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register `callback` to fire every `period_ms`, first at `now + period_ms`.
    ///
    /// A period of 0 registers the timer disabled.
    pub fn register(&mut self, period_ms: u32, now: u64, callback: TimerCallback<C>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let order = self.next_order;
        self.next_order += 1;
        self.entries.insert(
            id,
            TimerEntry {
                period_ms,
                last_fire: now,
                next_fire: now + period_ms as u64,
                order,
                generation: 0,
                callback: Some(callback),
            },
        );
        id
    }

    /// Replace the callback and period of an existing registration, keeping its
    /// handle and tie-break order. Returns false if `id` is not registered.
    pub fn replace(
        &mut self,
        id: TimerId,
        period_ms: u32,
        now: u64,
        callback: TimerCallback<C>,
    ) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };
        entry.period_ms = period_ms;
        entry.last_fire = now;
        entry.next_fire = now + period_ms as u64;
        entry.generation += 1;
        entry.callback = Some(callback);
        true
    }

    /// Remove a registration. Unknown or already removed handles are ignored.
    pub fn unregister(&mut self, id: TimerId) -> bool {
        let removed = self.entries.remove(&id).is_some();
        if removed {
            debug!(?id, "timer unregistered");
        }
        removed
    }

    /// Change the period of a registration.
    ///
    /// With `reset_phase` the next firing is `now + period_ms`; otherwise it is
    /// one new period after the previous firing.
    pub fn update(&mut self, id: TimerId, period_ms: u32, reset_phase: bool, now: u64) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };
        if reset_phase || entry.period_ms == 0 {
            entry.last_fire = now;
        }
        entry.period_ms = period_ms;
        entry.next_fire = entry.last_fire + period_ms as u64;
        entry.generation += 1;
        true
    }

    pub fn is_registered(&self, id: TimerId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn period(&self, id: TimerId) -> Option<u32> {
        self.entries.get(&id).map(|e| e.period_ms)
    }

    /// Next fire time, `None` if unknown or disabled.
    pub fn next_fire(&self, id: TimerId) -> Option<u64> {
        self.entries
            .get(&id)
            .filter(|e| e.period_ms > 0)
            .map(|e| e.next_fire)
    }

    /// Earliest fire time among enabled timers.
    pub fn next_deadline(&self) -> Option<u64> {
        self.entries
            .values()
            .filter(|e| e.period_ms > 0 && e.callback.is_some())
            .map(|e| e.next_fire)
            .min()
    }

    /// Check out the earliest timer due at or before `now`.
    pub fn take_due(&mut self, now: u64) -> Option<DueTimer<C>> {
        let (&id, _) = self
            .entries
            .iter()
            .filter(|(_, e)| e.period_ms > 0 && e.callback.is_some() && e.next_fire <= now)
            .min_by_key(|(_, e)| (e.next_fire, e.order))?;
        let entry = self.entries.get_mut(&id)?;
        let callback = entry.callback.take()?;
        Some(DueTimer {
            id,
            fire_time: entry.next_fire,
            generation: entry.generation,
            callback,
        })
    }

    /// Return a checked-out timer and apply the callback's decision.
    ///
    /// If the registration was removed while the callback ran, the callback is
    /// dropped. If it was replaced or its period updated meanwhile, that newer
    /// state wins over `action`.
    pub fn restore(&mut self, due: DueTimer<C>, action: TimerAction) {
        let Some(entry) = self.entries.get_mut(&due.id) else {
            return;
        };
        if entry.generation != due.generation {
            if entry.callback.is_none() {
                entry.callback = Some(due.callback);
            }
            return;
        }
        match action {
            TimerAction::Cancel => {
                self.entries.remove(&due.id);
                debug!(id = ?due.id, "timer cancelled by callback");
            }
            TimerAction::Continue | TimerAction::Reschedule(_) => {
                if let TimerAction::Reschedule(period) = action {
                    entry.period_ms = period;
                }
                entry.last_fire = due.fire_time;
                entry.next_fire = due.fire_time + entry.period_ms as u64;
                entry.callback = Some(due.callback);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
