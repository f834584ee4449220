//! PollItem - one registered measurement and its scheduling state
//!
//! State machine:
//!
//! ```text
//! Idle --(now + tolerance > next_due)--> Due --dispatch--> InFlight
//!   ^                                                          |
//!   +------------- complete: next_due = completed + interval --+
//! ```
//!
//! An in-flight item is never due, so at most one sample per item runs at a
//! time.

use std::time::Duration;

use contracts::{ItemDefinition, ItemName, ItemSnapshot, SamplerKey};
use rand::Rng;
use tokio::time::Instant;

/// Scheduling state at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Waiting for its next due time
    Idle,
    /// Eligible for dispatch
    Due,
    /// Owned by a worker
    InFlight,
}

/// A registered item plus its runtime state
#[derive(Debug, Clone)]
pub struct PollItem {
    definition: ItemDefinition,
    generation: u64,
    next_due: Instant,
    last_value: Option<f64>,
    in_flight: bool,
}

impl PollItem {
    /// New item due at `next_due`
    pub fn new(definition: ItemDefinition, generation: u64, next_due: Instant) -> Self {
        Self {
            definition,
            generation,
            next_due,
            last_value: None,
            in_flight: false,
        }
    }

    /// New item whose first due time is drawn uniformly from `[now, now + interval)`
    pub fn staggered<R: Rng>(
        definition: ItemDefinition,
        generation: u64,
        now: Instant,
        rng: &mut R,
    ) -> Self {
        let offset = stagger_offset(definition.interval, rng);
        Self::new(definition, generation, instant_after(now, offset))
    }

    pub fn name(&self) -> &ItemName {
        &self.definition.name
    }

    pub fn key(&self) -> &SamplerKey {
        &self.definition.key
    }

    pub fn arg(&self) -> Option<&str> {
        self.definition.arg.as_deref()
    }

    pub fn interval(&self) -> Duration {
        self.definition.interval
    }

    pub fn definition(&self) -> &ItemDefinition {
        &self.definition
    }

    /// Registration generation, unique per `add`
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    pub fn last_value(&self) -> Option<f64> {
        self.last_value
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn state(&self, now: Instant, tolerance: Duration) -> ItemState {
        if self.in_flight {
            ItemState::InFlight
        } else if instant_after(now, tolerance) > self.next_due {
            ItemState::Due
        } else {
            ItemState::Idle
        }
    }

    /// Due iff not in flight and `now - next_due > -tolerance`
    pub fn is_due(&self, now: Instant, tolerance: Duration) -> bool {
        self.state(now, tolerance) == ItemState::Due
    }

    /// Hand the item to a worker
    pub fn mark_dispatched(&mut self) {
        self.in_flight = true;
    }

    /// Undo `mark_dispatched` when the item never reached a worker
    pub fn cancel_dispatch(&mut self) {
        self.in_flight = false;
    }

    /// Record a sample outcome
    ///
    /// A failure clears `last_value`. Either way the next due time moves to
    /// `completed_at + interval`, so a failing item is retried one interval
    /// later.
    pub fn complete(&mut self, value: Option<f64>, completed_at: Instant) {
        self.last_value = value;
        self.next_due = instant_after(completed_at, self.definition.interval);
        self.in_flight = false;
    }

    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            name: self.definition.name.clone(),
            key: self.definition.key.clone(),
            arg: self.definition.arg.clone(),
            interval: self.definition.interval,
            last_value: self.last_value,
        }
    }
}

/// Instants this far ahead are treated as "never"
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `base + offset`, clamped instead of panicking on overflow
fn instant_after(base: Instant, offset: Duration) -> Instant {
    base.checked_add(offset)
        .or_else(|| base.checked_add(FAR_FUTURE))
        .unwrap_or(base)
}

/// Uniform offset in `[0, interval)`
pub fn stagger_offset<R: Rng>(interval: Duration, rng: &mut R) -> Duration {
    let nanos = u64::try_from(interval.as_nanos()).unwrap_or(u64::MAX);
    if nanos == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rng.random_range(0..nanos))
}
