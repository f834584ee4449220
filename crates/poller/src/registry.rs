//! ItemRegistry - name -> item table owned by the cycle task
//!
//! A dispatched item is moved out to its worker and the slot keeps only a
//! snapshot plus the item's generation. When the item comes back, the
//! generation must still match, otherwise the result belongs to an item that
//! was deleted (or deleted and re-added) meanwhile and is discarded.

use std::collections::HashMap;
use std::time::Duration;

use contracts::{ItemDefinition, ItemName, ItemSnapshot};
use rand::Rng;
use tokio::time::Instant;
use tracing::debug;

use crate::{PollItem, PollerError};

enum Slot {
    Idle(PollItem),
    InFlight {
        generation: u64,
        snapshot: ItemSnapshot,
    },
}

impl Slot {
    fn snapshot(&self) -> ItemSnapshot {
        match self {
            Slot::Idle(item) => item.snapshot(),
            Slot::InFlight { snapshot, .. } => snapshot.clone(),
        }
    }

    fn definition(&self) -> ItemDefinition {
        match self {
            Slot::Idle(item) => item.definition().clone(),
            Slot::InFlight { snapshot, .. } => snapshot.definition(),
        }
    }
}

/// Outcome of handing a completed item back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restore {
    /// Slot updated with the new state
    Applied,
    /// Item was deleted or replaced while in flight; result dropped
    Stale,
}

/// Insertion-ordered item table
#[derive(Default)]
pub struct ItemRegistry {
    order: Vec<ItemName>,
    slots: HashMap<ItemName, Slot>,
    next_generation: u64,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item with a staggered first due time
    pub fn add(&mut self, definition: ItemDefinition, now: Instant) -> Result<ItemSnapshot, PollerError> {
        self.add_with_rng(definition, now, &mut rand::rng())
    }

    /// Register an item with a staggered first due time drawn from `rng`
    pub fn add_with_rng<R: Rng>(
        &mut self,
        definition: ItemDefinition,
        now: Instant,
        rng: &mut R,
    ) -> Result<ItemSnapshot, PollerError> {
        let generation = self.reserve(&definition)?;
        self.insert(PollItem::staggered(definition, generation, now, rng))
    }

    /// Register an item that is due at `next_due`
    pub fn add_due_at(
        &mut self,
        definition: ItemDefinition,
        next_due: Instant,
    ) -> Result<ItemSnapshot, PollerError> {
        let generation = self.reserve(&definition)?;
        self.insert(PollItem::new(definition, generation, next_due))
    }

    fn reserve(&mut self, definition: &ItemDefinition) -> Result<u64, PollerError> {
        definition.check()?;
        if self.slots.contains_key(&definition.name) {
            return Err(PollerError::item_exists(definition.name.as_str()));
        }
        self.next_generation += 1;
        Ok(self.next_generation)
    }

    fn insert(&mut self, item: PollItem) -> Result<ItemSnapshot, PollerError> {
        let snapshot = item.snapshot();
        debug!(item = %item.definition(), generation = item.generation(), "item added");
        self.order.push(item.name().clone());
        self.slots.insert(item.name().clone(), Slot::Idle(item));
        Ok(snapshot)
    }

    /// Remove an item, in flight or not
    pub fn remove(&mut self, name: &str) -> Result<ItemSnapshot, PollerError> {
        let slot = self
            .slots
            .remove(name)
            .ok_or_else(|| PollerError::not_found(name))?;
        self.order.retain(|n| n.as_str() != name);
        if matches!(slot, Slot::InFlight { .. }) {
            debug!(item = name, "removed while in flight, late result will be dropped");
        }
        Ok(slot.snapshot())
    }

    pub fn get(&self, name: &str) -> Result<ItemSnapshot, PollerError> {
        self.slots
            .get(name)
            .map(Slot::snapshot)
            .ok_or_else(|| PollerError::not_found(name))
    }

    /// Snapshots in insertion order
    pub fn list(&self) -> Vec<ItemSnapshot> {
        self.order
            .iter()
            .filter_map(|name| self.slots.get(name))
            .map(Slot::snapshot)
            .collect()
    }

    /// Persisted definitions in insertion order
    pub fn definitions(&self) -> Vec<ItemDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.slots.get(name))
            .map(Slot::definition)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn in_flight_count(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, Slot::InFlight { .. }))
            .count()
    }

    /// Next due time of an idle item (`None` if absent or in flight)
    pub fn next_due(&self, name: &str) -> Option<Instant> {
        match self.slots.get(name)? {
            Slot::Idle(item) => Some(item.next_due()),
            Slot::InFlight { .. } => None,
        }
    }

    /// Move every due item out, in insertion order, marking it in flight
    pub fn take_due(&mut self, now: Instant, tolerance: Duration) -> Vec<PollItem> {
        let mut due = Vec::new();
        for name in &self.order {
            let Some(slot) = self.slots.get_mut(name) else {
                continue;
            };
            let Slot::Idle(item) = slot else {
                continue;
            };
            if !item.is_due(now, tolerance) {
                continue;
            }

            let placeholder = Slot::InFlight {
                generation: item.generation(),
                snapshot: item.snapshot(),
            };
            if let Slot::Idle(mut item) = std::mem::replace(slot, placeholder) {
                item.mark_dispatched();
                due.push(item);
            }
        }
        due
    }

    /// Put a completed (or undispatched) item back into its slot
    pub fn restore(&mut self, item: PollItem) -> Restore {
        let Some(slot) = self.slots.get_mut(item.name().as_str()) else {
            debug!(item = %item.name(), "dropping result for deleted item");
            return Restore::Stale;
        };

        let current = matches!(
            slot,
            Slot::InFlight { generation, .. } if *generation == item.generation()
        );
        if !current {
            debug!(
                item = %item.name(),
                generation = item.generation(),
                "dropping result for replaced item"
            );
            return Restore::Stale;
        }

        *slot = Slot::Idle(item);
        Restore::Applied
    }
}
