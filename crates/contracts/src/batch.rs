//! PollBatch - Poller output
//!
//! One cycle's worth of successful samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ItemSnapshot;

/// Result batch handed to sinks once per cycle
///
/// Items appear in worker completion order, which bears no relation to
/// dispatch order. Every item carries a `last_value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollBatch {
    /// Cycle sequence number (monotonically increasing, starts at 1)
    pub cycle: u64,

    /// Wall-clock time the batch was harvested
    pub timestamp: DateTime<Utc>,

    /// Items that produced a value this cycle
    pub items: Vec<ItemSnapshot>,
}

impl PollBatch {
    pub fn new(cycle: u64, items: Vec<ItemSnapshot>) -> Self {
        Self {
            cycle,
            timestamp: Utc::now(),
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `(name, value)` pairs, skipping anything without a value
    pub fn values(&self) -> impl Iterator<Item = (&str, f64)> {
        self.items
            .iter()
            .filter_map(|item| item.last_value.map(|v| (item.name.as_str(), v)))
    }
}
