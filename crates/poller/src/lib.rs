//! # Poller
//!
//! Periodic sampling scheduler.
//!
//! Responsibilities:
//! - Own the item registry (`ItemRegistry`) and each item's due-time state
//! - Fan due items out to a fixed pool of sampling workers (`WorkerPool`)
//! - Harvest completed samples once per cycle and hand them to a `DataSink`
//!
//! The cycle task is the only writer of the registry. The `Poller` surface
//! forwards add/delete/get/list to it as commands, so nothing else mutates
//! items while a cycle runs.
//!
//! ## Usage Example
//!
//! ```ignore
//! use poller::{Poller, PollerConfig};
//! use samplers::SamplerRegistry;
//!
//! let poller = Poller::new(PollerConfig::default(), SamplerRegistry::with_defaults());
//! poller.add_item(ItemDefinition::parse("load", "system.loadavg1", None, 5.0)?).await?;
//!
//! let handle = poller.start(sink)?;
//! // ...
//! let stats = handle.shutdown().await?;
//! ```

mod config;
mod error;
mod item;
mod poller;
mod registry;
mod stats;
mod worker;

pub use config::PollerConfig;
pub use error::PollerError;
pub use item::{stagger_offset, ItemState, PollItem};
pub use poller::{Poller, PollerHandle};
pub use registry::{ItemRegistry, Restore};
pub use stats::{CycleStats, CycleStatsSnapshot};
pub use worker::WorkerPool;
