//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the data logger.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Scheduling uses the monotonic clock (`tokio::time::Instant`) inside the poller
//! - Result batches carry a wall-clock `DateTime<Utc>` for persistence

mod batch;
mod logger_config;
mod error;
mod item;
mod item_name;
mod key;
mod sampler;
mod sink;

pub use batch::PollBatch;
pub use logger_config::*;
pub use error::*;
pub use item::{ItemDefinition, ItemSnapshot, MAX_INTERVAL};
pub use item_name::ItemName;
pub use key::{Namespace, SamplerKey};
pub use sampler::{Sampler, SamplerError};
pub use sink::*;
