//! LoggerConfig - Config Loader output
//!
//! Describes a complete data logger: worker count, cycle tuning, poll items and
//! result sinks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::ItemDefinition;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete logger configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggerConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Database / measurement name used by line-protocol sinks
    #[serde(default = "default_database")]
    pub database: String,

    /// Number of polling worker threads
    #[serde(default = "default_polling_threads")]
    #[validate(range(min = 1, max = 256))]
    pub polling_threads: usize,

    /// Cycle tuning
    #[serde(default)]
    pub poller: PollerSettings,

    /// Poll items, applied in file order
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<ItemDefinition>,

    /// Result sinks
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            version: ConfigVersion::default(),
            database: default_database(),
            polling_threads: default_polling_threads(),
            poller: PollerSettings::default(),
            items: Vec::new(),
            sinks: Vec::new(),
        }
    }
}

fn default_database() -> String {
    "rpdemo".to_string()
}

fn default_polling_threads() -> usize {
    4
}

/// Scheduler cycle tuning (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerSettings {
    /// Target cycle period
    #[serde(default = "default_cycle_period_ms")]
    pub cycle_period_ms: u64,

    /// Pause between dispatch and harvest
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Items due within this window ahead of the tick are dispatched now
    #[serde(default = "default_due_tolerance_ms")]
    pub due_tolerance_ms: u64,

    /// Bounded hand-off between poller and dispatcher (batches)
    #[serde(default = "default_batch_capacity")]
    pub batch_capacity: usize,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            cycle_period_ms: default_cycle_period_ms(),
            settle_ms: default_settle_ms(),
            due_tolerance_ms: default_due_tolerance_ms(),
            batch_capacity: default_batch_capacity(),
        }
    }
}

fn default_cycle_period_ms() -> u64 {
    1000
}

fn default_settle_ms() -> u64 {
    100
}

fn default_due_tolerance_ms() -> u64 {
    500
}

fn default_batch_capacity() -> usize {
    16
}

/// Sink output config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity (batches)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log summary via tracing
    Log,
    /// Append to a local file (jsonl or line protocol)
    File,
    /// UDP datagrams (json or line protocol)
    Network,
}
