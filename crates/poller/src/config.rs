//! Poller configuration

use std::time::Duration;

use contracts::{LoggerConfig, PollerSettings};

/// Poller timing and sizing
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Number of sampling workers
    pub workers: usize,
    /// Cycle period
    pub cycle_period: Duration,
    /// Delay between dispatch and harvest within a cycle
    pub settle_delay: Duration,
    /// Slack when deciding whether an item is due
    pub due_tolerance: Duration,
    /// Capacity of the command channel while running
    pub command_capacity: usize,
    /// Randomize the first due time of new items over one interval
    pub stagger: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            cycle_period: Duration::from_secs(1),
            settle_delay: Duration::from_millis(100),
            due_tolerance: Duration::from_millis(500),
            command_capacity: 64,
            stagger: true,
        }
    }
}

impl PollerConfig {
    /// Build from the `[poller]` settings plus the worker count
    pub fn from_settings(workers: usize, settings: &PollerSettings) -> Self {
        Self {
            workers: workers.max(1),
            cycle_period: Duration::from_millis(settings.cycle_period_ms),
            settle_delay: Duration::from_millis(settings.settle_ms),
            due_tolerance: Duration::from_millis(settings.due_tolerance_ms),
            ..Default::default()
        }
    }
}

impl From<&LoggerConfig> for PollerConfig {
    fn from(config: &LoggerConfig) -> Self {
        Self::from_settings(config.polling_threads, &config.poller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_logger_config() {
        let mut config = LoggerConfig::default();
        config.polling_threads = 8;
        config.poller.settle_ms = 250;

        let poller = PollerConfig::from(&config);
        assert_eq!(poller.workers, 8);
        assert_eq!(poller.settle_delay, Duration::from_millis(250));
        assert_eq!(poller.cycle_period, Duration::from_secs(1));
        assert!(poller.stagger);
    }
}
