//! Pipeline statistics and metrics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::CycleMetricsAggregator;
use poller::CycleStatsSnapshot;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Items registered from the config
    pub items_loaded: usize,

    /// Batches received from the poller
    pub batches: u64,

    /// Samples carried by those batches
    pub samples: u64,

    /// Batches the poller hand-off dropped because the queue was full
    pub handoff_dropped: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of configured sinks
    pub active_sinks: usize,

    /// Final poller counters
    pub poller: CycleStatsSnapshot,

    /// Per-sink counters reported by the dispatcher
    pub sink_metrics: Vec<(String, MetricsSnapshot)>,

    /// Batch metrics aggregator
    pub metrics: CycleMetricsAggregator,
}

impl PipelineStats {
    /// Samples per second
    pub fn sample_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.samples as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Failed samples as a percentage of all completed samples
    pub fn failure_rate(&self) -> f64 {
        let total = self.poller.samples_ok + self.poller.samples_failed;
        if total > 0 {
            (self.poller.samples_failed as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Data Logger Statistics                    ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Items: {}", self.items_loaded);
        println!("   ├─ Batches: {}", self.batches);
        println!("   ├─ Samples: {} ({:.2}/s)", self.samples, self.sample_rate());
        println!("   ├─ Hand-off drops: {}", self.handoff_dropped);
        println!("   └─ Active sinks: {}", self.active_sinks);

        let p = &self.poller;
        println!("\n⏱️  Poller");
        println!("   ├─ Cycles: {}", p.cycles);
        println!("   ├─ Dispatched: {}", p.dispatched);
        println!(
            "   ├─ Samples failed: {} ({:.2}%)",
            p.samples_failed,
            self.failure_rate()
        );
        println!("   ├─ Stale results: {}", p.stale_results);
        println!("   ├─ Overruns: {}", p.overruns);
        println!("   └─ Sink errors: {}", p.sink_errors);

        let summary = self.metrics.summary();
        println!("\n📈 Batch Metrics");
        println!(
            "   ├─ Empty cycles: {} of {} ({:.2}%)",
            summary.empty_cycles, summary.cycles_spanned, summary.empty_rate
        );
        println!("   └─ Batch size: {}", summary.batch_size);

        if !summary.item_values.is_empty() {
            println!("\n🔢 Item Values");
            for (name, values) in &summary.item_values {
                println!("   ├─ {}: {}", name, values);
            }
        }

        if !self.sink_metrics.is_empty() {
            println!("\n📤 Sinks");
            for (name, m) in &self.sink_metrics {
                println!(
                    "   ├─ {}: {} written, {} failed, {} dropped",
                    name, m.batches_written, m.failure_count, m.dropped_count
                );
            }
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let stats = PipelineStats {
            samples: 50,
            duration: Duration::from_secs(10),
            poller: CycleStatsSnapshot {
                samples_ok: 75,
                samples_failed: 25,
                ..Default::default()
            },
            ..Default::default()
        };

        assert!((stats.sample_rate() - 5.0).abs() < 1e-10);
        assert!((stats.failure_rate() - 25.0).abs() < 1e-10);
    }

    #[test]
    fn test_rates_without_data() {
        let stats = PipelineStats::default();
        assert_eq!(stats.sample_rate(), 0.0);
        assert_eq!(stats.failure_rate(), 0.0);
    }
}
