//! Cycle counters shared between the cycle task, workers and handles

use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals
#[derive(Debug, Default)]
pub struct CycleStats {
    cycles: AtomicU64,
    dispatched: AtomicU64,
    samples_ok: AtomicU64,
    samples_failed: AtomicU64,
    batches: AtomicU64,
    stale_results: AtomicU64,
    overruns: AtomicU64,
    sink_errors: AtomicU64,
}

impl CycleStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_cycles(&self) -> u64 {
        self.cycles.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn add_dispatched(&self, count: u64) {
        self.dispatched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_sample(&self, success: bool) {
        if success {
            self.samples_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.samples_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_batches(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_stale(&self) {
        self.stale_results.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_overruns(&self) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sink_errors(&self) {
        self.sink_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CycleStatsSnapshot {
        CycleStatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            samples_ok: self.samples_ok.load(Ordering::Relaxed),
            samples_failed: self.samples_failed.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            stale_results: self.stale_results.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            sink_errors: self.sink_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `CycleStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStatsSnapshot {
    /// Cycles started
    pub cycles: u64,
    /// Items handed to workers
    pub dispatched: u64,
    /// Samples that produced a value
    pub samples_ok: u64,
    /// Samples that failed (error or panic)
    pub samples_failed: u64,
    /// Non-empty batches handed to the sink
    pub batches: u64,
    /// Results dropped because their item was deleted or replaced
    pub stale_results: u64,
    /// Cycles that took longer than the cycle period
    pub overruns: u64,
    /// Failed sink writes
    pub sink_errors: u64,
}
