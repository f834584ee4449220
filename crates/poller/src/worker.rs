//! WorkerPool - fixed set of sampling workers
//!
//! Workers pull `PollItem`s from a shared MPMC work queue, run the sampler on
//! the blocking pool, record the outcome on the item and push it onto the
//! result queue. A sampler panic is caught and treated as a failed sample.

use std::sync::Arc;

use async_channel::{unbounded, Receiver, Sender};
use samplers::SamplerRegistry;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, instrument, warn};

use crate::{CycleStats, PollItem};

/// Handle to the running workers
pub struct WorkerPool {
    work_tx: Sender<PollItem>,
    work_rx: Receiver<PollItem>,
    results_rx: mpsc::UnboundedReceiver<PollItem>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers sharing `samplers`
    #[instrument(name = "worker_pool_spawn", skip(samplers, stats))]
    pub fn spawn(size: usize, samplers: Arc<SamplerRegistry>, stats: Arc<CycleStats>) -> Self {
        let (work_tx, work_rx) = unbounded();
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        let workers = (0..size.max(1))
            .map(|id| {
                let jobs = work_rx.clone();
                let results = results_tx.clone();
                let samplers = Arc::clone(&samplers);
                let stats = Arc::clone(&stats);
                tokio::spawn(async move {
                    poll_worker(id, jobs, results, samplers, stats).await;
                })
            })
            .collect();

        debug!(size, "worker pool started");
        Self {
            work_tx,
            work_rx,
            results_rx,
            workers,
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue an item for sampling (non-blocking)
    ///
    /// Hands the item back if every worker has exited.
    pub fn dispatch(&self, item: PollItem) -> Result<(), PollItem> {
        self.work_tx.try_send(item).map_err(|e| e.into_inner())
    }

    /// Items waiting for a free worker
    pub fn queue_depth(&self) -> usize {
        self.work_tx.len()
    }

    /// Take every completed item without waiting
    pub fn try_harvest(&mut self) -> Vec<PollItem> {
        let mut completed = Vec::new();
        while let Ok(item) = self.results_rx.try_recv() {
            completed.push(item);
        }
        completed
    }

    /// Close the work queue and wait for workers to finish their current item
    ///
    /// Items still queued are dropped unsampled.
    #[instrument(name = "worker_pool_shutdown", skip(self))]
    pub async fn shutdown(self) {
        self.work_tx.close();
        let mut dropped = 0usize;
        while self.work_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "queued items discarded on shutdown");
        }
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!(error = ?e, "poll worker panicked");
            }
        }
        debug!("worker pool stopped");
    }
}

async fn poll_worker(
    id: usize,
    jobs: Receiver<PollItem>,
    results: mpsc::UnboundedSender<PollItem>,
    samplers: Arc<SamplerRegistry>,
    stats: Arc<CycleStats>,
) {
    debug!(worker = id, "poll worker started");

    while let Ok(mut item) = jobs.recv().await {
        if jobs.is_closed() {
            break;
        }
        let started = Instant::now();
        let value = sample(&samplers, &item).await;
        let completed = Instant::now();

        let success = value.is_some();
        stats.inc_sample(success);
        observability::record_sample(
            item.key().namespace().as_str(),
            success,
            completed.duration_since(started).as_secs_f64() * 1000.0,
        );

        item.complete(value, completed);
        if results.send(item).is_err() {
            break;
        }
    }

    debug!(worker = id, "poll worker stopped");
}

async fn sample(samplers: &Arc<SamplerRegistry>, item: &PollItem) -> Option<f64> {
    let registry = Arc::clone(samplers);
    let key = item.key().clone();
    let arg = item.arg().map(str::to_owned);

    match tokio::task::spawn_blocking(move || registry.sample(&key, arg.as_deref())).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            debug!(item = %item.name(), key = %item.key(), kind = e.kind(), error = %e, "sample failed");
            None
        }
        Err(e) => {
            warn!(item = %item.name(), key = %item.key(), error = %e, "sampler panicked");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ItemDefinition, Namespace, Sampler, SamplerError};
    use std::time::Duration;

    struct Panicking;

    impl Sampler for Panicking {
        fn namespace(&self) -> Namespace {
            Namespace::Wemo
        }

        fn sample(&self, _metric: &str, _arg: Option<&str>) -> Result<f64, SamplerError> {
            panic!("device exploded")
        }
    }

    fn item(name: &str, key: &str, arg: Option<&str>) -> PollItem {
        let definition = ItemDefinition::parse(name, key, arg, 1.0).unwrap();
        let mut item = PollItem::new(definition, 1, Instant::now());
        item.mark_dispatched();
        item
    }

    async fn harvest_n(pool: &mut WorkerPool, n: usize) -> Vec<PollItem> {
        let mut done = Vec::new();
        for _ in 0..200 {
            done.extend(pool.try_harvest());
            if done.len() >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        done
    }

    #[tokio::test]
    async fn test_workers_sample_and_complete() {
        let samplers = Arc::new(SamplerRegistry::builder().register(samplers::MockSampler::new()).build());
        let stats = Arc::new(CycleStats::new());
        let mut pool = WorkerPool::spawn(2, samplers, Arc::clone(&stats));
        assert_eq!(pool.size(), 2);

        pool.dispatch(item("a", "mock.constant", Some("1.5"))).unwrap();
        pool.dispatch(item("b", "mock.fail", None)).unwrap();

        let done = harvest_n(&mut pool, 2).await;
        assert_eq!(done.len(), 2);
        for item in &done {
            assert!(!item.is_in_flight());
            match item.name().as_str() {
                "a" => assert_eq!(item.last_value(), Some(1.5)),
                _ => assert_eq!(item.last_value(), None),
            }
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.samples_ok, 1);
        assert_eq!(snapshot.samples_failed, 1);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_sampler_panic_is_a_failed_sample() {
        let samplers = Arc::new(SamplerRegistry::builder().register(Panicking).build());
        let stats = Arc::new(CycleStats::new());
        let mut pool = WorkerPool::spawn(1, samplers, Arc::clone(&stats));

        pool.dispatch(item("boom", "wemo.power", Some("desk"))).unwrap();
        pool.dispatch(item("boom2", "wemo.power", Some("desk"))).unwrap();

        // The worker survives the first panic and serves the second item
        let done = harvest_n(&mut pool, 2).await;
        assert_eq!(done.len(), 2);
        assert!(done.iter().all(|item| item.last_value().is_none()));
        assert_eq!(stats.snapshot().samples_failed, 2);
        pool.shutdown().await;
    }

    struct Slow(Duration);

    impl Sampler for Slow {
        fn namespace(&self) -> Namespace {
            Namespace::SenseHat
        }

        fn sample(&self, _metric: &str, _arg: Option<&str>) -> Result<f64, SamplerError> {
            std::thread::sleep(self.0);
            Ok(1.0)
        }
    }

    #[tokio::test]
    async fn test_huge_interval_does_not_kill_worker() {
        let samplers = Arc::new(SamplerRegistry::builder().register(samplers::MockSampler::new()).build());
        let stats = Arc::new(CycleStats::new());
        let mut pool = WorkerPool::spawn(1, samplers, Arc::clone(&stats));

        let mut big = item("big", "mock.counter", None);
        let definition = ItemDefinition {
            interval: Duration::MAX,
            ..big.definition().clone()
        };
        big = PollItem::new(definition, 1, Instant::now());
        big.mark_dispatched();

        pool.dispatch(big).unwrap();
        pool.dispatch(item("ok", "mock.counter", None)).unwrap();

        let done = harvest_n(&mut pool, 2).await;
        assert_eq!(done.len(), 2);
        assert!(done.iter().all(|item| !item.is_in_flight()));
        assert_eq!(stats.snapshot().samples_ok, 2);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_skips_queued_backlog() {
        let samplers = Arc::new(
            SamplerRegistry::builder()
                .register(Slow(Duration::from_millis(200)))
                .build(),
        );
        let stats = Arc::new(CycleStats::new());
        let pool = WorkerPool::spawn(1, samplers, Arc::clone(&stats));

        for n in 0..5 {
            pool.dispatch(item(&format!("slow{n}"), "sensehat.temperature", None)).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pool.queue_depth(), 4);

        let started = std::time::Instant::now();
        pool.shutdown().await;

        // Only the sample already running completes
        assert!(started.elapsed() < Duration::from_millis(600));
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.samples_ok + snapshot.samples_failed, 1);
    }

    #[tokio::test]
    async fn test_unknown_namespace_is_a_failed_sample() {
        let samplers = Arc::new(SamplerRegistry::builder().build());
        let mut pool = WorkerPool::spawn(1, samplers, Arc::new(CycleStats::new()));

        pool.dispatch(item("hat", "sensehat.temperature", None)).unwrap();
        let done = harvest_n(&mut pool, 1).await;
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].last_value(), None);
        pool.shutdown().await;
    }
}
