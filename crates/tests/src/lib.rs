//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 -> 轮询器 -> 分发器 -> sink 的端到端测试
//! - 并发派发与过期结果的压力测试

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(contracts::LoggerConfig::default().database, "rpdemo");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ItemDefinition, Namespace, PollBatch, Sampler, SamplerError};
    use dispatcher::{create_dispatcher, ChannelSink};
    use poller::{Poller, PollerConfig};
    use samplers::SamplerRegistry;
    use tempfile::tempdir;

    fn fast_config(workers: usize) -> PollerConfig {
        PollerConfig {
            workers,
            cycle_period: Duration::from_millis(50),
            settle_delay: Duration::from_millis(10),
            due_tolerance: Duration::from_millis(25),
            stagger: false,
            ..Default::default()
        }
    }

    async fn wait_for(mut done: impl FnMut() -> bool, timeout: Duration) {
        let waited = tokio::time::timeout(timeout, async {
            while !done() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "condition not reached within {timeout:?}");
    }

    /// End-to-end: config file -> Poller -> ChannelSink -> Dispatcher -> file sink
    ///
    /// 验证完整的数据流：
    /// 1. ConfigLoader 加载条目与 sink
    /// 2. Poller 按周期采样 mock 条目
    /// 3. Dispatcher 以 line protocol 写入文件，失败条目不出现
    #[tokio::test]
    async fn test_e2e_config_to_file_sink() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("points.txt");
        let content = format!(
            r#"
database = "lab"
polling_threads = 2

[poller]
cycle_period_ms = 50
settle_ms = 10

[[items]]
name = "counter"
key = "mock.counter"
interval = 0.05

[[items]]
name = "setpoint"
key = "mock.constant"
arg = "42.5"
interval = 0.05

[[items]]
name = "broken"
key = "mock.fail"
interval = 0.05

[[sinks]]
name = "points"
sink_type = "file"
[sinks.params]
path = "{}"
format = "line"
"#,
            path.display()
        );

        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();

        let poller = Poller::new(
            PollerConfig {
                stagger: false,
                ..PollerConfig::from(&config)
            },
            SamplerRegistry::with_defaults(),
        );
        for definition in &config.items {
            poller.add_item(definition.clone()).await.unwrap();
        }

        let (handoff, batch_rx) = ChannelSink::new("handoff", config.poller.batch_capacity);
        let dispatcher = create_dispatcher(config.sinks.clone(), &config.database, batch_rx)
            .await
            .unwrap();
        let dispatcher_handle = dispatcher.spawn();

        let handle = poller.start(handoff).unwrap();
        wait_for(|| handle.stats().batches >= 3, Duration::from_secs(5)).await;

        let stats = handle.shutdown().await.unwrap();
        assert!(stats.samples_failed > 0, "{stats:?}");

        // The poller dropped its sink, closing the dispatcher input
        let sink_metrics = tokio::time::timeout(Duration::from_secs(2), dispatcher_handle)
            .await
            .expect("dispatcher did not finish")
            .unwrap();
        assert_eq!(sink_metrics[0].0, "points");
        assert_eq!(sink_metrics[0].1.batches_written, stats.batches);

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len() as u64, stats.batches);
        for line in &lines {
            assert!(line.starts_with("lab "), "{line}");
            assert!(line.contains("setpoint=42.5"), "{line}");
            assert!(!line.contains("broken"), "{line}");
        }
        assert!(lines[0].contains("counter=0"), "{}", lines[0]);
    }

    /// Sampler that flags any overlapping call for the same arg
    struct OverlapSampler {
        active: Mutex<HashSet<String>>,
        overlaps: AtomicU64,
        calls: AtomicU64,
    }

    impl OverlapSampler {
        fn new() -> Self {
            Self {
                active: Mutex::new(HashSet::new()),
                overlaps: AtomicU64::new(0),
                calls: AtomicU64::new(0),
            }
        }
    }

    impl Sampler for OverlapSampler {
        fn namespace(&self) -> Namespace {
            Namespace::Wemo
        }

        fn sample(&self, _metric: &str, arg: Option<&str>) -> Result<f64, SamplerError> {
            let arg = arg.unwrap_or_default().to_string();
            let call = self.calls.fetch_add(1, Ordering::SeqCst);

            if !self.active.lock().unwrap().insert(arg.clone()) {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }

            // 0..40ms, often longer than the settle delay
            std::thread::sleep(Duration::from_millis(call * 7 % 40));

            self.active.lock().unwrap().remove(&arg);
            Ok(call as f64)
        }
    }

    /// Items are never handed to two workers at once, even when samples
    /// outlive the cycle that dispatched them.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_no_concurrent_dispatch_of_one_item() {
        let sampler = Arc::new(OverlapSampler::new());
        let registry = SamplerRegistry::builder()
            .register(SharedSampler(Arc::clone(&sampler)))
            .build();

        let poller = Poller::new(
            PollerConfig {
                cycle_period: Duration::from_millis(20),
                settle_delay: Duration::from_millis(5),
                ..fast_config(4)
            },
            registry,
        );
        for i in 0..16 {
            let def = ItemDefinition::parse(
                format!("plug{i}"),
                "wemo.power",
                Some(&format!("plug{i}")),
                0.01,
            )
            .unwrap();
            poller.add_item(def).await.unwrap();
        }

        let (handoff, mut batch_rx) = ChannelSink::new("handoff", 1024);
        let handle = poller.start(handoff).unwrap();

        tokio::time::sleep(Duration::from_millis(800)).await;
        let stats = handle.shutdown().await.unwrap();

        let mut per_item: HashMap<String, usize> = HashMap::new();
        while let Ok(batch) = batch_rx.try_recv() {
            let mut seen = HashSet::new();
            for (name, _) in batch.values() {
                // An item appears at most once per batch
                assert!(seen.insert(name.to_string()), "duplicate {name} in cycle {}", batch.cycle);
                *per_item.entry(name.to_string()).or_default() += 1;
            }
        }

        assert_eq!(sampler.overlaps.load(Ordering::SeqCst), 0);
        assert!(sampler.calls.load(Ordering::SeqCst) > 16);
        assert_eq!(stats.samples_failed, 0);
        assert_eq!(per_item.len(), 16);
    }

    /// Forwards to a sampler the test keeps a handle on
    struct SharedSampler<S>(Arc<S>);

    impl<S: Sampler> Sampler for SharedSampler<S> {
        fn namespace(&self) -> Namespace {
            self.0.namespace()
        }

        fn sample(&self, metric: &str, arg: Option<&str>) -> Result<f64, SamplerError> {
            self.0.sample(metric, arg)
        }
    }

    /// `old` is slow and returns 1.0, anything else returns 2.0 at once
    struct SlowOldSampler;

    impl Sampler for SlowOldSampler {
        fn namespace(&self) -> Namespace {
            Namespace::SenseHat
        }

        fn sample(&self, _metric: &str, arg: Option<&str>) -> Result<f64, SamplerError> {
            match arg {
                Some("old") => {
                    std::thread::sleep(Duration::from_millis(150));
                    Ok(1.0)
                }
                _ => Ok(2.0),
            }
        }
    }

    /// Deleting and re-adding an item while its old sample is running
    /// discards the late result instead of reviving the old item.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_late_result_of_replaced_item_is_discarded() {
        let registry = SamplerRegistry::builder().register(SlowOldSampler).build();
        let poller = Poller::new(fast_config(2), registry);

        poller
            .add_item(ItemDefinition::parse("temp", "sensehat.temperature", Some("old"), 10.0).unwrap())
            .await
            .unwrap();

        let (handoff, mut batch_rx) = ChannelSink::new("handoff", 256);
        let handle = poller.start(handoff).unwrap();

        wait_for(|| handle.stats().dispatched >= 1, Duration::from_secs(2)).await;

        let removed = poller.delete_item("temp").await.unwrap();
        assert_eq!(removed.arg.as_deref(), Some("old"));
        poller
            .add_item(ItemDefinition::parse("temp", "sensehat.temperature", Some("new"), 10.0).unwrap())
            .await
            .unwrap();

        wait_for(|| handle.stats().stale_results >= 1, Duration::from_secs(2)).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let item = poller.get_item("temp").await.unwrap();
        assert_eq!(item.arg.as_deref(), Some("new"));
        assert_eq!(item.last_value, Some(2.0));

        let stats = handle.shutdown().await.unwrap();
        assert_eq!(stats.stale_results, 1);

        let batches: Vec<PollBatch> = std::iter::from_fn(|| batch_rx.try_recv().ok()).collect();
        assert!(!batches.is_empty());
        for batch in &batches {
            for (_, value) in batch.values() {
                assert_eq!(value, 2.0, "old result leaked into cycle {}", batch.cycle);
            }
        }
    }

    /// Items exported from a poller load back into an identical poller
    #[tokio::test]
    async fn test_item_definitions_round_trip_through_config() {
        let content = r#"
[[items]]
name = "load 1m"
key = "system.loadavg1"
interval = 1.0

[[items]]
name = "ping gw"
key = "net.ping"
arg = "192.168.1.1"
interval = 2.5

[[items]]
name = "fast"
key = "mock.counter"
interval = 0.25
"#;
        let config = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        let poller = Poller::new(PollerConfig::from(&config), SamplerRegistry::with_defaults());
        for definition in &config.items {
            poller.add_item(definition.clone()).await.unwrap();
        }

        let exported = contracts::LoggerConfig {
            items: poller.item_definitions().await.unwrap(),
            ..config.clone()
        };
        let json = ConfigLoader::to_json(&exported).unwrap();
        let reloaded = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();

        assert_eq!(reloaded.items, config.items);
    }

    /// Batch statistics over a short run
    #[tokio::test]
    async fn test_metrics_aggregator_over_run() {
        let poller = Poller::new(fast_config(2), SamplerRegistry::with_defaults());
        poller
            .add_item(ItemDefinition::parse("c", "mock.constant", Some("3.5"), 0.05).unwrap())
            .await
            .unwrap();

        let (handoff, mut batch_rx) = ChannelSink::new("handoff", 64);
        let handle = poller.start(handoff).unwrap();
        wait_for(|| handle.stats().batches >= 3, Duration::from_secs(5)).await;
        handle.shutdown().await.unwrap();

        let mut aggregator = observability::CycleMetricsAggregator::new();
        while let Ok(batch) = batch_rx.try_recv() {
            aggregator.update(&batch);
        }

        let summary = aggregator.summary();
        assert!(summary.total_batches >= 3);
        assert_eq!(summary.total_samples, summary.total_batches);
        assert!((summary.item_values["c"].mean - 3.5).abs() < 1e-10);
    }
}
