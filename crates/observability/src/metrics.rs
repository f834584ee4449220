//! 调度器指标收集模块
//!
//! 周期、采样、批次与分发的 Prometheus 指标，以及内存中的批次统计。

use std::collections::BTreeMap;

use contracts::PollBatch;
use metrics::{counter, gauge, histogram};

/// 记录一个调度周期
///
/// `duration_ms` 为派发到回调完成的耗时（不含周期末尾的休眠）。
pub fn record_cycle(duration_ms: f64, dispatched: usize) {
    counter!("data_logger_cycles_total").increment(1);
    histogram!("data_logger_cycle_duration_ms").record(duration_ms);
    counter!("data_logger_items_dispatched_total").increment(dispatched as u64);
}

/// 记录周期超时 (耗时超过周期长度)
pub fn record_cycle_overrun(overrun_ms: f64) {
    counter!("data_logger_cycle_overruns_total").increment(1);
    histogram!("data_logger_cycle_overrun_ms").record(overrun_ms);
}

/// 记录工作队列深度 (派发后仍在等待空闲 worker 的条目数)
pub fn record_work_queue_depth(depth: usize) {
    gauge!("data_logger_work_queue_depth").set(depth as f64);
}

/// 记录单次采样结果
pub fn record_sample(namespace: &str, success: bool, latency_ms: f64) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "data_logger_samples_total",
        "namespace" => namespace.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!(
        "data_logger_sample_latency_ms",
        "namespace" => namespace.to_string()
    )
    .record(latency_ms);
}

/// 记录被丢弃的过期结果 (条目在采样期间被删除或替换)
pub fn record_stale_result() {
    counter!("data_logger_stale_results_total").increment(1);
}

/// 记录结果批次
pub fn record_batch(batch: &PollBatch) {
    counter!("data_logger_batches_total").increment(1);
    histogram!("data_logger_batch_size").record(batch.len() as f64);
    gauge!("data_logger_last_cycle").set(batch.cycle as f64);
}

/// 记录批次分发到 sink
pub fn record_batch_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "data_logger_batches_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录因队列已满而丢弃的批次
pub fn record_batch_dropped(sink_name: &str) {
    counter!(
        "data_logger_batches_dropped_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
}

/// 批次指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct CycleMetricsAggregator {
    /// 收到的批次数
    pub total_batches: u64,

    /// 收到的样本数
    pub total_samples: u64,

    /// 第一个批次的周期号
    pub first_cycle: Option<u64>,

    /// 最后一个批次的周期号
    pub last_cycle: Option<u64>,

    /// 批次大小统计
    pub batch_size_stats: RunningStats,

    /// 各条目数值统计
    pub item_stats: BTreeMap<String, RunningStats>,
}

impl CycleMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, batch: &PollBatch) {
        self.total_batches += 1;
        self.total_samples += batch.len() as u64;
        self.first_cycle.get_or_insert(batch.cycle);
        self.last_cycle = Some(batch.cycle);
        self.batch_size_stats.push(batch.len() as f64);

        for (name, value) in batch.values() {
            self.item_stats.entry(name.to_string()).or_default().push(value);
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let cycles_spanned = match (self.first_cycle, self.last_cycle) {
            (Some(first), Some(last)) => last.saturating_sub(first) + 1,
            _ => 0,
        };
        let empty_cycles = cycles_spanned.saturating_sub(self.total_batches);

        MetricsSummary {
            total_batches: self.total_batches,
            total_samples: self.total_samples,
            cycles_spanned,
            empty_cycles,
            empty_rate: if cycles_spanned > 0 {
                empty_cycles as f64 / cycles_spanned as f64 * 100.0
            } else {
                0.0
            },
            batch_size: StatsSummary::from(&self.batch_size_stats),
            item_values: self
                .item_stats
                .iter()
                .map(|(name, stats)| (name.clone(), StatsSummary::from(stats)))
                .collect(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_batches: u64,
    pub total_samples: u64,
    /// 第一个到最后一个批次之间的周期数
    pub cycles_spanned: u64,
    /// 其中未产生批次的周期数
    pub empty_cycles: u64,
    pub empty_rate: f64,
    pub batch_size: StatsSummary,
    pub item_values: BTreeMap<String, StatsSummary>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Poll Metrics Summary ===")?;
        writeln!(f, "Total batches: {}", self.total_batches)?;
        writeln!(f, "Total samples: {}", self.total_samples)?;
        writeln!(
            f,
            "Empty cycles: {} of {} ({:.2}%)",
            self.empty_cycles, self.cycles_spanned, self.empty_rate
        )?;
        writeln!(f, "Batch size: {}", self.batch_size)?;

        if !self.item_values.is_empty() {
            writeln!(f, "Item values:")?;
            for (name, stats) in &self.item_values {
                writeln!(f, "  {}: {}", name, stats)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
