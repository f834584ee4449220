//! # Dispatcher
//!
//! 结果分发模块。
//!
//! 负责：
//! - 通过有界通道接收 Poller 产生的 `PollBatch` (`ChannelSink`)
//! - Fan-out 到多个 sinks
//! - 隔离慢 sink，不阻塞调度周期

pub mod channel;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use channel::ChannelSink;
pub use contracts::{DataSink, PollBatch};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, LogSink, NetworkSink, RecordFormat};
