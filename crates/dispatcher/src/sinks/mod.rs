//! Sink implementations
//!
//! Contains LogSink, FileSink, and NetworkSink, plus the record encoders they
//! share.

mod file;
mod format;
mod log;
mod network;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::format::{encode_json, encode_line_protocol, RecordFormat, DEFAULT_MEASUREMENT};
pub use self::log::LogSink;
pub use self::network::{NetworkSink, NetworkSinkConfig};
