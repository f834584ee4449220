//! FileSink - appends batch records to a file
//!
//! Params:
//! - `path`: output file (default `./data_logger.jsonl`)
//! - `format`: `jsonl` (default) or `line`
//! - `measurement`: line-protocol measurement (default: the config's `database`)

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use contracts::{ContractError, DataSink, PollBatch};
use tracing::{debug, error, instrument};

use super::format::{encode_json, encode_line_protocol, RecordFormat, DEFAULT_MEASUREMENT};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    pub path: PathBuf,
    pub format: RecordFormat,
    pub measurement: String,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data_logger.jsonl"));

        Ok(Self {
            path,
            format: RecordFormat::from_param(params.get("format").map(String::as_str))?,
            measurement: params
                .get("measurement")
                .cloned()
                .unwrap_or_else(|| DEFAULT_MEASUREMENT.to_string()),
        })
    }
}

/// Sink that appends one record per batch to a file
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: Option<BufWriter<File>>,
    records: u64,
}

impl FileSink {
    /// Open (or create) the output file in append mode
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            config,
            writer: Some(BufWriter::new(file)),
            records: 0,
        })
    }

    /// Create from sink config params
    pub fn from_params(name: impl Into<String>, params: &HashMap<String, String>) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        Self::new(name, config)
    }

    /// Records written since open
    pub fn records(&self) -> u64 {
        self.records
    }

    fn encode(&self, batch: &PollBatch) -> std::io::Result<Option<String>> {
        match self.config.format {
            RecordFormat::Json => encode_json(batch)
                .map(Some)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            RecordFormat::LineProtocol => Ok(encode_line_protocol(&self.config.measurement, batch)),
        }
    }

    fn append(&mut self, batch: &PollBatch) -> std::io::Result<()> {
        let Some(record) = self.encode(batch)? else {
            return Ok(());
        };
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| std::io::Error::other("file sink closed"))?;
        writeln!(writer, "{record}")?;
        self.records += 1;
        Ok(())
    }
}

impl DataSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, batch),
        fields(sink = %self.name, cycle = batch.cycle)
    )]
    async fn write(&mut self, batch: &PollBatch) -> Result<(), ContractError> {
        self.append(batch).map_err(|e| {
            error!(sink = %self.name, cycle = batch.cycle, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush().await?;
        self.writer = None;
        debug!(sink = %self.name, records = self.records, path = %self.config.path.display(), "FileSink closed");
        Ok(())
    }
}
