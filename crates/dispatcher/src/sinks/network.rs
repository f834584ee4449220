//! NetworkSink - UDP fire-and-forget streaming
//!
//! Params: `addr` (required), `format` (`json` default, or `line`),
//! `measurement`, `max_packet_size` (default 65000).

use contracts::{ContractError, DataSink, PollBatch};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

use super::format::{encode_json, encode_line_protocol, RecordFormat, DEFAULT_MEASUREMENT};

/// Configuration for NetworkSink
#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    /// Target address
    pub addr: SocketAddr,
    pub format: RecordFormat,
    pub measurement: String,
    /// Larger datagrams are dropped (UDP payload limit is 65507 for IPv4)
    pub max_packet_size: usize,
}

impl NetworkSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let max_packet_size = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(65000);

        Ok(Self {
            addr,
            format: RecordFormat::from_param(params.get("format").map(String::as_str))?,
            measurement: params
                .get("measurement")
                .cloned()
                .unwrap_or_else(|| DEFAULT_MEASUREMENT.to_string()),
            max_packet_size,
        })
    }
}

/// Sink that sends one datagram per batch
pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    socket: Option<UdpSocket>,
}

impl NetworkSink {
    #[instrument(name = "network_sink_new", skip(name, config), fields(target = %config.addr))]
    pub async fn new(name: impl Into<String>, config: NetworkSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        let bind_addr = if config.addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(&config.addr).await?;

        debug!(sink = %name, target = %config.addr, "NetworkSink connected");

        Ok(Self {
            name,
            config,
            socket: Some(socket),
        })
    }

    /// Create from sink config params
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(params)
            .map_err(|e| ContractError::config_validation(format!("sinks.{name}.params"), e))?;

        Self::new(name.clone(), config)
            .await
            .map_err(|e| ContractError::SinkConnection {
                sink_name: name,
                message: e.to_string(),
            })
    }

    fn encode(&self, batch: &PollBatch) -> Result<Option<Vec<u8>>, ContractError> {
        let record = match self.config.format {
            RecordFormat::Json => Some(
                encode_json(batch).map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?,
            ),
            RecordFormat::LineProtocol => encode_line_protocol(&self.config.measurement, batch),
        };
        Ok(record.map(String::into_bytes))
    }

    async fn transmit(&self, socket: &UdpSocket, data: &[u8], cycle: u64) {
        match socket.send(data).await {
            Ok(sent) => debug!(sink = %self.name, cycle, bytes = sent, "Sent"),
            // Best effort: nobody listening is not a failure
            Err(e) => error!(sink = %self.name, error = %e, "UDP send failed"),
        }
    }
}

impl DataSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_sink_write",
        skip(self, batch),
        fields(sink = %self.name, cycle = batch.cycle)
    )]
    async fn write(&mut self, batch: &PollBatch) -> Result<(), ContractError> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| ContractError::sink_write(&self.name, "socket not connected"))?;

        let Some(data) = self.encode(batch)? else {
            return Ok(());
        };

        if data.len() > self.config.max_packet_size {
            warn!(
                sink = %self.name,
                size = data.len(),
                max = self.config.max_packet_size,
                "Datagram too large, batch skipped"
            );
            return Ok(());
        }

        self.transmit(socket, &data, batch.cycle).await;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "network_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(sink = %self.name, "NetworkSink closed");
        Ok(())
    }
}
