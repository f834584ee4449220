//! Net sampler - ICMP round-trip time via the system `ping`
//!
//! A single probe with a one second deadline, so an unreachable host costs a
//! worker at most about a second.

use std::process::Command;

use contracts::{Namespace, Sampler, SamplerError};
use tracing::debug;

/// Ping invocation settings
#[derive(Debug, Clone)]
pub struct PingConfig {
    /// Executable to run
    pub program: String,
    /// Probe deadline in seconds (`-w`)
    pub deadline_secs: u32,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            program: "ping".to_string(),
            deadline_secs: 1,
        }
    }
}

/// Serves `net.ping` (arg: host), value in milliseconds
#[derive(Debug, Clone, Default)]
pub struct NetSampler {
    config: PingConfig,
}

impl NetSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PingConfig) -> Self {
        Self { config }
    }

    fn ping(&self, host: &str) -> Result<f64, SamplerError> {
        // A leading '-' would be taken as a ping flag
        if host.is_empty() || host.starts_with('-') {
            return Err(SamplerError::unavailable(
                Namespace::Net,
                format!("invalid host '{host}'"),
            ));
        }

        let output = Command::new(&self.config.program)
            .arg("-c1")
            .arg(format!("-w{}", self.config.deadline_secs))
            .arg(host)
            .output()
            .map_err(|e| SamplerError::io(Namespace::Net, &e))?;

        if !output.status.success() {
            debug!(host, status = ?output.status.code(), "ping failed");
            return Err(SamplerError::unavailable(
                Namespace::Net,
                format!("no reply from {host}"),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let rtt = parse_ping_output(&stdout).ok_or_else(|| {
            SamplerError::parse(Namespace::Net, "no rtt summary in ping output")
        })?;

        debug!(host, rtt_ms = rtt, "ping");
        Ok(rtt)
    }
}

impl Sampler for NetSampler {
    fn namespace(&self) -> Namespace {
        Namespace::Net
    }

    fn sample(&self, metric: &str, arg: Option<&str>) -> Result<f64, SamplerError> {
        match metric {
            "ping" => {
                let host = arg.ok_or_else(|| SamplerError::missing_argument(Namespace::Net, metric))?;
                self.ping(host)
            }
            other => Err(SamplerError::unknown_metric(Namespace::Net, other)),
        }
    }
}

/// Extract the average round-trip time (ms) from ping's summary line
///
/// Accepts both `rtt min/avg/max/mdev = a/b/c/d ms` (Linux) and
/// `round-trip min/avg/max/stddev = a/b/c/d ms` (BSD/macOS).
pub fn parse_ping_output(output: &str) -> Option<f64> {
    output
        .lines()
        .find(|line| line.contains("min/avg/max"))
        .and_then(|line| line.split_once('='))
        .and_then(|(_, values)| values.trim().split('/').nth(1))
        .and_then(|avg| avg.trim().parse::<f64>().ok())
}
