//! Record encoders
//!
//! - JSON: the whole `PollBatch`, one object per line
//! - InfluxDB line protocol: one point per batch, one field per item
//!
//! ```text
//! rpdemo loadavg1\ 1s=0.52,ping\ google.com=13.965 1700000000000000000
//! ```

use contracts::PollBatch;

/// Measurement used when neither the sink nor the config names one
pub const DEFAULT_MEASUREMENT: &str = "rpdemo";

/// On-the-wire record format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordFormat {
    /// One JSON document per batch
    #[default]
    Json,
    /// InfluxDB line protocol
    LineProtocol,
}

impl RecordFormat {
    /// Parse the `format` sink param (`json`/`jsonl`, `line`/`influx`)
    pub fn from_param(value: Option<&str>) -> Result<Self, String> {
        match value {
            None | Some("json") | Some("jsonl") => Ok(Self::Json),
            Some("line") | Some("influx") => Ok(Self::LineProtocol),
            Some(other) => Err(format!("unknown format '{other}'")),
        }
    }
}

pub fn encode_json(batch: &PollBatch) -> Result<String, serde_json::Error> {
    serde_json::to_string(batch)
}

/// Encode a batch as a single point; `None` when no item has a finite value
pub fn encode_line_protocol(measurement: &str, batch: &PollBatch) -> Option<String> {
    let fields: Vec<String> = batch
        .values()
        .filter(|(_, value)| value.is_finite())
        .map(|(name, value)| format!("{}={}", escape_key(name), value))
        .collect();

    if fields.is_empty() {
        return None;
    }

    let timestamp = batch.timestamp.timestamp_nanos_opt().unwrap_or_default();
    Some(format!(
        "{} {} {}",
        escape_measurement(measurement),
        fields.join(","),
        timestamp
    ))
}

fn escape_measurement(value: &str) -> String {
    escape(value, &[',', ' '])
}

fn escape_key(value: &str) -> String {
    escape(value, &[',', '=', ' '])
}

fn escape(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use contracts::{ItemSnapshot, SamplerKey};
    use std::time::Duration;

    fn snapshot(name: &str, value: Option<f64>) -> ItemSnapshot {
        ItemSnapshot {
            name: name.into(),
            key: SamplerKey::parse("mock.constant").unwrap(),
            arg: None,
            interval: Duration::from_secs(1),
            last_value: value,
        }
    }

    fn batch(items: Vec<ItemSnapshot>) -> PollBatch {
        PollBatch {
            cycle: 3,
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            items,
        }
    }

    #[test]
    fn test_line_protocol_escapes_and_joins() {
        let batch = batch(vec![
            snapshot("loadavg1 1s", Some(0.52)),
            snapshot("a=b,c", Some(2.0)),
        ]);
        assert_eq!(
            encode_line_protocol("rpdemo", &batch).unwrap(),
            "rpdemo loadavg1\\ 1s=0.52,a\\=b\\,c=2 1700000000000000000"
        );
    }

    #[test]
    fn test_line_protocol_skips_missing_and_non_finite() {
        let batch = batch(vec![
            snapshot("none", None),
            snapshot("nan", Some(f64::NAN)),
        ]);
        assert_eq!(encode_line_protocol("rpdemo", &batch), None);
    }

    #[test]
    fn test_measurement_escaping() {
        let batch = batch(vec![snapshot("x", Some(1.5))]);
        let line = encode_line_protocol("my data", &batch).unwrap();
        assert!(line.starts_with("my\\ data x=1.5 "));
    }

    #[test]
    fn test_json_record() {
        let json = encode_json(&batch(vec![snapshot("x", Some(1.0))])).unwrap();
        assert!(json.contains("\"cycle\":3"));
        assert!(json.contains("\"last_value\":1.0"));
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_format_param() {
        assert_eq!(RecordFormat::from_param(None), Ok(RecordFormat::Json));
        assert_eq!(RecordFormat::from_param(Some("line")), Ok(RecordFormat::LineProtocol));
        assert!(RecordFormat::from_param(Some("bincode")).is_err());
    }
}
