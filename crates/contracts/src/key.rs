//! SamplerKey - `<namespace>.<metric>` resolved at registration time
//!
//! The namespace selects a sampler plugin, the metric is forwarded to it verbatim.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::ContractError;

/// Separator between namespace and metric
pub const NAMESPACE_SEPARATOR: char = '.';

/// Sampler namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Host metrics (load average)
    System,
    /// Network probes (ping)
    Net,
    /// Raspberry Pi Sense HAT environmental sensor
    #[serde(alias = "sense_hat")]
    SenseHat,
    /// WeMo smart plug telemetry
    Wemo,
    /// Deterministic fakes for demos and tests
    Mock,
}

impl Namespace {
    /// All namespaces, in declaration order
    pub const ALL: [Namespace; 5] = [
        Namespace::System,
        Namespace::Net,
        Namespace::SenseHat,
        Namespace::Wemo,
        Namespace::Mock,
    ];

    /// Canonical key prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::System => "system",
            Namespace::Net => "net",
            Namespace::SenseHat => "sensehat",
            Namespace::Wemo => "wemo",
            Namespace::Mock => "mock",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Ok(Namespace::System),
            "net" => Ok(Namespace::Net),
            "sensehat" | "sense_hat" => Ok(Namespace::SenseHat),
            "wemo" => Ok(Namespace::Wemo),
            "mock" => Ok(Namespace::Mock),
            other => Err(ContractError::invalid_key(
                s,
                format!("unknown namespace '{other}'"),
            )),
        }
    }
}

/// Parsed sampler key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SamplerKey {
    namespace: Namespace,
    metric: String,
}

impl SamplerKey {
    /// Create a key from its parts
    pub fn new(namespace: Namespace, metric: impl Into<String>) -> Self {
        Self {
            namespace,
            metric: metric.into(),
        }
    }

    /// Parse `<namespace>.<metric>`, splitting on the first separator only
    pub fn parse(key: &str) -> Result<Self, ContractError> {
        let (namespace, metric) = key.split_once(NAMESPACE_SEPARATOR).ok_or_else(|| {
            ContractError::invalid_key(key, "expected '<namespace>.<metric>'")
        })?;

        if metric.is_empty() {
            return Err(ContractError::invalid_key(key, "metric cannot be empty"));
        }

        let namespace = namespace
            .parse::<Namespace>()
            .map_err(|_| ContractError::invalid_key(key, format!("unknown namespace '{namespace}'")))?;

        Ok(Self::new(namespace, metric))
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }
}

impl fmt::Display for SamplerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.namespace, NAMESPACE_SEPARATOR, self.metric)
    }
}

impl FromStr for SamplerKey {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SamplerKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SamplerKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_key() {
        let key = SamplerKey::parse("system.loadavg1").unwrap();
        assert_eq!(key.namespace(), Namespace::System);
        assert_eq!(key.metric(), "loadavg1");
        assert_eq!(key.to_string(), "system.loadavg1");
    }

    #[test]
    fn test_split_on_first_separator_only() {
        let key = SamplerKey::parse("wemo.switch1.power").unwrap();
        assert_eq!(key.namespace(), Namespace::Wemo);
        assert_eq!(key.metric(), "switch1.power");
    }

    #[test]
    fn test_sense_hat_aliases() {
        assert_eq!(
            SamplerKey::parse("sense_hat.temperature").unwrap().namespace(),
            Namespace::SenseHat
        );
        assert_eq!(
            SamplerKey::parse("SenseHat.humidity").unwrap().namespace(),
            Namespace::SenseHat
        );
    }

    #[test]
    fn test_rejects_malformed_keys() {
        for bad in ["loadavg1", "system.", "disk.usage", ""] {
            let err = SamplerKey::parse(bad).unwrap_err();
            assert!(
                matches!(err, ContractError::InvalidKey { .. }),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_serde_round_trip() {
        let key = SamplerKey::new(Namespace::Net, "ping");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"net.ping\"");
        let back: SamplerKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);

        assert!(serde_json::from_str::<SamplerKey>("\"nope\"").is_err());
    }
}
