//! Poll item definitions and snapshots
//!
//! `ItemDefinition` is the persisted identity of an item, `ItemSnapshot` the
//! read-only view handed to the registry surface and to result sinks.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::{ContractError, ItemName, SamplerKey};

/// Longest accepted re-sample period (one year)
pub const MAX_INTERVAL: Duration = Duration::from_secs(86_400 * 365);

/// Persisted `{name, key, arg, interval}` record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ItemDefinition {
    /// Unique name within the registry
    #[validate(custom(function = "validate_name"))]
    pub name: ItemName,

    /// Sampler key (`<namespace>.<metric>`)
    pub key: SamplerKey,

    /// Sampler-specific qualifier (hostname, device id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,

    /// Target re-sample period, fractional seconds on the wire
    #[serde(with = "interval_secs")]
    #[validate(custom(function = "validate_interval"))]
    pub interval: Duration,
}

impl ItemDefinition {
    /// Create a checked definition
    pub fn new(
        name: impl Into<ItemName>,
        key: SamplerKey,
        arg: Option<String>,
        interval: Duration,
    ) -> Result<Self, ContractError> {
        let definition = Self {
            name: name.into(),
            key,
            arg,
            interval,
        };
        definition.check()?;
        Ok(definition)
    }

    /// Create a checked definition from a textual key and an interval in seconds
    pub fn parse(
        name: impl Into<ItemName>,
        key: &str,
        arg: Option<&str>,
        interval_secs: f64,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let interval = Duration::try_from_secs_f64(interval_secs).map_err(|e| {
            ContractError::invalid_interval(name.as_str(), format!("{interval_secs}: {e}"))
        })?;
        Self::new(
            name,
            SamplerKey::parse(key)?,
            arg.map(str::to_string),
            interval,
        )
    }

    /// Re-check the invariants serde cannot enforce
    pub fn check(&self) -> Result<(), ContractError> {
        if self.name.trim().is_empty() {
            return Err(ContractError::EmptyName);
        }
        if self.interval.is_zero() {
            return Err(ContractError::invalid_interval(
                self.name.as_str(),
                "interval must be > 0",
            ));
        }
        if self.interval > MAX_INTERVAL {
            return Err(ContractError::invalid_interval(
                self.name.as_str(),
                format!("interval must be at most {}s", MAX_INTERVAL.as_secs()),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for ItemDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.arg {
            Some(arg) => write!(f, "{} ({}[{}])", self.name, self.key, arg),
            None => write!(f, "{} ({})", self.name, self.key),
        }
    }
}

/// Read-only view of a poll item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub name: ItemName,
    pub key: SamplerKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    #[serde(with = "interval_secs")]
    pub interval: Duration,
    /// Most recent successful sample
    pub last_value: Option<f64>,
}

impl ItemSnapshot {
    /// Strip the runtime state, keeping the persisted identity
    pub fn definition(&self) -> ItemDefinition {
        ItemDefinition {
            name: self.name.clone(),
            key: self.key.clone(),
            arg: self.arg.clone(),
            interval: self.interval,
        }
    }
}

fn validate_name(name: &ItemName) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("empty_name").with_message("item name cannot be empty".into()));
    }
    Ok(())
}

fn validate_interval(interval: &Duration) -> Result<(), ValidationError> {
    if interval.is_zero() {
        return Err(ValidationError::new("interval").with_message("interval must be > 0".into()));
    }
    if *interval > MAX_INTERVAL {
        return Err(ValidationError::new("interval").with_message("interval exceeds one year".into()));
    }
    Ok(())
}

/// Serialize a `Duration` as fractional seconds
pub mod interval_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| serde::de::Error::custom(format!("invalid interval {secs}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_definition() {
        let def = ItemDefinition::parse("ping google.com", "net.ping", Some("google.com"), 1.0)
            .unwrap();
        assert_eq!(def.name, "ping google.com");
        assert_eq!(def.key.to_string(), "net.ping");
        assert_eq!(def.arg.as_deref(), Some("google.com"));
        assert_eq!(def.interval, Duration::from_secs(1));
        assert_eq!(def.to_string(), "ping google.com (net.ping[google.com])");
    }

    #[test]
    fn test_rejects_non_positive_interval() {
        let err = ItemDefinition::parse("x", "system.loadavg1", None, 0.0).unwrap_err();
        assert!(matches!(err, ContractError::InvalidInterval { .. }));

        let err = ItemDefinition::parse("x", "system.loadavg1", None, -1.0).unwrap_err();
        assert!(matches!(err, ContractError::InvalidInterval { .. }));
    }

    #[test]
    fn test_rejects_interval_beyond_one_year() {
        let err = ItemDefinition::parse("x", "mock.counter", None, 1e19).unwrap_err();
        assert!(matches!(err, ContractError::InvalidInterval { .. }));

        let def = ItemDefinition {
            interval: MAX_INTERVAL + Duration::from_secs(1),
            ..ItemDefinition::parse("x", "mock.counter", None, 1.0).unwrap()
        };
        assert!(def.validate().is_err());
        assert!(ItemDefinition::parse("x", "mock.counter", None, MAX_INTERVAL.as_secs_f64()).is_ok());
    }

    #[test]
    fn test_rejects_empty_name() {
        let err = ItemDefinition::parse("  ", "system.loadavg1", None, 1.0).unwrap_err();
        assert!(matches!(err, ContractError::EmptyName));
    }

    #[test]
    fn test_validator_flags_zero_interval() {
        let def = ItemDefinition {
            name: "x".into(),
            key: SamplerKey::parse("system.loadavg1").unwrap(),
            arg: None,
            interval: Duration::ZERO,
        };
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_fractional_interval_serde() {
        let json = r#"{"name":"fast","key":"mock.counter","interval":0.25}"#;
        let def: ItemDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.interval, Duration::from_millis(250));
        assert!(def.arg.is_none());

        let out = serde_json::to_string(&def).unwrap();
        assert!(out.contains("\"interval\":0.25"));
        assert!(!out.contains("arg"));
    }
}
