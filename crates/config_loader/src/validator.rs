//! 配置校验模块
//!
//! 校验规则：
//! - 字段级规则 (`validator` derive)：条目名非空、interval > 0、polling_threads 范围
//! - cycle_period_ms > 0，settle_ms < cycle_period_ms
//! - sink 名称非空且唯一，network sink 必须配置 addr
//!
//! 重复的条目名不在此处拒绝：加载时按文件顺序 `add_item`，由轮询器报告 `ItemExists`。

use std::collections::HashSet;

use contracts::{ContractError, LoggerConfig, SinkType};
use validator::Validate;

/// 校验 LoggerConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &LoggerConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_items(config)?;
    validate_poller(config)?;
    validate_sinks(config)?;
    Ok(())
}

/// 字段级校验
fn validate_fields(config: &LoggerConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|e| ContractError::config_validation("config", e.to_string()))
}

/// 校验条目 (serde 无法表达的约束)
fn validate_items(config: &LoggerConfig) -> Result<(), ContractError> {
    for (idx, item) in config.items.iter().enumerate() {
        item.check().map_err(|e| {
            ContractError::config_validation(format!("items[{idx}]"), e.to_string())
        })?;
    }
    Ok(())
}

/// 校验周期参数
fn validate_poller(config: &LoggerConfig) -> Result<(), ContractError> {
    let poller = &config.poller;

    if poller.cycle_period_ms == 0 {
        return Err(ContractError::config_validation(
            "poller.cycle_period_ms",
            "cycle_period_ms must be > 0",
        ));
    }

    if poller.settle_ms >= poller.cycle_period_ms {
        return Err(ContractError::config_validation(
            "poller.settle_ms / poller.cycle_period_ms",
            format!(
                "settle_ms ({}) must be < cycle_period_ms ({})",
                poller.settle_ms, poller.cycle_period_ms
            ),
        ));
    }

    if poller.batch_capacity == 0 {
        return Err(ContractError::config_validation(
            "poller.batch_capacity",
            "batch_capacity must be > 0",
        ));
    }

    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(config: &LoggerConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in config.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.sink_type == SinkType::Network && !sink.params.contains_key("addr") {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.addr", sink.name),
                "network sink requires 'addr'",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ItemDefinition, SamplerKey, SinkConfig};
    use std::time::Duration;

    fn minimal_config() -> LoggerConfig {
        LoggerConfig {
            items: vec![ItemDefinition::parse("load", "system.loadavg1", None, 1.0).unwrap()],
            sinks: vec![SinkConfig {
                name: "log".into(),
                sink_type: SinkType::Log,
                queue_capacity: 100,
                params: Default::default(),
            }],
            ..LoggerConfig::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_zero_interval() {
        let mut config = minimal_config();
        config.items.push(ItemDefinition {
            name: "zero".into(),
            key: SamplerKey::parse("mock.counter").unwrap(),
            arg: None,
            interval: Duration::ZERO,
        });
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }), "got: {err}");
    }

    #[test]
    fn test_polling_threads_out_of_range() {
        let mut config = minimal_config();
        config.polling_threads = 0;
        assert!(validate(&config).is_err());

        config.polling_threads = 1000;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_settle_must_fit_in_cycle() {
        let mut config = minimal_config();
        config.poller.settle_ms = 1000;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("settle_ms"), "got: {err}");
    }

    #[test]
    fn test_empty_sink_name() {
        let mut config = minimal_config();
        config.sinks[0].name = String::new();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_duplicate_sink_name() {
        let mut config = minimal_config();
        config.sinks.push(config.sinks[0].clone());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("duplicate sink name"), "got: {err}");
    }

    #[test]
    fn test_network_sink_requires_addr() {
        let mut config = minimal_config();
        config.sinks.push(SinkConfig {
            name: "udp".into(),
            sink_type: SinkType::Network,
            queue_capacity: 10,
            params: Default::default(),
        });
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("addr"), "got: {err}");
    }

    #[test]
    fn test_duplicate_item_names_pass_validation() {
        let mut config = minimal_config();
        config.items.push(config.items[0].clone());
        assert!(validate(&config).is_ok());
    }
}
