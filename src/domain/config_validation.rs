//! Configuration validation.
//!
//! Reads the `[market]`, `[backtest]` and `[parameters]` sections up front and
//! turns them into the immutable structs the core works with.

use chrono::{DateTime, TimeDelta, Utc};
use std::path::PathBuf;

use crate::domain::backtest::BacktestConfig;
use crate::domain::catalog::CatalogConfig;
use crate::domain::error::QuantframeError;
use crate::domain::execution::ExecutionConfig;
use crate::domain::parameter::ParameterKey;
use crate::domain::parameter_space::{ParameterAxis, ParameterSpace};
use crate::domain::resolution::{Resolution, RetentionPolicy, SeriesDefinition};
use crate::ports::config_port::ConfigPort;

fn missing(section: &str, key: &str) -> QuantframeError {
    QuantframeError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, QuantframeError> {
    match config.get_string(section, key) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(missing(section, key)),
    }
}

fn parse_resolution(raw: &str, section: &str, key: &str) -> Result<Resolution, QuantframeError> {
    raw.parse::<Resolution>()
        .map_err(|reason| QuantframeError::config_invalid(section, key, reason))
}

fn retention(config: &dyn ConfigPort, key: &str) -> Result<RetentionPolicy, QuantframeError> {
    match config.get_string("market", key) {
        None => Ok(RetentionPolicy::Unbounded),
        Some(raw) => raw
            .parse::<RetentionPolicy>()
            .map_err(|reason| QuantframeError::config_invalid("market", key, reason)),
    }
}

pub fn validate_market_config(config: &dyn ConfigPort) -> Result<CatalogConfig, QuantframeError> {
    let symbols = config.get_list("market", "symbols");
    if symbols.is_empty() {
        return Err(missing("market", "symbols"));
    }
    let resolution = parse_resolution(&required(config, "market", "resolution")?, "market", "resolution")?;
    let base = SeriesDefinition {
        resolution,
        retention: retention(config, "retention")?,
    };
    let aggregate_retention = retention(config, "aggregate_retention")?;

    let mut builder = CatalogConfig::builder(base).symbols(symbols);
    for raw in config.get_list("market", "aggregate") {
        builder = builder.aggregate_all(SeriesDefinition {
            resolution: parse_resolution(&raw, "market", "aggregate")?,
            retention: aggregate_retention,
        });
    }
    builder.build()
}

fn non_negative(config: &dyn ConfigPort, key: &str) -> Result<f64, QuantframeError> {
    let value = config.get_double("backtest", key)?.unwrap_or(0.0);
    if value.is_nan() || value < 0.0 {
        return Err(QuantframeError::config_invalid(
            "backtest",
            key,
            format!("{} must be non-negative", key),
        ));
    }
    Ok(value)
}

fn positive(config: &dyn ConfigPort, key: &str, default: f64) -> Result<f64, QuantframeError> {
    let value = config.get_double("backtest", key)?.unwrap_or(default);
    if value.is_nan() || value <= 0.0 {
        return Err(QuantframeError::config_invalid(
            "backtest",
            key,
            format!("{} must be positive", key),
        ));
    }
    Ok(value)
}

fn validate_from(config: &dyn ConfigPort) -> Result<DateTime<Utc>, QuantframeError> {
    let raw = required(config, "backtest", "from")?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            QuantframeError::config_invalid(
                "backtest",
                "from",
                format!("'{}' is not an RFC 3339 timestamp: {}", raw, e),
            )
        })
}

fn validate_window(config: &dyn ConfigPort) -> Result<TimeDelta, QuantframeError> {
    let minutes = config
        .get_int("backtest", "window_minutes")?
        .ok_or_else(|| missing("backtest", "window_minutes"))?;
    if minutes <= 0 {
        return Err(QuantframeError::config_invalid(
            "backtest",
            "window_minutes",
            format!("expected a positive number of minutes, got {}", minutes),
        ));
    }
    TimeDelta::try_minutes(minutes).ok_or_else(|| {
        QuantframeError::config_invalid("backtest", "window_minutes", "window is too large")
    })
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, QuantframeError> {
    let from = validate_from(config)?;
    let window = validate_window(config)?;
    Ok(BacktestConfig {
        from,
        window,
        amount: positive(config, "amount", 1000.0)?,
        pip: positive(config, "pip", 0.0001)?,
        deposit: non_negative(config, "deposit")?,
        execution: ExecutionConfig {
            commission_per_trade: non_negative(config, "commission_per_trade")?,
            commission_pct: non_negative(config, "commission_pct")?,
            slippage_pct: non_negative(config, "slippage_pct")?,
        },
    })
}

/// `data_dir` from `[backtest]`, if configured.
pub fn backtest_data_dir(config: &dyn ConfigPort) -> Option<PathBuf> {
    config
        .get_string("backtest", "data_dir")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

/// One axis per key of `K`, read from `[parameters]` under the lowercased key
/// name. Axes are declared in the key enum's order.
pub fn validate_parameter_space<K: ParameterKey>(
    config: &dyn ConfigPort,
) -> Result<ParameterSpace<K>, QuantframeError> {
    let mut space = ParameterSpace::new();
    for key in K::all() {
        let name = key.name().to_lowercase();
        let raw = required(config, "parameters", &name)?;
        space.add(ParameterAxis::parse(*key, &raw)?)?;
    }
    Ok(space)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::strategies::rsi::RsiParameter;
    use chrono::TimeZone;

    const VALID: &str = r#"
[market]
symbols = EURUSD,GBPUSD
resolution = M1
retention = 500
aggregate = M5, M15
aggregate_retention = 100

[backtest]
data_dir = ./data
from = 2024-01-02T00:00:00Z
window_minutes = 1440
amount = 1000
pip = 0.0001
deposit = 100

[parameters]
rsi_period = 14
rsi_lower_bound = range(10, 40, 10)
rsi_upper_bound = range(90, 60, -10)
trade_symbol = EURUSD
"#;

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn replace(from: &str, to: &str) -> FileConfigAdapter {
        config(&VALID.replace(from, to))
    }

    #[test]
    fn valid_market_section() {
        let market = validate_market_config(&config(VALID)).unwrap();
        assert_eq!(market.symbols(), ["EURUSD".to_string(), "GBPUSD".to_string()]);
        assert_eq!(market.base(), SeriesDefinition::limited(Resolution::M1, 500));
        assert_eq!(
            market.aggregations_for("GBPUSD"),
            [
                SeriesDefinition::limited(Resolution::M5, 100),
                SeriesDefinition::limited(Resolution::M15, 100)
            ]
        );
    }

    #[test]
    fn market_errors() {
        assert!(matches!(
            validate_market_config(&replace("symbols = EURUSD,GBPUSD", "")),
            Err(QuantframeError::ConfigMissing { .. })
        ));
        assert!(matches!(
            validate_market_config(&replace("resolution = M1", "resolution = M2")),
            Err(QuantframeError::ConfigInvalid { .. })
        ));
        assert!(matches!(
            validate_market_config(&replace("retention = 500", "retention = lots")),
            Err(QuantframeError::ConfigInvalid { .. })
        ));
        assert!(matches!(
            validate_market_config(&replace("aggregate = M5, M15", "aggregate = M1")),
            Err(QuantframeError::ConfigInvalid { .. })
        ));
        assert!(matches!(
            validate_market_config(&replace("symbols = EURUSD,GBPUSD", "symbols = EURUSD,EURUSD")),
            Err(QuantframeError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn valid_backtest_section() {
        let bt = validate_backtest_config(&config(VALID)).unwrap();
        assert_eq!(bt.from, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        assert_eq!(bt.window, TimeDelta::days(1));
        assert_eq!(bt.amount, 1000.0);
        assert_eq!(bt.pip, 0.0001);
        assert_eq!(bt.deposit, 100.0);
        assert_eq!(bt.execution, ExecutionConfig::default());
        assert_eq!(backtest_data_dir(&config(VALID)), Some(PathBuf::from("./data")));
    }

    #[test]
    fn backtest_errors() {
        assert!(matches!(
            validate_backtest_config(&replace("from = 2024-01-02T00:00:00Z", "")),
            Err(QuantframeError::ConfigMissing { .. })
        ));
        assert!(matches!(
            validate_backtest_config(&replace("from = 2024-01-02T00:00:00Z", "from = 2024-01-02")),
            Err(QuantframeError::ConfigInvalid { .. })
        ));
        assert!(matches!(
            validate_backtest_config(&replace("window_minutes = 1440", "window_minutes = 0")),
            Err(QuantframeError::ConfigInvalid { .. })
        ));
        assert!(matches!(
            validate_backtest_config(&replace("pip = 0.0001", "pip = -1")),
            Err(QuantframeError::ConfigInvalid { .. })
        ));
        assert!(matches!(
            validate_backtest_config(&replace("deposit = 100", "slippage_pct = -0.5")),
            Err(QuantframeError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        for (from, to, key) in [
            ("pip = 0.0001", "pip = abc", "pip"),
            ("pip = 0.0001", "pip = 0.0001x", "pip"),
            ("amount = 1000", "amount = 1,000", "amount"),
            ("deposit = 100", "deposit = 100\nslippage_pct = half", "slippage_pct"),
            ("window_minutes = 1440", "window_minutes = 1440.5", "window_minutes"),
        ] {
            let err = validate_backtest_config(&replace(from, to)).unwrap_err();
            assert!(
                matches!(&err, QuantframeError::ConfigInvalid { section, key: k, .. } if section == "backtest" && k == key),
                "{} -> {:?}",
                to,
                err
            );
        }
    }

    #[test]
    fn blank_numbers_use_defaults() {
        let bt = validate_backtest_config(&replace("amount = 1000", "amount =")).unwrap();
        assert_eq!(bt.amount, 1000.0);
    }

    #[test]
    fn parameter_space_from_section() {
        let space = validate_parameter_space::<RsiParameter>(&config(VALID)).unwrap();
        assert_eq!(space.axes().len(), 4);
        assert_eq!(space.len(), 16);
        assert_eq!(space.axes()[0].key(), RsiParameter::RsiPeriod);
    }

    #[test]
    fn parameter_errors() {
        assert!(matches!(
            validate_parameter_space::<RsiParameter>(&replace("rsi_period = 14", "")),
            Err(QuantframeError::ConfigMissing { .. })
        ));
        assert!(matches!(
            validate_parameter_space::<RsiParameter>(&replace("rsi_period = 14", "rsi_period = range(1, 5, 0)")),
            Err(QuantframeError::InvalidRange { .. })
        ));
        assert!(matches!(
            validate_parameter_space::<RsiParameter>(&replace("rsi_period = 14", "rsi_period = fourteen")),
            Err(QuantframeError::MissingOrMistypedParameter { .. })
        ));
    }
}
