//! Configuration validation.
//!
//! Validates all config fields before a backtest runs.

use crate::domain::bar::parse_timestamp;
use crate::domain::error::ReplayError;
use crate::domain::execution::FillPolicy;
use crate::domain::resolution::Resolution;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDateTime;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
pub const DEFAULT_RDV_PERIOD: i64 = 2;
pub const DEFAULT_SMA_FAST: i64 = 10;
pub const DEFAULT_SMA_SLOW: i64 = 30;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    validate_initial_capital(config)?;
    validate_risk_free_rate(config)?;
    validate_dates(config)?;
    validate_resolution(config)?;
    validate_commission(config)?;
    validate_slippage(config)?;
    validate_leverage(config)?;
    validate_fill_policy(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    config.require_string("strategy", "symbol")?;
    let kind = config.require_string("strategy", "kind")?;
    match kind.to_lowercase().as_str() {
        "relative_volume" => validate_period(config, "period", DEFAULT_RDV_PERIOD)?,
        "sma_cross" => validate_sma_periods(config)?,
        other => {
            return Err(invalid(
                "strategy",
                "kind",
                format!("unknown strategy '{other}' (expected relative_volume or sma_cross)"),
            ))
        }
    }
    validate_target_weight(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> ReplayError {
    ReplayError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Numeric value of `[section] key`, or `default` when absent.
///
/// Unparseable and non-finite values are errors rather than falling back.
fn number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, ReplayError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(default);
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err(invalid(section, key, format!("{key} must be finite"))),
        Err(_) => Err(invalid(section, key, format!("{key} '{raw}' is not a number"))),
    }
}

fn integer(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, ReplayError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(section, key, format!("{key} '{raw}' is not an integer"))),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    let value = number(config, "backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL)?;
    if value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    let value = number(config, "backtest", "risk_free_rate", 0.0)?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    let start = parse_date(config, "start_date")?;
    let end = parse_date(config, "end_date")?;

    if start >= end {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

/// Read and parse a `[backtest]` date key.
pub fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<NaiveDateTime, ReplayError> {
    let value = config.require_string("backtest", field)?;
    parse_timestamp(&value).ok_or_else(|| {
        invalid(
            "backtest",
            field,
            format!("invalid {field} '{value}', expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS"),
        )
    })
}

/// `[backtest] resolution`, defaulting to hourly.
pub fn parse_resolution(config: &dyn ConfigPort) -> Result<Resolution, ReplayError> {
    match config.get_string("backtest", "resolution") {
        None => Ok(Resolution::Hour),
        Some(s) => s
            .parse::<Resolution>()
            .map_err(|reason| invalid("backtest", "resolution", reason)),
    }
}

/// `[execution] fill_policy`, defaulting to same-bar close.
pub fn parse_fill_policy(config: &dyn ConfigPort) -> Result<FillPolicy, ReplayError> {
    match config.get_string("execution", "fill_policy") {
        None => Ok(FillPolicy::default()),
        Some(s) => s
            .parse::<FillPolicy>()
            .map_err(|reason| invalid("execution", "fill_policy", reason)),
    }
}

fn validate_resolution(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    parse_resolution(config).map(|_| ())
}

fn validate_fill_policy(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    parse_fill_policy(config).map(|_| ())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    for key in ["commission_per_trade", "commission_pct"] {
        if number(config, "execution", key, 0.0)? < 0.0 {
            return Err(invalid(
                "execution",
                key,
                format!("{key} must be non-negative"),
            ));
        }
    }
    Ok(())
}

fn validate_slippage(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    if number(config, "execution", "slippage_pct", 0.0)? < 0.0 {
        return Err(invalid(
            "execution",
            "slippage_pct",
            "slippage_pct must be non-negative",
        ));
    }
    Ok(())
}

fn validate_leverage(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    if number(config, "execution", "leverage", 1.0)? <= 0.0 {
        return Err(invalid("execution", "leverage", "leverage must be positive"));
    }
    Ok(())
}

fn validate_period(config: &dyn ConfigPort, key: &str, default: i64) -> Result<(), ReplayError> {
    if integer(config, "strategy", key, default)? < 1 {
        return Err(invalid("strategy", key, format!("{key} must be at least 1")));
    }
    Ok(())
}

fn validate_sma_periods(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    validate_period(config, "fast", DEFAULT_SMA_FAST)?;
    validate_period(config, "slow", DEFAULT_SMA_SLOW)?;
    let fast = integer(config, "strategy", "fast", DEFAULT_SMA_FAST)?;
    let slow = integer(config, "strategy", "slow", DEFAULT_SMA_SLOW)?;
    if fast >= slow {
        return Err(invalid("strategy", "fast", "fast must be below slow"));
    }
    Ok(())
}

fn validate_target_weight(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    if number(config, "strategy", "target_weight", 1.0)? == 0.0 {
        return Err(invalid(
            "strategy",
            "target_weight",
            "target_weight must be finite and non-zero",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const VALID: &str = r#"
[backtest]
initial_capital = 100000.0
start_date = 2013-10-07
end_date = 2013-10-11
resolution = hour
warmup = true

[execution]
fill_policy = same_bar_close
commission_per_trade = 1.0
commission_pct = 0.1
slippage_pct = 0.05
leverage = 1.0

[strategy]
kind = relative_volume
symbol = SPY
period = 2
target_weight = 1.0
"#;

    fn with(key_line_from: &str, key_line_to: &str) -> FileConfigAdapter {
        make_config(&VALID.replace(key_line_from, key_line_to))
    }

    fn invalid_key(result: Result<(), ReplayError>) -> String {
        match result {
            Err(ReplayError::ConfigInvalid { key, .. }) => key,
            Err(ReplayError::ConfigMissing { key, .. }) => key,
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn valid_config_passes() {
        let config = make_config(VALID);
        assert!(validate_backtest_config(&config).is_ok());
        assert!(validate_strategy_config(&config).is_ok());
    }

    #[test]
    fn initial_capital_defaults_when_missing() {
        let config = with("initial_capital = 100000.0\n", "");
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn initial_capital_zero_fails() {
        let config = with("initial_capital = 100000.0", "initial_capital = 0");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "initial_capital");
    }

    #[test]
    fn missing_end_date_fails() {
        let config = with("end_date = 2013-10-11\n", "");
        assert!(matches!(
            validate_backtest_config(&config),
            Err(ReplayError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn invalid_start_date_format_fails() {
        let config = with("start_date = 2013-10-07", "start_date = 10/07/2013");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "start_date");
    }

    #[test]
    fn start_after_end_fails() {
        let config = with("start_date = 2013-10-07", "start_date = 2013-10-12");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "start_date");
    }

    #[test]
    fn datetime_dates_accepted() {
        let config = with("end_date = 2013-10-11", "end_date = 2013-10-07 16:00:00");
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn unknown_resolution_fails() {
        let config = with("resolution = hour", "resolution = tick");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "resolution");
    }

    #[test]
    fn negative_commission_fails() {
        let config = with("commission_pct = 0.1", "commission_pct = -0.1");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "commission_pct");
    }

    #[test]
    fn negative_slippage_fails() {
        let config = with("slippage_pct = 0.05", "slippage_pct = -1");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "slippage_pct");
    }

    #[test]
    fn zero_leverage_fails() {
        let config = with("leverage = 1.0", "leverage = 0");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "leverage");
    }

    #[test]
    fn unknown_fill_policy_fails() {
        let config = with("fill_policy = same_bar_close", "fill_policy = vwap");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "fill_policy");
    }

    #[test]
    fn missing_symbol_fails() {
        let config = with("symbol = SPY", "symbol =");
        assert_eq!(invalid_key(validate_strategy_config(&config)), "symbol");
    }

    #[test]
    fn unknown_kind_fails() {
        let config = with("kind = relative_volume", "kind = momentum");
        assert_eq!(invalid_key(validate_strategy_config(&config)), "kind");
    }

    #[test]
    fn zero_period_fails() {
        let config = with("period = 2", "period = 0");
        assert_eq!(invalid_key(validate_strategy_config(&config)), "period");
    }

    #[test]
    fn sma_cross_periods_checked() {
        let config = with("kind = relative_volume", "kind = sma_cross\nfast = 20\nslow = 10");
        assert_eq!(invalid_key(validate_strategy_config(&config)), "fast");

        let config = with("kind = relative_volume", "kind = sma_cross\nfast = 5\nslow = 20");
        assert!(validate_strategy_config(&config).is_ok());
    }

    #[test]
    fn zero_target_weight_fails() {
        let config = with("target_weight = 1.0", "target_weight = 0");
        assert_eq!(invalid_key(validate_strategy_config(&config)), "target_weight");
    }

    #[test]
    fn nan_commission_fails() {
        let config = with("commission_pct = 0.1", "commission_pct = NaN");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "commission_pct");
    }

    #[test]
    fn nan_slippage_fails() {
        let config = with("slippage_pct = 0.05", "slippage_pct = nan");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "slippage_pct");
    }

    #[test]
    fn malformed_leverage_fails() {
        let config = with("leverage = 1.0", "leverage = abc");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "leverage");
    }

    #[test]
    fn infinite_capital_fails() {
        let config = with("initial_capital = 100000.0", "initial_capital = inf");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "initial_capital");
    }

    #[test]
    fn malformed_period_fails() {
        let config = with("period = 2", "period = two");
        assert_eq!(invalid_key(validate_strategy_config(&config)), "period");
    }
}
