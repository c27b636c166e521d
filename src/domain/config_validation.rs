//! Configuration validation.
//!
//! Checks every key a run will read before any data is loaded. Optional keys
//! are only checked when present; defaults are applied by the CLI builders.

use crate::domain::error::SwingtraderError;
use crate::domain::pivot::PivotKind;
use crate::ports::config_port::ConfigPort;
use chrono::{NaiveDate, NaiveTime};
use std::collections::HashSet;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SwingtraderError {
    SwingtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> SwingtraderError {
    SwingtraderError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn present(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn parse_date(section: &str, key: &str, value: &str) -> Result<NaiveDate, SwingtraderError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        invalid(
            section,
            key,
            format!("invalid {} format, expected YYYY-MM-DD", key),
        )
    })
}

pub fn parse_time(section: &str, key: &str, value: &str) -> Result<NaiveTime, SwingtraderError> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT)
        .map_err(|_| invalid(section, key, format!("invalid {} format, expected HH:MM", key)))
}

/// Comma-separated codes, trimmed and upper-cased. Empty tokens and
/// duplicates are rejected.
pub fn parse_codes(input: &str) -> Result<Vec<String>, SwingtraderError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(invalid("backtest", "codes", "empty code in list"));
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(invalid("backtest", "codes", format!("duplicate code {}", code)));
        }
        codes.push(code);
    }

    Ok(codes)
}

fn parse_number<T: std::str::FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, SwingtraderError> {
    match present(config, section, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("{} must be a number", key))),
    }
}

fn validate_at_least(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    min: i64,
) -> Result<Option<i64>, SwingtraderError> {
    let value = parse_number::<i64>(config, section, key)?;
    match value {
        Some(v) if v < min => Err(invalid(
            section,
            key,
            format!("{} must be at least {}", key, min),
        )),
        _ => Ok(value),
    }
}

fn validate_optional_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, SwingtraderError> {
    present(config, section, key)
        .map(|raw| parse_date(section, key, &raw))
        .transpose()
}

/// `[data]` and `[backtest]`: data location, universe, window and sizing.
pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), SwingtraderError> {
    validate_data(config)?;
    validate_codes(config)?;
    validate_dates(config)?;
    validate_sizing(config)?;
    Ok(())
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), SwingtraderError> {
    if present(config, "data", "path").is_none() {
        return Err(missing("data", "path"));
    }
    if present(config, "data", "exchange").is_none() {
        return Err(missing("data", "exchange"));
    }
    Ok(())
}

fn validate_codes(config: &dyn ConfigPort) -> Result<(), SwingtraderError> {
    match present(config, "backtest", "codes").or_else(|| present(config, "backtest", "code")) {
        Some(codes) => parse_codes(&codes).map(|_| ()),
        None => Err(missing("backtest", "code")),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SwingtraderError> {
    let start = validate_optional_date(config, "backtest", "start_date")?;
    let end = validate_optional_date(config, "backtest", "end_date")?;
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        )),
        _ => Ok(()),
    }
}

fn validate_sizing(config: &dyn ConfigPort) -> Result<(), SwingtraderError> {
    if let Some(money) = parse_number::<f64>(config, "backtest", "money_to_spend")? {
        if money <= 0.0 {
            return Err(invalid(
                "backtest",
                "money_to_spend",
                "money_to_spend must be positive",
            ));
        }
    }
    validate_at_least(config, "backtest", "share_count", 0)?;
    Ok(())
}

pub fn validate_ema_crossover_config(config: &dyn ConfigPort) -> Result<(), SwingtraderError> {
    let short = validate_at_least(config, "ema_crossover", "short_span", 1)?;
    let long = validate_at_least(config, "ema_crossover", "long_span", 1)?;
    match (short, long) {
        (Some(short), Some(long)) if short >= long => Err(invalid(
            "ema_crossover",
            "short_span",
            "short_span must be less than long_span",
        )),
        _ => Ok(()),
    }
}

pub fn validate_trendline_config(config: &dyn ConfigPort) -> Result<(), SwingtraderError> {
    if let Some(margin) = parse_number::<f64>(config, "trendline", "margin_of_error")? {
        if margin <= 0.0 {
            return Err(invalid(
                "trendline",
                "margin_of_error",
                "margin_of_error must be positive",
            ));
        }
    }
    if let Some(raw) = present(config, "trendline", "reverse") {
        if parse_bool(&raw).is_none() {
            return Err(invalid("trendline", "reverse", "reverse must be a boolean"));
        }
    }
    Ok(())
}

/// Same spellings the INI adapter accepts for `get_bool`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

pub fn validate_ma_proximity_config(config: &dyn ConfigPort) -> Result<(), SwingtraderError> {
    validate_at_least(config, "ma_proximity", "window", 1)?;
    validate_at_least(config, "ma_proximity", "lookback", 1)?;
    if let Some(pd) = parse_number::<f64>(config, "ma_proximity", "percent_diff")? {
        if pd < 0.0 {
            return Err(invalid(
                "ma_proximity",
                "percent_diff",
                "percent_diff must be non-negative",
            ));
        }
    }
    if let Some(raw) = present(config, "ma_proximity", "line_kind") {
        raw.parse::<PivotKind>().map_err(|_| {
            invalid(
                "ma_proximity",
                "line_kind",
                "line_kind must be support or resistance",
            )
        })?;
    }
    validate_optional_date(config, "ma_proximity", "date")?;
    validate_trendline_config(config)
}

pub fn validate_dip_and_rip_config(config: &dyn ConfigPort) -> Result<(), SwingtraderError> {
    if let Some(raw) = present(config, "dip_and_rip", "exit_time") {
        parse_time("dip_and_rip", "exit_time", &raw)?;
    }
    validate_at_least(config, "dip_and_rip", "min_volume", 0)?;
    validate_optional_date(config, "dip_and_rip", "date")?;
    Ok(())
}

/// Every section, as run by `swingtrader validate`.
pub fn validate_all(config: &dyn ConfigPort) -> Result<(), SwingtraderError> {
    validate_run_config(config)?;
    validate_ema_crossover_config(config)?;
    validate_ma_proximity_config(config)?;
    validate_dip_and_rip_config(config)?;
    Ok(())
}
