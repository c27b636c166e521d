#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;
pub use swingtrader::domain::ohlcv::OhlcvBar;
use swingtrader::domain::error::SwingtraderError;
use swingtrader::domain::price_series::PriceSeries;
use swingtrader::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        code: &str,
        _exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SwingtraderError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(SwingtraderError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(code)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date() >= start_date && b.date() <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day_ts(start: NaiveDate, offset: usize) -> NaiveDateTime {
    (start + chrono::Duration::days(offset as i64))
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn at(day: NaiveDate, time: &str) -> NaiveDateTime {
    day.and_time(NaiveTime::parse_from_str(time, "%H:%M").unwrap())
}

/// Daily bars from (open, close) pairs; high and low sit 0.5 outside the body.
pub fn bars_from_pairs(start: NaiveDate, pairs: &[(f64, f64)]) -> Vec<OhlcvBar> {
    pairs
        .iter()
        .enumerate()
        .map(|(i, &(open, close))| OhlcvBar {
            index: i,
            timestamp: day_ts(start, i),
            open,
            high: open.max(close) + 0.5,
            low: open.min(close) - 0.5,
            close,
            volume: 1000,
        })
        .collect()
}

/// Daily bars that open at the previous close and close at each value.
pub fn bars_from_closes(start: NaiveDate, closes: &[f64]) -> Vec<OhlcvBar> {
    let mut prev = closes.first().copied().unwrap_or_default();
    let pairs: Vec<(f64, f64)> = closes
        .iter()
        .map(|&close| {
            let pair = (prev, close);
            prev = close;
            pair
        })
        .collect();
    bars_from_pairs(start, &pairs)
}

pub fn intraday_bar(
    day: NaiveDate,
    time: &str,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
) -> OhlcvBar {
    OhlcvBar {
        index: 0,
        timestamp: at(day, time),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Premarket high 10.00 at 09:00, entry 10.05 at 09:31, stop breach to 9.40 at 09:45.
pub fn dip_and_rip_day(day: NaiveDate) -> Vec<OhlcvBar> {
    vec![
        intraday_bar(day, "09:00", 9.80, 10.00, 9.70, 9.90, 800_000),
        intraday_bar(day, "09:31", 9.95, 10.05, 9.90, 10.00, 400_000),
        intraday_bar(day, "09:45", 9.80, 9.85, 9.40, 9.50, 300_000),
        intraday_bar(day, "10:30", 9.50, 10.60, 9.45, 10.50, 200_000),
    ]
}

pub fn series(code: &str, bars: Vec<OhlcvBar>) -> PriceSeries {
    PriceSeries::indexed(code, bars).unwrap()
}

pub fn bars_to_csv(bars: &[OhlcvBar], intraday: bool) -> String {
    let mut out = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        let stamp = if intraday {
            b.timestamp.format("%Y-%m-%d %H:%M").to_string()
        } else {
            b.timestamp.format("%Y-%m-%d").to_string()
        };
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            stamp, b.open, b.high, b.low, b.close, b.volume
        ));
    }
    out
}
