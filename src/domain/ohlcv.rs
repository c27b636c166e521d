//! OHLCV bar representation.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl OhlcvBar {
    /// close > open
    pub fn is_green(&self) -> bool {
        self.close > self.open
    }

    /// close < open
    pub fn is_red(&self) -> bool {
        self.close < self.open
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn time(&self) -> NaiveTime {
        self.timestamp.time()
    }
}
