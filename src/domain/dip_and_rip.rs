//! Intraday Dip-and-Rip backtest.
//!
//! One trading day is split into premarket, regular and after-hours bars.
//! The premarket high is the level to reclaim: the first regular-session bar
//! trading above it is bought at its high. The first regular bar's low is the
//! stop; while waiting for an entry the stop ratchets down to any lower low.
//! A position exits on a stop breach, at the exit cutoff, or at the close.

use crate::domain::error::SwingtraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::price_series::PriceSeries;
use crate::domain::trade::{PositionSizing, TradeRecord};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;

pub const DEFAULT_MIN_VOLUME: u64 = 1_000_000;

fn hm(hour: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, min, 0).unwrap_or_default()
}

pub fn market_open() -> NaiveTime {
    hm(9, 30)
}

pub fn market_close() -> NaiveTime {
    hm(16, 0)
}

/// One calendar day's bars by session: premarket before 09:30, regular
/// 09:30 up to 16:00, after-hours from 16:00.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySessionSplit {
    pub date: NaiveDate,
    pub premarket: Vec<OhlcvBar>,
    pub regular: Vec<OhlcvBar>,
    pub after_hours: Vec<OhlcvBar>,
}

impl DailySessionSplit {
    pub fn for_day(series: &PriceSeries, date: NaiveDate) -> Self {
        Self::from_bars(date, series.day(date).bars())
    }

    /// Bars not on `date` are ignored.
    pub fn from_bars(date: NaiveDate, bars: &[OhlcvBar]) -> Self {
        let (open, close) = (market_open(), market_close());
        let mut split = DailySessionSplit {
            date,
            premarket: Vec::new(),
            regular: Vec::new(),
            after_hours: Vec::new(),
        };
        for bar in bars.iter().filter(|b| b.date() == date) {
            let t = bar.time();
            if t < open {
                split.premarket.push(bar.clone());
            } else if t < close {
                split.regular.push(bar.clone());
            } else {
                split.after_hours.push(bar.clone());
            }
        }
        split
    }

    pub fn is_tradeable(&self) -> bool {
        !self.premarket.is_empty() && !self.regular.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DipAndRipConfig {
    pub exit_cutoff: NaiveTime,
    pub sizing: PositionSizing,
}

impl Default for DipAndRipConfig {
    fn default() -> Self {
        DipAndRipConfig {
            exit_cutoff: hm(11, 0),
            sizing: PositionSizing::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitReason {
    StopBreach,
    TimeCutoff,
    SessionEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DipAndRipTrade {
    pub date: NaiveDate,
    pub trade: TradeRecord,
    pub premarket_high: f64,
    pub premarket_high_time: NaiveDateTime,
    pub high_reached: f64,
    pub high_time: NaiveDateTime,
    pub time_to_high: TimeDelta,
    pub time_to_exit: TimeDelta,
    pub stop: f64,
    pub max_profit: f64,
    pub max_loss: f64,
    pub exit_reason: ExitReason,
}

#[derive(Debug, Clone, Copy)]
enum DayState {
    Waiting,
    InPosition {
        entry_time: NaiveDateTime,
        entry_price: f64,
        shares: u64,
    },
}

struct Walk {
    premarket_high: f64,
    premarket_high_time: NaiveDateTime,
    pattern_high: f64,
    pattern_time: NaiveDateTime,
    stop: f64,
}

impl Walk {
    fn close(
        &self,
        date: NaiveDate,
        state: DayState,
        exit_time: NaiveDateTime,
        exit_price: f64,
        exit_reason: ExitReason,
    ) -> Option<DipAndRipTrade> {
        let DayState::InPosition {
            entry_time,
            entry_price,
            shares,
        } = state
        else {
            return None;
        };
        Some(DipAndRipTrade {
            date,
            trade: TradeRecord::close(entry_time, entry_price, shares, exit_time, exit_price),
            premarket_high: self.premarket_high,
            premarket_high_time: self.premarket_high_time,
            high_reached: self.pattern_high,
            high_time: self.pattern_time,
            time_to_high: self.pattern_time - entry_time,
            time_to_exit: exit_time - entry_time,
            stop: self.stop,
            max_profit: (self.pattern_high - entry_price) * shares as f64,
            max_loss: (self.stop - entry_price) * shares as f64,
            exit_reason,
        })
    }
}

/// Run one day. Yields at most one trade.
pub fn run_dip_and_rip(
    split: &DailySessionSplit,
    config: &DipAndRipConfig,
) -> Result<Option<DipAndRipTrade>, SwingtraderError> {
    let mut premarket = split.premarket.iter();
    let Some(mut pm_high) = premarket.next() else {
        return Err(SwingtraderError::invalid_series(format!(
            "no premarket bars on {}",
            split.date
        )));
    };
    for bar in premarket {
        if bar.high > pm_high.high {
            pm_high = bar;
        }
    }
    let Some(first) = split.regular.first() else {
        return Err(SwingtraderError::invalid_series(format!(
            "no regular-session bars on {}",
            split.date
        )));
    };

    let mut walk = Walk {
        premarket_high: pm_high.high,
        premarket_high_time: pm_high.timestamp,
        pattern_high: pm_high.high,
        pattern_time: pm_high.timestamp,
        stop: first.low,
    };
    let mut state = DayState::Waiting;

    for bar in &split.regular {
        if bar.time() >= config.exit_cutoff {
            return Ok(walk.close(
                split.date,
                state,
                bar.timestamp,
                bar.open,
                ExitReason::TimeCutoff,
            ));
        }

        match state {
            DayState::Waiting => {
                if bar.high > walk.pattern_high {
                    state = DayState::InPosition {
                        entry_time: bar.timestamp,
                        entry_price: bar.high,
                        shares: config.sizing.shares_for(bar.high),
                    };
                    walk.pattern_high = bar.high;
                    walk.pattern_time = bar.timestamp;
                } else if bar.low < walk.stop {
                    walk.stop = bar.low;
                }
            }
            DayState::InPosition { .. } => {
                if bar.high > walk.pattern_high {
                    walk.pattern_high = bar.high;
                    walk.pattern_time = bar.timestamp;
                }
                if bar.low < walk.stop {
                    return Ok(walk.close(
                        split.date,
                        state,
                        bar.timestamp,
                        bar.low,
                        ExitReason::StopBreach,
                    ));
                }
            }
        }
    }

    match split.regular.last() {
        Some(last) => Ok(walk.close(
            split.date,
            state,
            last.timestamp,
            last.close,
            ExitReason::SessionEnd,
        )),
        None => Ok(None),
    }
}

/// Run every day of an intraday series. Days missing a premarket or
/// regular session are skipped.
pub fn run_days(
    series: &PriceSeries,
    config: &DipAndRipConfig,
) -> Result<Vec<DipAndRipTrade>, SwingtraderError> {
    let mut trades = Vec::new();
    for date in series.dates() {
        let split = DailySessionSplit::for_day(series, date);
        if !split.is_tradeable() {
            continue;
        }
        if let Some(trade) = run_dip_and_rip(&split, config)? {
            trades.push(trade);
        }
    }
    Ok(trades)
}

/// Collapse an intraday series to one bar per calendar day: first open,
/// highest high, lowest low, last close, summed volume. Timestamps are
/// midnight.
pub fn daily_bars(series: &PriceSeries) -> Result<PriceSeries, SwingtraderError> {
    let mut days: Vec<OhlcvBar> = Vec::new();
    for bar in series.bars() {
        match days.last_mut() {
            Some(day) if day.date() == bar.date() => {
                day.high = day.high.max(bar.high);
                day.low = day.low.min(bar.low);
                day.close = bar.close;
                day.volume += bar.volume;
            }
            _ => days.push(OhlcvBar {
                index: days.len(),
                timestamp: bar.date().and_time(NaiveTime::default()),
                ..bar.clone()
            }),
        }
    }
    PriceSeries::new(series.code(), days)
}

/// Days of a daily series trading more than `min_volume`, busiest first.
pub fn high_volume_days(daily: &PriceSeries, min_volume: u64) -> Vec<NaiveDate> {
    let mut busy: Vec<&OhlcvBar> = daily
        .bars()
        .iter()
        .filter(|bar| bar.volume > min_volume)
        .collect();
    busy.sort_by(|a, b| b.volume.cmp(&a.volume));
    busy.into_iter().map(OhlcvBar::date).collect()
}
