//! EMA crossover swing backtest.
//!
//! Walks the bars once with a flat / long state machine (plus a seed state). A positive
//! crossover (short EMA rising above long EMA) buys at the bar's open; a
//! negative crossover sells at the bar's close and emits a [`TradeRecord`].
//! Bars before the trading window only warm up the averages and the
//! crossover state.

use crate::domain::error::SwingtraderError;
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::{crossover_states, CrossoverState};
use crate::domain::trade::{PositionSizing, TradeRecord};
use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, PartialEq)]
pub struct EmaCrossoverConfig {
    pub short_span: usize,
    pub long_span: usize,
    pub sizing: PositionSizing,
}

impl Default for EmaCrossoverConfig {
    fn default() -> Self {
        EmaCrossoverConfig {
            short_span: 5,
            long_span: 20,
            sizing: PositionSizing::default(),
        }
    }
}

impl EmaCrossoverConfig {
    /// Bars of history needed before the backtest window to warm up the EMAs.
    pub fn lookback(&self) -> usize {
        self.short_span.max(self.long_span)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    /// Short >= long with nothing bought: the first negative crossover has
    /// nothing to close.
    Seed,
    Flat,
    Long {
        entry_time: NaiveDateTime,
        entry_price: f64,
        shares: u64,
    },
}

fn ema_column(series: &PriceSeries, span: usize) -> IndicatorSeries {
    series
        .indicator(IndicatorType::Ema(span))
        .cloned()
        .unwrap_or_else(|| calculate_ema(series.bars(), span))
}

/// Run the crossover strategy over `series`, returning completed round trips
/// in order. Attached EMA columns are reused; missing ones are computed.
pub fn run_ema_crossover(
    series: &PriceSeries,
    config: &EmaCrossoverConfig,
) -> Result<Vec<TradeRecord>, SwingtraderError> {
    walk(series, config, NaiveDate::MIN)
}

/// As [`run_ema_crossover`], but positions open only on bars dated
/// `trade_from` or later. Earlier bars still drive the crossover state, so a
/// crossover inside the warmup leaves a seed rather than a position.
pub fn run_ema_crossover_from(
    series: &PriceSeries,
    config: &EmaCrossoverConfig,
    trade_from: NaiveDate,
) -> Result<Vec<TradeRecord>, SwingtraderError> {
    walk(series, config, trade_from)
}

fn walk(
    series: &PriceSeries,
    config: &EmaCrossoverConfig,
    trade_from: NaiveDate,
) -> Result<Vec<TradeRecord>, SwingtraderError> {
    series.require_len(2)?;

    let short = ema_column(series, config.short_span);
    let long = ema_column(series, config.long_span);
    let states = crossover_states(&short, &long);

    let start = states
        .iter()
        .position(Option::is_some)
        .filter(|&i| i + 1 < series.len())
        .ok_or_else(|| {
            SwingtraderError::invalid_series(format!(
                "{} has fewer than 2 bars with both EMA({}) and EMA({})",
                series.code(),
                config.short_span,
                config.long_span
            ))
        })?;

    let mut prev_is_negative = states[start] == Some(CrossoverState::Below);
    let mut state = if prev_is_negative {
        State::Flat
    } else {
        State::Seed
    };
    let mut trades = Vec::new();

    for (bar, current) in series.bars().iter().zip(&states).skip(start + 1) {
        let Some(current) = current else {
            continue;
        };

        match current {
            CrossoverState::Above if prev_is_negative => {
                state = if bar.date() >= trade_from {
                    State::Long {
                        entry_time: bar.timestamp,
                        entry_price: bar.open,
                        shares: config.sizing.shares_for(bar.open),
                    }
                } else {
                    State::Seed
                };
                prev_is_negative = false;
            }
            CrossoverState::Below if !prev_is_negative => {
                if let State::Long {
                    entry_time,
                    entry_price,
                    shares,
                } = state
                {
                    trades.push(TradeRecord::close(
                        entry_time,
                        entry_price,
                        shares,
                        bar.timestamp,
                        bar.close,
                    ));
                }
                state = State::Flat;
                prev_is_negative = true;
            }
            _ => {}
        }
    }

    Ok(trades)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::IndicatorPoint;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::trade::Outcome;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn ts(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::days(i as i64)
    }

    fn config() -> EmaCrossoverConfig {
        EmaCrossoverConfig {
            short_span: 5,
            long_span: 20,
            sizing: PositionSizing::Shares(100),
        }
    }

    /// Series whose EMA columns follow `states`: 'n' short < long, 'p' short > long,
    /// 'e' equal. Bar i opens at 10 + i and closes at 10.5 + i.
    fn series_with_states(states: &str) -> PriceSeries {
        let bars: Vec<OhlcvBar> = (0..states.len())
            .map(|i| OhlcvBar {
                index: i,
                timestamp: ts(i),
                open: 10.0 + i as f64,
                high: 11.0 + i as f64,
                low: 9.0 + i as f64,
                close: 10.5 + i as f64,
                volume: 1000,
            })
            .collect();
        let column = |kind: IndicatorType, f: &dyn Fn(char) -> f64| IndicatorSeries {
            indicator_type: kind,
            values: states
                .chars()
                .enumerate()
                .map(|(i, c)| IndicatorPoint {
                    timestamp: ts(i),
                    valid: true,
                    value: f(c),
                })
                .collect(),
        };
        let short = column(IndicatorType::Ema(5), &|c| match c {
            'n' => 1.0,
            'p' => 2.0,
            _ => 1.5,
        });
        let long = column(IndicatorType::Ema(20), &|_| 1.5);

        let mut series = PriceSeries::new("TEST", bars).unwrap();
        series.attach_indicator(short).unwrap();
        series.attach_indicator(long).unwrap();
        series
    }

    #[test]
    fn one_round_trip_for_neg_neg_pos_pos_neg() {
        let trades = run_ema_crossover(&series_with_states("nnppn"), &config()).unwrap();

        assert_eq!(trades.len(), 1);
        let trade = &trades[0];
        assert_eq!(trade.entry_time, ts(2));
        assert_relative_eq!(trade.entry_price, 12.0);
        assert_eq!(trade.exit_time, ts(4));
        assert_relative_eq!(trade.exit_price, 14.5);
        assert_eq!(trade.shares, 100);
        assert_relative_eq!(trade.pnl, 250.0);
        assert_eq!(trade.outcome, Outcome::Win);
    }

    #[test]
    fn seed_position_is_never_recorded() {
        // starts positive: the first negative crossover closes nothing
        let trades = run_ema_crossover(&series_with_states("ppnpn"), &config()).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_time, ts(3));
        assert_eq!(trades[0].exit_time, ts(4));
    }

    #[test]
    fn first_bar_never_trades() {
        // bar 0 is positive but only seeds state; bar 1 closes the seed
        let trades = run_ema_crossover(&series_with_states("pn"), &config()).unwrap();
        assert!(trades.is_empty());
    }

    #[test]
    fn equal_averages_fire_nothing() {
        let trades = run_ema_crossover(&series_with_states("nepen"), &config()).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_time, ts(2));
        assert_eq!(trades[0].exit_time, ts(4));
    }

    #[test]
    fn open_position_at_end_is_not_recorded() {
        let trades = run_ema_crossover(&series_with_states("nnpnpp"), &config()).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_time, ts(3));
    }

    #[test]
    fn money_sizing_floors_shares() {
        let mut cfg = config();
        cfg.sizing = PositionSizing::Money(10_000.0);
        // entry on bar 27 opens at 37.0
        let states: String = std::iter::repeat_n('n', 27)
            .chain("pn".chars())
            .collect();
        let trades = run_ema_crossover(&series_with_states(&states), &cfg).unwrap();
        assert_eq!(trades.len(), 1);
        assert_relative_eq!(trades[0].entry_price, 37.0);
        assert_eq!(trades[0].shares, 270);
    }

    #[test]
    fn computes_emas_when_not_attached() {
        // fall 20 -> 11, rise 12 -> 30, fall 29 -> 10
        let closes: Vec<f64> = (0..10)
            .map(|i| 20.0 - i as f64)
            .chain((12..=30).map(f64::from))
            .chain((10..=29).rev().map(f64::from))
            .collect();
        let bars: Vec<OhlcvBar> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                index: i,
                timestamp: ts(i),
                open: close,
                high: close + 0.5,
                low: close - 0.5,
                close,
                volume: 1000,
            })
            .collect();
        let series = PriceSeries::new("TEST", bars).unwrap();
        let cfg = EmaCrossoverConfig {
            short_span: 2,
            long_span: 5,
            sizing: PositionSizing::Shares(10),
        };

        let trades = run_ema_crossover(&series, &cfg).unwrap();
        assert_eq!(trades.len(), 1);
        assert!(trades[0].entry_time >= ts(10));
        assert!(trades[0].exit_time > ts(28));
        assert!(trades[0].pnl > 0.0);
    }

    #[test]
    fn rejects_short_series() {
        let result = run_ema_crossover(&series_with_states("n"), &config());
        assert!(matches!(result, Err(SwingtraderError::InvalidSeries { .. })));
    }

    #[test]
    fn warmup_crossover_leaves_a_seed() {
        // positive crossover on bar 2 falls before the window
        let series = series_with_states("nnppnpn");
        let trades = run_ema_crossover_from(&series, &config(), ts(3).date()).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_time, ts(5));
        assert_eq!(trades[0].exit_time, ts(6));
    }

    #[test]
    fn warmup_sets_negative_state_for_window() {
        // already negative when the window opens on bar 2
        let series = series_with_states("ppnnpn");
        let trades = run_ema_crossover_from(&series, &config(), ts(2).date()).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_time, ts(4));
    }

    #[test]
    fn trading_from_series_start_matches_full_run() {
        let series = series_with_states("nnppnpn");
        assert_eq!(
            run_ema_crossover_from(&series, &config(), ts(0).date()).unwrap(),
            run_ema_crossover(&series, &config()).unwrap()
        );
    }

    #[test]
    fn lookback_is_longest_span() {
        assert_eq!(EmaCrossoverConfig::default().lookback(), 20);
    }
}
