//! Moving-average signals: SMA proximity flags and EMA crossover state.

use crate::domain::error::SwingtraderError;
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::price_series::PriceSeries;

/// Fixed divisor applied to close − MA before comparing with `percent_diff`.
///
/// The difference is not normalised by price or MA, so the band is a fixed
/// price unit and behaves differently for cheap and expensive instruments.
pub const PROXIMITY_DIVISOR: f64 = 100.0;

/// `0 <= (close - ma) / 100 <= percent_diff` on a green bar.
pub fn within_ma_range(bar: &OhlcvBar, ma: f64, percent_diff: f64) -> bool {
    let diff = (bar.close - ma) / PROXIMITY_DIVISOR;
    (0.0..=percent_diff).contains(&diff) && bar.is_green()
}

/// One flag per bar; bars without a valid MA are never flagged.
pub fn proximity_flags(series: &PriceSeries, ma: &IndicatorSeries, percent_diff: f64) -> Vec<bool> {
    series
        .bars()
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            ma.value_at(i)
                .is_some_and(|value| within_ma_range(bar, value, percent_diff))
        })
        .collect()
}

/// Position of the short average relative to the long one on a single bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverState {
    Above,
    Level,
    Below,
}

impl CrossoverState {
    pub fn of(short: f64, long: f64) -> Self {
        if short > long {
            CrossoverState::Above
        } else if short < long {
            CrossoverState::Below
        } else {
            CrossoverState::Level
        }
    }

    /// Short >= long.
    pub fn is_positive(self) -> bool {
        self != CrossoverState::Below
    }
}

/// Crossover state per bar, `None` until both averages are valid.
pub fn crossover_states(short: &IndicatorSeries, long: &IndicatorSeries) -> Vec<Option<CrossoverState>> {
    (0..short.len().min(long.len()))
        .map(|i| match (short.value_at(i), long.value_at(i)) {
            (Some(s), Some(l)) => Some(CrossoverState::of(s, l)),
            _ => None,
        })
        .collect()
}

/// Compute the requested averages and attach any the series does not carry yet.
pub fn annotate(series: &mut PriceSeries, kinds: &[IndicatorType]) -> Result<(), SwingtraderError> {
    for &kind in kinds {
        if series.indicator(kind).is_some() {
            continue;
        }
        let column = match kind {
            IndicatorType::Sma(period) => calculate_sma(series.bars(), period),
            IndicatorType::Ema(span) => calculate_ema(series.bars(), span),
        };
        series.attach_indicator(column)?;
    }
    Ok(())
}
