//! MA-proximity swing setups.
//!
//! Decision support rather than a trade simulator: finds bars sitting just
//! above their simple moving average, then for each such bar looks back for
//! the recent swing high and fits a trendline over the pivots between that
//! high and the bar.

use crate::domain::error::SwingtraderError;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::IndicatorType;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::pivot::{detect_pivots, PivotKind};
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::proximity_flags;
use crate::domain::trendline::{Trendline, TrendlineFitter};
use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, PartialEq)]
pub struct MaProximityConfig {
    pub window: usize,
    pub percent_diff: f64,
    pub lookback: usize,
    pub line_kind: PivotKind,
    pub fitter: TrendlineFitter,
}

impl Default for MaProximityConfig {
    fn default() -> Self {
        MaProximityConfig {
            window: 50,
            percent_diff: 0.05,
            lookback: 20,
            line_kind: PivotKind::Resistance,
            fitter: TrendlineFitter::new(0.05, true),
        }
    }
}

impl MaProximityConfig {
    /// Bars of history needed before the first scanned date: enough for a
    /// valid SMA and a full lookback window.
    pub fn warmup_bars(&self) -> usize {
        self.window.max(self.lookback)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaSetup {
    pub target: NaiveDateTime,
    pub lookback_high: OhlcvBar,
    pub trendline: Option<Trendline>,
}

/// Timestamps of bars within the proximity band of SMA(`window`).
pub fn proximity_dates(
    series: &PriceSeries,
    config: &MaProximityConfig,
) -> Result<Vec<NaiveDateTime>, SwingtraderError> {
    series.require_len(config.window.max(1))?;

    let computed;
    let ma = match series.indicator(IndicatorType::Sma(config.window)) {
        Some(column) => column,
        None => {
            computed = calculate_sma(series.bars(), config.window);
            &computed
        }
    };

    Ok(proximity_flags(series, ma, config.percent_diff)
        .into_iter()
        .zip(series.bars())
        .filter(|(flagged, _)| *flagged)
        .map(|(_, bar)| bar.timestamp)
        .collect())
}

/// Bar with the highest high among the `lookback` bars before `target`.
/// Ties keep the earliest bar.
pub fn lookback_high(
    series: &PriceSeries,
    target: NaiveDateTime,
    lookback: usize,
) -> Result<&OhlcvBar, SwingtraderError> {
    let pos = series.position_of_time(target).ok_or_else(|| {
        SwingtraderError::out_of_range(format!("{} not in series {}", target, series.code()))
    })?;
    if lookback == 0 {
        return Err(SwingtraderError::out_of_range("lookback must be at least 1 bar"));
    }
    if pos < lookback {
        return Err(SwingtraderError::out_of_range(format!(
            "lookback of {} bars from {} precedes series start ({} bars available)",
            lookback, target, pos
        )));
    }

    let window = &series.bars()[pos - lookback..pos];
    let mut best = &window[0];
    for bar in &window[1..] {
        if bar.high > best.high {
            best = bar;
        }
    }
    Ok(best)
}

/// Lookback high plus the trendline fitted between it and `target`.
pub fn setup(
    series: &PriceSeries,
    target: NaiveDateTime,
    config: &MaProximityConfig,
) -> Result<MaSetup, SwingtraderError> {
    let high = lookback_high(series, target, config.lookback)?.clone();
    let target_index = series
        .get_by_time(target)
        .map(|bar| bar.index)
        .ok_or_else(|| SwingtraderError::out_of_range(format!("{} not in series", target)))?;

    let window = series.slice(high.index, target_index)?;
    let pivots = detect_pivots(&window)?;
    let trendline = config.fitter.fit(pivots.of_kind(config.line_kind))?;

    Ok(MaSetup {
        target,
        lookback_high: high,
        trendline,
    })
}

/// `setup` for every proximity date. Dates without enough history or
/// pivots are skipped.
pub fn scan(
    series: &PriceSeries,
    config: &MaProximityConfig,
) -> Result<Vec<MaSetup>, SwingtraderError> {
    scan_from(series, config, NaiveDate::MIN)
}

/// As [`scan`], ignoring proximity dates before `from`. Earlier bars still
/// feed the SMA and the lookback search.
pub fn scan_from(
    series: &PriceSeries,
    config: &MaProximityConfig,
    from: NaiveDate,
) -> Result<Vec<MaSetup>, SwingtraderError> {
    let mut setups = Vec::new();
    for date in proximity_dates(series, config)?
        .into_iter()
        .filter(|ts| ts.date() >= from)
    {
        match setup(series, date, config) {
            Ok(s) => setups.push(s),
            Err(SwingtraderError::OutOfRange { .. })
            | Err(SwingtraderError::InsufficientPivots { .. }) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(setups)
}
