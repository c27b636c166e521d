//! Pivot detection from bar colour flips.
//!
//! A bar is green when close > open and red when close < open. Flat bars
//! carry the previous colour. A support pivot is recorded where red turns
//! green, a resistance pivot where green turns red.

use crate::domain::error::SwingtraderError;
use crate::domain::price_series::PriceSeries;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PivotKind {
    Support,
    Resistance,
}

impl fmt::Display for PivotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PivotKind::Support => write!(f, "support"),
            PivotKind::Resistance => write!(f, "resistance"),
        }
    }
}

impl std::str::FromStr for PivotKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "support" => Ok(PivotKind::Support),
            "resistance" => Ok(PivotKind::Resistance),
            other => Err(format!("unknown pivot kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pivot {
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub index: usize,
    pub kind: PivotKind,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotSet {
    pub support: Vec<Pivot>,
    pub resistance: Vec<Pivot>,
}

impl PivotSet {
    pub fn of_kind(&self, kind: PivotKind) -> &[Pivot] {
        match kind {
            PivotKind::Support => &self.support,
            PivotKind::Resistance => &self.resistance,
        }
    }

    /// Both sequences interleaved chronologically.
    pub fn merged(&self) -> Vec<Pivot> {
        let mut all: Vec<Pivot> = self
            .support
            .iter()
            .chain(self.resistance.iter())
            .copied()
            .collect();
        all.sort_by_key(|p| p.index);
        all
    }

    pub fn is_empty(&self) -> bool {
        self.support.is_empty() && self.resistance.is_empty()
    }
}

/// Scan `series` for colour flips. The first bar only seeds state.
pub fn detect_pivots(series: &PriceSeries) -> Result<PivotSet, SwingtraderError> {
    series.require_len(2)?;

    let bars = series.bars();
    let mut pivots = PivotSet::default();
    let mut prev_is_green = bars[0].is_green();
    let mut prev_close = bars[0].close;

    for bar in &bars[1..] {
        if bar.is_green() && !prev_is_green {
            pivots.support.push(Pivot {
                timestamp: bar.timestamp,
                price: prev_close.min(bar.open),
                index: bar.index,
                kind: PivotKind::Support,
            });
            prev_is_green = true;
        } else if bar.is_red() && prev_is_green {
            pivots.resistance.push(Pivot {
                timestamp: bar.timestamp,
                price: prev_close.max(bar.open),
                index: bar.index,
                kind: PivotKind::Resistance,
            });
            prev_is_green = false;
        }
        prev_close = bar.close;
    }

    Ok(pivots)
}
