//! PriceSeries: ordered bars with sequence-index and timestamp lookup.
//!
//! Bars are immutable after construction. Derived indicator columns may be
//! attached afterwards; each column is aligned 1:1 with the bars by position.

use crate::domain::error::SwingtraderError;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct PriceSeries {
    code: String,
    bars: Vec<OhlcvBar>,
    time_index: HashMap<NaiveDateTime, usize>,
    indicators: HashMap<IndicatorType, IndicatorSeries>,
}

impl PriceSeries {
    /// Build a series from bars that already carry their sequence indices.
    ///
    /// Indices must be consecutive and timestamps strictly increasing.
    pub fn new(code: impl Into<String>, bars: Vec<OhlcvBar>) -> Result<Self, SwingtraderError> {
        for pair in bars.windows(2) {
            if pair[1].index != pair[0].index + 1 {
                return Err(SwingtraderError::invalid_series(format!(
                    "sequence index gap between {} and {}",
                    pair[0].index, pair[1].index
                )));
            }
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(SwingtraderError::invalid_series(format!(
                    "timestamps not strictly increasing at index {} ({} after {})",
                    pair[1].index, pair[1].timestamp, pair[0].timestamp
                )));
            }
        }
        Ok(Self::from_validated(code.into(), bars, HashMap::new()))
    }

    /// Build a series from supplier-ordered bars, numbering them 0.. in order.
    pub fn indexed(
        code: impl Into<String>,
        mut bars: Vec<OhlcvBar>,
    ) -> Result<Self, SwingtraderError> {
        for (i, bar) in bars.iter_mut().enumerate() {
            bar.index = i;
        }
        Self::new(code, bars)
    }

    fn from_validated(
        code: String,
        bars: Vec<OhlcvBar>,
        indicators: HashMap<IndicatorType, IndicatorSeries>,
    ) -> Self {
        let time_index = bars
            .iter()
            .enumerate()
            .map(|(pos, bar)| (bar.timestamp, pos))
            .collect();
        Self {
            code,
            bars,
            time_index,
            indicators,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&OhlcvBar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&OhlcvBar> {
        self.bars.last()
    }

    /// Position inside `bars()` of the bar with sequence index `index`.
    pub fn position(&self, index: usize) -> Option<usize> {
        let first = self.bars.first()?.index;
        let pos = index.checked_sub(first)?;
        (pos < self.bars.len()).then_some(pos)
    }

    pub fn position_of_time(&self, timestamp: NaiveDateTime) -> Option<usize> {
        self.time_index.get(&timestamp).copied()
    }

    pub fn get(&self, index: usize) -> Option<&OhlcvBar> {
        self.position(index).map(|pos| &self.bars[pos])
    }

    pub fn get_by_time(&self, timestamp: NaiveDateTime) -> Option<&OhlcvBar> {
        self.position_of_time(timestamp).map(|pos| &self.bars[pos])
    }

    /// Fail with `InvalidSeries` unless the series holds at least `minimum` bars.
    pub fn require_len(&self, minimum: usize) -> Result<(), SwingtraderError> {
        if self.bars.len() < minimum {
            return Err(SwingtraderError::invalid_series(format!(
                "{} has {} bars, need {}",
                self.code,
                self.bars.len(),
                minimum
            )));
        }
        Ok(())
    }

    /// Sub-range view over sequence indices `start..=end`, keeping indices
    /// and any attached indicator columns aligned.
    pub fn slice(&self, start: usize, end: usize) -> Result<PriceSeries, SwingtraderError> {
        let (Some(from), Some(to)) = (self.position(start), self.position(end)) else {
            return Err(SwingtraderError::out_of_range(format!(
                "index range {}..={} outside series {}",
                start, end, self.code
            )));
        };
        if from > to {
            return Err(SwingtraderError::out_of_range(format!(
                "index range {}..={} is reversed",
                start, end
            )));
        }
        Ok(self.view(from, to + 1))
    }

    /// Sub-range view of bars with `start <= timestamp <= end`.
    pub fn between(&self, start: NaiveDateTime, end: NaiveDateTime) -> PriceSeries {
        let from = self.bars.partition_point(|b| b.timestamp < start);
        let to = self.bars.partition_point(|b| b.timestamp <= end);
        self.view(from, to.max(from))
    }

    /// Bars falling on calendar day `date`.
    pub fn day(&self, date: NaiveDate) -> PriceSeries {
        let from = self.bars.partition_point(|b| b.date() < date);
        let to = self.bars.partition_point(|b| b.date() <= date);
        self.view(from, to.max(from))
    }

    /// Distinct calendar days present, in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let days: BTreeSet<NaiveDate> = self.bars.iter().map(OhlcvBar::date).collect();
        days.into_iter().collect()
    }

    fn view(&self, from: usize, to: usize) -> PriceSeries {
        let indicators = self
            .indicators
            .iter()
            .map(|(kind, series)| {
                let values = series.values[from..to].to_vec();
                (
                    *kind,
                    IndicatorSeries {
                        indicator_type: *kind,
                        values,
                    },
                )
            })
            .collect();
        Self::from_validated(self.code.clone(), self.bars[from..to].to_vec(), indicators)
    }

    /// Attach a derived column. Its length must match the bar count.
    pub fn attach_indicator(&mut self, series: IndicatorSeries) -> Result<(), SwingtraderError> {
        if series.values.len() != self.bars.len() {
            return Err(SwingtraderError::invalid_series(format!(
                "{} column has {} values for {} bars",
                series.indicator_type,
                series.values.len(),
                self.bars.len()
            )));
        }
        self.indicators.insert(series.indicator_type, series);
        Ok(())
    }

    pub fn indicator(&self, kind: IndicatorType) -> Option<&IndicatorSeries> {
        self.indicators.get(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::sma::calculate_sma;

    fn make_bar(index: usize, timestamp: &str, close: f64) -> OhlcvBar {
        OhlcvBar {
            index,
            timestamp: NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M").unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1000,
        }
    }

    fn sample_series() -> PriceSeries {
        PriceSeries::new(
            "ABC",
            vec![
                make_bar(0, "2024-01-01 00:00", 100.0),
                make_bar(1, "2024-01-02 00:00", 101.0),
                make_bar(2, "2024-01-03 00:00", 102.0),
                make_bar(3, "2024-01-04 00:00", 103.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn lookup_by_index_and_time() {
        let series = sample_series();
        assert_eq!(series.len(), 4);
        assert_eq!(series.get(2).unwrap().close, 102.0);
        assert!(series.get(4).is_none());

        let ts = NaiveDateTime::parse_from_str("2024-01-02 00:00", "%Y-%m-%d %H:%M").unwrap();
        assert_eq!(series.get_by_time(ts).unwrap().index, 1);
        assert_eq!(series.position_of_time(ts), Some(1));
    }

    #[test]
    fn rejects_index_gap() {
        let err = PriceSeries::new(
            "ABC",
            vec![
                make_bar(0, "2024-01-01 00:00", 100.0),
                make_bar(2, "2024-01-02 00:00", 101.0),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, SwingtraderError::InvalidSeries { .. }));
    }

    #[test]
    fn rejects_non_increasing_timestamps() {
        let err = PriceSeries::new(
            "ABC",
            vec![
                make_bar(0, "2024-01-02 00:00", 100.0),
                make_bar(1, "2024-01-02 00:00", 101.0),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, SwingtraderError::InvalidSeries { .. }));
    }

    #[test]
    fn indexed_renumbers_bars() {
        let series = PriceSeries::indexed(
            "ABC",
            vec![
                make_bar(7, "2024-01-01 00:00", 100.0),
                make_bar(9, "2024-01-02 00:00", 101.0),
            ],
        )
        .unwrap();
        assert_eq!(series.bars()[0].index, 0);
        assert_eq!(series.bars()[1].index, 1);
    }

    #[test]
    fn slice_keeps_original_indices() {
        let series = sample_series();
        let view = series.slice(1, 2).unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(view.first().unwrap().index, 1);
        assert_eq!(view.get(2).unwrap().close, 102.0);
        assert!(view.get(0).is_none());
    }

    #[test]
    fn slice_out_of_range() {
        let series = sample_series();
        assert!(matches!(
            series.slice(2, 9),
            Err(SwingtraderError::OutOfRange { .. })
        ));
        assert!(matches!(
            series.slice(3, 1),
            Err(SwingtraderError::OutOfRange { .. })
        ));
    }

    #[test]
    fn between_is_inclusive() {
        let series = sample_series();
        let start = NaiveDateTime::parse_from_str("2024-01-02 00:00", "%Y-%m-%d %H:%M").unwrap();
        let end = NaiveDateTime::parse_from_str("2024-01-03 00:00", "%Y-%m-%d %H:%M").unwrap();
        let view = series.between(start, end);
        assert_eq!(view.len(), 2);
        assert_eq!(view.first().unwrap().index, 1);
        assert_eq!(view.last().unwrap().index, 2);
    }

    #[test]
    fn between_empty_when_reversed() {
        let series = sample_series();
        let start = NaiveDateTime::parse_from_str("2024-01-03 00:00", "%Y-%m-%d %H:%M").unwrap();
        let end = NaiveDateTime::parse_from_str("2024-01-02 00:00", "%Y-%m-%d %H:%M").unwrap();
        assert!(series.between(start, end).is_empty());
    }

    #[test]
    fn day_and_dates() {
        let series = PriceSeries::indexed(
            "ABC",
            vec![
                make_bar(0, "2024-01-02 09:00", 1.0),
                make_bar(0, "2024-01-02 09:30", 1.0),
                make_bar(0, "2024-01-03 09:30", 1.0),
            ],
        )
        .unwrap();
        assert_eq!(
            series.dates(),
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
            ]
        );
        let day = series.day(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(day.len(), 2);
    }

    #[test]
    fn require_len() {
        let series = sample_series();
        assert!(series.require_len(4).is_ok());
        assert!(matches!(
            series.require_len(5),
            Err(SwingtraderError::InvalidSeries { .. })
        ));
    }

    #[test]
    fn attach_indicator_aligned_and_sliced() {
        let mut series = sample_series();
        let sma = calculate_sma(series.bars(), 2);
        series.attach_indicator(sma).unwrap();

        let column = series.indicator(IndicatorType::Sma(2)).unwrap();
        assert_eq!(column.value_at(1), Some(100.5));

        let view = series.slice(2, 3).unwrap();
        let sliced = view.indicator(IndicatorType::Sma(2)).unwrap();
        assert_eq!(sliced.len(), 2);
        assert_eq!(sliced.value_at(0), Some(101.5));
    }

    #[test]
    fn attach_indicator_rejects_misaligned() {
        let mut series = sample_series();
        let sma = calculate_sma(&series.bars()[..2], 2);
        assert!(matches!(
            series.attach_indicator(sma),
            Err(SwingtraderError::InvalidSeries { .. })
        ));
    }
}
