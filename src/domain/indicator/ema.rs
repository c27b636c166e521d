//! Exponential Moving Average indicator.
//!
//! alpha = 2/(span+1). Bias-adjusted weighting over the whole history:
//! EMA[i] = sum((1-alpha)^j * C[i-j]) / sum((1-alpha)^j), j in 0..=i,
//! kept as a running numerator/denominator pair. Valid from the first bar.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_ema(bars: &[OhlcvBar], span: usize) -> IndicatorSeries {
    if span == 0 || bars.is_empty() {
        return IndicatorSeries {
            indicator_type: IndicatorType::Ema(span),
            values: Vec::new(),
        };
    }

    let mut values = Vec::with_capacity(bars.len());
    let decay = 1.0 - 2.0 / (span as f64 + 1.0);
    let mut numerator = 0.0;
    let mut denominator = 0.0;

    for bar in bars {
        numerator = bar.close + decay * numerator;
        denominator = 1.0 + decay * denominator;
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: numerator / denominator,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(span),
        values,
    }
}
