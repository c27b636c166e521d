//! Core domain types and logic.

pub mod ohlcv;
pub mod price_series;
pub mod indicator;
pub mod signal;
pub mod pivot;
pub mod trendline;
pub mod trade;
pub mod ema_crossover;
pub mod ma_proximity;
pub mod dip_and_rip;
pub mod metrics;
pub mod config_validation;
pub mod error;
