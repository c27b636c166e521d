//! Price data access port.

use crate::domain::error::SwingtraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::price_series::PriceSeries;
use chrono::NaiveDate;

fn no_bars(code: &str, exchange: &str, start_date: NaiveDate, end_date: NaiveDate) -> SwingtraderError {
    SwingtraderError::Data {
        reason: format!(
            "no bars for {}.{} between {} and {}",
            code, exchange, start_date, end_date
        ),
    }
}

pub trait DataPort {
    /// Bars for `code` whose date falls within `start_date..=end_date`, in
    /// time order. Bar indices are not meaningful until wrapped in a series.
    fn fetch_ohlcv(
        &self,
        code: &str,
        exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SwingtraderError>;

    /// `fetch_ohlcv` wrapped in an indexed [`PriceSeries`].
    fn fetch_series(
        &self,
        code: &str,
        exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, SwingtraderError> {
        let bars = self.fetch_ohlcv(code, exchange, start_date, end_date)?;
        if bars.is_empty() {
            return Err(no_bars(code, exchange, start_date, end_date));
        }
        PriceSeries::indexed(code, bars)
    }

    /// Like `fetch_series`, with up to `warmup_bars` bars from before
    /// `start_date` prepended. Fails when the window itself has no bars.
    fn fetch_series_with_warmup(
        &self,
        code: &str,
        exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        warmup_bars: usize,
    ) -> Result<PriceSeries, SwingtraderError> {
        let mut bars = self.fetch_ohlcv(code, exchange, NaiveDate::MIN, end_date)?;
        let first_in_window = bars.partition_point(|b| b.date() < start_date);
        if first_in_window == bars.len() {
            return Err(no_bars(code, exchange, start_date, end_date));
        }
        bars.drain(..first_in_window.saturating_sub(warmup_bars));
        PriceSeries::indexed(code, bars)
    }
}
