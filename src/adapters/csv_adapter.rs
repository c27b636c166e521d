//! CSV file data adapter.
//!
//! One file per instrument, `{base}/{CODE}_{EXCHANGE}.csv`, with columns
//! `date,open,high,low,close,volume`. Daily files carry plain dates;
//! intraday files carry `YYYY-MM-DD HH:MM[:SS]`.

use crate::domain::error::SwingtraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str, exchange: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", code, exchange))
    }
}

fn data_error(reason: impl Into<String>) -> SwingtraderError {
    SwingtraderError::Data {
        reason: reason.into(),
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, SwingtraderError> {
    let raw = raw.trim();
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| data_error(format!("invalid date '{}'", raw)))
}

fn field<T>(record: &csv::StringRecord, idx: usize, name: &str) -> Result<T, SwingtraderError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    record
        .get(idx)
        .ok_or_else(|| data_error(format!("missing {} column", name)))?
        .trim()
        .parse()
        .map_err(|e| data_error(format!("invalid {} value: {}", name, e)))
}

fn volume(record: &csv::StringRecord) -> Result<u64, SwingtraderError> {
    // some exports write volume as a float
    field::<u64>(record, 5, "volume").or_else(|_| {
        let v: f64 = field(record, 5, "volume")?;
        if v < 0.0 {
            return Err(data_error(format!("negative volume {}", v)));
        }
        Ok(v as u64)
    })
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        code: &str,
        exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SwingtraderError> {
        let path = self.csv_path(code, exchange);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {}", e)))?;

            let timestamp = parse_timestamp(
                record
                    .get(0)
                    .ok_or_else(|| data_error("missing date column"))?,
            )?;
            let date = timestamp.date();
            if date < start_date || date > end_date {
                continue;
            }

            bars.push(OhlcvBar {
                index: 0,
                timestamp,
                open: field(&record, 1, "open")?,
                high: field(&record, 2, "high")?,
                low: field(&record, 3, "low")?,
                close: field(&record, 4, "close")?,
                volume: volume(&record)?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        for (i, bar) in bars.iter_mut().enumerate() {
            bar.index = i;
        }
        Ok(bars)
    }
}
