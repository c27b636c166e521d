//! CSV report adapter: one header row, one row per record.

use crate::domain::dip_and_rip::{DipAndRipTrade, ExitReason};
use crate::domain::error::SwingtraderError;
use crate::domain::ma_proximity::MaSetup;
use crate::domain::pivot::Pivot;
use crate::domain::trade::Outcome;
use crate::ports::report_port::{CodeTrades, ReportPort};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }
}

#[derive(Serialize)]
struct TradeRow<'a> {
    code: &'a str,
    entry_time: NaiveDateTime,
    exit_time: NaiveDateTime,
    entry_price: f64,
    exit_price: f64,
    shares: u64,
    pnl: f64,
    outcome: Outcome,
}

#[derive(Serialize)]
struct SetupRow {
    target: NaiveDateTime,
    lookback_high_time: NaiveDateTime,
    lookback_high: f64,
    line_start: Option<NaiveDateTime>,
    line_end: Option<NaiveDateTime>,
    slope: Option<f64>,
    intercept: Option<f64>,
    score: Option<usize>,
}

#[derive(Serialize)]
struct DipAndRipRow {
    date: NaiveDate,
    premarket_high: f64,
    premarket_high_time: NaiveDateTime,
    entry_time: NaiveDateTime,
    entry_price: f64,
    stop: f64,
    high_reached: f64,
    high_time: NaiveDateTime,
    exit_time: NaiveDateTime,
    exit_price: f64,
    exit_reason: ExitReason,
    shares: u64,
    pnl: f64,
    max_profit: f64,
    max_loss: f64,
    minutes_to_high: i64,
    minutes_to_exit: i64,
    outcome: Outcome,
}

fn report_error(path: &Path, e: impl std::fmt::Display) -> SwingtraderError {
    SwingtraderError::Report {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn write_rows<T: Serialize>(
    rows: impl IntoIterator<Item = T>,
    output_path: &Path,
) -> Result<(), SwingtraderError> {
    let mut writer = csv::Writer::from_path(output_path).map_err(|e| report_error(output_path, e))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| report_error(output_path, e))?;
    }
    writer.flush().map_err(|e| report_error(output_path, e))?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write_pivots(&self, pivots: &[Pivot], output_path: &Path) -> Result<(), SwingtraderError> {
        write_rows(pivots, output_path)
    }

    fn write_trades(
        &self,
        runs: &[CodeTrades],
        output_path: &Path,
    ) -> Result<(), SwingtraderError> {
        let rows = runs.iter().flat_map(|run| {
            run.trades.iter().map(move |t| TradeRow {
                code: &run.code,
                entry_time: t.entry_time,
                exit_time: t.exit_time,
                entry_price: t.entry_price,
                exit_price: t.exit_price,
                shares: t.shares,
                pnl: t.pnl,
                outcome: t.outcome,
            })
        });
        write_rows(rows, output_path)
    }

    fn write_setups(
        &self,
        setups: &[MaSetup],
        output_path: &Path,
    ) -> Result<(), SwingtraderError> {
        let rows = setups.iter().map(|s| SetupRow {
            target: s.target,
            lookback_high_time: s.lookback_high.timestamp,
            lookback_high: s.lookback_high.high,
            line_start: s.trendline.as_ref().map(|l| l.start.timestamp),
            line_end: s.trendline.as_ref().map(|l| l.end.timestamp),
            slope: s.trendline.as_ref().map(|l| l.slope),
            intercept: s.trendline.as_ref().map(|l| l.intercept),
            score: s.trendline.as_ref().map(|l| l.score),
        });
        write_rows(rows, output_path)
    }

    fn write_dip_and_rip(
        &self,
        trades: &[DipAndRipTrade],
        output_path: &Path,
    ) -> Result<(), SwingtraderError> {
        let rows = trades.iter().map(|d| DipAndRipRow {
            date: d.date,
            premarket_high: d.premarket_high,
            premarket_high_time: d.premarket_high_time,
            entry_time: d.trade.entry_time,
            entry_price: d.trade.entry_price,
            stop: d.stop,
            high_reached: d.high_reached,
            high_time: d.high_time,
            exit_time: d.trade.exit_time,
            exit_price: d.trade.exit_price,
            exit_reason: d.exit_reason,
            shares: d.trade.shares,
            pnl: d.trade.pnl,
            max_profit: d.max_profit,
            max_loss: d.max_loss,
            minutes_to_high: d.time_to_high.num_minutes(),
            minutes_to_exit: d.time_to_exit.num_minutes(),
            outcome: d.trade.outcome,
        });
        write_rows(rows, output_path)
    }
}
