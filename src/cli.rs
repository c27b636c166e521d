//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{
    self, parse_codes, parse_date, parse_time, validate_all,
    validate_dip_and_rip_config, validate_ema_crossover_config, validate_ma_proximity_config,
    validate_run_config, validate_trendline_config,
};
use crate::domain::dip_and_rip::{
    self, DailySessionSplit, DipAndRipConfig, DipAndRipTrade, DEFAULT_MIN_VOLUME,
};
use crate::domain::ema_crossover::{run_ema_crossover_from, EmaCrossoverConfig};
use crate::domain::error::SwingtraderError;
use crate::domain::indicator::IndicatorType;
use crate::domain::ma_proximity::{self, MaProximityConfig, MaSetup};
use crate::domain::metrics::TradeStats;
use crate::domain::pivot::{detect_pivots, PivotKind};
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::annotate;
use crate::domain::trade::PositionSizing;
use crate::domain::trendline::{TrendlineFitter, DEFAULT_MARGIN_OF_ERROR};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::{CodeTrades, ReportPort};

#[derive(Parser, Debug)]
#[command(name = "swingtrader", about = "Pivot, trendline and swing-trade backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List support and resistance pivots
    Pivots {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fit the best trendline through one kind of pivot
    Trendline {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
        /// support or resistance
        #[arg(long, default_value = "support")]
        kind: PivotKind,
    },
    /// Run the EMA crossover backtest
    EmaBacktest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Find MA-proximity setups and their trendlines
    MaSetup {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
        /// Evaluate a single date instead of scanning
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the intraday Dip-and-Rip backtest
    DipAndRip {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
        /// Trade a single day instead of the high-volume days
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Pivots {
            config,
            code,
            output,
        } => run_pivots(&config, code.as_deref(), output.as_deref()),
        Command::Trendline { config, code, kind } => {
            run_trendline(&config, code.as_deref(), kind)
        }
        Command::EmaBacktest {
            config,
            code,
            output,
        } => run_ema_backtest(&config, code.as_deref(), output.as_deref()),
        Command::MaSetup {
            config,
            code,
            date,
            output,
        } => run_ma_setup(&config, code.as_deref(), date, output.as_deref()),
        Command::DipAndRip {
            config,
            code,
            date,
            output,
        } => run_dip_and_rip(&config, code.as_deref(), date, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SwingtraderError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// Everything a data-driven subcommand needs once its config has loaded.
struct RunContext {
    config: FileConfigAdapter,
    data: CsvAdapter,
    exchange: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl RunContext {
    fn fetch(&self, code: &str) -> Result<PriceSeries, SwingtraderError> {
        self.data
            .fetch_series(code, &self.exchange, self.start_date, self.end_date)
    }

    fn fetch_with_warmup(&self, code: &str, warmup_bars: usize) -> Result<PriceSeries, SwingtraderError> {
        self.data.fetch_series_with_warmup(
            code,
            &self.exchange,
            self.start_date,
            self.end_date,
            warmup_bars,
        )
    }
}

fn prepare(
    config_path: &Path,
    validate: fn(&dyn ConfigPort) -> Result<(), SwingtraderError>,
) -> Result<RunContext, SwingtraderError> {
    let config = load_config(config_path)?;
    validate_run_config(&config)?;
    validate(&config)?;

    let (start_date, end_date) = build_date_range(&config)?;
    let data_path = required(&config, "data", "path")?;
    let exchange = required(&config, "data", "exchange")?;

    Ok(RunContext {
        data: CsvAdapter::new(PathBuf::from(data_path)),
        config,
        exchange,
        start_date,
        end_date,
    })
}

fn no_extra_checks(_: &dyn ConfigPort) -> Result<(), SwingtraderError> {
    Ok(())
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, SwingtraderError> {
    config
        .get_string(section, key)
        .ok_or_else(|| SwingtraderError::ConfigMissing {
            section: section.into(),
            key: key.into(),
        })
}

fn optional_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, SwingtraderError> {
    config
        .get_string(section, key)
        .map(|raw| parse_date(section, key, &raw))
        .transpose()
}

pub fn build_date_range(config: &dyn ConfigPort) -> Result<(NaiveDate, NaiveDate), SwingtraderError> {
    let start = optional_date(config, "backtest", "start_date")?.unwrap_or(NaiveDate::MIN);
    let end = optional_date(config, "backtest", "end_date")?.unwrap_or(NaiveDate::MAX);
    Ok((start, end))
}

/// `--code` wins over `[backtest] codes`, which wins over `[backtest] code`.
pub fn resolve_codes(
    code_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, SwingtraderError> {
    let raw = code_override
        .map(str::to_string)
        .or_else(|| config.get_string("backtest", "codes"))
        .or_else(|| config.get_string("backtest", "code"))
        .ok_or_else(|| SwingtraderError::ConfigMissing {
            section: "backtest".into(),
            key: "code".into(),
        })?;
    parse_codes(&raw)
}

fn first_code(code_override: Option<&str>, config: &dyn ConfigPort) -> Result<String, SwingtraderError> {
    let codes = resolve_codes(code_override, config)?;
    if codes.len() > 1 {
        eprintln!("warning: using {} of {} configured codes", codes[0], codes.len());
    }
    codes
        .into_iter()
        .next()
        .ok_or_else(|| SwingtraderError::ConfigMissing {
            section: "backtest".into(),
            key: "code".into(),
        })
}

pub fn build_sizing(config: &dyn ConfigPort) -> PositionSizing {
    let share_count = config.get_int("backtest", "share_count", 0).max(0) as u64;
    PositionSizing::from_config(
        config.get_double("backtest", "money_to_spend", 10_000.0),
        share_count,
    )
}

pub fn build_ema_config(config: &dyn ConfigPort) -> EmaCrossoverConfig {
    let defaults = EmaCrossoverConfig::default();
    EmaCrossoverConfig {
        short_span: config.get_int("ema_crossover", "short_span", defaults.short_span as i64) as usize,
        long_span: config.get_int("ema_crossover", "long_span", defaults.long_span as i64) as usize,
        sizing: build_sizing(config),
    }
}

pub fn build_fitter(config: &dyn ConfigPort, defaults: TrendlineFitter) -> TrendlineFitter {
    TrendlineFitter::new(
        config.get_double("trendline", "margin_of_error", defaults.margin_of_error),
        config.get_bool("trendline", "reverse", defaults.reverse),
    )
}

pub fn build_ma_config(config: &dyn ConfigPort) -> Result<MaProximityConfig, SwingtraderError> {
    let defaults = MaProximityConfig::default();
    let line_kind = match config.get_string("ma_proximity", "line_kind") {
        Some(raw) => raw
            .parse::<PivotKind>()
            .map_err(|reason| SwingtraderError::ConfigInvalid {
                section: "ma_proximity".into(),
                key: "line_kind".into(),
                reason,
            })?,
        None => defaults.line_kind,
    };
    Ok(MaProximityConfig {
        window: config.get_int("ma_proximity", "window", defaults.window as i64) as usize,
        percent_diff: config.get_double("ma_proximity", "percent_diff", defaults.percent_diff),
        lookback: config.get_int("ma_proximity", "lookback", defaults.lookback as i64) as usize,
        line_kind,
        fitter: build_fitter(config, defaults.fitter),
    })
}

pub fn build_dip_and_rip_config(config: &dyn ConfigPort) -> Result<DipAndRipConfig, SwingtraderError> {
    let defaults = DipAndRipConfig::default();
    let exit_cutoff = match config.get_string("dip_and_rip", "exit_time") {
        Some(raw) => parse_time("dip_and_rip", "exit_time", &raw)?,
        None => defaults.exit_cutoff,
    };
    Ok(DipAndRipConfig {
        exit_cutoff,
        sizing: build_sizing(config),
    })
}

pub fn run_pivots(
    config_path: &Path,
    code_override: Option<&str>,
    output_path: Option<&Path>,
) -> Result<(), SwingtraderError> {
    let ctx = prepare(config_path, no_extra_checks)?;
    let code = first_code(code_override, &ctx.config)?;
    let series = ctx.fetch(&code)?;
    eprintln!("Detecting pivots: {} ({} bars)", code, series.len());

    let pivots = detect_pivots(&series)?.merged();
    eprintln!("  {} pivots", pivots.len());

    match output_path {
        Some(path) => {
            CsvReportAdapter::new().write_pivots(&pivots, path)?;
            eprintln!("Report written to: {}", path.display());
        }
        None => {
            for p in &pivots {
                println!("{}\t{}\t{:.4}\t{}", p.index, p.timestamp, p.price, p.kind);
            }
        }
    }
    Ok(())
}

pub fn run_trendline(
    config_path: &Path,
    code_override: Option<&str>,
    kind: PivotKind,
) -> Result<(), SwingtraderError> {
    let ctx = prepare(config_path, validate_trendline_config)?;
    let code = first_code(code_override, &ctx.config)?;
    let series = ctx.fetch(&code)?;
    let fitter = build_fitter(
        &ctx.config,
        TrendlineFitter::new(DEFAULT_MARGIN_OF_ERROR, kind == PivotKind::Resistance),
    );
    eprintln!(
        "Fitting {} trendline: {} ({} bars, margin {})",
        kind,
        code,
        series.len(),
        fitter.margin_of_error
    );

    let pivots = detect_pivots(&series)?;
    match fitter.fit(pivots.of_kind(kind))? {
        Some(line) => {
            println!(
                "{} {} -> {} slope={:.6} intercept={:.4} score={}",
                kind, line.start.timestamp, line.end.timestamp, line.slope, line.intercept, line.score
            );
            for p in &line.pivots {
                println!("  {}\t{:.4}", p.timestamp, p.price);
            }
        }
        None => eprintln!("No trendline found for {}", code),
    }
    Ok(())
}

pub fn run_ema_backtest(
    config_path: &Path,
    code_override: Option<&str>,
    output_path: Option<&Path>,
) -> Result<(), SwingtraderError> {
    let ctx = prepare(config_path, validate_ema_crossover_config)?;
    let codes = resolve_codes(code_override, &ctx.config)?;
    let ema_config = build_ema_config(&ctx.config);

    eprintln!(
        "Running EMA({}) / EMA({}) crossover: {} codes on {}",
        ema_config.short_span,
        ema_config.long_span,
        codes.len(),
        ctx.exchange
    );

    let runs = run_ema_pipeline(
        &ctx.data,
        &ctx.exchange,
        (ctx.start_date, ctx.end_date),
        &codes,
        &ema_config,
    )?;

    eprintln!("\n=== Per-Code Summary ===");
    for run in &runs {
        print_summary(&run.code, &TradeStats::compute(&run.trades));
    }
    if runs.len() > 1 {
        let all: Vec<_> = runs.iter().flat_map(|r| r.trades.iter().cloned()).collect();
        print_summary("ALL", &TradeStats::compute(&all));
    }

    if let Some(path) = output_path {
        CsvReportAdapter::new().write_trades(&runs, path)?;
        eprintln!("\nReport written to: {}", path.display());
    }
    Ok(())
}

/// Backtest each code in turn. Each fetch reaches `lookback()` bars before
/// `start_date` to warm up the EMAs; trades open only inside the window.
/// Codes without usable data are skipped with a warning; an empty result is
/// an error.
pub fn run_ema_pipeline(
    data_port: &dyn DataPort,
    exchange: &str,
    (start_date, end_date): (NaiveDate, NaiveDate),
    codes: &[String],
    ema_config: &EmaCrossoverConfig,
) -> Result<Vec<CodeTrades>, SwingtraderError> {
    let mut runs: Vec<CodeTrades> = Vec::with_capacity(codes.len());
    for code in codes {
        let mut series = match data_port.fetch_series_with_warmup(
            code,
            exchange,
            start_date,
            end_date,
            ema_config.lookback(),
        ) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("warning: skipping {} ({})", code, e);
                continue;
            }
        };
        annotate(
            &mut series,
            &[
                IndicatorType::Ema(ema_config.short_span),
                IndicatorType::Ema(ema_config.long_span),
            ],
        )?;
        match run_ema_crossover_from(&series, ema_config, start_date) {
            Ok(trades) => runs.push(CodeTrades {
                code: code.clone(),
                trades,
            }),
            Err(e) => eprintln!("warning: skipping {} ({})", code, e),
        }
    }

    if runs.is_empty() {
        return Err(SwingtraderError::invalid_series(
            "no valid codes with data to backtest",
        ));
    }
    Ok(runs)
}

fn print_summary(code: &str, stats: &TradeStats) {
    let pnl_sign = if stats.total_pnl >= 0.0 { "+" } else { "" };
    eprintln!(
        "  {}:  {} trades, {:.1}% win rate, {}${:.2}, profit factor {:.2}",
        code,
        stats.trades,
        stats.win_rate * 100.0,
        pnl_sign,
        stats.total_pnl,
        stats.profit_factor,
    );
}

pub fn run_ma_setup(
    config_path: &Path,
    code_override: Option<&str>,
    date_override: Option<NaiveDate>,
    output_path: Option<&Path>,
) -> Result<(), SwingtraderError> {
    let ctx = prepare(config_path, validate_ma_proximity_config)?;
    let code = first_code(code_override, &ctx.config)?;
    let ma_config = build_ma_config(&ctx.config)?;
    let mut series = ctx.fetch_with_warmup(&code, ma_config.warmup_bars())?;
    annotate(&mut series, &[IndicatorType::Sma(ma_config.window)])?;

    let date = match date_override {
        Some(d) => Some(d),
        None => optional_date(&ctx.config, "ma_proximity", "date")?,
    };

    let setups: Vec<MaSetup> = match date {
        Some(d) => {
            let target = series
                .day(d)
                .first()
                .map(|bar| bar.timestamp)
                .ok_or_else(|| {
                    SwingtraderError::out_of_range(format!("{} has no bar on {}", code, d))
                })?;
            eprintln!("Evaluating {} setup on {}", code, d);
            vec![ma_proximity::setup(&series, target, &ma_config)?]
        }
        None => {
            eprintln!(
                "Scanning {} for closes within {} of SMA({})",
                code, ma_config.percent_diff, ma_config.window
            );
            ma_proximity::scan_from(&series, &ma_config, ctx.start_date)?
        }
    };

    eprintln!("  {} setups", setups.len());
    match output_path {
        Some(path) => {
            CsvReportAdapter::new().write_setups(&setups, path)?;
            eprintln!("Report written to: {}", path.display());
        }
        None => {
            for s in &setups {
                match &s.trendline {
                    Some(line) => println!(
                        "{}\thigh {:.4} @ {}\t{} -> {} slope={:.6} score={}",
                        s.target,
                        s.lookback_high.high,
                        s.lookback_high.timestamp,
                        line.start.timestamp,
                        line.end.timestamp,
                        line.slope,
                        line.score
                    ),
                    None => println!(
                        "{}\thigh {:.4} @ {}\tno trendline",
                        s.target, s.lookback_high.high, s.lookback_high.timestamp
                    ),
                }
            }
        }
    }
    Ok(())
}

pub fn run_dip_and_rip(
    config_path: &Path,
    code_override: Option<&str>,
    date_override: Option<NaiveDate>,
    output_path: Option<&Path>,
) -> Result<(), SwingtraderError> {
    let ctx = prepare(config_path, validate_dip_and_rip_config)?;
    let code = first_code(code_override, &ctx.config)?;
    let dr_config = build_dip_and_rip_config(&ctx.config)?;
    let series = ctx.fetch(&code)?;

    let date = match date_override {
        Some(d) => Some(d),
        None => optional_date(&ctx.config, "dip_and_rip", "date")?,
    };

    let days = match date {
        Some(d) => vec![d],
        None => {
            let min_volume = ctx
                .config
                .get_int("dip_and_rip", "min_volume", DEFAULT_MIN_VOLUME as i64)
                .max(0) as u64;
            let mut days =
                dip_and_rip::high_volume_days(&dip_and_rip::daily_bars(&series)?, min_volume);
            days.sort();
            eprintln!("{} days above {} shares", days.len(), min_volume);
            days
        }
    };

    let mut trades: Vec<DipAndRipTrade> = Vec::new();
    for day in days {
        let split = DailySessionSplit::for_day(&series, day);
        match dip_and_rip::run_dip_and_rip(&split, &dr_config) {
            Ok(Some(trade)) => trades.push(trade),
            Ok(None) => eprintln!("  {}: no entry", day),
            Err(e) if date.is_none() => eprintln!("warning: skipping {} ({})", day, e),
            Err(e) => return Err(e),
        }
    }

    let records: Vec<_> = trades.iter().map(|t| t.trade.clone()).collect();
    print_summary(&code, &TradeStats::compute(&records));

    match output_path {
        Some(path) => {
            CsvReportAdapter::new().write_dip_and_rip(&trades, path)?;
            eprintln!("Report written to: {}", path.display());
        }
        None => {
            for t in &trades {
                println!(
                    "{}\tentry {:.4} @ {}\texit {:.4} @ {} ({:?})\tpnl {:.2}",
                    t.date,
                    t.trade.entry_price,
                    t.trade.entry_time.time(),
                    t.trade.exit_price,
                    t.trade.exit_time.time(),
                    t.exit_reason,
                    t.trade.pnl
                );
            }
        }
    }
    Ok(())
}

pub fn run_validate(config_path: &Path) -> Result<(), SwingtraderError> {
    let config = load_config(config_path)?;
    validate_all(&config)?;

    let codes = resolve_codes(None, &config)?;
    let (start, end) = build_date_range(&config)?;
    eprintln!("\nUniverse:");
    eprintln!(
        "  exchange: {}",
        config.get_string("data", "exchange").unwrap_or_default()
    );
    eprintln!("  codes: {}", codes.join(", "));
    if start != NaiveDate::MIN || end != NaiveDate::MAX {
        eprintln!(
            "  window: {} to {}",
            start.format(config_validation::DATE_FORMAT),
            end.format(config_validation::DATE_FORMAT)
        );
    }
    eprintln!("\nConfiguration is valid.");
    Ok(())
}
