//! Revest CLI — end-of-day signal, stage, and backtest commands.
//!
//! Commands:
//! - `signal` — compute the next-open advice for an as-of date
//! - `stages` — print the confirmed stage of every analysis symbol
//! - `backtest` — replay the decision loop over a date window
//! - `demo` — backtest on a seeded synthetic market (no data files)

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use revest_core::backtest::{self, BacktestResult, BacktestSpec};
use revest_core::config::RevestConfig;
use revest_core::domain::{Bar, RawStage, StageLabel};
use revest_core::exits::PositionBook;
use revest_core::history::MarketHistory;
use revest_core::signal::{Advice, MarketView, SignalEngine, SignalReport};
use revest_core::stage::StageTracker;
use revest_core::synthetic;

#[derive(Parser)]
#[command(
    name = "revest",
    about = "Revest CLI — rule-based end-of-day asset-rotation engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the next-open advice for an as-of date.
    Signal {
        /// Bar CSV file (columns: symbol,date,open,high,low,close,volume).
        #[arg(long)]
        data: PathBuf,

        /// Optional TOML config file (missing sections use defaults).
        #[arg(long)]
        config: Option<PathBuf>,

        /// As-of date (YYYY-MM-DD). Defaults to the last benchmark date.
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Print the confirmed stage of every analysis symbol.
    Stages {
        /// Bar CSV file (columns: symbol,date,open,high,low,close,volume).
        #[arg(long)]
        data: PathBuf,

        /// Optional TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// As-of date (YYYY-MM-DD). Defaults to the last benchmark date.
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Replay the decision loop over a date window.
    Backtest {
        /// Bar CSV file (columns: symbol,date,open,high,low,close,volume).
        #[arg(long)]
        data: PathBuf,

        /// Optional TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Window start (YYYY-MM-DD). Defaults to the first benchmark date.
        #[arg(long)]
        start: Option<String>,

        /// Window end (YYYY-MM-DD). Defaults to the last benchmark date.
        #[arg(long)]
        end: Option<String>,

        /// Starting capital.
        #[arg(long, default_value_t = 100_000.0)]
        capital: f64,

        /// Output directory for trades.csv, equity.csv, summary.json.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Backtest on a seeded synthetic market (no data files needed).
    Demo {
        /// RNG seed; the same seed always produces the same market.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Number of synthetic trading days.
        #[arg(long, default_value_t = 750)]
        days: usize,

        /// Optional TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for artifacts. Omit to skip saving.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Signal {
            data,
            config,
            as_of,
        } => run_signal(&data, config.as_deref(), as_of.as_deref()),
        Commands::Stages {
            data,
            config,
            as_of,
        } => run_stages(&data, config.as_deref(), as_of.as_deref()),
        Commands::Backtest {
            data,
            config,
            start,
            end,
            capital,
            output_dir,
        } => run_backtest(
            &data,
            config.as_deref(),
            start.as_deref(),
            end.as_deref(),
            capital,
            &output_dir,
        ),
        Commands::Demo {
            seed,
            days,
            config,
            output_dir,
        } => run_demo(seed, days, config.as_deref(), output_dir.as_deref()),
    }
}

fn run_signal(data: &Path, config: Option<&Path>, as_of: Option<&str>) -> Result<()> {
    let cfg = load_config(config)?;
    let history = load_history(data)?;
    let as_of = resolve_as_of(&history, &cfg, as_of)?;

    let engine = SignalEngine::new(cfg);
    let book = PositionBook::new();
    let report = engine.compute_signal(&history, &book, None, as_of)?;

    print_report(&report);
    Ok(())
}

fn run_stages(data: &Path, config: Option<&Path>, as_of: Option<&str>) -> Result<()> {
    let cfg = load_config(config)?;
    let history = load_history(data)?;
    let as_of = resolve_as_of(&history, &cfg, as_of)?;

    // Replay the tracker over the benchmark calendar so the debounce state
    // matches a day-by-day run.
    let dates = history.trading_dates(&cfg.universe.benchmark, NaiveDate::MIN, as_of);
    if dates.is_empty() {
        bail!("no {} bars on or before {as_of}", cfg.universe.benchmark);
    }
    let mut tracker = StageTracker::new(&cfg.stage);
    let mut view = None;
    for date in dates {
        view = Some(MarketView::assemble(&history, &mut tracker, None, &cfg, date));
    }
    let view = view.unwrap();

    println!("Stages as of {}", view.date);
    println!("{:<8} {:<14} {:<14} {:>6}", "Symbol", "Raw", "Effective", "Days");
    println!("{}", "-".repeat(46));
    for (symbol, label) in &view.stages {
        println!(
            "{:<8} {:<14} {:<14} {:>6}",
            symbol,
            raw_name(label),
            effective_name(label),
            label.consecutive_days
        );
    }
    if let Some(vix) = &view.vix {
        println!();
        println!(
            "VIX: {:.2} ({:?}{})",
            vix.close,
            vix.regime,
            vix.trend
                .map(|t| format!(", {t:?}"))
                .unwrap_or_default()
        );
    }
    if !view.stale_symbols.is_empty() {
        println!("WARNING: stale bars for {}", view.stale_symbols.join(", "));
    }
    Ok(())
}

fn run_backtest(
    data: &Path,
    config: Option<&Path>,
    start: Option<&str>,
    end: Option<&str>,
    capital: f64,
    output_dir: &Path,
) -> Result<()> {
    let cfg = load_config(config)?;
    let history = load_history(data)?;

    let dates = history.trading_dates(&cfg.universe.benchmark, NaiveDate::MIN, NaiveDate::MAX);
    let (Some(first), Some(last)) = (dates.first().copied(), dates.last().copied()) else {
        bail!("no {} bars in {}", cfg.universe.benchmark, data.display());
    };
    let spec = BacktestSpec {
        start: start.map(parse_date).transpose()?.unwrap_or(first),
        end: end.map(parse_date).transpose()?.unwrap_or(last),
        initial_capital: capital,
    };

    let result = backtest::run(&history, &cfg, None, &spec)?;
    print_backtest(&result, &cfg.universe.benchmark);

    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_demo(
    seed: u64,
    days: usize,
    config: Option<&Path>,
    output_dir: Option<&Path>,
) -> Result<()> {
    let cfg = load_config(config)?;
    let history = synthetic::demo_history(seed, days);

    let dates = history.trading_dates(&cfg.universe.benchmark, NaiveDate::MIN, NaiveDate::MAX);
    if dates.is_empty() {
        bail!("--days {days} produced no trading days");
    }
    let warmup = cfg.indicators.max_lookback().min(dates.len() - 1);
    let spec = BacktestSpec {
        start: dates[warmup],
        end: *dates.last().unwrap(),
        initial_capital: 100_000.0,
    };

    let result = backtest::run(&history, &cfg, None, &spec)?;
    print_backtest(&result, &cfg.universe.benchmark);
    println!("NOTE: results based on SYNTHETIC data (seed {seed})");

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&result, dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

// ─── loading ───

fn load_config(path: Option<&Path>) -> Result<RevestConfig> {
    match path {
        Some(p) => Ok(RevestConfig::load(p)?),
        None => Ok(RevestConfig::default()),
    }
}

fn load_history(path: &Path) -> Result<MarketHistory> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut by_symbol: std::collections::BTreeMap<String, Vec<Bar>> =
        std::collections::BTreeMap::new();
    for (i, row) in reader.deserialize::<Bar>().enumerate() {
        let bar = row.with_context(|| format!("{}: row {}", path.display(), i + 2))?;
        by_symbol.entry(bar.symbol.clone()).or_default().push(bar);
    }
    if by_symbol.is_empty() {
        bail!("no bars in {}", path.display());
    }

    let mut history = MarketHistory::new();
    for (symbol, bars) in by_symbol {
        history.insert_bars(&symbol, bars);
    }
    Ok(history)
}

fn resolve_as_of(
    history: &MarketHistory,
    cfg: &RevestConfig,
    as_of: Option<&str>,
) -> Result<NaiveDate> {
    if let Some(s) = as_of {
        return parse_date(s);
    }
    history
        .trading_dates(&cfg.universe.benchmark, NaiveDate::MIN, NaiveDate::MAX)
        .last()
        .copied()
        .with_context(|| format!("no {} bars loaded", cfg.universe.benchmark))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("bad date '{s}'"))
}

// ─── output ───

fn print_report(report: &SignalReport) {
    println!("Signal for {}", report.date);
    println!();
    for line in &report.narrative {
        println!("  {line}");
    }
    println!();
    match &report.advice {
        Advice::Enter {
            symbol,
            underlying,
            direction,
            tier,
            strength,
            params,
            reference_price,
        } => {
            println!("ENTER {symbol} ({direction:?}, {tier:?}, {strength:?})");
            if underlying != symbol {
                println!("  underlying:   {underlying}");
            }
            println!("  reference:    {reference_price:.2}");
            println!("  initial stop: {:.2}", params.initial_stop);
            println!("  first target: {:.2}", params.first_target);
            println!(
                "  trail {:.1}% after {:.0}% scale-out",
                params.trailing_pct * 100.0,
                params.partial_exit_pct * 100.0
            );
        }
        Advice::ExitAll { reason, detail } => {
            println!("EXIT ALL ({reason:?}): {detail}");
        }
        Advice::ScaleOut { fraction, detail } => {
            println!("SCALE OUT {:.0}%: {detail}", fraction * 100.0);
        }
        Advice::RaiseStop { new_stop } => {
            println!("RAISE STOP to {new_stop:.2}");
        }
        Advice::Hold { symbol } => {
            println!("HOLD {symbol}");
        }
        Advice::Cash { reason } => {
            println!("STAY IN CASH: {reason}");
        }
    }
    if report.stale {
        println!();
        println!("WARNING: one or more symbols had stale bars for this date");
    }
}

fn print_backtest(result: &BacktestResult, benchmark: &str) {
    let s = &result.summary;
    println!();
    println!("=== Backtest Result ===");
    println!(
        "Period:          {} to {}",
        result.spec.start, result.spec.end
    );
    println!("Starting equity: {:.2}", result.spec.initial_capital);
    println!("Trades:          {}", s.trade_count);
    println!();
    println!("--- Performance ---");
    println!("Total Return:    {:.2}%", s.total_return_pct);
    println!(
        "{benchmark} Buy&Hold:   {:.2}%",
        result.benchmark_return_pct
    );
    println!("Max Drawdown:    {:.2}%", s.max_drawdown_pct);
    println!("Sharpe:          {:.3}", s.sharpe);
    println!("Win Rate:        {:.1}%", s.win_rate_pct);
    println!("Avg Win:         {:.2}%", s.avg_win_pct);
    println!("Avg Loss:        {:.2}%", s.avg_loss_pct);
    println!("Best Trade:      {:.2}%", s.best_trade_pct);
    println!("Worst Trade:     {:.2}%", s.worst_trade_pct);
    println!("Trades/Year:     {:.1}", s.trades_per_year);
    println!("Avg Hold Days:   {:.1}", s.avg_holding_days);
    println!("Median Hold:     {:.1}", s.median_holding_days);
    println!("Cash Days:       {:.1}%", s.cash_days_pct);
    println!();
    println!("Fingerprint:     {}", result.fingerprint);
}

/// Write trades.csv, equity.csv, state.csv, and summary.json under a run
/// directory named by the result fingerprint. Returns the run directory.
fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let short = &result.fingerprint[..12.min(result.fingerprint.len())];
    let run_dir = output_dir.join(format!("run-{short}"));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("creating {}", run_dir.display()))?;

    let mut trades = csv::Writer::from_path(run_dir.join("trades.csv"))?;
    for trade in &result.trades {
        trades.serialize(trade)?;
    }
    trades.flush()?;

    let mut equity = csv::Writer::from_path(run_dir.join("equity.csv"))?;
    for point in &result.equity_curve {
        equity.serialize(point)?;
    }
    equity.flush()?;

    let mut state = csv::Writer::from_path(run_dir.join("state.csv"))?;
    for day in &result.state_log {
        state.serialize(day)?;
    }
    state.flush()?;

    let summary = serde_json::json!({
        "spec": result.spec,
        "summary": result.summary,
        "benchmark_return_pct": result.benchmark_return_pct,
        "fingerprint": result.fingerprint,
    });
    std::fs::write(
        run_dir.join("summary.json"),
        serde_json::to_string_pretty(&summary)?,
    )?;

    Ok(run_dir)
}

fn raw_name(label: &StageLabel) -> String {
    match label.raw {
        RawStage::Stage(stage) => format!("{stage:?}"),
        RawStage::Transitional => "Transitional".to_string(),
    }
}

fn effective_name(label: &StageLabel) -> String {
    match label.effective {
        Some(stage) if label.confirmed => format!("{stage:?}"),
        Some(stage) => format!("{stage:?} (held)"),
        None => "-".to_string(),
    }
}
