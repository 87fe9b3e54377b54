//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{
    parse_date, parse_fill_policy, parse_resolution, validate_backtest_config,
    validate_strategy_config, DEFAULT_INITIAL_CAPITAL, DEFAULT_RDV_PERIOD, DEFAULT_SMA_FAST,
    DEFAULT_SMA_SLOW,
};
use crate::domain::error::ReplayError;
use crate::domain::execution::ExecutionConfig;
use crate::domain::metrics::Metrics;
use crate::domain::resolution::Resolution;
use crate::domain::strategies::{RelativeVolume, SmaCross};
use crate::domain::strategy::Strategy;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "tickreplay", about = "Event-driven bar replay backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides `[backtest] data_dir`
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
    /// Validate a configuration file without running it
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols with CSV data at a resolution
    ListSymbols {
        #[arg(short, long)]
        data_dir: PathBuf,
        #[arg(short, long, default_value = "hour")]
        resolution: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest { config, data_dir } => run_backtest_command(&config, data_dir.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols {
            data_dir,
            resolution,
        } => run_list_symbols(&data_dir, &resolution),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ReplayError> {
    FileConfigAdapter::from_file(path)
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, ReplayError> {
    Ok(BacktestConfig {
        start: parse_date(adapter, "start_date")?,
        end: parse_date(adapter, "end_date")?,
        initial_capital: adapter.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL),
        resolution: parse_resolution(adapter)?,
        warmup: adapter.get_bool("backtest", "warmup", true),
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", 0.0),
        execution: ExecutionConfig {
            fill_policy: parse_fill_policy(adapter)?,
            commission_per_trade: adapter.get_double("execution", "commission_per_trade", 0.0),
            commission_pct: adapter.get_double("execution", "commission_pct", 0.0),
            slippage_pct: adapter.get_double("execution", "slippage_pct", 0.0),
            leverage: adapter.get_double("execution", "leverage", 1.0),
            allow_shorting: adapter.get_bool("execution", "allow_shorting", false),
        },
    })
}

pub fn build_strategy(adapter: &dyn ConfigPort) -> Result<Box<dyn Strategy>, ReplayError> {
    let kind = adapter.require_string("strategy", "kind")?;
    let symbol = adapter.require_string("strategy", "symbol")?;
    let target_weight = adapter.get_double("strategy", "target_weight", 1.0);
    let period = |key: &str, default: i64| -> usize {
        adapter.get_int("strategy", key, default).max(0) as usize
    };

    match kind.to_lowercase().as_str() {
        "relative_volume" => Ok(Box::new(RelativeVolume::new(
            &symbol,
            period("period", DEFAULT_RDV_PERIOD),
            target_weight,
        ))),
        "sma_cross" => Ok(Box::new(SmaCross::new(
            &symbol,
            period("fast", DEFAULT_SMA_FAST),
            period("slow", DEFAULT_SMA_SLOW),
            target_weight,
        ))),
        other => Err(ReplayError::ConfigInvalid {
            section: "strategy".into(),
            key: "kind".into(),
            reason: format!("unknown strategy '{other}'"),
        }),
    }
}

/// `--data-dir` wins over `[backtest] data_dir`.
pub fn resolve_data_dir(
    override_dir: Option<&Path>,
    adapter: &dyn ConfigPort,
) -> Result<PathBuf, ReplayError> {
    match override_dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => adapter
            .require_string("backtest", "data_dir")
            .map(PathBuf::from),
    }
}

fn run_backtest_command(config_path: &Path, data_dir: Option<&Path>) -> Result<(), ReplayError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter)?;
    validate_strategy_config(&adapter)?;

    let config = build_backtest_config(&adapter)?;
    let mut strategy = build_strategy(&adapter)?;
    let port = CsvAdapter::new(resolve_data_dir(data_dir, &adapter)?);

    let (result, metrics) = run_backtest_pipeline(&port, strategy.as_mut(), &config)?;
    print_summary(&result, &metrics, &config);
    Ok(())
}

/// Run and compute metrics.
pub fn run_backtest_pipeline(
    port: &dyn DataPort,
    strategy: &mut dyn Strategy,
    config: &BacktestConfig,
) -> Result<(BacktestResult, Metrics), ReplayError> {
    eprintln!(
        "Running backtest: {} from {} to {} ({})",
        strategy.name(),
        config.start,
        config.end,
        config.resolution
    );
    let result = run_backtest(port, strategy, config)?;
    let metrics = result.metrics(config);
    Ok((result, metrics))
}

fn print_summary(result: &BacktestResult, metrics: &Metrics, config: &BacktestConfig) {
    eprintln!("\n=== Results: {} ===", result.strategy);
    eprintln!("Ticks:            {}", result.ticks);
    eprintln!("Bars:             {}", result.bars_delivered);
    eprintln!(
        "Warm-up:          {}/{} bars, {}",
        result.warmup.bars_fed,
        result.warmup.required_bars,
        if result.warmup.all_ready {
            "ready"
        } else {
            "not ready"
        }
    );
    eprintln!("Initial Capital:  {:.2}", config.initial_capital);
    eprintln!("Final Value:      {:.2}", metrics.final_value);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", metrics.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    eprintln!(
        "Max Drawdown:     -{:.2}% over {} ticks",
        metrics.max_drawdown * 100.0,
        metrics.max_drawdown_duration
    );
    eprintln!("Realized P&L:     {:.2}", metrics.realized_pnl);
    eprintln!("Unrealized P&L:   {:.2}", metrics.unrealized_pnl);
    eprintln!("Commission:       {:.2}", metrics.total_commission);
    eprintln!(
        "Orders:           {} filled, {} rejected, {} canceled",
        metrics.orders_filled, metrics.orders_rejected, metrics.orders_canceled
    );

    if !result.portfolio.positions.is_empty() {
        eprintln!("\n=== Open Positions ===");
        for position in result.portfolio.positions.values() {
            eprintln!(
                "  {}: {} @ {:.2} (last {:.2})",
                position.symbol, position.quantity, position.avg_cost, position.last_price
            );
        }
    }
}

fn run_validate(config_path: &Path) -> Result<(), ReplayError> {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter)?;
    validate_strategy_config(&adapter)?;

    let config = build_backtest_config(&adapter)?;
    let strategy = build_strategy(&adapter)?;

    eprintln!("\nBacktest:");
    eprintln!("  window:     {} -> {}", config.start, config.end);
    eprintln!("  resolution: {}", config.resolution);
    eprintln!("  warm-up:    {}", config.warmup);
    eprintln!("  fill:       {}", config.execution.fill_policy);
    eprintln!("\nStrategy: {}", strategy.name());
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_list_symbols(data_dir: &Path, resolution: &str) -> Result<(), ReplayError> {
    let resolution: Resolution = resolution
        .parse()
        .map_err(|reason| ReplayError::ConfigInvalid {
            section: "cli".into(),
            key: "resolution".into(),
            reason,
        })?;
    let symbols = CsvAdapter::new(data_dir).list_symbols(resolution)?;

    if symbols.is_empty() {
        eprintln!("No {} data found in {}", resolution, data_dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}
