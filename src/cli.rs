//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::csv_adapter::{CsvAdapter, read_quotes};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestRunner};
use crate::domain::catalog::MarketDataCatalog;
use crate::domain::config_validation::{
    backtest_data_dir, validate_backtest_config, validate_market_config, validate_parameter_space,
};
use crate::domain::criterion::{
    AverageProfitLoss, Criterion, FinishDeposit, MaximumDrawdown, NumberOfTrades, ProfitLossPips,
    ProfitableTradesRatio, RewardRiskRatio, TotalProfitLoss,
};
use crate::domain::error::QuantframeError;
use crate::domain::resolution::Resolution;
use crate::domain::scenario::{ScenarioResult, TradeScenario};
use crate::domain::strategies::rsi::{RsiParameter, RsiStrategy};

#[derive(Parser, Debug)]
#[command(name = "quantframe", about = "Multi-resolution market data and parametrized backtests")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the RSI strategy over every parameter combination
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding <SYMBOL>_<RES>.csv bar files; overrides [backtest] data_dir
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Replay a quote file and print the bars of one resolution
    Bars {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        quotes: PathBuf,
        #[arg(short, long)]
        symbol: String,
        #[arg(short, long)]
        resolution: Resolution,
    },
    /// Validate a configuration file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest { config, data_dir } => run_backtest(&config, data_dir),
        Command::Bars {
            config,
            quotes,
            symbol,
            resolution,
        } => run_bars(&config, &quotes, &symbol, resolution),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, QuantframeError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

fn run_backtest(config_path: &Path, data_dir: Option<PathBuf>) -> Result<(), QuantframeError> {
    let adapter = load_config(config_path)?;
    let market = validate_market_config(&adapter)?;
    let backtest = validate_backtest_config(&adapter)?;
    let space = validate_parameter_space::<RsiParameter>(&adapter)?;

    let data_dir = data_dir
        .or_else(|| backtest_data_dir(&adapter))
        .ok_or_else(|| QuantframeError::ConfigMissing {
            section: "backtest".to_string(),
            key: "data_dir".to_string(),
        })?;
    let history = CsvAdapter::new(data_dir);

    let resolution = market.base().resolution;
    let runner = BacktestRunner::new(&history, backtest.clone());
    let results = runner.run_space(
        &space,
        RsiStrategy::recipe(resolution, backtest.amount),
        backtest.from,
        backtest.window,
    );

    for result in &results {
        print_result(result, &backtest);
    }

    let failed = results.iter().filter(|r| r.outcome.is_err()).count();
    info!(scenarios = results.len(), failed, "backtest run complete");
    if failed == results.len() {
        if let Some(Err(e)) = results.into_iter().next().map(|r| r.outcome) {
            return Err(e);
        }
    }
    Ok(())
}

fn print_result(result: &ScenarioResult<RsiParameter>, config: &BacktestConfig) {
    match &result.outcome {
        Ok(scenario) => print_scenario(scenario, config),
        Err(e) => {
            println!("== [{}]", result.parameters);
            println!("failed: {}", e);
            println!();
        }
    }
}

fn print_scenario(scenario: &TradeScenario<RsiParameter>, config: &BacktestConfig) {
    println!("== {} [{}]", scenario.strategy, scenario.parameters);
    println!(
        "window: {} .. {} ({} bars)",
        scenario.from,
        scenario.to,
        scenario.bar_count()
    );

    let criteria: [&dyn Criterion<RsiParameter>; 4] = [
        &TotalProfitLoss,
        &AverageProfitLoss,
        &NumberOfTrades,
        &ProfitLossPips { pip: config.pip },
    ];
    for criterion in criteria {
        println!("{}: {:.2}", criterion.name(), criterion.calculate(scenario));
    }
    let winning = ProfitableTradesRatio;
    println!(
        "{}: {:.2}%",
        Criterion::<RsiParameter>::name(&winning),
        winning.calculate(scenario) * 100.0
    );
    let deposit = FinishDeposit {
        deposit: config.deposit,
        pip: config.pip,
    };
    println!(
        "{}: {:.2}",
        Criterion::<RsiParameter>::name(&deposit),
        deposit.calculate(scenario)
    );
    let drawdown = MaximumDrawdown {
        deposit: config.deposit,
        pip: config.pip,
    };
    println!(
        "{}: {:.2}%",
        Criterion::<RsiParameter>::name(&drawdown),
        drawdown.calculate(scenario) * 100.0
    );
    let reward_risk = RewardRiskRatio {
        deposit: config.deposit,
        pip: config.pip,
    };
    println!(
        "{}: {:.4}",
        Criterion::<RsiParameter>::name(&reward_risk),
        reward_risk.calculate(scenario)
    );

    for (i, trade) in scenario.trades().iter().enumerate() {
        println!(
            "trade {}: enter #{} @ {:.5}, exit #{} @ {:.5}, p/l {:.2}",
            i + 1,
            trade.entry.index,
            trade.entry.price,
            trade.exit.index,
            trade.exit.price,
            trade.profit()
        );
    }
    if let Some(open) = scenario.record.current_entry() {
        println!("open: enter #{} @ {:.5}", open.index, open.price);
    }
    println!();
}

fn run_bars(
    config_path: &Path,
    quotes_path: &Path,
    symbol: &str,
    resolution: Resolution,
) -> Result<(), QuantframeError> {
    let adapter = load_config(config_path)?;
    let mut catalog = MarketDataCatalog::new(&validate_market_config(&adapter)?);
    // fail before reading quotes if the series does not exist
    catalog.series_for(symbol, resolution)?;

    let quotes = read_quotes(quotes_path)?;
    let mut skipped = 0usize;
    for quote in &quotes {
        match catalog.on(quote) {
            Ok(()) => {}
            Err(e @ QuantframeError::OutOfOrderUpdate { .. }) => {
                warn!(error = %e, "skipping quote");
                skipped += 1;
            }
            Err(e @ QuantframeError::UnknownInstrument { .. }) => {
                warn!(error = %e, "skipping quote");
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    info!(quotes = quotes.len(), skipped, "quotes replayed");

    let view = catalog.series_for(symbol, resolution)?;
    let (Some(first), Some(end)) = (view.first_index(), view.end_index()) else {
        println!("no bars for {} {}", symbol, resolution);
        return Ok(());
    };
    println!("index,begin,open,high,low,close,ask_close,volume");
    for index in first..=end {
        let bar = view.bar(index)?;
        let begin = bar
            .begin
            .map_or_else(|| "NaN".to_string(), |t| t.to_rfc3339());
        println!(
            "{},{},{},{},{},{},{},{}",
            index,
            begin,
            bar.open(),
            bar.high(),
            bar.low(),
            bar.close(),
            bar.ask.close,
            bar.volume
        );
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), QuantframeError> {
    let adapter = load_config(config_path)?;
    let market = validate_market_config(&adapter)?;
    let backtest = validate_backtest_config(&adapter)?;
    let space = validate_parameter_space::<RsiParameter>(&adapter)?;

    println!("config OK");
    println!(
        "market: {} symbol(s), base {}",
        market.symbols().len(),
        market.base().resolution
    );
    println!("window: {} + {} minutes", backtest.from, backtest.window.num_minutes());
    println!("parameter combinations: {}", space.len());
    Ok(())
}
