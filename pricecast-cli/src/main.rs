//! PriceCast CLI — headless forecast reports and configuration commands.
//!
//! Commands:
//! - `report` — run the full pipeline for one ticker and print the report
//! - `tickers` — list the configured ticker set
//! - `config` — print the effective configuration as TOML

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use pricecast_core::domain::Ticker;
use pricecast_runner::{
    init_logging, run_pipeline, LoggingConfig, PricecastConfig, DEFAULT_CONFIG_FILE,
};

#[derive(Parser)]
#[command(
    name = "pricecast",
    about = "PriceCast CLI — stock price forecasts from the avg_last_price table"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to ./pricecast.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the forecast pipeline for one ticker and print the report.
    Report {
        /// Ticker symbol (e.g., AAPL).
        #[arg(long)]
        ticker: String,

        /// Print the report as JSON instead of Markdown.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Number of most recent history rows in the Markdown report.
        #[arg(long, default_value_t = 10)]
        history_rows: usize,
    },
    /// List the configured tickers.
    Tickers,
    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(LoggingConfig::from_env())?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Report {
            ticker,
            json,
            history_rows,
        } => run_report(&config, &ticker, json, history_rows),
        Commands::Tickers => {
            for ticker in &config.tickers {
                println!("{ticker}");
            }
            Ok(())
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

/// An explicit `--config` must exist; the default file is optional.
fn load_config(path: Option<&Path>) -> Result<PricecastConfig> {
    match path {
        Some(p) => PricecastConfig::from_file(p)
            .with_context(|| format!("loading config {}", p.display())),
        None => PricecastConfig::load_or_default(Path::new(DEFAULT_CONFIG_FILE))
            .with_context(|| format!("loading config {DEFAULT_CONFIG_FILE}")),
    }
}

fn run_report(config: &PricecastConfig, ticker: &str, json: bool, history_rows: usize) -> Result<()> {
    let ticker: Ticker = ticker
        .parse()
        .with_context(|| format!("invalid ticker '{ticker}'"))?;
    if !config.tickers.contains(&ticker) {
        info!(%ticker, "ticker is not in the configured set, querying it anyway");
    }

    let warehouse = config.warehouse.build();
    match run_pipeline(config, warehouse.as_ref(), &ticker) {
        Ok(report) => {
            if json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report.to_markdown(history_rows));
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
