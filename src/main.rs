#![allow(dead_code)]

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::{
    config::{ApiConfig, Config},
    constants::{files, model, training, TICKERS},
    models::TrainingConfig,
};

mod autodiff;
mod charts;
mod config;
mod constants;
mod data;
mod features;
mod models;
mod pipeline;
mod report;
mod types;
mod utils;

#[derive(Parser)]
#[command(name = "clairvoyant")]
#[command(about = "Ranks symbols by spectral entropy and reconstructs their closing prices", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct Settings {
    /// Finnhub API token
    #[arg(short, long, env = "KEY", default_value = "", hide_env_values = true, global = true)]
    key: String,

    #[arg(long, default_value = files::SNAPSHOT_PATH, global = true)]
    snapshot: String,

    #[arg(long, default_value = files::CHART_PATH, global = true)]
    chart: String,

    /// Folder the training losses are written to
    #[arg(long, default_value = files::TRAINING_PATH, global = true)]
    training_dir: String,

    /// Prices per symbol, longer series are trimmed and shorter ones skipped
    #[arg(short, long, default_value_t = model::WINDOW, global = true)]
    window: usize,

    #[arg(short, long, default_value_t = training::ITERATIONS, global = true)]
    iterations: usize,

    #[arg(long, default_value_t = training::ALPHA, global = true)]
    alpha: f32,

    #[arg(long, default_value_t = training::ETA, global = true)]
    eta: f32,

    #[arg(long, default_value_t = training::SEED, global = true)]
    seed: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Download every US symbol's closes into the snapshot
    Fetch,
    /// Rank the snapshot's symbols by entropy
    Rank,
    /// Train the price model on live prices
    Train {
        #[arg(short, long, value_delimiter = ',')]
        symbols: Option<Vec<String>>,
    },
    /// Rank the snapshot and train the price model on it
    Run,
}

impl From<Settings> for Config {
    fn from(settings: Settings) -> Self {
        Config {
            window: settings.window,
            training: TrainingConfig {
                iterations: settings.iterations,
                alpha: settings.alpha,
                eta: settings.eta,
                loss_threshold: training::LOSS_THRESHOLD,
                seed: settings.seed,
                record_dir: Some(settings.training_dir),
            },
            snapshot_path: settings.snapshot,
            chart_path: settings.chart,
            api: ApiConfig::new(settings.key),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("{}", "Start".green());

    let cli = Cli::parse();
    let config = Config::from(cli.settings);

    match cli.command {
        Some(Commands::Fetch) => {
            pipeline::fetch(&config).await?;
        }
        Some(Commands::Train { symbols }) => {
            let symbols = symbols
                .unwrap_or_else(|| TICKERS.iter().map(|ticker| ticker.to_string()).collect());
            pipeline::train_live(&config, &symbols).await?;
        }
        Some(Commands::Run) => {
            pipeline::run(&config)?;
        }
        Some(Commands::Rank) | None => {
            pipeline::rank(&config)?;
        }
    }

    println!("{}", "End".green());
    Ok(())
}
