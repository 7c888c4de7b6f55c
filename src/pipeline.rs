use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;

use crate::{
    charts::loss_chart,
    config::Config,
    data::{finnhub::FinnhubClient, prepare_windows, snapshot},
    models::{rank as rank_windows, PriceModel},
    report::{print_predictions, print_ranking},
    types::{Score, SymbolRecord, SymbolWindow},
    utils::dense_complex_gigabytes,
};

fn client(config: &Config) -> Result<FinnhubClient> {
    if config.api.key.is_empty() {
        bail!("an API key is required, pass --key or set KEY");
    }

    Ok(FinnhubClient::new(config.api.clone())?)
}

/// Downloads the exchange's symbol directory and every symbol's closes into the snapshot.
pub async fn fetch(config: &Config) -> Result<Vec<SymbolRecord>> {
    let client = client(config)?;
    let mut records = client
        .symbols()
        .await
        .context("failed to fetch the symbol directory")?;

    let pacing = client.pacing();
    let days = (records.len() as f64 * pacing.as_secs_f64()) / 86_400.;
    println!(
        "{} symbols, {:.3} GiB dense, {:.3} days to fetch",
        records.len(),
        dense_complex_gigabytes(records.len(), records.len()),
        days
    );

    let total = records.len();
    for (index, record) in records.iter_mut().enumerate() {
        record.prices = client.prices(&record.symbol).await;
        println!("{}/{total} {} {}", index + 1, record.symbol, record.prices.len());
        tokio::time::sleep(pacing).await;
    }

    snapshot::save(&config.snapshot_path, &records)
        .with_context(|| format!("failed to write {}", config.snapshot_path))?;
    println!("{} {}", "Saved".green(), config.snapshot_path);

    Ok(records)
}

fn load_windows(config: &Config) -> Result<Vec<SymbolWindow>> {
    let records = snapshot::load(&config.snapshot_path)
        .with_context(|| format!("failed to read {}", config.snapshot_path))?;

    Ok(prepare_windows(&records, config.window))
}

/// Scores every usable symbol in the snapshot and prints the ranking.
pub fn rank(config: &Config) -> Result<Vec<Score>> {
    let windows = load_windows(config)?;
    println!("{} {} symbols", "Ranking".green(), windows.len());

    let scores = rank_windows(&windows)?;
    print_ranking(&scores);

    Ok(scores)
}

fn train(config: &Config, windows: &[SymbolWindow]) -> Result<()> {
    if windows.is_empty() {
        bail!("no symbol has {} prices to train on", config.window);
    }
    println!("{} {} symbols", "Training".green(), windows.len());

    let mut model = PriceModel::from_windows(windows, config.training.seed)?;
    let report = model.train(&config.training)?;

    print_predictions(&model.predictions(windows));

    loss_chart(&config.chart_path, &report.losses)
        .map_err(|error| anyhow!("failed to draw {}: {error}", config.chart_path))?;

    Ok(())
}

/// Fetches `symbols` live and trains the price model on them.
pub async fn train_live(config: &Config, symbols: &[String]) -> Result<()> {
    let client = client(config)?;
    let mut records = Vec::with_capacity(symbols.len());

    for (index, symbol) in symbols.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(client.pacing()).await;
        }
        records.push(SymbolRecord::new(symbol, "", client.prices(symbol).await));
    }

    train(config, &prepare_windows(&records, config.window))
}

/// Ranks the snapshot and trains the price model on the same windows.
pub fn run(config: &Config) -> Result<()> {
    let windows = load_windows(config)?;

    let scores = rank_windows(&windows)?;
    print_ranking(&scores);

    train(config, &windows)
}
