pub mod finnhub;
pub mod snapshot;

use colored::Colorize;
use thiserror::Error;

use crate::types::{SymbolRecord, SymbolWindow};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request for {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no candles for {0}")]
    NoData(String),
    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] postcard::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Keeps records holding at least `window` prices, trimmed to their first `window` prices.
pub fn prepare_windows(records: &[SymbolRecord], window: usize) -> Vec<SymbolWindow> {
    let mut windows = Vec::with_capacity(records.len());

    for record in records {
        if record.prices.len() < window {
            println!(
                "{} {} has {} of {window} prices",
                "Skipping".yellow(),
                record.symbol,
                record.prices.len()
            );
            continue;
        }

        windows.push(SymbolWindow::new(
            &record.symbol,
            &record.description,
            record.prices[..window].to_vec(),
        ));
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_windows_trims_and_skips() {
        let records = vec![
            SymbolRecord::new("LONG", "long history", (0..300).map(|v| v as f32).collect()),
            SymbolRecord::new("SHORT", "recent listing", vec![1.0; 100]),
            SymbolRecord::new("EXACT", "exact history", vec![2.0; 251]),
        ];

        let windows = prepare_windows(&records, 251);

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].symbol, "LONG");
        assert_eq!(windows[0].name, "long history");
        assert_eq!(windows[0].prices.len(), 251);
        assert_eq!(windows[0].prices[0], 0.0);
        assert_eq!(windows[0].prices[250], 250.0);
        assert_eq!(windows[1].symbol, "EXACT");
    }

    #[test]
    fn test_prepare_windows_empty() {
        assert!(prepare_windows(&[], 8).is_empty());
    }
}
