use std::time::Duration;

use chrono::{Duration as TimeSpan, Utc};
use colored::Colorize;
use reqwest::Client;
use serde::Deserialize;

use super::DataError;
use crate::{config::ApiConfig, constants::api::EXCHANGE, types::SymbolRecord};

/// Daily candles as returned by the candle endpoint. Only the closes are kept.
#[derive(Debug, Deserialize)]
pub struct Candles {
    #[serde(default)]
    pub c: Vec<f32>,
    pub s: String,
}

pub struct FinnhubClient {
    client: Client,
    config: ApiConfig,
}

impl FinnhubClient {
    pub fn new(config: ApiConfig) -> Result<Self, DataError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.config.pacing_millis)
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String, DataError> {
        let url = format!("{}{path}", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("token", self.config.key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::Status {
                url,
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    /// Every listed symbol on the exchange, sorted by symbol.
    pub async fn symbols(&self) -> Result<Vec<SymbolRecord>, DataError> {
        let body = self
            .get("/stock/symbol", &[("exchange", EXCHANGE.to_string())])
            .await?;

        let mut records: Vec<SymbolRecord> = serde_json::from_str(&body)?;
        records.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(records)
    }

    async fn candles(&self, symbol: &str) -> Result<Vec<f32>, DataError> {
        let to = Utc::now();
        let from = to - TimeSpan::days(365);

        let body = self
            .get(
                "/stock/candle",
                &[
                    ("symbol", symbol.to_string()),
                    ("resolution", "D".to_string()),
                    ("from", from.timestamp().to_string()),
                    ("to", to.timestamp().to_string()),
                ],
            )
            .await?;

        parse_candles(symbol, &body)
    }

    /// Daily closes over the trailing year. Failures are logged and yield no prices.
    pub async fn prices(&self, symbol: &str) -> Vec<f32> {
        match self.candles(symbol).await {
            Ok(closes) => closes,
            Err(error) => {
                eprintln!("{} {symbol}: {error}", "Failed to fetch".red());
                Vec::new()
            }
        }
    }
}

pub fn parse_candles(symbol: &str, body: &str) -> Result<Vec<f32>, DataError> {
    let candles: Candles = serde_json::from_str(body)?;
    if candles.s != "ok" {
        return Err(DataError::NoData(symbol.to_string()));
    }

    Ok(candles.c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_candles() {
        let body = r#"{"c":[217.68,221.03,219.89],"h":[1,2,3],"s":"ok","t":[1,2,3]}"#;
        assert_eq!(parse_candles("AAPL", body).unwrap(), vec![217.68, 221.03, 219.89]);
    }

    #[test]
    fn test_parse_candles_no_data() {
        assert!(matches!(
            parse_candles("GONE", r#"{"s":"no_data"}"#),
            Err(DataError::NoData(symbol)) if symbol == "GONE"
        ));
        assert!(matches!(parse_candles("BAD", "<html>"), Err(DataError::Decode(_))));
    }

    #[test]
    fn test_symbol_directory_decodes() {
        let body = r#"[
            {"currency":"USD","description":"WALMART INC","displaySymbol":"WMT","figi":"BBG000BWXBC2","mic":"XNYS","symbol":"WMT","type":"Common Stock"},
            {"currency":"USD","description":"APPLE INC","displaySymbol":"AAPL","symbol":"AAPL","type":null}
        ]"#;

        let records: Vec<SymbolRecord> = serde_json::from_str(body).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].display, "WMT");
        assert_eq!(records[0].kind.as_deref(), Some("Common Stock"));
        assert_eq!(records[1].kind, None);
        assert!(records[1].prices.is_empty());
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_prices() {
        let key = std::env::var("KEY").unwrap();
        let client = FinnhubClient::new(ApiConfig::new(key)).unwrap();

        let prices = client.prices("AAPL").await;

        assert!(prices.len() > 200);
    }
}
