use serde::{Deserialize, Serialize};

/// Daily closing prices, where the last index is the most recent
pub type PriceSeries = Vec<f32>;

/// A listed symbol as returned by the symbol directory, with the prices fetched for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub symbol: String,
    #[serde(rename = "displaySymbol", default)]
    pub display: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub currency: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub prices: PriceSeries,
}

impl SymbolRecord {
    pub fn new(symbol: &str, description: &str, prices: PriceSeries) -> Self {
        Self {
            symbol: symbol.to_string(),
            display: symbol.to_string(),
            description: description.to_string(),
            currency: String::new(),
            kind: None,
            prices,
        }
    }
}

/// A symbol's prices trimmed to exactly the configured window
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolWindow {
    pub symbol: String,
    pub name: String,
    pub prices: PriceSeries,
}

impl SymbolWindow {
    pub fn new(symbol: &str, name: &str, prices: PriceSeries) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            prices,
        }
    }

    /// Last price minus first price
    pub fn change(&self) -> f32 {
        match (self.prices.first(), self.prices.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

/// Entropy of a symbol's attention output
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub symbol: String,
    pub name: String,
    /// Magnitude of the complex entropy, the ranking key
    pub entropy: f64,
    pub phase: f64,
    pub change: f32,
}

/// A symbol's closing price against the value the price model refined it to
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub symbol: String,
    pub original: f32,
    pub refined: f32,
}
