/// Symbols trained on when no snapshot is used
pub const TICKERS: [&str; 8] = ["AAPL", "IBM", "CTVA", "K", "CAT", "GS", "T", "WMT"];

pub mod model {
    /// Trading days in a trailing year of daily closes
    pub const WINDOW: usize = 251;
}

pub mod training {
    pub const ITERATIONS: usize = 100;
    /// Momentum decay of the heavy ball update
    pub const ALPHA: f32 = 0.3;
    /// Step size
    pub const ETA: f32 = 0.05;
    /// Training stops early once the mean squared error falls below this
    pub const LOSS_THRESHOLD: f32 = 0.001;
    /// Gradient norms above this are rescaled to it
    pub const CLIP_NORM: f32 = 1.0;
    pub const SEED: u64 = 1;
}

pub mod files {
    pub const SNAPSHOT_PATH: &str = "symbols.bin";
    pub const CHART_PATH: &str = "epochs.png";
    pub const TRAINING_PATH: &str = "training";
}

pub mod api {
    pub const BASE_URL: &str = "https://finnhub.io/api/v1";
    pub const EXCHANGE: &str = "US";
    /// Delay between requests, keeps a full directory fetch under the free tier rate limit
    pub const PACING_MILLIS: u64 = 1500;
    pub const TIMEOUT_SECS: u64 = 30;
}
