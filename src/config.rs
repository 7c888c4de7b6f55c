use crate::{
    constants::{api, files, model},
    models::TrainingConfig,
};

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub key: String,
    pub pacing_millis: u64,
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn new(key: String) -> Self {
        Self {
            base_url: api::BASE_URL.to_string(),
            key,
            pacing_millis: api::PACING_MILLIS,
            timeout_secs: api::TIMEOUT_SECS,
        }
    }
}

/// Everything a run needs, resolved once from the command line
#[derive(Debug, Clone)]
pub struct Config {
    pub window: usize,
    pub training: TrainingConfig,
    pub snapshot_path: String,
    pub chart_path: String,
    pub api: ApiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: model::WINDOW,
            training: TrainingConfig::default(),
            snapshot_path: files::SNAPSHOT_PATH.to_string(),
            chart_path: files::CHART_PATH.to_string(),
            api: ApiConfig::new(String::new()),
        }
    }
}
