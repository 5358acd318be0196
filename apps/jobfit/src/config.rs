use anyhow::{Context, Result};

use crate::analysis::normalizer::ScoreScale;

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Client configuration loaded from environment variables.
/// Nothing is required; every value has a default except the CLI credentials.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub timeout_secs: u64,
    pub score_scale: ScoreScale,
    pub email: Option<String>,
    pub password: Option<String>,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            score_scale: ScoreScale::default(),
            email: None,
            password: None,
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let api_url = lookup("JOBFIT_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);

        let timeout_secs = match lookup("JOBFIT_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("JOBFIT_TIMEOUT_SECS must be a whole number, got '{raw}'"))?,
            None => defaults.timeout_secs,
        };

        let score_scale = match lookup("JOBFIT_SCORE_SCALE") {
            Some(raw) => raw.parse::<ScoreScale>().map_err(anyhow::Error::msg).with_context(|| {
                format!("JOBFIT_SCORE_SCALE must be 'ten_point' or 'percent', got '{raw}'")
            })?,
            None => defaults.score_scale,
        };

        Ok(Config {
            api_url,
            timeout_secs,
            score_scale,
            email: lookup("JOBFIT_EMAIL").filter(|v| !v.trim().is_empty()),
            password: lookup("JOBFIT_PASSWORD").filter(|v| !v.is_empty()),
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
        })
    }
}
