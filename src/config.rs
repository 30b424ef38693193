use crate::engine::backtest::BacktestParams;
use crate::engine::elo::RatingParams;
use crate::engine::form::FormParams;
use crate::engine::predict::PredictSettings;
use crate::model::logistic::LogisticParams;
use crate::model::split::SplitConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const ENV_FILE: &str = ".env";
const ODDS_API_KEY_VAR: &str = "ODDS_API_KEY";

/// Every section is optional; an empty file yields the built-in defaults.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub ratings: RatingParams,
    #[serde(default)]
    pub form: FormParams,
    #[serde(default)]
    pub backtest: BacktestParams,
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub data: DataConfig,
    pub odds_feed: Option<OddsFeedConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    #[serde(flatten)]
    pub logistic: LogisticParams,
}

fn default_artifacts_dir() -> PathBuf { PathBuf::from("artifacts") }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: default_artifacts_dir(),
            logistic: LogisticParams::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

fn default_snapshot_path() -> PathBuf { PathBuf::from("data/snapshot.json") }

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OddsFeedConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_sport")]
    pub sport: String,
    /// Comma-separated bookmaker keys, passed through to the provider.
    pub bookmakers: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    pub quota_warning_threshold: Option<u64>,
}

fn default_base_url() -> String { "https://api.the-odds-api.com".to_string() }
fn default_sport() -> String { "basketball_nba".to_string() }
fn default_max_retries() -> u32 { 3 }
fn default_retry_base_ms() -> u64 { 500 }

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| "Failed to parse config TOML")?;
        config.split.validate()?;
        Ok(config)
    }

    /// `load` when the file exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!(path = %path.display(), "config file not found; using defaults");
            Ok(Self::default())
        }
    }

    pub fn predict_settings(&self) -> PredictSettings {
        PredictSettings {
            form: self.form,
            initial_rating: self.ratings.initial,
            edge_threshold: self.backtest.edge_threshold,
        }
    }

    /// Load .env file into process environment. Real env vars take precedence.
    pub fn load_env_file() {
        let Ok(content) = std::fs::read_to_string(ENV_FILE) else {
            return;
        };
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"').trim_matches('\'');
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
        }
    }

    pub fn odds_api_key() -> Result<String> {
        match std::env::var(ODDS_API_KEY_VAR) {
            Ok(key) if !sanitize_key(&key).is_empty() => Ok(sanitize_key(&key)),
            _ => anyhow::bail!("{} is not set (environment or {})", ODDS_API_KEY_VAR, ENV_FILE),
        }
    }
}

/// Strip carriage returns, BOM and zero-width spaces from a key value.
fn sanitize_key(raw: &str) -> String {
    raw.replace(['\r', '\u{feff}', '\u{200b}'], "")
        .trim()
        .to_string()
}
