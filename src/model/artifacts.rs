//! JSON persistence for the trained classifier and scaler.
//!
//! Both files carry the feature column list they were trained against; a
//! load whose columns differ from [`FEATURE_COLUMNS`] is rejected so a stale
//! model is never fed reordered inputs.

use super::{LogisticRegression, StandardScaler};
use crate::engine::features::FEATURE_COLUMNS;
use crate::error::{PredictError, PredictResult};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const LEDGER_FILE: &str = "backtest_ledger.json";

#[derive(Serialize, Deserialize)]
struct Artifact<T> {
    feature_columns: Vec<String>,
    trained_at: chrono::DateTime<chrono::Utc>,
    model: T,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.dir.join(CLASSIFIER_FILE)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(SCALER_FILE)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.dir.join(LEDGER_FILE)
    }

    pub fn save_classifier(&self, model: &LogisticRegression) -> Result<()> {
        self.save(&self.classifier_path(), model)
    }

    pub fn save_scaler(&self, scaler: &StandardScaler) -> Result<()> {
        self.save(&self.scaler_path(), scaler)
    }

    pub fn load_classifier(&self) -> PredictResult<LogisticRegression> {
        let model: LogisticRegression = self.load(&self.classifier_path(), "classifier")?;
        if !model.is_fitted() {
            return Err(PredictError::NotFitted("classifier"));
        }
        Ok(model)
    }

    pub fn load_scaler(&self) -> PredictResult<StandardScaler> {
        let scaler: StandardScaler = self.load(&self.scaler_path(), "scaler")?;
        if !scaler.is_fitted() {
            return Err(PredictError::NotFitted("scaler"));
        }
        Ok(scaler)
    }

    fn save<T: Serialize>(&self, path: &Path, model: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let artifact = Artifact {
            feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            trained_at: chrono::Utc::now(),
            model,
        };
        let json = serde_json::to_string_pretty(&artifact)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write artifact: {}", path.display()))?;
        tracing::info!(path = %path.display(), "artifact saved");
        Ok(())
    }

    fn load<T: DeserializeOwned>(&self, path: &Path, artifact: &'static str) -> PredictResult<T> {
        if !path.exists() {
            return Err(PredictError::MissingArtifact {
                artifact,
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let parsed: Artifact<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        if parsed.feature_columns != FEATURE_COLUMNS {
            return Err(PredictError::InvalidInput(format!(
                "{} was trained on different feature columns; retrain",
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), trained_at = %parsed.trained_at, "artifact loaded");
        Ok(parsed.model)
    }
}
