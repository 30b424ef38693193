//! End-to-end batch jobs behind the CLI subcommands.
//!
//! Every job that reads features runs the rating pass first; the pass holds
//! `&mut` on the store and finishes before any feature is built.

use crate::config::Config;
use crate::engine::backtest::{self, BacktestReport};
use crate::engine::elo::{RatingEngine, RatingParams};
use crate::engine::features::{feature_matrix, labels, FeatureBuilder, FeatureRow};
use crate::engine::form::FormWindow;
use crate::engine::predict::{Prediction, Predictor};
use crate::error::PredictResult;
use crate::feed::ingest::{apply_updates, fetch_with_retry, IngestStats, RetryPolicy};
use crate::feed::OddsFeed;
use crate::model::artifacts::ArtifactStore;
use crate::model::metrics::{evaluate, Evaluation};
use crate::model::split::split_by_season;
use crate::model::{Classifier, FeatureScaler, LogisticRegression, StandardScaler};
use crate::store::{snapshot, MemoryStore};
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use std::time::Duration;

pub fn recompute_ratings(store: &mut MemoryStore, params: &RatingParams) -> RatingEngine {
    let mut engine = RatingEngine::new(*params);
    engine.run(store);
    engine
}

/// Two rows per completed game, optionally limited to one season.
pub fn training_rows(store: &MemoryStore, config: &Config, season: Option<i32>) -> Vec<FeatureRow> {
    let builder = FeatureBuilder::new(
        store,
        FormWindow::new(store, config.form),
        config.ratings.initial,
    );
    builder.build_all_training_rows(season)
}

#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub train_rows: usize,
    pub train: Evaluation,
    pub validation: Option<Evaluation>,
    pub test: Option<Evaluation>,
}

fn score<C: Classifier, F: FeatureScaler>(
    classifier: &C,
    scaler: &F,
    rows: &[FeatureRow],
) -> PredictResult<Option<Evaluation>> {
    if rows.is_empty() {
        return Ok(None);
    }
    let probs = classifier.predict_proba(&scaler.transform(&feature_matrix(rows))?)?;
    Ok(Some(evaluate(&probs, &labels(rows))))
}

/// Ratings, features, season split, scaler and classifier fit on the
/// training seasons, metrics on the held-out seasons, then persist both
/// artifacts.
pub fn train(store: &mut MemoryStore, config: &Config) -> Result<TrainSummary> {
    recompute_ratings(store, &config.ratings);
    let rows = training_rows(store, config, None);
    let split = split_by_season(rows, &config.split);
    if split.train.is_empty() {
        anyhow::bail!(
            "no training rows for seasons {:?}; check [split] against the snapshot",
            config.split.train_seasons
        );
    }

    let mut scaler = StandardScaler::new();
    scaler.fit(&feature_matrix(&split.train))?;
    let mut classifier = LogisticRegression::new(config.model.logistic.clone());
    classifier.fit(
        &scaler.transform(&feature_matrix(&split.train))?,
        &labels(&split.train),
    )?;

    let summary = TrainSummary {
        train_rows: split.train.len(),
        train: score(&classifier, &scaler, &split.train)?.context("empty training partition")?,
        validation: score(&classifier, &scaler, &split.validation)?,
        test: score(&classifier, &scaler, &split.test)?,
    };
    tracing::info!(
        rows = summary.train_rows,
        train_accuracy = summary.train.accuracy,
        validation_accuracy = ?summary.validation.map(|e| e.accuracy),
        test_accuracy = ?summary.test.map(|e| e.accuracy),
        "model trained"
    );

    let artifacts = ArtifactStore::new(&config.model.artifacts_dir);
    artifacts.save_scaler(&scaler)?;
    artifacts.save_classifier(&classifier)?;
    Ok(summary)
}

/// Replay the test season with the persisted model and write the ledger
/// next to the artifacts.
pub fn backtest(store: &mut MemoryStore, config: &Config) -> Result<BacktestReport> {
    let artifacts = ArtifactStore::new(&config.model.artifacts_dir);
    let scaler = artifacts.load_scaler()?;
    let classifier = artifacts.load_classifier()?;

    recompute_ratings(store, &config.ratings);
    let rows = training_rows(store, config, Some(config.split.test_season));
    if rows.is_empty() {
        tracing::warn!(season = config.split.test_season, "no completed games in test season");
    }
    let report = backtest::simulate(&classifier, &scaler, &rows, &*store, &config.backtest)?;
    backtest::write_ledger(&report, &artifacts.ledger_path())?;
    Ok(report)
}

pub fn predict(
    store: &MemoryStore,
    config: &Config,
    home: &str,
    away: &str,
    as_of: NaiveDate,
    odds: Option<(i32, i32)>,
) -> PredictResult<Prediction> {
    let artifacts = ArtifactStore::new(&config.model.artifacts_dir);
    let predictor = Predictor::from_artifacts(store, &artifacts, config.predict_settings())?;
    predictor.predict(home, away, as_of, odds)
}

/// Fetch, ingest, re-rate and save the snapshot. A feed that keeps failing
/// leaves the store untouched.
pub async fn update_odds<F>(feed: &mut F, store: &mut MemoryStore, config: &Config) -> Result<IngestStats>
where
    F: OddsFeed + ?Sized,
{
    let feed_config = config
        .odds_feed
        .as_ref()
        .context("[odds_feed] section missing from config")?;
    let policy = RetryPolicy {
        max_retries: feed_config.max_retries,
        base_delay: Duration::from_millis(feed_config.retry_base_ms),
    };

    let updates = fetch_with_retry(feed, &feed_config.sport, &policy).await?;
    if let (Some(quota), Some(threshold)) = (feed.last_quota(), feed_config.quota_warning_threshold) {
        if quota.requests_remaining < threshold {
            tracing::warn!(
                used = quota.requests_used,
                remaining = quota.requests_remaining,
                "odds API quota running low"
            );
        }
    }

    let stats = apply_updates(store, &updates, Utc::now());
    recompute_ratings(store, &config.ratings);
    snapshot::save(store, &config.data.snapshot_path)?;
    Ok(stats)
}
