//! Classifier and scaler seams.
//!
//! The pipeline only relies on the two traits below; `LogisticRegression`
//! and `StandardScaler` are the implementations the binary trains and ships.

pub mod artifacts;
pub mod logistic;
pub mod metrics;
pub mod scaler;
pub mod split;

pub use logistic::LogisticRegression;
pub use scaler::StandardScaler;

use crate::error::PredictResult;

/// Binary win/loss classifier.
pub trait Classifier {
    fn fit(&mut self, features: &[Vec<f64>], labels: &[u8]) -> PredictResult<()>;

    /// `[p_loss, p_win]` per row.
    fn predict_proba(&self, features: &[Vec<f64>]) -> PredictResult<Vec<[f64; 2]>>;
}

/// Column-wise feature standardization. Fit on the training partition only,
/// then applied unchanged to every other partition.
pub trait FeatureScaler {
    fn fit(&mut self, features: &[Vec<f64>]) -> PredictResult<()>;

    fn transform(&self, features: &[Vec<f64>]) -> PredictResult<Vec<Vec<f64>>>;
}
