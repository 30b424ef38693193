pub mod backtest;
pub mod elo;
pub mod features;
pub mod form;
pub mod kelly;
pub mod odds;
pub mod predict;

pub use backtest::{BacktestParams, BacktestReport, QuotePolicy, Staking};
pub use elo::{RatingEngine, RatingParams};
pub use features::{FeatureBuilder, FeatureRow, FEATURE_COLUMNS};
pub use form::{FormParams, FormWindow};
pub use predict::{Prediction, Predictor};
