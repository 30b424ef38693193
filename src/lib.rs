pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod model;
pub mod pipeline;
pub mod store;

pub use error::{PredictError, PredictResult};
