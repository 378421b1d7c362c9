//! Metric series, the sources they come from, and synthetic generators.

pub mod series;
pub mod source;
pub mod synthetic;

pub use series::Series;
pub use source::{MetricSource, PrometheusSource};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("timestamps ({timestamps}) and values ({values}) must have the same length")]
    ShapeMismatch { timestamps: usize, values: usize },

    #[error("metric source request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("metric source returned status {status}: {message}")]
    Api { status: String, message: String },

    #[error("could not decode sample: {0}")]
    Decode(String),
}
