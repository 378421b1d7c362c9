//! Anomaly detectors and the ensemble combiner.
//!
//! Every detector maps a value sequence to per-point binary labels and
//! non-negative magnitude scores of the same length. The combiner and the
//! recipes only ever talk to the [`Detector`] trait.

pub mod ema;
pub mod ensemble;
pub mod stats;
pub mod zscore;

pub use ema::{EmaDeviationDetector, EmaState};
pub use ensemble::{normalize_scores, EnsembleCombiner, EnsembleReport};
pub use zscore::RollingZScoreDetector;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Guard added to denominators that may collapse to zero.
pub const EPSILON: f64 = 1e-8;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("invalid configuration: {name} - {reason}")]
    Configuration { name: String, reason: String },

    #[error("detector {detector} returned {got} points, expected {expected}")]
    LengthMismatch {
        detector: String,
        expected: usize,
        got: usize,
    },
}

impl DetectError {
    pub(crate) fn config(name: &str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Per-point labels and scores produced by one detector run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorOutput {
    /// `1` marks an anomalous point, `0` a normal one.
    pub labels: Vec<u8>,
    /// Anomaly magnitude, higher is more anomalous.
    pub scores: Vec<f64>,
}

impl DetectorOutput {
    /// All-zero output of length `n`.
    pub fn zeros(n: usize) -> Self {
        Self {
            labels: vec![0; n],
            scores: vec![0.0; n],
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn anomaly_indices(&self) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(i, &l)| (l == 1).then_some(i))
            .collect()
    }

    pub fn anomaly_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }
}

/// Capability shared by every anomaly detector, statistical or model-backed.
///
/// Implementations must be deterministic for identical input and
/// configuration, must return outputs of exactly `values.len()` points, and
/// must accept an empty slice. Detectors are shared across threads by the
/// ensemble, so any per-run state lives inside the `detect` call.
pub trait Detector: Send + Sync {
    /// Short identifier used in notes, logs and errors.
    fn name(&self) -> &str;

    fn detect(&self, values: &[f64]) -> DetectorOutput;

    /// Entry point for detectors that need the time axis. Statistical
    /// detectors ignore it.
    fn detect_with_timestamps(&self, values: &[f64], _timestamps: &[f64]) -> DetectorOutput {
        self.detect(values)
    }
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn detect(&self, values: &[f64]) -> DetectorOutput {
        (**self).detect(values)
    }

    fn detect_with_timestamps(&self, values: &[f64], timestamps: &[f64]) -> DetectorOutput {
        (**self).detect_with_timestamps(values, timestamps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_queries() {
        let out = DetectorOutput {
            labels: vec![0, 1, 0, 1],
            scores: vec![0.0, 4.0, 0.5, 3.1],
        };
        assert_eq!(out.anomaly_indices(), vec![1, 3]);
        assert_eq!(out.anomaly_count(), 2);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_empty_output() {
        let out = DetectorOutput::empty();
        assert!(out.is_empty());
        assert!(out.anomaly_indices().is_empty());
        assert_eq!(DetectorOutput::zeros(3).scores, vec![0.0; 3]);
    }

    #[test]
    fn test_error_display() {
        let err = DetectError::config("window", "must be positive");
        assert_eq!(err.to_string(), "invalid configuration: window - must be positive");
    }

    #[test]
    fn test_timestamps_ignored_by_default() {
        let detector: Box<dyn Detector> = Box::new(RollingZScoreDetector::new(4, 2.0, 2).unwrap());
        let values = [1.0, 1.2, 0.9, 1.1, 9.0];
        let with_ts = detector.detect_with_timestamps(&values, &[0.0, 15.0, 30.0, 45.0, 60.0]);
        assert_eq!(with_ts, detector.detect(&values));
        assert_eq!(with_ts.labels[4], 1);
        assert_eq!(detector.name(), "rolling_zscore");
    }
}
