//! Incident records and severity scoring.

pub mod severity;

pub use severity::{simple_severity, SeverityLevel, SeverityResult, SeverityScorer, SeverityWeights};

use crate::detect::DetectorOutput;
use crate::metrics::Series;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IncidentError {
    #[error(
        "timestamps, scores, and labels must have the same length (got {timestamps}, {scores}, {labels})"
    )]
    ShapeMismatch {
        timestamps: usize,
        scores: usize,
        labels: usize,
    },
}

/// A scored, labeled span of one service metric, ready for alerting.
///
/// Immutable once built; the three per-point vectors always share a length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incident {
    service: String,
    metric: String,
    timestamps: Vec<f64>,
    scores: Vec<f64>,
    labels: Vec<u8>,
    note: String,
}

#[derive(Deserialize)]
struct RawIncident {
    service: String,
    metric: String,
    timestamps: Vec<f64>,
    scores: Vec<f64>,
    labels: Vec<u8>,
    #[serde(default)]
    note: String,
}

impl<'de> Deserialize<'de> for Incident {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawIncident::deserialize(deserializer)?;
        Incident::from_detector_output(
            raw.service,
            raw.metric,
            raw.timestamps,
            raw.scores,
            raw.labels,
            raw.note,
        )
        .map_err(serde::de::Error::custom)
    }
}

impl Incident {
    /// Build an incident from raw per-point arrays. Only the lengths are
    /// checked; score signs and timestamp order are taken as given.
    pub fn from_detector_output(
        service: impl Into<String>,
        metric: impl Into<String>,
        timestamps: Vec<f64>,
        scores: Vec<f64>,
        labels: Vec<u8>,
        note: impl Into<String>,
    ) -> Result<Self, IncidentError> {
        if timestamps.len() != scores.len() || scores.len() != labels.len() {
            return Err(IncidentError::ShapeMismatch {
                timestamps: timestamps.len(),
                scores: scores.len(),
                labels: labels.len(),
            });
        }
        Ok(Self {
            service: service.into(),
            metric: metric.into(),
            timestamps,
            scores,
            labels,
            note: note.into(),
        })
    }

    /// Wrap a detector run over `series`.
    pub fn from_series(
        service: impl Into<String>,
        metric: impl Into<String>,
        series: &Series,
        output: DetectorOutput,
        note: impl Into<String>,
    ) -> Result<Self, IncidentError> {
        Self::from_detector_output(
            service,
            metric,
            series.timestamps().to_vec(),
            output.scores,
            output.labels,
            note,
        )
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
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

    /// Largest score, 0 when empty.
    pub fn max_score(&self) -> f64 {
        self.scores.iter().copied().reduce(f64::max).unwrap_or(0.0)
    }

    /// Last minus first timestamp, 0 when empty.
    pub fn duration(&self) -> f64 {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident() -> Incident {
        Incident::from_detector_output(
            "orders-service",
            "error_rate",
            vec![100.0, 130.0, 160.0, 190.0],
            vec![0.2, 5.5, 1.0, 3.0],
            vec![0, 1, 0, 1],
            "test",
        )
        .unwrap()
    }

    #[test]
    fn test_queries() {
        let inc = incident();
        assert_eq!(inc.anomaly_indices(), vec![1, 3]);
        assert_eq!(inc.anomaly_count(), 2);
        assert_eq!(inc.max_score(), 5.5);
        assert_eq!(inc.duration(), 90.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let err = Incident::from_detector_output("s", "m", vec![1.0, 2.0], vec![0.0], vec![0, 0], "")
            .unwrap_err();
        assert_eq!(
            err,
            IncidentError::ShapeMismatch {
                timestamps: 2,
                scores: 1,
                labels: 2
            }
        );
        assert!(Incident::from_detector_output("s", "m", vec![1.0], vec![0.0], vec![], "").is_err());
    }

    #[test]
    fn test_empty_incident() {
        let inc = Incident::from_detector_output("s", "m", vec![], vec![], vec![], "").unwrap();
        assert!(inc.is_empty());
        assert_eq!(inc.max_score(), 0.0);
        assert_eq!(inc.duration(), 0.0);
        assert!(inc.anomaly_indices().is_empty());
    }

    #[test]
    fn test_accepts_unvalidated_values() {
        let inc = Incident::from_detector_output("s", "m", vec![50.0, 10.0], vec![-1.0, -3.0], vec![0, 0], "")
            .unwrap();
        assert_eq!(inc.max_score(), -1.0);
        assert_eq!(inc.duration(), -40.0);
    }

    #[test]
    fn test_external_shape() {
        let json = serde_json::to_value(incident()).unwrap();
        assert_eq!(json["service"], "orders-service");
        assert_eq!(json["labels"], serde_json::json!([0, 1, 0, 1]));
        assert_eq!(json["note"], "test");

        let back: Incident = serde_json::from_value(json).unwrap();
        assert_eq!(back, incident());

        let bad = serde_json::json!({
            "service": "s", "metric": "m",
            "timestamps": [1.0], "scores": [], "labels": [0]
        });
        assert!(serde_json::from_value::<Incident>(bad).is_err());
    }
}
