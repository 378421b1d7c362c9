//! Vote-threshold ensemble over heterogeneous detectors.

use super::stats::min_max;
use super::{DetectError, Detector, DetectorOutput, EPSILON};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

/// Min-max scale `scores` into `[0, 1]`. A flat input maps to all zeros.
pub fn normalize_scores(scores: &[f64]) -> Vec<f64> {
    let Some((lo, hi)) = min_max(scores) else {
        return Vec::new();
    };
    let range = hi - lo + EPSILON;
    scores.iter().map(|&s| (s - lo) / range).collect()
}

/// Combined verdict plus the raw output of every member detector.
#[derive(Debug, Clone, Serialize)]
pub struct EnsembleReport {
    pub combined: DetectorOutput,
    pub members: Vec<(String, DetectorOutput)>,
    pub min_votes: usize,
}

/// Runs K detectors over the same values and merges them: a point is
/// anomalous when at least `min_votes` detectors flag it, and its score is
/// the mean of the per-detector min-max normalized scores.
pub struct EnsembleCombiner {
    detectors: Vec<Box<dyn Detector>>,
    min_votes: usize,
}

impl std::fmt::Debug for EnsembleCombiner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleCombiner")
            .field("detectors", &self.detector_names())
            .field("min_votes", &self.min_votes)
            .finish()
    }
}

impl EnsembleCombiner {
    pub fn new(detectors: Vec<Box<dyn Detector>>, min_votes: usize) -> Result<Self, DetectError> {
        if detectors.is_empty() {
            return Err(DetectError::config("detectors", "ensemble needs at least one detector"));
        }
        if min_votes == 0 || min_votes > detectors.len() {
            return Err(DetectError::config(
                "min_votes",
                format!("must be in [1, {}], got {min_votes}", detectors.len()),
            ));
        }
        Ok(Self {
            detectors,
            min_votes,
        })
    }

    /// Add another member. `min_votes` stays valid since K only grows.
    pub fn with_detector(mut self, detector: Box<dyn Detector>) -> Self {
        self.detectors.push(detector);
        self
    }

    pub fn min_votes(&self) -> usize {
        self.min_votes
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Run the ensemble and return only the merged output.
    pub fn combine(&self, values: &[f64]) -> Result<DetectorOutput, DetectError> {
        self.run(values).map(|report| report.combined)
    }

    /// Run every detector in parallel, wait for all of them, then aggregate.
    pub fn run(&self, values: &[f64]) -> Result<EnsembleReport, DetectError> {
        let members: Vec<(String, DetectorOutput)> = self
            .detectors
            .par_iter()
            .map(|d| (d.name().to_string(), d.detect(values)))
            .collect();

        if let Some((name, _)) = members.iter().find(|(_, out)| out.is_empty()) {
            if !values.is_empty() {
                warn!(detector = %name, points = values.len(), "detector returned no output, ensemble result is empty");
            }
            return Ok(EnsembleReport {
                combined: DetectorOutput::empty(),
                members,
                min_votes: self.min_votes,
            });
        }

        let n = values.len();
        for (name, out) in &members {
            if out.labels.len() != n || out.scores.len() != n {
                return Err(DetectError::LengthMismatch {
                    detector: name.clone(),
                    expected: n,
                    got: out.labels.len().min(out.scores.len()),
                });
            }
        }

        let k = members.len() as f64;
        let mut votes = vec![0usize; n];
        let mut score_sum = vec![0.0; n];
        for (_, out) in &members {
            for (i, &label) in out.labels.iter().enumerate() {
                votes[i] += usize::from(label == 1);
            }
            for (i, s) in normalize_scores(&out.scores).into_iter().enumerate() {
                score_sum[i] += s;
            }
        }

        let combined = DetectorOutput {
            labels: votes.iter().map(|&v| u8::from(v >= self.min_votes)).collect(),
            scores: score_sum.into_iter().map(|s| s / k).collect(),
        };

        debug!(
            detectors = members.len(),
            min_votes = self.min_votes,
            points = n,
            flagged = combined.anomaly_count(),
            "ensemble aggregation complete"
        );

        Ok(EnsembleReport {
            combined,
            members,
            min_votes: self.min_votes,
        })
    }
}
