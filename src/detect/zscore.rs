use super::stats::Baseline;
use super::{DetectError, Detector, DetectorOutput, EPSILON};
use tracing::debug;

/// Causal rolling z-score detector.
///
/// Point `i` is compared against the up-to-`window` values strictly before
/// it. Points whose history is shorter than `min_history` are never flagged
/// and score 0.
#[derive(Debug, Clone)]
pub struct RollingZScoreDetector {
    window: usize,
    z_thresh: f64,
    min_history: usize,
}

impl RollingZScoreDetector {
    pub fn new(window: usize, z_thresh: f64, min_history: usize) -> Result<Self, DetectError> {
        if window == 0 {
            return Err(DetectError::config("window", "must be greater than 0"));
        }
        if !z_thresh.is_finite() || z_thresh <= 0.0 {
            return Err(DetectError::config("z_thresh", format!("must be a positive number, got {z_thresh}")));
        }
        if min_history > window {
            return Err(DetectError::config(
                "min_history",
                format!("must not exceed window ({min_history} > {window})"),
            ));
        }
        Ok(Self {
            window,
            z_thresh,
            min_history,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn z_thresh(&self) -> f64 {
        self.z_thresh
    }

    pub fn min_history(&self) -> usize {
        self.min_history
    }
}

impl Default for RollingZScoreDetector {
    fn default() -> Self {
        Self {
            window: 30,
            z_thresh: 3.0,
            min_history: 10,
        }
    }
}

impl Detector for RollingZScoreDetector {
    fn name(&self) -> &str {
        "rolling_zscore"
    }

    fn detect(&self, values: &[f64]) -> DetectorOutput {
        let mut out = DetectorOutput::zeros(values.len());

        for (i, &value) in values.iter().enumerate() {
            let history = &values[i.saturating_sub(self.window)..i];
            if history.len() < self.min_history {
                continue;
            }

            let score = Baseline::from_window(history).z_score(value, EPSILON).abs();
            out.scores[i] = score;
            out.labels[i] = u8::from(score >= self.z_thresh);
        }

        debug!(
            detector = self.name(),
            points = values.len(),
            flagged = out.anomaly_count(),
            "rolling z-score pass complete"
        );
        out
    }
}
