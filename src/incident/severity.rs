use super::Incident;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// `max_score` at which the magnitude term saturates.
const MAX_SCORE_CEILING: f64 = 10.0;
/// Anomalous point count at which the spread term saturates.
const ANOMALY_COUNT_CEILING: f64 = 50.0;
/// Duration in seconds at which the duration term saturates.
const DURATION_CEILING_SECS: f64 = 600.0;

/// Ordinal severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityLevel {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s < 0.2 => Self::Info,
            s if s < 0.4 => Self::Low,
            s if s < 0.7 => Self::Medium,
            s if s < 0.9 => Self::High,
            _ => Self::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityResult {
    pub score: f64,
    pub level: SeverityLevel,
}

/// Weights of the three severity terms. Meant to sum to 1, not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityWeights {
    pub w_max_score: f64,
    pub w_anomaly_count: f64,
    pub w_duration: f64,
}

impl SeverityWeights {
    pub const DEFAULT: Self = Self {
        w_max_score: 0.5,
        w_anomaly_count: 0.3,
        w_duration: 0.2,
    };
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Reduces an [`Incident`] to a bounded composite score and a level.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SeverityScorer {
    weights: SeverityWeights,
}

impl SeverityScorer {
    pub fn new(weights: SeverityWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> SeverityWeights {
        self.weights
    }

    /// Weighted sum of the saturated magnitude, spread and duration terms,
    /// clamped to `[0, 1]`.
    pub fn score(&self, incident: &Incident) -> f64 {
        if incident.is_empty() {
            return 0.0;
        }

        let norm_max_score = (incident.max_score() / MAX_SCORE_CEILING).min(1.0);
        let norm_count = (incident.anomaly_count() as f64 / ANOMALY_COUNT_CEILING).min(1.0);
        let norm_duration = (incident.duration() / DURATION_CEILING_SECS).min(1.0);

        let composite = self.weights.w_max_score * norm_max_score
            + self.weights.w_anomaly_count * norm_count
            + self.weights.w_duration * norm_duration;
        // negative scores or reversed timestamps are accepted upstream
        composite.clamp(0.0, 1.0)
    }

    pub fn level(&self, incident: &Incident) -> SeverityLevel {
        SeverityLevel::from_score(self.score(incident))
    }

    pub fn evaluate(&self, incident: &Incident) -> SeverityResult {
        let score = self.score(incident);
        let level = SeverityLevel::from_score(score);
        debug!(
            service = %incident.service(),
            metric = %incident.metric(),
            score,
            %level,
            "severity evaluated"
        );
        SeverityResult { score, level }
    }
}

/// Severity level with [`SeverityWeights::DEFAULT`].
pub fn simple_severity(incident: &Incident) -> SeverityLevel {
    SeverityScorer::new(SeverityWeights::DEFAULT).level(incident)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Incident with `count` flagged points of which one carries `max_score`,
    /// spread evenly over `duration` seconds.
    fn shaped(max_score: f64, count: usize, duration: f64) -> Incident {
        let n = count.max(2);
        let step = duration / (n - 1) as f64;
        let timestamps = (0..n)
            .map(|i| if i == n - 1 { duration } else { i as f64 * step })
            .collect();
        let mut scores = vec![0.0; n];
        scores[0] = max_score;
        let labels = (0..n).map(|i| u8::from(i < count)).collect();
        Incident::from_detector_output("svc", "m", timestamps, scores, labels, "").unwrap()
    }

    #[test]
    fn test_saturated_incident_is_critical() {
        let inc = shaped(12.0, 60, 700.0);
        assert_eq!(inc.max_score(), 12.0);
        assert_eq!(inc.anomaly_count(), 60);
        assert_eq!(inc.duration(), 700.0);

        let result = SeverityScorer::default().evaluate(&inc);
        assert!(result.score >= 0.9);
        assert_eq!(result.level, SeverityLevel::Critical);
        assert_eq!(simple_severity(&inc), SeverityLevel::Critical);
    }

    #[test]
    fn test_empty_incident_is_info() {
        let inc = Incident::from_detector_output("s", "m", vec![], vec![], vec![], "").unwrap();
        let result = SeverityScorer::default().evaluate(&inc);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.level, SeverityLevel::Info);
    }

    #[test]
    fn test_level_boundaries() {
        assert_eq!(SeverityLevel::from_score(0.0), SeverityLevel::Info);
        assert_eq!(SeverityLevel::from_score(0.19), SeverityLevel::Info);
        assert_eq!(SeverityLevel::from_score(0.2), SeverityLevel::Low);
        assert_eq!(SeverityLevel::from_score(0.4), SeverityLevel::Medium);
        assert_eq!(SeverityLevel::from_score(0.7), SeverityLevel::High);
        assert_eq!(SeverityLevel::from_score(0.9), SeverityLevel::Critical);
        assert_eq!(SeverityLevel::from_score(1.0), SeverityLevel::Critical);
    }

    #[test]
    fn test_custom_weights() {
        let inc = shaped(10.0, 0, 0.0);
        let only_magnitude = SeverityScorer::new(SeverityWeights {
            w_max_score: 1.0,
            w_anomaly_count: 0.0,
            w_duration: 0.0,
        });
        assert_eq!(only_magnitude.score(&inc), 1.0);
        assert_eq!(SeverityScorer::default().score(&inc), 0.5);
    }

    #[test]
    fn test_score_clamped_to_unit_interval() {
        // accepted by Incident: negative scores, reversed timestamps
        let inc = Incident::from_detector_output("s", "m", vec![600.0, 0.0], vec![-50.0, -20.0], vec![0, 0], "").unwrap();
        assert!(inc.duration() < 0.0);
        let result = SeverityScorer::default().evaluate(&inc);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.level, SeverityLevel::Info);

        let heavy = SeverityScorer::new(SeverityWeights {
            w_max_score: 1.0,
            w_anomaly_count: 1.0,
            w_duration: 1.0,
        });
        assert_eq!(heavy.score(&shaped(12.0, 60, 700.0)), 1.0);
    }

    #[test]
    fn test_result_external_shape() {
        let json = serde_json::to_value(SeverityResult {
            score: 0.55,
            level: SeverityLevel::Medium,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"score": 0.55, "level": "medium"}));
        assert_eq!(SeverityLevel::High.to_string(), "high");
    }

    proptest! {
        #[test]
        fn prop_score_is_bounded(
            max_score in 0.0f64..100.0,
            count in 0usize..120,
            duration in 0.0f64..5000.0,
        ) {
            let s = SeverityScorer::default().score(&shaped(max_score, count, duration));
            prop_assert!((0.0..=1.0 + 1e-12).contains(&s));
        }

        #[test]
        fn prop_monotone_in_max_score(a in 0.0f64..30.0, b in 0.0f64..30.0, count in 0usize..80, d in 0.0f64..900.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let scorer = SeverityScorer::default();
            prop_assert!(scorer.score(&shaped(lo, count, d)) <= scorer.score(&shaped(hi, count, d)));
        }

        #[test]
        fn prop_monotone_in_count(a in 0usize..80, b in 0usize..80, m in 0.0f64..30.0, d in 0.0f64..900.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let scorer = SeverityScorer::default();
            prop_assert!(scorer.score(&shaped(m, lo, d)) <= scorer.score(&shaped(m, hi, d)));
        }

        #[test]
        fn prop_monotone_in_duration(a in 0.0f64..2000.0, b in 0.0f64..2000.0, m in 0.0f64..30.0, count in 0usize..80) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let scorer = SeverityScorer::default();
            prop_assert!(scorer.score(&shaped(m, count, lo)) <= scorer.score(&shaped(m, count, hi)));
        }
    }
}
