use super::{DetectError, Detector, DetectorOutput, EPSILON};
use tracing::debug;

/// Running state of an EMA deviation pass.
///
/// [`EmaDeviationDetector::detect`] folds a fresh state over the whole
/// slice. Callers that feed a series in chunks keep one `EmaState` and pass
/// it to [`EmaDeviationDetector::step`] themselves; the detector never
/// stores it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmaState {
    ema: f64,
    ema_dev: f64,
    seen: usize,
}

impl EmaState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ema(&self) -> f64 {
        self.ema
    }

    pub fn ema_dev(&self) -> f64 {
        self.ema_dev
    }

    /// Number of points consumed so far.
    pub fn seen(&self) -> usize {
        self.seen
    }
}

/// Flags points whose deviation from an exponential moving average is large
/// relative to the smoothed deviation itself.
#[derive(Debug, Clone)]
pub struct EmaDeviationDetector {
    alpha: f64,
    k_sigma: f64,
    warmup: usize,
}

impl EmaDeviationDetector {
    pub fn new(alpha: f64, k_sigma: f64, warmup: usize) -> Result<Self, DetectError> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(DetectError::config("alpha", format!("must be in (0, 1], got {alpha}")));
        }
        if !k_sigma.is_finite() || k_sigma <= 0.0 {
            return Err(DetectError::config("k_sigma", format!("must be a positive number, got {k_sigma}")));
        }
        Ok(Self {
            alpha,
            k_sigma,
            warmup,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn k_sigma(&self) -> f64 {
        self.k_sigma
    }

    pub fn warmup(&self) -> usize {
        self.warmup
    }

    /// Consume one value, returning its `(label, score)`.
    pub fn step(&self, state: &mut EmaState, value: f64) -> (u8, f64) {
        let i = state.seen;
        state.seen += 1;

        if i == 0 {
            state.ema = value;
            state.ema_dev = 0.0;
            return (0, 0.0);
        }

        // incremental form keeps a repeated value an exact fixed point
        state.ema += self.alpha * (value - state.ema);
        let dev = (value - state.ema).abs();
        state.ema_dev += self.alpha * (dev - state.ema_dev);

        if i < self.warmup || state.ema_dev == 0.0 {
            return (0, 0.0);
        }

        let score = dev / (state.ema_dev + EPSILON);
        (u8::from(score >= self.k_sigma), score)
    }
}

impl Default for EmaDeviationDetector {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            k_sigma: 3.0,
            warmup: 10,
        }
    }
}

impl Detector for EmaDeviationDetector {
    fn name(&self) -> &str {
        "ema_deviation"
    }

    fn detect(&self, values: &[f64]) -> DetectorOutput {
        let mut state = EmaState::new();
        let mut out = DetectorOutput::zeros(values.len());

        for (i, &value) in values.iter().enumerate() {
            let (label, score) = self.step(&mut state, value);
            out.labels[i] = label;
            out.scores[i] = score;
        }

        debug!(
            detector = self.name(),
            points = values.len(),
            flagged = out.anomaly_count(),
            "ema deviation pass complete"
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy_with_spike() -> Vec<f64> {
        let mut values: Vec<f64> = (0..60).map(|i| 10.0 + ((i * 7) % 5) as f64 * 0.1).collect();
        values[45] = 40.0;
        values
    }

    #[test]
    fn test_constant_series_is_silent() {
        let det = EmaDeviationDetector::new(0.2, 3.0, 10).unwrap();
        for level in [0.0, 1.0, 0.02, 0.1, 0.15] {
            let out = det.detect(&vec![level; 50]);
            assert!(out.labels.iter().all(|&l| l == 0));
            assert!(out.scores.iter().all(|&s| s == 0.0));
        }
    }

    #[test]
    fn test_first_point_and_warmup_never_flagged() {
        let mut values = vec![1.0, 50.0, -50.0, 80.0, 1.0, 90.0];
        values.extend((0..20).map(|i| i as f64));
        let det = EmaDeviationDetector::new(0.5, 0.1, 6).unwrap();
        let out = det.detect(&values);
        assert_eq!(out.labels[0], 0);
        assert_eq!(out.scores[0], 0.0);
        for i in 0..6 {
            assert_eq!(out.labels[i], 0, "index {i} inside warmup");
        }
    }

    #[test]
    fn test_flags_spike() {
        let det = EmaDeviationDetector::default();
        let out = det.detect(&noisy_with_spike());
        assert_eq!(out.labels[45], 1);
        assert!(out.scores[45] >= 3.0);
    }

    #[test]
    fn test_step_matches_detect_across_chunks() {
        let values = noisy_with_spike();
        let det = EmaDeviationDetector::default();
        let whole = det.detect(&values);

        let mut state = EmaState::new();
        let (head, tail) = values.split_at(25);
        let chunked: Vec<(u8, f64)> = head
            .iter()
            .chain(tail.iter())
            .map(|&v| det.step(&mut state, v))
            .collect();

        assert_eq!(state.seen(), values.len());
        for (i, (label, score)) in chunked.into_iter().enumerate() {
            assert_eq!(label, whole.labels[i]);
            assert_eq!(score, whole.scores[i]);
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(EmaDeviationDetector::default().detect(&[]).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let det = EmaDeviationDetector::default();
        let values = noisy_with_spike();
        assert_eq!(det.detect(&values), det.detect(&values));
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(EmaDeviationDetector::new(0.0, 3.0, 10).is_err());
        assert!(EmaDeviationDetector::new(1.5, 3.0, 10).is_err());
        assert!(EmaDeviationDetector::new(f64::NAN, 3.0, 10).is_err());
        assert!(EmaDeviationDetector::new(0.2, -1.0, 10).is_err());
        assert!(EmaDeviationDetector::new(1.0, 3.0, 0).is_ok());
    }
}
