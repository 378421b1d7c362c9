use super::{Recipe, RecipeError};
use crate::config::{EmaConfig, LatencyConfig};
use crate::detect::{DetectError, Detector, EmaDeviationDetector};
use crate::incident::Incident;
use crate::metrics::Series;
use tracing::debug;

/// Score added to every point that breaches the SLO.
pub const SLO_BREACH_BOOST: f64 = 2.0;

/// Latency anomalies from EMA deviation OR a hard SLO ceiling.
///
/// Series values are seconds; the ceiling is configured in milliseconds.
/// A breach is strictly above the ceiling. Breaching points are always
/// flagged and their EMA score is raised by [`SLO_BREACH_BOOST`], so the
/// statistical signal is kept rather than replaced.
#[derive(Debug, Clone)]
pub struct LatencySloRecipe {
    service: String,
    metric: String,
    slo_ms: f64,
    detector: EmaDeviationDetector,
}

impl LatencySloRecipe {
    pub fn new(
        service: impl Into<String>,
        latency: &LatencyConfig,
        ema: &EmaConfig,
    ) -> Result<Self, DetectError> {
        if !latency.slo_ms.is_finite() || latency.slo_ms < 0.0 {
            return Err(DetectError::config(
                "slo_ms",
                format!("must be a non-negative number, got {}", latency.slo_ms),
            ));
        }
        Ok(Self {
            service: service.into(),
            metric: "latency_p95".to_string(),
            slo_ms: latency.slo_ms,
            detector: ema.build()?,
        })
    }

    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = metric.into();
        self
    }

    pub fn slo_secs(&self) -> f64 {
        self.slo_ms / 1000.0
    }
}

impl Recipe for LatencySloRecipe {
    fn name(&self) -> &str {
        "LatencySLORecipe"
    }

    fn run(&self, series: &Series) -> Result<Incident, RecipeError> {
        let mut output = self.detector.detect(series.values());
        let ceiling = self.slo_secs();

        let mut breaches = 0usize;
        for (i, &value) in series.values().iter().enumerate() {
            let breach = u8::from(value > ceiling);
            breaches += usize::from(breach);
            output.labels[i] |= breach;
            output.scores[i] += SLO_BREACH_BOOST * f64::from(breach);
        }
        debug!(service = %self.service, ceiling, breaches, "slo rule applied");

        let note = format!(
            "LatencySLORecipe (SLO={}ms, alpha={}, k_sigma={})",
            self.slo_ms,
            self.detector.alpha(),
            self.detector.k_sigma()
        );
        Ok(Incident::from_series(&self.service, &self.metric, series, output, note)?)
    }
}
