use super::{Recipe, RecipeError};
use crate::config::ZScoreConfig;
use crate::detect::{DetectError, Detector, RollingZScoreDetector};
use crate::incident::Incident;
use crate::metrics::Series;

/// Error-rate anomalies from a single rolling z-score detector.
#[derive(Debug, Clone)]
pub struct ErrorRateZScoreRecipe {
    service: String,
    metric: String,
    detector: RollingZScoreDetector,
}

impl ErrorRateZScoreRecipe {
    pub fn new(service: impl Into<String>, config: &ZScoreConfig) -> Result<Self, DetectError> {
        Ok(Self {
            service: service.into(),
            metric: "error_rate".to_string(),
            detector: config.build()?,
        })
    }

    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = metric.into();
        self
    }
}

impl Recipe for ErrorRateZScoreRecipe {
    fn name(&self) -> &str {
        "ErrorRateZScoreRecipe"
    }

    fn run(&self, series: &Series) -> Result<Incident, RecipeError> {
        let output = self.detector.detect(series.values());
        let note = format!(
            "ErrorRateZScoreRecipe (window={}, z={})",
            self.detector.window(),
            self.detector.z_thresh()
        );
        Ok(Incident::from_series(&self.service, &self.metric, series, output, note)?)
    }
}
