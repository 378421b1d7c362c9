use super::{Recipe, RecipeError};
use crate::config::{EmaConfig, EnsembleConfig, ZScoreConfig};
use crate::detect::{DetectError, Detector, EnsembleCombiner};
use crate::incident::Incident;
use crate::metrics::Series;

/// Error-rate anomalies agreed on by at least `min_votes` detectors.
///
/// The built-in members are the rolling z-score and EMA deviation
/// detectors; model-backed detectors can be appended with
/// [`with_detector`](Self::with_detector).
#[derive(Debug)]
pub struct EnsembleErrorRateRecipe {
    service: String,
    metric: String,
    combiner: EnsembleCombiner,
}

impl EnsembleErrorRateRecipe {
    pub fn new(
        service: impl Into<String>,
        zscore: &ZScoreConfig,
        ema: &EmaConfig,
        ensemble: &EnsembleConfig,
    ) -> Result<Self, DetectError> {
        let members: Vec<Box<dyn Detector>> = vec![Box::new(zscore.build()?), Box::new(ema.build()?)];
        Ok(Self {
            service: service.into(),
            metric: "error_rate".to_string(),
            combiner: EnsembleCombiner::new(members, ensemble.min_votes)?,
        })
    }

    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = metric.into();
        self
    }

    pub fn with_detector(mut self, detector: Box<dyn Detector>) -> Self {
        self.combiner = self.combiner.with_detector(detector);
        self
    }

    pub fn combiner(&self) -> &EnsembleCombiner {
        &self.combiner
    }
}

impl Recipe for EnsembleErrorRateRecipe {
    fn name(&self) -> &str {
        "EnsembleErrorRateRecipe"
    }

    fn run(&self, series: &Series) -> Result<Incident, RecipeError> {
        let output = self.combiner.combine(series.values())?;
        let note = format!(
            "EnsembleErrorRateRecipe (min_votes={}, detectors={})",
            self.combiner.min_votes(),
            self.combiner.detector_names().join("+")
        );
        Ok(Incident::from_series(&self.service, &self.metric, series, output, note)?)
    }
}
