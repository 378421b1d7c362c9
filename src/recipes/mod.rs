//! Recipes: fixed detector compositions per metric type that turn a
//! [`Series`] into an [`Incident`].
//!
//! A recipe is a pure function of its configuration and the series. It
//! validates its detectors when it is built, so `run` can only fail on a
//! detector breaking the output-length contract.

pub mod ensemble;
pub mod slo;
pub mod zscore;

pub use ensemble::EnsembleErrorRateRecipe;
pub use slo::LatencySloRecipe;
pub use zscore::ErrorRateZScoreRecipe;

use crate::config::SignalGuardConfig;
use crate::detect::DetectError;
use crate::incident::{Incident, IncidentError, SeverityResult, SeverityScorer};
use crate::metrics::Series;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error(transparent)]
    Incident(#[from] IncidentError),
}

/// Incident plus the context it was produced in.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeReport {
    pub recipe: String,
    pub incident: Incident,
    pub severity: SeverityResult,
}

pub trait Recipe: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, series: &Series) -> Result<Incident, RecipeError>;

    /// Run and score in one go.
    fn run_with_meta(&self, series: &Series, scorer: &SeverityScorer) -> Result<RecipeReport, RecipeError> {
        let incident = self.run(series)?;
        let severity = scorer.evaluate(&incident);
        info!(
            recipe = self.name(),
            service = %incident.service(),
            metric = %incident.metric(),
            points = incident.len(),
            anomalies = incident.anomaly_count(),
            severity = %severity.level,
            "recipe complete"
        );
        Ok(RecipeReport {
            recipe: self.name().to_string(),
            incident,
            severity,
        })
    }
}

/// The built-in recipes, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeKind {
    ZScore,
    Latency,
    Ensemble,
}

impl RecipeKind {
    /// Build the recipe from `config`, overriding its default metric name
    /// when `metric` is given.
    pub fn build(
        self,
        service: &str,
        metric: Option<&str>,
        config: &SignalGuardConfig,
    ) -> Result<Box<dyn Recipe>, DetectError> {
        let recipe: Box<dyn Recipe> = match self {
            Self::ZScore => {
                let r = ErrorRateZScoreRecipe::new(service, &config.zscore)?;
                Box::new(match metric {
                    Some(m) => r.with_metric(m),
                    None => r,
                })
            }
            Self::Latency => {
                let r = LatencySloRecipe::new(service, &config.latency, &config.ema)?;
                Box::new(match metric {
                    Some(m) => r.with_metric(m),
                    None => r,
                })
            }
            Self::Ensemble => {
                let r = EnsembleErrorRateRecipe::new(service, &config.zscore, &config.ema, &config.ensemble)?;
                Box::new(match metric {
                    Some(m) => r.with_metric(m),
                    None => r,
                })
            }
        };
        Ok(recipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::SeverityLevel;
    use crate::metrics::synthetic;

    #[test]
    fn test_build_every_kind() {
        let config = SignalGuardConfig::default();
        for (kind, name) in [
            (RecipeKind::ZScore, "ErrorRateZScoreRecipe"),
            (RecipeKind::Latency, "LatencySLORecipe"),
            (RecipeKind::Ensemble, "EnsembleErrorRateRecipe"),
        ] {
            let recipe = kind.build("svc", None, &config).unwrap();
            assert_eq!(recipe.name(), name);
        }
        let custom = RecipeKind::ZScore.build("svc", Some("failure_rate"), &config).unwrap();
        let incident = custom.run(&Series::from_values(vec![0.0; 3], "x")).unwrap();
        assert_eq!(incident.metric(), "failure_rate");
    }

    #[test]
    fn test_build_propagates_bad_config() {
        let mut config = SignalGuardConfig::default();
        config.ensemble.min_votes = 0;
        assert!(RecipeKind::Ensemble.build("svc", None, &config).is_err());
        assert!(RecipeKind::ZScore.build("svc", None, &config).is_ok());
    }

    #[test]
    fn test_run_with_meta_scores_incident() {
        let recipe = RecipeKind::Latency
            .build("payments-service", None, &SignalGuardConfig::default())
            .unwrap();
        let report = recipe
            .run_with_meta(&synthetic::latency_p95(300, 5), &SeverityScorer::default())
            .unwrap();
        assert_eq!(report.recipe, "LatencySLORecipe");
        assert_eq!(report.severity, SeverityScorer::default().evaluate(&report.incident));
        assert!(report.severity.level >= SeverityLevel::Low);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["incident"]["service"], "payments-service");
        assert!(json["severity"]["level"].is_string());
    }
}
