//! SignalGuard -- anomaly scoring and incident severity for metric series.
//!
//! A [`metrics::Series`] flows through one or more [`detect::Detector`]s
//! (optionally merged by the [`detect::EnsembleCombiner`]), is wrapped as an
//! [`incident::Incident`], and is reduced to a bounded severity by the
//! [`incident::SeverityScorer`]. [`recipes`] wire these together per metric
//! type.

pub mod config;
pub mod detect;
pub mod incident;
pub mod metrics;
pub mod recipes;

use anyhow::{Context, Result};
use metrics::{MetricSource, Series};
use recipes::{Recipe, RecipeReport};

/// Fetch the last `minutes` of `query` from `source` and run `recipe` on it.
pub async fn analyze_recent(
    source: &dyn MetricSource,
    query: &str,
    minutes: u64,
    step: &str,
    recipe: &dyn Recipe,
    scorer: &incident::SeverityScorer,
) -> Result<RecipeReport> {
    let end_ts = chrono::Utc::now().timestamp() as f64;
    let start_ts = end_ts - minutes as f64 * 60.0;
    tracing::info!(%query, minutes, %step, "fetching metric range");

    let series: Series = source
        .fetch_range(query, start_ts, end_ts, step)
        .await
        .with_context(|| format!("failed to fetch {query}"))?;

    recipe
        .run_with_meta(&series, scorer)
        .with_context(|| format!("{} failed on {query}", recipe.name()))
}
