//! TOML configuration for detectors, recipes, scoring and the metric source.
//!
//! Every section is optional; missing sections and fields fall back to the
//! defaults below. Detector sections only become detectors through their
//! `build` methods, which validate the parameters before any data is touched.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::detect::{DetectError, EmaDeviationDetector, RollingZScoreDetector};
use crate::incident::SeverityWeights;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SIGNALGUARD_CONFIG";
/// Config file looked up in the working directory.
pub const LOCAL_CONFIG: &str = "signalguard.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalGuardConfig {
    #[serde(default)]
    pub zscore: ZScoreConfig,
    #[serde(default)]
    pub ema: EmaConfig,
    #[serde(default)]
    pub latency: LatencyConfig,
    #[serde(default)]
    pub ensemble: EnsembleConfig,
    #[serde(default)]
    pub severity: SeverityWeights,
    #[serde(default)]
    pub prometheus: PrometheusConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SignalGuardConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Try, in order: `$SIGNALGUARD_CONFIG`, `./signalguard.toml`, defaults.
    pub fn load_or_default() -> Self {
        let resolved = Self::resolve();
        resolved.log();
        resolved.config
    }

    /// Same lookup as [`load_or_default`](Self::load_or_default), but
    /// returns what happened instead of logging it, so a caller can report
    /// it once logging is installed.
    pub fn resolve() -> ResolvedConfig {
        Self::resolve_candidates(
            std::env::var_os(CONFIG_ENV).map(PathBuf::from),
            Path::new(LOCAL_CONFIG),
        )
    }

    fn resolve_candidates(env_path: Option<PathBuf>, local: &Path) -> ResolvedConfig {
        let mut skipped = Vec::new();

        if let Some(path) = env_path {
            match Self::load(&path) {
                Ok(config) => {
                    return ResolvedConfig {
                        config,
                        source: ConfigSource::Env(path),
                        skipped,
                    }
                }
                Err(e) => skipped.push(SkippedConfig {
                    path,
                    from_env: true,
                    error: format!("{e:#}"),
                }),
            }
        }

        if local.exists() {
            match Self::load(local) {
                Ok(config) => {
                    return ResolvedConfig {
                        config,
                        source: ConfigSource::Local(local.to_path_buf()),
                        skipped,
                    }
                }
                Err(e) => skipped.push(SkippedConfig {
                    path: local.to_path_buf(),
                    from_env: false,
                    error: format!("{e:#}"),
                }),
            }
        }

        ResolvedConfig {
            config: Self::default(),
            source: ConfigSource::Defaults,
            skipped,
        }
    }
}

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Env(PathBuf),
    Local(PathBuf),
    Defaults,
}

/// A config file that was found but could not be used.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedConfig {
    pub path: PathBuf,
    pub from_env: bool,
    pub error: String,
}

/// Outcome of config resolution.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: SignalGuardConfig,
    pub source: ConfigSource,
    pub skipped: Vec<SkippedConfig>,
}

impl ResolvedConfig {
    /// Config read from a path the user named; failures are fatal.
    pub fn explicit(path: &Path) -> Result<Self> {
        Ok(Self {
            config: SignalGuardConfig::load(path)?,
            source: ConfigSource::Explicit(path.to_path_buf()),
            skipped: Vec::new(),
        })
    }

    /// Report skipped files and the winning source.
    pub fn log(&self) {
        for skip in &self.skipped {
            if skip.from_env {
                warn!(
                    path = %skip.path.display(),
                    error = %skip.error,
                    "SIGNALGUARD_CONFIG set but file could not be loaded, trying fallback"
                );
            } else {
                warn!(
                    path = %skip.path.display(),
                    error = %skip.error,
                    "local config file exists but could not be loaded, using defaults"
                );
            }
        }
        match &self.source {
            ConfigSource::Explicit(path) | ConfigSource::Env(path) | ConfigSource::Local(path) => {
                info!(path = %path.display(), "loaded configuration");
            }
            ConfigSource::Defaults => debug!("no usable config file, using compiled-in defaults"),
        }
    }
}

// ---------------------------------------------------------------------------
// Detectors
// ---------------------------------------------------------------------------

/// Rolling z-score parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZScoreConfig {
    /// Number of preceding points in the baseline.
    pub window: usize,
    /// `|z|` at or above which a point is flagged.
    pub z_thresh: f64,
    /// Baseline length below which points are never flagged.
    pub min_history: usize,
}

impl Default for ZScoreConfig {
    fn default() -> Self {
        Self {
            window: 30,
            z_thresh: 3.0,
            min_history: 10,
        }
    }
}

impl ZScoreConfig {
    pub fn build(&self) -> Result<RollingZScoreDetector, DetectError> {
        RollingZScoreDetector::try_from(self)
    }
}

impl TryFrom<&ZScoreConfig> for RollingZScoreDetector {
    type Error = DetectError;

    fn try_from(cfg: &ZScoreConfig) -> Result<Self, Self::Error> {
        Self::new(cfg.window, cfg.z_thresh, cfg.min_history)
    }
}

/// EMA deviation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaConfig {
    /// Smoothing factor in `(0, 1]`.
    pub alpha: f64,
    /// Deviation ratio at or above which a point is flagged.
    pub k_sigma: f64,
    /// Leading points that are never flagged.
    pub warmup: usize,
}

impl Default for EmaConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            k_sigma: 3.0,
            warmup: 10,
        }
    }
}

impl EmaConfig {
    pub fn build(&self) -> Result<EmaDeviationDetector, DetectError> {
        EmaDeviationDetector::try_from(self)
    }
}

impl TryFrom<&EmaConfig> for EmaDeviationDetector {
    type Error = DetectError;

    fn try_from(cfg: &EmaConfig) -> Result<Self, Self::Error> {
        Self::new(cfg.alpha, cfg.k_sigma, cfg.warmup)
    }
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    /// Latency ceiling in milliseconds; series values are in seconds.
    pub slo_ms: f64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self { slo_ms: 300.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Detectors that must agree before a point is flagged.
    pub min_votes: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self { min_votes: 2 }
    }
}

// ---------------------------------------------------------------------------
// Metric source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrometheusConfig {
    pub base_url: String,
    /// Range query resolution, Prometheus duration syntax.
    pub step: String,
    pub timeout_secs: u64,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9090".to_string(),
            step: "30s".to_string(),
            timeout_secs: 10,
        }
    }
}

impl PrometheusConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`),
    /// used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable logs.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
