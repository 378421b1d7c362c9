use super::MetricsError;
use serde::{Deserialize, Serialize};

/// Ordered `(timestamp, value)` samples held as two parallel vectors.
///
/// Timestamps are Unix seconds and are expected to be non-decreasing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    name: String,
    timestamps: Vec<f64>,
    values: Vec<f64>,
}

#[derive(Deserialize)]
struct RawSeries {
    #[serde(default)]
    name: String,
    timestamps: Vec<f64>,
    values: Vec<f64>,
}

impl<'de> Deserialize<'de> for Series {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawSeries::deserialize(deserializer)?;
        Series::new(raw.name, raw.timestamps, raw.values).map_err(serde::de::Error::custom)
    }
}

impl Series {
    pub fn new(
        name: impl Into<String>,
        timestamps: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<Self, MetricsError> {
        if timestamps.len() != values.len() {
            return Err(MetricsError::ShapeMismatch {
                timestamps: timestamps.len(),
                values: values.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            timestamps,
            values,
        })
    }

    /// Build from any pair of numeric sequences.
    pub fn from_lists<T, V>(timestamps: T, values: V, name: &str) -> Result<Self, MetricsError>
    where
        T: IntoIterator<Item = f64>,
        V: IntoIterator<Item = f64>,
    {
        Self::new(name, timestamps.into_iter().collect(), values.into_iter().collect())
    }

    /// Values indexed `0, 1, 2, ...` seconds.
    pub fn from_values(values: Vec<f64>, name: &str) -> Self {
        let timestamps = (0..values.len()).map(|i| i as f64).collect();
        Self {
            name: name.to_string(),
            timestamps,
            values,
        }
    }

    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Samples with `start <= timestamp <= end`, keeping the name.
    pub fn window(&self, start: f64, end: f64) -> Series {
        let (timestamps, values) = self
            .timestamps
            .iter()
            .zip(&self.values)
            .filter(|(ts, _)| **ts >= start && **ts <= end)
            .map(|(&ts, &v)| (ts, v))
            .unzip();
        Series {
            name: self.name.clone(),
            timestamps,
            values,
        }
    }

    /// Last minus first timestamp, 0 for fewer than two samples.
    pub fn span(&self) -> f64 {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}
