//! Population statistics over a borrowed window of samples.

/// Summary of a baseline window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub mean: f64,
    pub std_dev: f64,
    pub sample_count: usize,
}

impl Baseline {
    /// A window holding one repeated value has exactly that mean and zero
    /// spread; summation rounding must not leak a residual into either.
    pub fn from_window(values: &[f64]) -> Self {
        if let Some((lo, hi)) = min_max(values) {
            if lo == hi {
                return Self {
                    mean: lo,
                    std_dev: 0.0,
                    sample_count: values.len(),
                };
            }
        }
        Self {
            mean: mean(values),
            std_dev: std_dev(values),
            sample_count: values.len(),
        }
    }

    /// Z = (value - mean) / std_dev, with a zero spread replaced by `floor`.
    pub fn z_score(&self, value: f64, floor: f64) -> f64 {
        let std = if self.std_dev == 0.0 { floor } else { self.std_dev };
        (value - self.mean) / std
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by `n`).
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    let sum_sq_diff: f64 = values.iter().map(|&x| (x - mean).powi(2)).sum();
    sum_sq_diff / values.len() as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// `(min, max)` of the slice, `None` when empty.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}
