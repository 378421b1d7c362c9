//! Seeded synthetic metric series with injected incident regimes.
//!
//! Used by the `demo` command and by tests that need realistic shapes
//! without a live metric backend.

use super::Series;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

fn gaussian(rng: &mut StdRng, n: usize, sd: f64) -> Vec<f64> {
    (0..n)
        .map(|_| {
            let z: f64 = rng.sample(StandardNormal);
            z * sd
        })
        .collect()
}

fn bump(values: &mut [f64], start: usize, end: usize, by: f64) {
    let end = end.min(values.len());
    if start < end {
        values[start..end].iter_mut().for_each(|v| *v += by);
    }
}

/// p95 latency in seconds: ~150ms baseline with two spikes of +250ms and
/// +200ms at 80..100 and 200..210 (scaled to `n`).
pub fn latency_p95(n: usize, seed: u64) -> Series {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ms: Vec<f64> = gaussian(&mut rng, n, 20.0)
        .into_iter()
        .map(|noise| 150.0 + noise)
        .collect();

    let at = |i: usize| i * n / 300;
    bump(&mut ms, at(80), at(100), 250.0);
    bump(&mut ms, at(200), at(210), 200.0);

    Series::from_values(ms.into_iter().map(|v| v / 1000.0).collect(), "latency_p95")
}

/// Error ratio around 3% with three elevated regimes, clipped to `[0, 1]`.
pub fn error_rate(n: usize, seed: u64) -> Series {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut values: Vec<f64> = gaussian(&mut rng, n, 0.004)
        .into_iter()
        .map(|noise| 0.03 + noise)
        .collect();

    let at = |i: usize| i * n / 400;
    bump(&mut values, at(100), at(130), 0.12);
    bump(&mut values, at(220), at(260), 0.18);
    bump(&mut values, at(330), at(345), 0.25);

    Series::from_values(values.into_iter().map(|v| v.clamp(0.0, 1.0)).collect(), "error_rate")
}
