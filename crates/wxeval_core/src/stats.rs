//! NaN-aware reductions and percentiles.
//!
//! Skill scores use NaN for "undefined", so every reducer applied across
//! thresholds or bootstrap iterations skips NaN values. A reduction over
//! nothing but NaN yields NaN.

use crate::error::{CoreError, Result};

/// Sum of the non-NaN values (0 if there are none).
pub fn nan_sum(values: &[f64]) -> f64 {
    values.iter().filter(|v| !v.is_nan()).sum()
}

/// Arithmetic mean of the non-NaN values.
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Maximum of the non-NaN values.
pub fn nan_max(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NAN, f64::max)
}

/// Percentile `q` (in [0, 100]) of the non-NaN values.
///
/// Linear interpolation between order statistics at rank
/// `q / 100 * (n - 1)`, the default convention of NumPy's `nanpercentile`.
///
/// # Panics
///
/// Panics if `q` is outside [0, 100].
pub fn nan_percentile(values: &[f64], q: f64) -> f64 {
    assert!((0.0..=100.0).contains(&q), "percentile must be in [0, 100]");

    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Validate a confidence level (exclusive range (0, 1)).
pub fn check_confidence_level(confidence_level: f64) -> Result<()> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(CoreError::invalid(format!(
            "confidence level must be in (0, 1), got {confidence_level}"
        )));
    }
    Ok(())
}

/// Two-sided percentile confidence interval `(lower, upper)`.
///
/// The bounds are the `50 * (1 - level)` and `50 * (1 + level)`
/// percentiles of the non-NaN values.
pub fn confidence_interval(values: &[f64], confidence_level: f64) -> Result<(f64, f64)> {
    check_confidence_level(confidence_level)?;
    let lower = nan_percentile(values, 50.0 * (1.0 - confidence_level));
    let upper = nan_percentile(values, 50.0 * (1.0 + confidence_level));
    Ok((lower, upper))
}
