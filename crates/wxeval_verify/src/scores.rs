//! Probabilistic scores computed directly from forecast probabilities.

use wxeval_core::ForecastSet;

/// Probabilities are clipped into `[MIN, 1 - MIN]` before taking logs.
pub const MIN_PROB_FOR_XENTROPY: f64 = f64::EPSILON;

/// Brier score: mean squared difference between probability and label.
pub fn get_brier_score(forecasts: &ForecastSet) -> f64 {
    let sum: f64 = forecasts
        .probabilities()
        .iter()
        .zip(forecasts.labels())
        .map(|(&p, &label)| (p - f64::from(label)).powi(2))
        .sum();
    sum / forecasts.len() as f64
}

/// Cross-entropy in bits.
///
/// The forecast set itself is not modified; clipping happens on the
/// per-example copies.
pub fn get_cross_entropy(forecasts: &ForecastSet) -> f64 {
    let sum: f64 = forecasts
        .probabilities()
        .iter()
        .zip(forecasts.labels())
        .map(|(&p, &label)| {
            let p = p.clamp(MIN_PROB_FOR_XENTROPY, 1.0 - MIN_PROB_FOR_XENTROPY);
            let y = f64::from(label);
            y * p.log2() + (1.0 - y) * (1.0 - p).log2()
        })
        .sum();
    -sum / forecasts.len() as f64
}
