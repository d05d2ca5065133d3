//! Binarization thresholds for ROC curves and performance diagrams.

use serde::{Deserialize, Serialize};
use wxeval_core::{CoreError, Result};

use crate::contingency::{check_threshold, MAX_BINARIZATION_THRESHOLD, MIN_BINARIZATION_THRESHOLD};

/// Default rounding precision for [`ThresholdArg::UniqueForecasts`].
pub const DEFAULT_PRECISION_FOR_THRESHOLDS: f64 = 1e-4;

/// Largest admissible rounding precision.
pub const MAX_PRECISION_FOR_THRESHOLDS: f64 = 0.01;

/// How to choose binarization thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdArg {
    /// Every unique forecast probability, after rounding to the nearest
    /// multiple of `precision` (in (0, 0.01]) so that huge datasets do not
    /// produce millions of thresholds.
    UniqueForecasts {
        /// Rounding precision.
        precision: f64,
    },
    /// Caller-supplied thresholds.
    Explicit(Vec<f64>),
    /// This many thresholds, equally spaced over [0, 1].
    Count(usize),
}

impl Default for ThresholdArg {
    fn default() -> Self {
        Self::UniqueForecasts {
            precision: DEFAULT_PRECISION_FOR_THRESHOLDS,
        }
    }
}

impl ThresholdArg {
    /// Unique forecasts with the default precision.
    pub fn unique() -> Self {
        Self::default()
    }
}

/// Round `value` to the nearest multiple of `precision` (ties to even).
pub fn round_to_nearest(value: f64, precision: f64) -> f64 {
    (value / precision).round_ties_even() * precision
}

/// Sort the thresholds and make sure they span [0, 1 + 1e-6].
///
/// This guarantees POD = POFD = 1 at the lowest threshold (top-right corner
/// of the ROC curve) and POD = POFD = 0 at the highest (bottom-left corner).
fn pad_binarization_thresholds(mut thresholds: Vec<f64>) -> Vec<f64> {
    thresholds.sort_by(f64::total_cmp);

    if thresholds.first().map_or(true, |&t| t > MIN_BINARIZATION_THRESHOLD) {
        thresholds.insert(0, MIN_BINARIZATION_THRESHOLD);
    }
    if thresholds.last().map_or(true, |&t| t < MAX_BINARIZATION_THRESHOLD) {
        thresholds.push(MAX_BINARIZATION_THRESHOLD);
    }
    thresholds
}

/// Build the sorted, padded list of binarization thresholds.
///
/// `probabilities` is only read for [`ThresholdArg::UniqueForecasts`].
///
/// # Errors
///
/// Fails if the precision is outside (0, 0.01], an explicit threshold is
/// outside `[0, 1 + 1e-6]`, an explicit list is empty, or a count is below 2.
pub fn get_binarization_thresholds(arg: &ThresholdArg, probabilities: &[f64]) -> Result<Vec<f64>> {
    let thresholds = match arg {
        ThresholdArg::UniqueForecasts { precision } => {
            let precision = *precision;
            if !(precision > 0.0 && precision <= MAX_PRECISION_FOR_THRESHOLDS) {
                return Err(CoreError::invalid(format!(
                    "unique-forecast precision must be in (0, {}], got {precision}",
                    MAX_PRECISION_FOR_THRESHOLDS
                )));
            }

            let mut rounded: Vec<f64> = probabilities
                .iter()
                .map(|&p| round_to_nearest(p, precision))
                .collect();
            rounded.sort_by(f64::total_cmp);
            rounded.dedup();
            rounded
        }
        ThresholdArg::Explicit(values) => {
            if values.is_empty() {
                return Err(CoreError::EmptyInput("binarization thresholds"));
            }
            for &value in values {
                check_threshold(value)?;
            }
            values.clone()
        }
        ThresholdArg::Count(num_thresholds) => {
            let k = *num_thresholds;
            if k < 2 {
                return Err(CoreError::invalid(format!(
                    "number of thresholds must be at least 2, got {k}"
                )));
            }
            (0..k).map(|i| i as f64 / (k - 1) as f64).collect()
        }
    };

    let thresholds = pad_binarization_thresholds(thresholds);
    tracing::debug!(num_thresholds = thresholds.len(), "built binarization thresholds");
    Ok(thresholds)
}
