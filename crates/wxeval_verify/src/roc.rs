//! ROC (relative operating characteristic) curves.

use serde::{Deserialize, Serialize};
use wxeval_core::{check_length, CoreError, ForecastSet, Result};

use crate::contingency::ContingencyTable;
use crate::thresholds::{get_binarization_thresholds, ThresholdArg};

/// Points of a ROC curve, one per binarization threshold (ascending).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    /// Binarization thresholds that produced the points.
    pub thresholds: Vec<f64>,
    /// POFD at each threshold (x-axis).
    pub pofd_by_threshold: Vec<f64>,
    /// POD at each threshold (y-axis).
    pub pod_by_threshold: Vec<f64>,
}

impl RocCurve {
    /// Area under this curve. See [`get_area_under_roc_curve`].
    pub fn area_under_curve(&self) -> f64 {
        area_under_curve_unchecked(&self.pofd_by_threshold, &self.pod_by_threshold)
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    /// Whether the curve has no points.
    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }
}

/// Sweep the thresholds, returning `(pofd, pod)` per threshold.
pub(crate) fn roc_points(
    probabilities: &[f64],
    labels: &[u8],
    thresholds: &[f64],
) -> (Vec<f64>, Vec<f64>) {
    thresholds
        .iter()
        .map(|&t| {
            let table = ContingencyTable::from_probabilities_unchecked(probabilities, labels, t);
            (table.pofd(), table.pod())
        })
        .unzip()
}

/// Determine the points of the ROC curve.
///
/// # Errors
///
/// Fails if the threshold argument is invalid.
pub fn get_points_in_roc_curve(
    forecasts: &ForecastSet,
    threshold_arg: &ThresholdArg,
) -> Result<RocCurve> {
    let thresholds = get_binarization_thresholds(threshold_arg, forecasts.probabilities())?;
    let (pofd_by_threshold, pod_by_threshold) =
        roc_points(forecasts.probabilities(), forecasts.labels(), &thresholds);

    Ok(RocCurve {
        thresholds,
        pofd_by_threshold,
        pod_by_threshold,
    })
}

fn check_unit_or_nan(what: &str, values: &[f64]) -> Result<()> {
    if let Some(bad) = values.iter().find(|v| !v.is_nan() && !(0.0..=1.0).contains(*v)) {
        return Err(CoreError::invalid(format!("{what} must be in [0, 1] or NaN, got {bad}")));
    }
    Ok(())
}

/// Area under the ROC curve, ignoring NaN points.
///
/// Points are ordered by descending POFD (from the top-right corner toward
/// the origin), every pair in which either value is NaN is dropped, and the
/// rest is integrated with the trapezoidal rule. A single NaN therefore does
/// not poison the whole area. Fewer than two usable points give NaN.
///
/// # Errors
///
/// Fails if the arrays differ in length or hold non-NaN values outside [0, 1].
pub fn get_area_under_roc_curve(
    pofd_by_threshold: &[f64],
    pod_by_threshold: &[f64],
) -> Result<f64> {
    check_length("POD values", pofd_by_threshold.len(), pod_by_threshold.len())?;
    check_unit_or_nan("POFD", pofd_by_threshold)?;
    check_unit_or_nan("POD", pod_by_threshold)?;
    Ok(area_under_curve_unchecked(pofd_by_threshold, pod_by_threshold))
}

pub(crate) fn area_under_curve_unchecked(pofd: &[f64], pod: &[f64]) -> f64 {
    let mut points: Vec<(f64, f64)> = pofd
        .iter()
        .zip(pod)
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(&x, &y)| (x, y))
        .collect();

    if points.len() < 2 {
        return f64::NAN;
    }

    // Stable, so points sharing a POFD keep their threshold order.
    points.sort_by(|a, b| b.0.total_cmp(&a.0));

    points
        .windows(2)
        .map(|w| (w[0].0 - w[1].0) * (w[0].1 + w[1].1) / 2.0)
        .sum()
}

/// The ROC curve of a random forecast: the diagonal from (0, 0) to (1, 1).
pub fn get_random_roc_curve() -> (Vec<f64>, Vec<f64>) {
    (vec![0.0, 1.0], vec![0.0, 1.0])
}
