//! Performance diagrams (Roebber 2009): POD against success ratio, with
//! CSI and frequency-bias contours.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use wxeval_core::{check_length, stats, CoreError, ForecastSet, Result};

use crate::contingency::ContingencyTable;
use crate::thresholds::{get_binarization_thresholds, ThresholdArg};

/// Default grid spacing for success ratio.
pub const DEFAULT_SUCCESS_RATIO_SPACING: f64 = 0.01;

/// Default grid spacing for POD.
pub const DEFAULT_POD_SPACING: f64 = 0.01;

/// Points of a performance diagram, one per binarization threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceDiagram {
    /// Binarization thresholds that produced the points.
    pub thresholds: Vec<f64>,
    /// Success ratio at each threshold (x-axis).
    pub success_ratio_by_threshold: Vec<f64>,
    /// POD at each threshold (y-axis).
    pub pod_by_threshold: Vec<f64>,
}

impl PerformanceDiagram {
    /// CSI at each threshold.
    pub fn csi_by_threshold(&self) -> Vec<f64> {
        csi_unchecked(&self.success_ratio_by_threshold, &self.pod_by_threshold)
    }

    /// Largest CSI over all thresholds, ignoring NaN.
    pub fn max_csi(&self) -> f64 {
        stats::nan_max(&self.csi_by_threshold())
    }
}

pub(crate) fn performance_points(
    probabilities: &[f64],
    labels: &[u8],
    thresholds: &[f64],
) -> (Vec<f64>, Vec<f64>) {
    thresholds
        .iter()
        .map(|&t| {
            let table = ContingencyTable::from_probabilities_unchecked(probabilities, labels, t);
            (table.success_ratio(), table.pod())
        })
        .unzip()
}

/// Determine the points of the performance diagram.
///
/// # Errors
///
/// Fails if the threshold argument is invalid.
pub fn get_points_in_performance_diagram(
    forecasts: &ForecastSet,
    threshold_arg: &ThresholdArg,
) -> Result<PerformanceDiagram> {
    let thresholds = get_binarization_thresholds(threshold_arg, forecasts.probabilities())?;
    let (success_ratio_by_threshold, pod_by_threshold) =
        performance_points(forecasts.probabilities(), forecasts.labels(), &thresholds);

    Ok(PerformanceDiagram {
        thresholds,
        success_ratio_by_threshold,
        pod_by_threshold,
    })
}

fn check_sr_and_pod(success_ratio: &[f64], pod: &[f64], allow_nan: bool) -> Result<()> {
    check_length("POD values", success_ratio.len(), pod.len())?;
    for (what, values) in [("success ratio", success_ratio), ("POD", pod)] {
        for &v in values {
            let ok = (allow_nan && v.is_nan()) || (0.0..=1.0).contains(&v);
            if !ok {
                return Err(CoreError::invalid(format!("{what} must be in [0, 1], got {v}")));
            }
        }
    }
    Ok(())
}

pub(crate) fn csi_unchecked(success_ratio: &[f64], pod: &[f64]) -> Vec<f64> {
    success_ratio
        .iter()
        .zip(pod)
        .map(|(&sr, &pod)| 1.0 / (1.0 / sr + 1.0 / pod - 1.0))
        .collect()
}

/// CSI from success ratio and POD: `(1/SR + 1/POD - 1)^-1`, elementwise.
///
/// NaN inputs propagate to NaN outputs; a zero SR or POD gives CSI 0.
///
/// # Errors
///
/// Fails if the arrays differ in length or hold non-NaN values outside [0, 1].
pub fn csi_from_sr_and_pod(success_ratio: &[f64], pod: &[f64]) -> Result<Vec<f64>> {
    check_sr_and_pod(success_ratio, pod, true)?;
    Ok(csi_unchecked(success_ratio, pod))
}

/// Frequency bias from success ratio and POD: `POD / SR`, elementwise.
///
/// # Errors
///
/// Fails if the arrays differ in length or hold values outside [0, 1].
pub fn frequency_bias_from_sr_and_pod(success_ratio: &[f64], pod: &[f64]) -> Result<Vec<f64>> {
    check_sr_and_pod(success_ratio, pod, false)?;
    Ok(success_ratio.iter().zip(pod).map(|(&sr, &pod)| pod / sr).collect())
}

/// Regular grid in SR-POD space, for contouring CSI and frequency bias
/// behind a performance diagram.
///
/// Returns `(success_ratio_matrix, pod_matrix)`, both with one row per POD
/// value and one column per success ratio. Coordinates are grid-cell
/// centres; success ratio increases along each row and POD decreases down
/// each column (the first row holds the largest POD).
///
/// # Errors
///
/// Fails if a spacing is outside (0, 1).
pub fn get_sr_pod_grid(
    success_ratio_spacing: f64,
    pod_spacing: f64,
) -> Result<(Array2<f64>, Array2<f64>)> {
    let spacings = [
        ("success-ratio spacing", success_ratio_spacing),
        ("POD spacing", pod_spacing),
    ];
    for (what, spacing) in spacings {
        if !(spacing > 0.0 && spacing < 1.0) {
            return Err(CoreError::invalid(format!("{what} must be in (0, 1), got {spacing}")));
        }
    }

    let num_success_ratios = (1.0 / success_ratio_spacing).ceil() as usize;
    let num_pod_values = (1.0 / pod_spacing).ceil() as usize;
    let sr_spacing = 1.0 / num_success_ratios as f64;
    let pod_spacing = 1.0 / num_pod_values as f64;

    let shape = (num_pod_values, num_success_ratios);
    let sr_matrix = Array2::from_shape_fn(shape, |(_, j)| sr_spacing / 2.0 + j as f64 * sr_spacing);
    let pod_matrix = Array2::from_shape_fn(shape, |(i, _)| {
        pod_spacing / 2.0 + (num_pod_values - 1 - i) as f64 * pod_spacing
    });

    Ok((sr_matrix, pod_matrix))
}
