//! Reliability (attributes) diagrams and the Brier skill score.
//!
//! A forecast is reliable when, among all cases forecast with probability
//! `p`, the event is observed a fraction `p` of the time. Forecasts are
//! grouped into equal-width probability bins and the mean forecast of each
//! bin is compared with its observed event frequency.
//!
//! The Brier score decomposes (Murphy 1973) into
//! `uncertainty + reliability - resolution`, and the Brier skill score
//! against climatology is `(resolution - reliability) / uncertainty`.

use serde::{Deserialize, Serialize};
use wxeval_core::{check_length, CoreError, ForecastSet, Result};

/// Default number of forecast bins.
pub const DEFAULT_NUM_FORECAST_BINS: usize = 10;

/// Per-bin points of a reliability curve.
///
/// Bins with no examples have NaN means and a count of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityCurve {
    /// Mean forecast probability in each bin (x-axis).
    pub mean_forecast_prob_by_bin: Vec<f64>,
    /// Conditional event frequency in each bin (y-axis).
    pub mean_observed_label_by_bin: Vec<f64>,
    /// Number of examples in each bin.
    pub num_examples_by_bin: Vec<usize>,
}

impl ReliabilityCurve {
    /// Number of bins.
    pub fn num_bins(&self) -> usize {
        self.num_examples_by_bin.len()
    }

    /// Total number of examples over all bins.
    pub fn total_examples(&self) -> usize {
        self.num_examples_by_bin.iter().sum()
    }

    /// Brier decomposition of this curve against `climatology`.
    ///
    /// # Errors
    ///
    /// Fails if the climatology is outside [0, 1].
    pub fn brier_decomposition(&self, climatology: f64) -> Result<BrierDecomposition> {
        get_brier_skill_score(
            &self.mean_forecast_prob_by_bin,
            &self.mean_observed_label_by_bin,
            &self.num_examples_by_bin,
            climatology,
        )
    }

    /// Text summary, one line per non-empty bin.
    pub fn summary(&self) -> String {
        let mut output = String::new();
        output.push_str("=== Reliability Curve ===\n\n");
        output.push_str(&format!("Number of bins: {}\n", self.num_bins()));
        output.push_str(&format!("Total examples: {}\n\n", self.total_examples()));

        output.push_str("  Bin  | Mean fcst | Obs freq | Count | Gap\n");
        output.push_str("-------+-----------+----------+-------+------\n");

        for i in 0..self.num_bins() {
            if self.num_examples_by_bin[i] == 0 {
                continue;
            }
            let gap = self.mean_forecast_prob_by_bin[i] - self.mean_observed_label_by_bin[i];
            let gap_str = if gap.abs() <= 0.01 {
                "~0.00".to_string()
            } else {
                format!("{gap:+.2}")
            };

            output.push_str(&format!(
                "  {:3}  |   {:.3}   |  {:.3}   | {:5} | {}\n",
                i + 1,
                self.mean_forecast_prob_by_bin[i],
                self.mean_observed_label_by_bin[i],
                self.num_examples_by_bin[i],
                gap_str
            ));
        }

        output
    }
}

/// Brier score and its decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrierDecomposition {
    /// `(resolution - reliability) / uncertainty`; NaN when uncertainty is 0.
    pub brier_skill_score: f64,
    /// `uncertainty + reliability - resolution`.
    pub brier_score: f64,
    /// Count-weighted squared gap between mean forecast and observed frequency.
    pub reliability: f64,
    /// Count-weighted squared gap between observed frequency and climatology.
    pub resolution: f64,
    /// `climatology * (1 - climatology)`.
    pub uncertainty: f64,
}

fn check_num_bins(num_bins: usize) -> Result<()> {
    if num_bins < 2 {
        return Err(CoreError::invalid(format!(
            "number of forecast bins must be at least 2, got {num_bins}"
        )));
    }
    Ok(())
}

fn check_climatology(climatology: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&climatology) {
        return Err(CoreError::invalid(format!(
            "climatology must be in [0, 1], got {climatology}"
        )));
    }
    Ok(())
}

/// Bin index of each probability: `floor(p * num_bins)`, with p = 1 in the
/// last bin.
pub(crate) fn assign_bins(probabilities: &[f64], num_bins: usize) -> Vec<usize> {
    probabilities
        .iter()
        .map(|&p| ((p * num_bins as f64).floor() as usize).min(num_bins - 1))
        .collect()
}

/// Per-bin means over the examples at `indices` (repeats allowed), using
/// bins fixed in advance.
pub(crate) fn reliability_points(
    probabilities: &[f64],
    labels: &[u8],
    bin_by_example: &[usize],
    num_bins: usize,
    indices: impl IntoIterator<Item = usize>,
) -> ReliabilityCurve {
    let mut prob_sums = vec![0.0; num_bins];
    let mut label_sums = vec![0.0; num_bins];
    let mut num_examples_by_bin = vec![0usize; num_bins];

    for i in indices {
        let bin = bin_by_example[i];
        prob_sums[bin] += probabilities[i];
        label_sums[bin] += f64::from(labels[i]);
        num_examples_by_bin[bin] += 1;
    }

    let mean = |sum: f64, count: usize| if count == 0 { f64::NAN } else { sum / count as f64 };
    ReliabilityCurve {
        mean_forecast_prob_by_bin: prob_sums
            .iter()
            .zip(&num_examples_by_bin)
            .map(|(&s, &c)| mean(s, c))
            .collect(),
        mean_observed_label_by_bin: label_sums
            .iter()
            .zip(&num_examples_by_bin)
            .map(|(&s, &c)| mean(s, c))
            .collect(),
        num_examples_by_bin,
    }
}

/// Determine the points of the reliability curve with `num_bins`
/// equal-width bins over [0, 1].
///
/// # Errors
///
/// Fails if `num_bins < 2`.
pub fn get_points_in_reliability_curve(
    forecasts: &ForecastSet,
    num_bins: usize,
) -> Result<ReliabilityCurve> {
    check_num_bins(num_bins)?;
    let bins = assign_bins(forecasts.probabilities(), num_bins);
    Ok(reliability_points(
        forecasts.probabilities(),
        forecasts.labels(),
        &bins,
        num_bins,
        0..forecasts.len(),
    ))
}

/// `sum(n * gap^2) / sum(n)`, skipping NaN terms.
fn weighted_mean_square(num_examples_by_bin: &[usize], gaps: impl Iterator<Item = f64>) -> f64 {
    let total: usize = num_examples_by_bin.iter().sum();
    let sum: f64 = num_examples_by_bin
        .iter()
        .zip(gaps)
        .map(|(&n, gap)| n as f64 * gap * gap)
        .filter(|v| !v.is_nan())
        .sum();
    sum / total as f64
}

pub(crate) fn brier_decomposition_unchecked(
    mean_forecast_prob_by_bin: &[f64],
    mean_observed_label_by_bin: &[f64],
    num_examples_by_bin: &[usize],
    climatology: f64,
) -> BrierDecomposition {
    let uncertainty = climatology * (1.0 - climatology);
    let reliability = weighted_mean_square(
        num_examples_by_bin,
        mean_forecast_prob_by_bin
            .iter()
            .zip(mean_observed_label_by_bin)
            .map(|(&f, &o)| f - o),
    );
    let resolution = weighted_mean_square(
        num_examples_by_bin,
        mean_observed_label_by_bin.iter().map(|&o| o - climatology),
    );
    let brier_score = uncertainty + reliability - resolution;
    let brier_skill_score = if uncertainty == 0.0 {
        f64::NAN
    } else {
        (resolution - reliability) / uncertainty
    };

    BrierDecomposition {
        brier_skill_score,
        brier_score,
        reliability,
        resolution,
        uncertainty,
    }
}

/// Brier skill score and decomposition from reliability-curve points.
///
/// Bins whose means are NaN contribute nothing to the sums.
///
/// # Errors
///
/// Fails if the arrays differ in length, a mean is outside [0, 1] (NaN is
/// allowed), or the climatology is outside [0, 1].
pub fn get_brier_skill_score(
    mean_forecast_prob_by_bin: &[f64],
    mean_observed_label_by_bin: &[f64],
    num_examples_by_bin: &[usize],
    climatology: f64,
) -> Result<BrierDecomposition> {
    let num_bins = mean_forecast_prob_by_bin.len();
    check_length("mean observed labels", num_bins, mean_observed_label_by_bin.len())?;
    check_length("example counts", num_bins, num_examples_by_bin.len())?;
    for (what, values) in [
        ("mean forecast probability", mean_forecast_prob_by_bin),
        ("mean observed label", mean_observed_label_by_bin),
    ] {
        if let Some(bad) = values.iter().find(|v| !v.is_nan() && !(0.0..=1.0).contains(*v)) {
            return Err(CoreError::invalid(format!("{what} must be in [0, 1] or NaN, got {bad}")));
        }
    }
    check_climatology(climatology)?;

    if climatology == 0.0 || climatology == 1.0 {
        tracing::warn!(climatology, "single-class labels, Brier skill score is undefined");
    }

    Ok(brier_decomposition_unchecked(
        mean_forecast_prob_by_bin,
        mean_observed_label_by_bin,
        num_examples_by_bin,
        climatology,
    ))
}

/// A line or polygon in reliability-diagram coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramLine {
    /// x-coordinates.
    pub x: Vec<f64>,
    /// y-coordinates.
    pub y: Vec<f64>,
}

impl DiagramLine {
    fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self { x, y }
    }
}

/// Perfect reliability: the 1:1 diagonal.
pub fn get_perfect_reliability_curve() -> DiagramLine {
    DiagramLine::new(vec![0.0, 1.0], vec![0.0, 1.0])
}

/// No-skill line, halfway between perfect reliability and no resolution.
///
/// # Errors
///
/// Fails if the climatology is outside [0, 1].
pub fn get_no_skill_reliability_curve(climatology: f64) -> Result<DiagramLine> {
    check_climatology(climatology)?;
    Ok(DiagramLine::new(
        vec![0.0, 1.0],
        vec![climatology / 2.0, (1.0 + climatology) / 2.0],
    ))
}

/// Vertical line at the climatological forecast.
///
/// # Errors
///
/// Fails if the climatology is outside [0, 1].
pub fn get_climatology_line_for_reliability_curve(climatology: f64) -> Result<DiagramLine> {
    check_climatology(climatology)?;
    Ok(DiagramLine::new(vec![climatology, climatology], vec![0.0, 1.0]))
}

/// Horizontal line at the climatological frequency.
///
/// # Errors
///
/// Fails if the climatology is outside [0, 1].
pub fn get_no_resolution_line_for_reliability_curve(climatology: f64) -> Result<DiagramLine> {
    check_climatology(climatology)?;
    Ok(DiagramLine::new(vec![0.0, 1.0], vec![climatology, climatology]))
}

/// Regions of the diagram where forecasts have positive Brier skill.
///
/// Returns `(left, right)` closed polygons of five vertices each: the left
/// one below climatology, the right one above.
///
/// # Errors
///
/// Fails if the climatology is outside [0, 1].
pub fn get_skill_areas_in_reliability_curve(
    climatology: f64,
) -> Result<(DiagramLine, DiagramLine)> {
    check_climatology(climatology)?;
    let c = climatology;
    let left = DiagramLine::new(vec![0.0, c, c, 0.0, 0.0], vec![0.0, 0.0, c, c / 2.0, 0.0]);
    let right = DiagramLine::new(vec![c, 1.0, 1.0, c, c], vec![c, (1.0 + c) / 2.0, 1.0, 1.0, c]);
    Ok((left, right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::get_brier_score;

    #[test]
    fn test_bin_assignment() {
        let bins = assign_bins(&[0.0, 0.09, 0.1, 0.55, 0.999, 1.0], 10);
        assert_eq!(bins, vec![0, 0, 1, 5, 9, 9]);
    }

    #[test]
    fn test_bin_edges_belong_to_the_upper_bin() {
        // Every exact edge k/10 lands in bin k, except p = 1 which stays in the last bin.
        let edges: Vec<f64> = (0..=10).map(|k| f64::from(k) / 10.0).collect();
        let bins = assign_bins(&edges, 10);
        assert_eq!(bins, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 9]);

        assert_eq!(assign_bins(&[0.299_999_99, 0.3, 0.300_000_01], 10), vec![2, 3, 3]);

        let set = ForecastSet::new(vec![0.3, 1.0], vec![1, 0]).unwrap();
        let curve = get_points_in_reliability_curve(&set, 10).unwrap();
        assert_eq!(curve.num_examples_by_bin[3], 1);
        assert_eq!(curve.num_examples_by_bin[9], 1);
        assert_eq!(curve.total_examples(), 2);
    }

    #[test]
    fn test_default_bin_count() {
        assert_eq!(DEFAULT_NUM_FORECAST_BINS, 10);
        let set = ForecastSet::new(vec![0.05, 0.95], vec![0, 1]).unwrap();
        let curve = get_points_in_reliability_curve(&set, DEFAULT_NUM_FORECAST_BINS).unwrap();
        assert_eq!(curve.num_bins(), 10);
    }

    #[test]
    fn test_reliability_curve_points() {
        let set =
            ForecastSet::new(vec![0.1, 0.2, 0.3, 0.8, 0.9, 1.0], vec![0, 0, 1, 1, 0, 1]).unwrap();
        let curve = get_points_in_reliability_curve(&set, 2).unwrap();

        assert_eq!(curve.num_examples_by_bin, vec![3, 3]);
        assert!((curve.mean_forecast_prob_by_bin[0] - 0.2).abs() < 1e-12);
        assert!((curve.mean_forecast_prob_by_bin[1] - 0.9).abs() < 1e-12);
        assert!((curve.mean_observed_label_by_bin[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((curve.mean_observed_label_by_bin[1] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_bins_are_nan() {
        let set = ForecastSet::new(vec![0.05, 0.95], vec![0, 1]).unwrap();
        let curve = get_points_in_reliability_curve(&set, 4).unwrap();
        assert_eq!(curve.num_examples_by_bin, vec![1, 0, 0, 1]);
        assert!(curve.mean_forecast_prob_by_bin[1].is_nan());
        assert!(curve.mean_observed_label_by_bin[2].is_nan());

        assert!(get_points_in_reliability_curve(&set, 1).is_err());
    }

    #[test]
    fn test_brier_decomposition_identity() {
        let set = ForecastSet::new(
            vec![0.05, 0.15, 0.25, 0.45, 0.55, 0.65, 0.85, 0.95, 0.35, 0.75],
            vec![0, 0, 1, 0, 1, 1, 1, 1, 0, 0],
        )
        .unwrap();
        let curve = get_points_in_reliability_curve(&set, 10).unwrap();
        let bss = curve.brier_decomposition(set.climatology()).unwrap();

        let recomposed = bss.uncertainty + bss.reliability - bss.resolution;
        assert!((bss.brier_score - recomposed).abs() < 1e-6);
        assert!((bss.uncertainty - 0.25).abs() < 1e-12);
        // One example per bin, so the decomposition is exact.
        assert!((bss.brier_score - get_brier_score(&set)).abs() < 1e-9);
    }

    #[test]
    fn test_brier_skill_score_by_hand() {
        let bss =
            get_brier_skill_score(&[0.2, f64::NAN, 0.8], &[0.0, f64::NAN, 1.0], &[5, 0, 5], 0.5)
                .unwrap();
        // reliability = (5 * 0.04 + 5 * 0.04) / 10, resolution = 0.25
        assert!((bss.reliability - 0.04).abs() < 1e-12);
        assert!((bss.resolution - 0.25).abs() < 1e-12);
        assert!((bss.brier_score - 0.04).abs() < 1e-12);
        assert!((bss.brier_skill_score - 0.84).abs() < 1e-12);
    }

    #[test]
    fn test_brier_skill_score_undefined_without_uncertainty() {
        let bss = get_brier_skill_score(&[0.1, 0.7], &[0.0, 0.0], &[3, 1], 0.0).unwrap();
        assert!(bss.brier_skill_score.is_nan());
        assert!(bss.brier_score.is_finite());
    }

    #[test]
    fn test_brier_skill_score_validation() {
        assert!(get_brier_skill_score(&[0.1], &[0.1, 0.2], &[1, 1], 0.5).is_err());
        assert!(get_brier_skill_score(&[0.1], &[0.1], &[1, 1], 0.5).is_err());
        assert!(get_brier_skill_score(&[1.2], &[0.1], &[1], 0.5).is_err());
        assert!(get_brier_skill_score(&[0.1], &[0.1], &[1], 1.5).is_err());
    }

    #[test]
    fn test_reference_lines() {
        let no_skill = get_no_skill_reliability_curve(0.2).unwrap();
        assert_eq!(no_skill.x, vec![0.0, 1.0]);
        assert!((no_skill.y[0] - 0.1).abs() < 1e-12);
        assert!((no_skill.y[1] - 0.6).abs() < 1e-12);

        let clim = get_climatology_line_for_reliability_curve(0.2).unwrap();
        assert_eq!(clim.x, vec![0.2, 0.2]);
        let no_res = get_no_resolution_line_for_reliability_curve(0.2).unwrap();
        assert_eq!(no_res.y, vec![0.2, 0.2]);
        assert_eq!(get_perfect_reliability_curve().y, vec![0.0, 1.0]);

        assert!(get_no_skill_reliability_curve(-0.1).is_err());
    }

    #[test]
    fn test_skill_areas() {
        let (left, right) = get_skill_areas_in_reliability_curve(0.4).unwrap();
        assert_eq!(left.x, vec![0.0, 0.4, 0.4, 0.0, 0.0]);
        assert_eq!(left.y, vec![0.0, 0.0, 0.4, 0.2, 0.0]);
        assert_eq!(right.x, vec![0.4, 1.0, 1.0, 0.4, 0.4]);
        assert!((right.y[1] - 0.7).abs() < 1e-12);
        assert_eq!(left.x.first(), left.x.last());
        assert!(get_skill_areas_in_reliability_curve(1.1).is_err());
    }

    #[test]
    fn test_summary() {
        let set = ForecastSet::new(vec![0.1, 0.9], vec![0, 1]).unwrap();
        let summary = get_points_in_reliability_curve(&set, 10).unwrap().summary();
        assert!(summary.contains("Reliability Curve"));
        assert!(summary.contains("Total examples: 2"));
    }
}
