//! Bootstrap confidence envelopes for ROC curves, performance diagrams and
//! reliability curves.
//!
//! Each routine fixes the thresholds (or forecast bins) on the full data,
//! then re-evaluates the curve on `num_iters` resamples of the examples and
//! reduces every per-threshold value and every scalar score across
//! iterations into a [`ConfidenceEnvelope`].
//!
//! Iteration `j` draws its indices from stream `j` of the configured seed,
//! so the parallel and sequential paths give bit-identical envelopes.

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use wxeval_core::{draw_sample, stats, CoreError, ForecastSet, Result, Seed};

use crate::performance::{csi_unchecked, performance_points};
use crate::reliability::{assign_bins, brier_decomposition_unchecked, reliability_points};
use crate::roc::{area_under_curve_unchecked, roc_points};
use crate::thresholds::{get_binarization_thresholds, ThresholdArg};

/// Default number of bootstrap iterations.
pub const DEFAULT_NUM_BOOTSTRAP_ITERS: usize = 100;

/// Default confidence level.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Configuration for bootstrap resampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Number of resamples (must be > 1).
    pub num_iters: usize,
    /// Confidence level of the envelope, in (0, 1).
    pub confidence_level: f64,
    /// Seed for the resampling streams.
    pub seed: Seed,
    /// Run iterations on the rayon thread pool.
    pub parallel: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            num_iters: DEFAULT_NUM_BOOTSTRAP_ITERS,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            seed: Seed::default(),
            parallel: true,
        }
    }
}

impl BootstrapConfig {
    /// Set the number of iterations.
    #[must_use]
    pub fn with_num_iters(mut self, num_iters: usize) -> Self {
        self.num_iters = num_iters;
        self
    }

    /// Set the confidence level.
    #[must_use]
    pub fn with_confidence_level(mut self, confidence_level: f64) -> Self {
        self.confidence_level = confidence_level;
        self
    }

    /// Set the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    /// Enable or disable parallel iterations.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check the iteration count and confidence level.
    pub fn validate(&self) -> Result<()> {
        if self.num_iters < 2 {
            return Err(CoreError::invalid(format!(
                "number of bootstrap iterations must be > 1, got {}",
                self.num_iters
            )));
        }
        stats::check_confidence_level(self.confidence_level)
    }
}

/// Lower bound, NaN-aware mean and upper bound of a bootstrapped quantity.
///
/// `bottom` is the worse-skill side of the envelope. For POFD and mean
/// forecast probability, where larger means worse, it holds the upper
/// percentile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceEnvelope<T> {
    /// Worse-skill bound.
    pub bottom: T,
    /// Mean across iterations.
    pub mean: T,
    /// Better-skill bound.
    pub top: T,
}

/// One member of a ROC envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocEnvelopeMember {
    /// POFD by threshold.
    pub pofd: Vec<f64>,
    /// POD by threshold.
    pub pod: Vec<f64>,
    /// Area under the curve.
    pub auc: f64,
}

/// One member of a performance-diagram envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceEnvelopeMember {
    /// Success ratio by threshold.
    pub success_ratio: Vec<f64>,
    /// POD by threshold.
    pub pod: Vec<f64>,
    /// Maximum CSI over thresholds.
    pub max_csi: f64,
}

/// One member of a reliability envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityEnvelopeMember {
    /// Mean forecast probability by bin.
    pub mean_forecast_prob: Vec<f64>,
    /// Conditional event frequency by bin.
    pub mean_observed_label: Vec<f64>,
    /// Brier skill score.
    pub brier_skill_score: f64,
    /// Brier score.
    pub brier_score: f64,
    /// Reliability term.
    pub reliability: f64,
    /// Resolution term.
    pub resolution: f64,
}

/// Bootstrapped ROC curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocBootstrap {
    /// Thresholds fixed on the full data.
    pub thresholds: Vec<f64>,
    /// Confidence envelope.
    pub envelope: ConfidenceEnvelope<RocEnvelopeMember>,
}

/// Bootstrapped performance diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceBootstrap {
    /// Thresholds fixed on the full data.
    pub thresholds: Vec<f64>,
    /// Confidence envelope.
    pub envelope: ConfidenceEnvelope<PerformanceEnvelopeMember>,
}

/// Bootstrapped reliability curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityBootstrap {
    /// Examples per bin in the full (not resampled) data.
    pub num_examples_by_bin: Vec<usize>,
    /// Confidence envelope.
    pub envelope: ConfidenceEnvelope<ReliabilityEnvelopeMember>,
}

#[derive(Clone, Copy)]
enum Bound {
    Lower,
    Mean,
    Upper,
}

/// Per-row reductions of a `(rows x iterations)` sample matrix.
struct RowSummary {
    lower: Vec<f64>,
    mean: Vec<f64>,
    upper: Vec<f64>,
}

impl RowSummary {
    fn new(samples: &Array2<f64>, confidence_level: f64) -> Result<Self> {
        let mut summary = Self {
            lower: Vec::with_capacity(samples.nrows()),
            mean: Vec::with_capacity(samples.nrows()),
            upper: Vec::with_capacity(samples.nrows()),
        };
        for row in samples.rows() {
            let values = row.to_vec();
            let (lower, upper) = stats::confidence_interval(&values, confidence_level)?;
            summary.lower.push(lower);
            summary.mean.push(stats::nan_mean(&values));
            summary.upper.push(upper);
        }
        Ok(summary)
    }

    fn get(&self, bound: Bound) -> &[f64] {
        match bound {
            Bound::Lower => &self.lower,
            Bound::Mean => &self.mean,
            Bound::Upper => &self.upper,
        }
    }
}

/// Run `evaluate` once per resample of `forecasts` and stack the results
/// as columns of a `(num_rows x num_iters)` matrix.
///
/// `evaluate` gets the resampled probabilities, the labels at the same
/// indices, and the indices themselves.
fn run_iterations<F>(
    config: &BootstrapConfig,
    forecasts: &ForecastSet,
    num_rows: usize,
    evaluate: F,
) -> Array2<f64>
where
    F: Fn(&[f64], &[u8], &[usize]) -> Vec<f64> + Sync,
{
    let iteration = |j: usize| {
        let mut rng = config.seed.stream_rng(j as u64);
        let (probs, indices) = draw_sample(forecasts.probabilities(), &mut rng);
        let labels: Vec<u8> = indices.iter().map(|&i| forecasts.labels()[i]).collect();
        evaluate(&probs, &labels, &indices)
    };

    let columns: Vec<Vec<f64>> = if config.parallel {
        (0..config.num_iters).into_par_iter().map(iteration).collect()
    } else {
        (0..config.num_iters).map(iteration).collect()
    };

    let mut samples = Array2::from_elem((num_rows, config.num_iters), f64::NAN);
    for (j, column) in columns.iter().enumerate() {
        for (i, &value) in column.iter().enumerate() {
            samples[[i, j]] = value;
        }
    }
    samples
}

/// Bootstrap the ROC curve and its area.
///
/// # Errors
///
/// Fails if the configuration or threshold argument is invalid.
pub fn bootstrap_roc_curve(
    forecasts: &ForecastSet,
    threshold_arg: &ThresholdArg,
    config: &BootstrapConfig,
) -> Result<RocBootstrap> {
    config.validate()?;
    let thresholds = get_binarization_thresholds(threshold_arg, forecasts.probabilities())?;
    let t = thresholds.len();
    tracing::debug!(num_iters = config.num_iters, num_thresholds = t, "bootstrapping ROC curve");

    let samples = run_iterations(config, forecasts, 2 * t + 1, |probs, labels, _| {
        let (pofd, pod) = roc_points(probs, labels, &thresholds);
        let auc = area_under_curve_unchecked(&pofd, &pod);

        let mut column = pofd;
        column.extend(pod);
        column.push(auc);
        column
    });

    let s = RowSummary::new(&samples, config.confidence_level)?;
    let member = |pofd: Bound, pod: Bound| RocEnvelopeMember {
        pofd: s.get(pofd)[..t].to_vec(),
        pod: s.get(pod)[t..2 * t].to_vec(),
        auc: s.get(pod)[2 * t],
    };

    Ok(RocBootstrap {
        thresholds,
        envelope: ConfidenceEnvelope {
            bottom: member(Bound::Upper, Bound::Lower),
            mean: member(Bound::Mean, Bound::Mean),
            top: member(Bound::Lower, Bound::Upper),
        },
    })
}

/// Bootstrap the performance diagram and its maximum CSI.
///
/// # Errors
///
/// Fails if the configuration or threshold argument is invalid.
pub fn bootstrap_performance_diagram(
    forecasts: &ForecastSet,
    threshold_arg: &ThresholdArg,
    config: &BootstrapConfig,
) -> Result<PerformanceBootstrap> {
    config.validate()?;
    let thresholds = get_binarization_thresholds(threshold_arg, forecasts.probabilities())?;
    let t = thresholds.len();
    tracing::debug!(
        num_iters = config.num_iters,
        num_thresholds = t,
        "bootstrapping performance diagram"
    );

    let samples = run_iterations(config, forecasts, 2 * t + 1, |probs, labels, _| {
        let (success_ratio, pod) = performance_points(probs, labels, &thresholds);
        let max_csi = stats::nan_max(&csi_unchecked(&success_ratio, &pod));

        let mut column = success_ratio;
        column.extend(pod);
        column.push(max_csi);
        column
    });

    let s = RowSummary::new(&samples, config.confidence_level)?;
    let member = |bound: Bound| PerformanceEnvelopeMember {
        success_ratio: s.get(bound)[..t].to_vec(),
        pod: s.get(bound)[t..2 * t].to_vec(),
        max_csi: s.get(bound)[2 * t],
    };

    Ok(PerformanceBootstrap {
        thresholds,
        envelope: ConfidenceEnvelope {
            bottom: member(Bound::Lower),
            mean: member(Bound::Mean),
            top: member(Bound::Upper),
        },
    })
}

/// Bootstrap the reliability curve and the Brier decomposition.
///
/// Each example keeps the bin it falls into on the full data, and the
/// climatology of each iteration is the mean resampled label.
///
/// # Errors
///
/// Fails if the configuration is invalid or `num_bins < 2`.
pub fn bootstrap_reliability_curve(
    forecasts: &ForecastSet,
    num_bins: usize,
    config: &BootstrapConfig,
) -> Result<ReliabilityBootstrap> {
    config.validate()?;
    let full = crate::reliability::get_points_in_reliability_curve(forecasts, num_bins)?;
    let bins = assign_bins(forecasts.probabilities(), num_bins);
    let b = num_bins;
    tracing::debug!(num_iters = config.num_iters, num_bins = b, "bootstrapping reliability curve");

    let samples = run_iterations(config, forecasts, 2 * b + 4, |_, labels, indices| {
        let curve = reliability_points(
            forecasts.probabilities(),
            forecasts.labels(),
            &bins,
            b,
            indices.iter().copied(),
        );
        let num_events: usize = labels.iter().map(|&l| usize::from(l)).sum();
        let climatology = num_events as f64 / labels.len() as f64;
        let bss = brier_decomposition_unchecked(
            &curve.mean_forecast_prob_by_bin,
            &curve.mean_observed_label_by_bin,
            &curve.num_examples_by_bin,
            climatology,
        );

        let mut column = curve.mean_forecast_prob_by_bin;
        column.extend(curve.mean_observed_label_by_bin);
        column.extend([bss.brier_skill_score, bss.brier_score, bss.reliability, bss.resolution]);
        column
    });

    let s = RowSummary::new(&samples, config.confidence_level)?;
    let member = |forecast: Bound, bound: Bound| {
        let scalars = &s.get(bound)[2 * b..];
        ReliabilityEnvelopeMember {
            mean_forecast_prob: s.get(forecast)[..b].to_vec(),
            mean_observed_label: s.get(bound)[b..2 * b].to_vec(),
            brier_skill_score: scalars[0],
            brier_score: scalars[1],
            reliability: scalars[2],
            resolution: scalars[3],
        }
    };

    Ok(ReliabilityBootstrap {
        num_examples_by_bin: full.num_examples_by_bin,
        envelope: ConfidenceEnvelope {
            bottom: member(Bound::Upper, Bound::Lower),
            mean: member(Bound::Mean, Bound::Mean),
            top: member(Bound::Lower, Bound::Upper),
        },
    })
}
