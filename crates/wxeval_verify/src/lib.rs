//! # wxeval_verify
//!
//! Verification of probabilistic forecasts of binary events.
//!
//! This crate provides:
//! - Contingency tables and the scores derived from them (POD, POFD, CSI, ...)
//! - Threshold sweeps: ROC curves and performance diagrams
//! - Reliability curves, the Brier skill score and its decomposition
//! - Bootstrap confidence envelopes for every curve and scalar score
//! - A one-call [`VerificationReport`]
//!
//! ## Example
//!
//! ```rust
//! use wxeval_core::{ForecastSet, Seed};
//! use wxeval_verify::{
//!     bootstrap_roc_curve, get_points_in_roc_curve, BootstrapConfig, ThresholdArg,
//! };
//!
//! let set = ForecastSet::new(vec![0.1, 0.8, 0.3, 0.6, 0.9], vec![0, 1, 0, 0, 1]).unwrap();
//! let roc = get_points_in_roc_curve(&set, &ThresholdArg::unique()).unwrap();
//! assert!(roc.area_under_curve() > 0.5);
//!
//! let config = BootstrapConfig::default().with_num_iters(20).with_seed(Seed::new(1));
//! let envelope = bootstrap_roc_curve(&set, &ThresholdArg::unique(), &config).unwrap().envelope;
//! assert_eq!(envelope.mean.pod.len(), roc.len());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod bootstrap;
mod contingency;
mod performance;
mod reliability;
mod report;
mod roc;
mod scores;
mod thresholds;

pub use bootstrap::{
    bootstrap_performance_diagram, bootstrap_reliability_curve, bootstrap_roc_curve,
    BootstrapConfig, ConfidenceEnvelope, PerformanceBootstrap, PerformanceEnvelopeMember,
    ReliabilityBootstrap, ReliabilityEnvelopeMember, RocBootstrap, RocEnvelopeMember,
    DEFAULT_CONFIDENCE_LEVEL, DEFAULT_NUM_BOOTSTRAP_ITERS,
};
pub use contingency::{
    binarize_forecast_probs, check_threshold, ContingencyTable, MAX_BINARIZATION_THRESHOLD,
    MIN_BINARIZATION_THRESHOLD,
};
pub use performance::{
    csi_from_sr_and_pod, frequency_bias_from_sr_and_pod, get_points_in_performance_diagram,
    get_sr_pod_grid, PerformanceDiagram, DEFAULT_POD_SPACING, DEFAULT_SUCCESS_RATIO_SPACING,
};
pub use reliability::{
    get_brier_skill_score, get_climatology_line_for_reliability_curve,
    get_no_resolution_line_for_reliability_curve, get_no_skill_reliability_curve,
    get_perfect_reliability_curve, get_points_in_reliability_curve,
    get_skill_areas_in_reliability_curve, BrierDecomposition, DiagramLine, ReliabilityCurve,
    DEFAULT_NUM_FORECAST_BINS,
};
pub use report::{
    verification_report, DeterministicScores, EvaluationConfig, VerificationReport,
    DEFAULT_DECISION_THRESHOLD,
};
pub use roc::{get_area_under_roc_curve, get_points_in_roc_curve, get_random_roc_curve, RocCurve};
pub use scores::{get_brier_score, get_cross_entropy, MIN_PROB_FOR_XENTROPY};
pub use thresholds::{
    get_binarization_thresholds, round_to_nearest, ThresholdArg, DEFAULT_PRECISION_FOR_THRESHOLDS,
    MAX_PRECISION_FOR_THRESHOLDS,
};
