//! # wxeval
//!
//! Verification of probabilistic forecasts of binary weather events in Rust.
//!
//! wxeval scores forecast probabilities of a yes/no event (tornado, damaging
//! wind, ...) against what was observed:
//!
//! - **Core**: validated forecast sets, seeds, bootstrap resampling, NaN-aware statistics
//! - **Verify**: contingency tables, ROC curves, performance diagrams, reliability
//!   curves, Brier skill score, bootstrap confidence envelopes, verification reports
//! - **Analysis**: cost functions, bootstrapped costs, predictor permutation tests
//!
//! ## Quick Start
//!
//! ```rust
//! use wxeval::prelude::*;
//!
//! let set = ForecastSet::new(
//!     vec![0.05, 0.2, 0.35, 0.5, 0.65, 0.8, 0.95],
//!     vec![0, 0, 1, 0, 1, 1, 1],
//! )?;
//!
//! let roc = get_points_in_roc_curve(&set, &ThresholdArg::unique())?;
//! println!("AUC = {:.3}", roc.area_under_curve());
//!
//! let config = BootstrapConfig::default().with_num_iters(50).with_seed(Seed::new(42));
//! let envelope = bootstrap_roc_curve(&set, &ThresholdArg::Count(11), &config)?.envelope;
//! assert!(envelope.bottom.auc <= envelope.top.auc);
//!
//! let report = verification_report(&set, &EvaluationConfig::default())?;
//! println!("{}", report.summary());
//! # Ok::<(), wxeval::core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export all crates
pub use wxeval_analysis as analysis;
pub use wxeval_core as core;
pub use wxeval_verify as verify;

/// Prelude module for convenient imports.
///
/// ```rust
/// use wxeval::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use wxeval_core::{CoreError, ForecastSet, Result, Seed};

    // Verification
    pub use wxeval_verify::{
        bootstrap_performance_diagram, bootstrap_reliability_curve, bootstrap_roc_curve,
        get_brier_score, get_cross_entropy, get_points_in_performance_diagram,
        get_points_in_reliability_curve, get_points_in_roc_curve, verification_report,
        BootstrapConfig, ContingencyTable, EvaluationConfig, PerformanceDiagram, ReliabilityCurve,
        RocCurve, ThresholdArg, VerificationReport,
    };

    // Analysis
    pub use wxeval_analysis::{cross_entropy_function, negative_auc_function, run_permutation_test};
}

/// All module for importing everything.
pub mod all {
    pub use super::prelude::*;

    // Additional exports
    pub use wxeval_core::stats;
    pub use wxeval_core::{draw_sample, sample_indices};
    pub use wxeval_verify::*;
    pub use wxeval_analysis::{
        bootstrap_cost, list_predictors, permute_one_predictor, unpermute_one_predictor,
        AnalysisError, PermutationConfig, PermutationResult, PredictorId, PredictorMatrix,
    };
}
