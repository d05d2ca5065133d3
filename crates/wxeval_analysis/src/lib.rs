//! # wxeval_analysis
//!
//! Model-interpretation utilities built on the wxeval verification core.
//!
//! This crate provides:
//! - Cost functions over class-probability matrices (cross-entropy, negative AUC)
//! - Bootstrapped costs
//! - Predictor permutation and the single-pass permutation test
//!
//! ## Example
//!
//! ```rust
//! use ndarray::array;
//! use wxeval_analysis::negative_auc_function;
//!
//! let probs = array![[0.9, 0.1], [0.2, 0.8], [0.6, 0.4]];
//! let cost = negative_auc_function(&[0, 1, 0], &probs).unwrap();
//! assert!((cost + 1.0).abs() < 1e-12);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod cost;
mod error;
mod permutation;

pub use cost::{bootstrap_cost, cross_entropy_function, negative_auc_function, MIN_PROBABILITY};
pub use error::{AnalysisError, Result};
pub use permutation::{
    flatten_last_two_dim, list_predictors, permute_one_predictor, run_permutation_test,
    unflatten_last_two_dim, unpermute_one_predictor, PermutationConfig, PermutationResult,
    PredictorId, PredictorImportance, PredictorMatrix, NUM_AXES_WITH_HEIGHTS,
};
