//! # wxeval_core
//!
//! Core types shared by the wxeval verification crates.
//!
//! This crate provides:
//! - [`ForecastSet`] for validated (probability, label) pairs
//! - [`Seed`] for deterministic random number generation
//! - [`draw_sample`] for resampling with replacement
//! - NaN-aware reducers and the percentile routine used for confidence intervals
//! - Error types and common utilities
//!
//! ## Conventions
//!
//! Probabilities are `f64` in [0, 1]; labels are `u8` with 1 meaning the
//! event (tornado, damaging wind, ...) was observed.
//!
//! ## Example
//!
//! ```rust
//! use wxeval_core::{ForecastSet, Seed};
//!
//! let set = ForecastSet::new(vec![0.1, 0.7, 0.4], vec![0, 1, 0]).unwrap();
//! assert_eq!(set.num_events(), 1);
//! let _rng = Seed::new(42).to_rng();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod forecast;
mod sampler;
mod seed;
pub mod stats;

pub use error::{CoreError, Result};
pub use forecast::{
    check_labels, check_length, check_probabilities, labels_from_integers, ForecastSet,
};
pub use sampler::{draw_sample, sample_indices};
pub use seed::Seed;

/// Tolerance used for the padded upper binarization threshold.
pub const TOLERANCE: f64 = 1e-6;
