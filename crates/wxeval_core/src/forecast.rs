//! Paired forecast probabilities and observed labels.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Check that every probability lies in [0, 1].
///
/// NaN is rejected.
pub fn check_probabilities(probabilities: &[f64]) -> Result<()> {
    for (index, &value) in probabilities.iter().enumerate() {
        if !(0.0..=1.0).contains(&value) {
            return Err(CoreError::ProbabilityOutOfRange { index, value });
        }
    }
    Ok(())
}

/// Check that every label is 0 or 1.
pub fn check_labels(labels: &[u8]) -> Result<()> {
    for (index, &value) in labels.iter().enumerate() {
        if value > 1 {
            return Err(CoreError::InvalidLabel {
                index,
                value: i64::from(value),
            });
        }
    }
    Ok(())
}

/// Convert integer labels of any width into validated binary labels.
pub fn labels_from_integers(values: &[i64]) -> Result<Vec<u8>> {
    values
        .iter()
        .enumerate()
        .map(|(index, &value)| match value {
            0 => Ok(0),
            1 => Ok(1),
            _ => Err(CoreError::InvalidLabel { index, value }),
        })
        .collect()
}

/// Check that a paired array has the expected length.
pub fn check_length(what: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(CoreError::LengthMismatch { what, expected, got });
    }
    Ok(())
}

/// Forecast probabilities of a binary event paired with what happened.
///
/// Built through [`ForecastSet::new`], which validates lengths and value
/// ranges once; every verification routine can then trust its contents.
/// The set is never modified after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawForecastSet")]
pub struct ForecastSet {
    probabilities: Vec<f64>,
    labels: Vec<u8>,
}

#[derive(Deserialize)]
struct RawForecastSet {
    probabilities: Vec<f64>,
    labels: Vec<i64>,
}

impl TryFrom<RawForecastSet> for ForecastSet {
    type Error = CoreError;

    fn try_from(raw: RawForecastSet) -> Result<Self> {
        Self::new(raw.probabilities, labels_from_integers(&raw.labels)?)
    }
}

impl ForecastSet {
    /// Create a validated forecast set.
    ///
    /// # Errors
    ///
    /// Fails if the set is empty, the lengths differ, a probability lies
    /// outside [0, 1] or a label is not 0/1.
    pub fn new(probabilities: Vec<f64>, labels: Vec<u8>) -> Result<Self> {
        if probabilities.is_empty() {
            return Err(CoreError::EmptyInput("forecast probabilities"));
        }
        check_length("observed labels", probabilities.len(), labels.len())?;
        check_probabilities(&probabilities)?;
        check_labels(&labels)?;

        let num_events = labels.iter().filter(|&&l| l == 1).count();
        if num_events == 0 || num_events == labels.len() {
            tracing::warn!(
                num_examples = labels.len(),
                num_events,
                "all labels are in one class, POD or POFD will be undefined"
            );
        }

        Ok(Self {
            probabilities,
            labels,
        })
    }

    /// Forecast probabilities.
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Observed labels (1 = event occurred).
    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Number of forecast-observation pairs.
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Number of observed events.
    pub fn num_events(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }

    /// Climatology: the event frequency over the whole set.
    pub fn climatology(&self) -> f64 {
        self.num_events() as f64 / self.len() as f64
    }
}
