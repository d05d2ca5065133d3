//! 2x2 contingency tables and the scores derived from them.
//!
//! Every score returns `NaN` when its denominator is zero. This is how an
//! undefined ratio is reported (e.g. POD when no event was observed), and
//! downstream NaN-aware reducers skip such values.

use serde::{Deserialize, Serialize};
use wxeval_core::{check_labels, check_length, check_probabilities, CoreError, Result, TOLERANCE};

/// Smallest admissible binarization threshold.
pub const MIN_BINARIZATION_THRESHOLD: f64 = 0.0;

/// Largest admissible binarization threshold (slightly above 1, so that
/// nothing is forecast as "yes").
pub const MAX_BINARIZATION_THRESHOLD: f64 = 1.0 + TOLERANCE;

/// Contingency table for deterministic yes/no forecasts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyTable {
    /// Forecast yes, observed yes.
    pub true_positives: usize,
    /// Forecast yes, observed no.
    pub false_positives: usize,
    /// Forecast no, observed yes.
    pub false_negatives: usize,
    /// Forecast no, observed no.
    pub true_negatives: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        f64::NAN
    } else {
        numerator as f64 / denominator as f64
    }
}

impl ContingencyTable {
    /// Build the table from deterministic forecast labels and observed labels.
    ///
    /// # Errors
    ///
    /// Fails if the arrays differ in length or hold values other than 0/1.
    pub fn from_labels(forecast_labels: &[u8], observed_labels: &[u8]) -> Result<Self> {
        check_labels(forecast_labels)?;
        check_length("observed labels", forecast_labels.len(), observed_labels.len())?;
        check_labels(observed_labels)?;

        let mut table = Self::default();
        for (&forecast, &observed) in forecast_labels.iter().zip(observed_labels) {
            table.add(forecast == 1, observed == 1);
        }
        Ok(table)
    }

    /// Build the table for probabilities binarized at `threshold`.
    ///
    /// # Errors
    ///
    /// Fails if the arrays differ in length, a probability is outside
    /// [0, 1], a label is not 0/1 or the threshold is outside
    /// `[0, 1 + 1e-6]`.
    pub fn from_probabilities(
        probabilities: &[f64],
        observed_labels: &[u8],
        threshold: f64,
    ) -> Result<Self> {
        check_probabilities(probabilities)?;
        check_length("observed labels", probabilities.len(), observed_labels.len())?;
        check_labels(observed_labels)?;
        check_threshold(threshold)?;
        Ok(Self::from_probabilities_unchecked(probabilities, observed_labels, threshold))
    }

    /// Same as [`Self::from_probabilities`] for inputs validated once up
    /// front, as the threshold sweeps do.
    pub(crate) fn from_probabilities_unchecked(
        probabilities: &[f64],
        observed_labels: &[u8],
        threshold: f64,
    ) -> Self {
        let mut table = Self::default();
        for (&p, &observed) in probabilities.iter().zip(observed_labels) {
            table.add(p >= threshold, observed == 1);
        }
        table
    }

    /// Record one forecast-observation pair.
    pub fn add(&mut self, forecast_yes: bool, observed_yes: bool) {
        match (forecast_yes, observed_yes) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_positives += 1,
            (false, true) => self.false_negatives += 1,
            (false, false) => self.true_negatives += 1,
        }
    }

    /// Total number of pairs.
    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.false_negatives + self.true_negatives
    }

    /// Probability of detection, TP / (TP + FN).
    pub fn pod(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// Frequency of misses, 1 - POD.
    pub fn fom(&self) -> f64 {
        1.0 - self.pod()
    }

    /// Probability of false detection, FP / (FP + TN).
    pub fn pofd(&self) -> f64 {
        ratio(self.false_positives, self.false_positives + self.true_negatives)
    }

    /// Negative predictive value as defined here: 1 - POFD.
    pub fn npv(&self) -> f64 {
        1.0 - self.pofd()
    }

    /// Success ratio, TP / (TP + FP).
    pub fn success_ratio(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// False-alarm ratio, 1 - success ratio.
    pub fn far(&self) -> f64 {
        1.0 - self.success_ratio()
    }

    /// Detection-failure ratio, FN / (FN + TN).
    pub fn dfr(&self) -> f64 {
        ratio(self.false_negatives, self.false_negatives + self.true_negatives)
    }

    /// Frequency of correct nulls, 1 - DFR.
    pub fn focn(&self) -> f64 {
        1.0 - self.dfr()
    }

    /// Accuracy, (TP + TN) / N.
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    /// Critical success index, TP / (TP + FP + FN).
    pub fn csi(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_positives + self.false_negatives,
        )
    }

    /// Frequency bias, (TP + FP) / (TP + FN).
    pub fn frequency_bias(&self) -> f64 {
        ratio(
            self.true_positives + self.false_positives,
            self.true_positives + self.false_negatives,
        )
    }

    /// Peirce score, POD - POFD.
    pub fn peirce_score(&self) -> f64 {
        self.pod() - self.pofd()
    }

    /// Heidke skill score.
    ///
    /// `2 (TP·TN - FP·FN) / [(TP+FP)(FP+TN) + (TN+FN)(TP+FN)]`, i.e. forecast
    /// positives times observed non-events plus forecast negatives times
    /// observed events.
    pub fn heidke_score(&self) -> f64 {
        let tp = self.true_positives as f64;
        let fp = self.false_positives as f64;
        let fn_ = self.false_negatives as f64;
        let tn = self.true_negatives as f64;

        let numerator = 2.0 * (tp * tn - fp * fn_);
        let num_positives = tp + fp;
        let num_negatives = tn + fn_;
        let num_events = tp + fn_;
        let num_non_events = tn + fp;
        let denominator = num_positives * num_non_events + num_negatives * num_events;

        if denominator == 0.0 {
            f64::NAN
        } else {
            numerator / denominator
        }
    }

    /// Get a text representation.
    pub fn to_string_table(&self) -> String {
        let mut s = String::new();
        s.push_str("               obs yes    obs no\n");
        s.push_str(&format!(
            "  fcst yes  {:>10}{:>10}\n",
            self.true_positives, self.false_positives
        ));
        s.push_str(&format!(
            "  fcst no   {:>10}{:>10}\n",
            self.false_negatives, self.true_negatives
        ));
        s
    }
}

/// Validate a binarization threshold.
pub fn check_threshold(threshold: f64) -> Result<()> {
    if !(MIN_BINARIZATION_THRESHOLD..=MAX_BINARIZATION_THRESHOLD).contains(&threshold) {
        return Err(CoreError::InvalidThreshold {
            value: threshold,
            min: MIN_BINARIZATION_THRESHOLD,
            max: MAX_BINARIZATION_THRESHOLD,
        });
    }
    Ok(())
}

/// Turn probabilistic forecasts into deterministic ones.
///
/// A forecast becomes "yes" (1) iff `probability >= threshold`.
///
/// # Errors
///
/// Fails if a probability is outside [0, 1] or the threshold is outside
/// `[0, 1 + 1e-6]`.
pub fn binarize_forecast_probs(probabilities: &[f64], threshold: f64) -> Result<Vec<u8>> {
    check_probabilities(probabilities)?;
    check_threshold(threshold)?;

    Ok(probabilities
        .iter()
        .map(|&p| u8::from(p >= threshold))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(tp: usize, fp: usize, fn_: usize, tn: usize) -> ContingencyTable {
        ContingencyTable {
            true_positives: tp,
            false_positives: fp,
            false_negatives: fn_,
            true_negatives: tn,
        }
    }

    #[test]
    fn test_binarize_ties_go_to_yes() {
        let labels = binarize_forecast_probs(&[0.0, 0.3, 0.5, 0.7, 1.0], 0.5).unwrap();
        assert_eq!(labels, vec![0, 0, 1, 1, 1]);

        assert!(binarize_forecast_probs(&[0.2], -0.1).is_err());
        assert!(binarize_forecast_probs(&[0.2], 1.1).is_err());
        assert!(binarize_forecast_probs(&[1.5], 0.5).is_err());
        assert_eq!(binarize_forecast_probs(&[1.0], MAX_BINARIZATION_THRESHOLD).unwrap(), vec![0]);
    }

    #[test]
    fn test_contingency_table_counts() {
        let forecast = [1, 1, 0, 0, 1, 0];
        let observed = [1, 0, 1, 0, 1, 0];
        let ct = ContingencyTable::from_labels(&forecast, &observed).unwrap();

        assert_eq!(ct, table(2, 1, 1, 2));
        assert_eq!(ct.total(), forecast.len());
    }

    #[test]
    fn test_contingency_table_rejects_bad_input() {
        assert!(ContingencyTable::from_labels(&[1, 0], &[1]).is_err());
        assert!(ContingencyTable::from_labels(&[2, 0], &[1, 0]).is_err());
        assert!(ContingencyTable::from_labels(&[1, 0], &[1, 5]).is_err());
    }

    #[test]
    fn test_from_probabilities_matches_binarize() {
        let probs = [0.05, 0.4, 0.6, 0.95, 0.5];
        let labels = [0, 1, 0, 1, 1];
        let forecast = binarize_forecast_probs(&probs, 0.5).unwrap();
        assert_eq!(
            ContingencyTable::from_probabilities(&probs, &labels, 0.5).unwrap(),
            ContingencyTable::from_labels(&forecast, &labels).unwrap()
        );
    }

    #[test]
    fn test_from_probabilities_rejects_bad_input() {
        let probs = [0.2, 0.7, 0.9];
        let err = ContingencyTable::from_probabilities(&probs, &[0, 1], 0.5).unwrap_err();
        assert!(matches!(err, CoreError::LengthMismatch { expected: 3, got: 2, .. }));

        let err = ContingencyTable::from_probabilities(&probs, &[0, 1, 2], 0.5).unwrap_err();
        assert!(matches!(err, CoreError::InvalidLabel { index: 2, value: 2 }));

        let err = ContingencyTable::from_probabilities(&[0.2, 1.4], &[0, 1], 0.5).unwrap_err();
        assert!(matches!(err, CoreError::ProbabilityOutOfRange { index: 1, .. }));

        assert!(ContingencyTable::from_probabilities(&probs, &[0, 1, 1], 1.5).is_err());
    }

    #[test]
    fn test_scores() {
        let ct = table(3, 1, 2, 4);

        assert!((ct.pod() - 0.6).abs() < 1e-12);
        assert!((ct.pofd() - 0.2).abs() < 1e-12);
        assert!((ct.success_ratio() - 0.75).abs() < 1e-12);
        assert!((ct.dfr() - 1.0 / 3.0).abs() < 1e-12);
        assert!((ct.accuracy() - 0.7).abs() < 1e-12);
        assert!((ct.csi() - 0.5).abs() < 1e-12);
        assert!((ct.frequency_bias() - 0.8).abs() < 1e-12);
        assert!((ct.peirce_score() - 0.4).abs() < 1e-12);
        // 2 * (12 - 2) / (4 * 5 + 6 * 5)
        assert!((ct.heidke_score() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_complementary_scores() {
        for ct in [table(3, 1, 2, 4), table(0, 5, 7, 1), table(9, 0, 0, 2)] {
            assert!((ct.fom() - (1.0 - ct.pod())).abs() < 1e-12);
            assert!((ct.far() - (1.0 - ct.success_ratio())).abs() < 1e-12);
            assert!((ct.npv() - (1.0 - ct.pofd())).abs() < 1e-12);
            assert!((ct.focn() - (1.0 - ct.dfr())).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_denominators_give_nan() {
        let empty = ContingencyTable::default();
        assert!(empty.pod().is_nan());
        assert!(empty.pofd().is_nan());
        assert!(empty.success_ratio().is_nan());
        assert!(empty.dfr().is_nan());
        assert!(empty.accuracy().is_nan());
        assert!(empty.csi().is_nan());
        assert!(empty.frequency_bias().is_nan());
        assert!(empty.heidke_score().is_nan());
        assert!(empty.fom().is_nan());
        assert!(empty.peirce_score().is_nan());

        // No events observed: POD undefined, POFD fine.
        let no_events = table(0, 2, 0, 3);
        assert!(no_events.pod().is_nan());
        assert!((no_events.pofd() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_string_table() {
        let s = table(1, 2, 3, 4).to_string_table();
        assert!(s.contains("fcst yes"));
        assert!(s.contains('4'));
    }
}
