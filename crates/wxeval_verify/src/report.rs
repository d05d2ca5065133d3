//! One-call verification report for a set of probabilistic forecasts.
//!
//! Combines the threshold-free scores (AUC, maximum CSI, Brier score and
//! its decomposition, cross-entropy) with the deterministic scores of the
//! forecasts binarized at a single decision threshold.

use serde::{Deserialize, Serialize};
use wxeval_core::{ForecastSet, Result};

use crate::bootstrap::BootstrapConfig;
use crate::contingency::{check_threshold, ContingencyTable};
use crate::performance::get_points_in_performance_diagram;
use crate::reliability::{
    get_points_in_reliability_curve, BrierDecomposition, DEFAULT_NUM_FORECAST_BINS,
};
use crate::roc::get_points_in_roc_curve;
use crate::scores::{get_brier_score, get_cross_entropy};
use crate::thresholds::ThresholdArg;

/// Default threshold for the deterministic scores.
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

/// Settings shared by every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Thresholds for ROC curves and performance diagrams.
    pub thresholds: ThresholdArg,
    /// Number of reliability-curve bins.
    pub num_bins: usize,
    /// Threshold for the contingency-table scores of the report.
    pub decision_threshold: f64,
    /// Bootstrap settings.
    pub bootstrap: BootstrapConfig,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdArg::default(),
            num_bins: DEFAULT_NUM_FORECAST_BINS,
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
            bootstrap: BootstrapConfig::default(),
        }
    }
}

impl EvaluationConfig {
    /// Set the threshold argument.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: ThresholdArg) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Set the number of reliability bins.
    #[must_use]
    pub fn with_num_bins(mut self, num_bins: usize) -> Self {
        self.num_bins = num_bins;
        self
    }

    /// Set the decision threshold.
    #[must_use]
    pub fn with_decision_threshold(mut self, decision_threshold: f64) -> Self {
        self.decision_threshold = decision_threshold;
        self
    }

    /// Set the bootstrap settings.
    #[must_use]
    pub fn with_bootstrap(mut self, bootstrap: BootstrapConfig) -> Self {
        self.bootstrap = bootstrap;
        self
    }
}

/// Scores of the forecasts binarized at one threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeterministicScores {
    /// Probability of detection.
    pub pod: f64,
    /// Probability of false detection.
    pub pofd: f64,
    /// Success ratio.
    pub success_ratio: f64,
    /// False-alarm ratio.
    pub far: f64,
    /// Accuracy.
    pub accuracy: f64,
    /// Critical success index.
    pub csi: f64,
    /// Frequency bias.
    pub frequency_bias: f64,
    /// Peirce score.
    pub peirce_score: f64,
    /// Heidke score.
    pub heidke_score: f64,
}

impl From<&ContingencyTable> for DeterministicScores {
    fn from(table: &ContingencyTable) -> Self {
        Self {
            pod: table.pod(),
            pofd: table.pofd(),
            success_ratio: table.success_ratio(),
            far: table.far(),
            accuracy: table.accuracy(),
            csi: table.csi(),
            frequency_bias: table.frequency_bias(),
            peirce_score: table.peirce_score(),
            heidke_score: table.heidke_score(),
        }
    }
}

/// Verification report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Number of examples.
    pub num_examples: usize,
    /// Event frequency.
    pub climatology: f64,
    /// Area under the ROC curve.
    pub auc: f64,
    /// Maximum CSI over all thresholds.
    pub max_csi: f64,
    /// Brier score computed directly from the probabilities.
    pub brier_score: f64,
    /// Cross-entropy in bits.
    pub cross_entropy: f64,
    /// Binned Brier decomposition.
    pub brier_decomposition: BrierDecomposition,
    /// Threshold used for the deterministic scores.
    pub decision_threshold: f64,
    /// Contingency table at the decision threshold.
    pub contingency_table: ContingencyTable,
    /// Scores at the decision threshold.
    pub scores: DeterministicScores,
}

impl VerificationReport {
    /// Display the report as a formatted string.
    pub fn summary(&self) -> String {
        let mut output = String::new();
        output.push_str("=== Verification Report ===\n\n");
        output.push_str(&format!("Examples:        {}\n", self.num_examples));
        output.push_str(&format!("Climatology:     {:.4}\n\n", self.climatology));

        output.push_str(&format!("AUC:             {:.4}\n", self.auc));
        output.push_str(&format!("Max CSI:         {:.4}\n", self.max_csi));
        output.push_str(&format!("Brier score:     {:.4}\n", self.brier_score));
        output.push_str(&format!("Cross-entropy:   {:.4} bits\n", self.cross_entropy));

        let bss = &self.brier_decomposition;
        output.push_str(&format!("Brier skill:     {:.4}\n", bss.brier_skill_score));
        output.push_str(&format!(
            "  reliability {:.4}  resolution {:.4}  uncertainty {:.4}\n\n",
            bss.reliability, bss.resolution, bss.uncertainty
        ));

        output.push_str(&format!("At threshold {:.3}:\n", self.decision_threshold));
        output.push_str(&self.contingency_table.to_string_table());
        output.push('\n');

        let s = &self.scores;
        for (name, value) in [
            ("POD", s.pod),
            ("POFD", s.pofd),
            ("success ratio", s.success_ratio),
            ("FAR", s.far),
            ("accuracy", s.accuracy),
            ("CSI", s.csi),
            ("frequency bias", s.frequency_bias),
            ("Peirce score", s.peirce_score),
            ("Heidke score", s.heidke_score),
        ] {
            output.push_str(&format!("{name:>16}  {value:.4}\n"));
        }

        output
    }
}

/// Compute a verification report.
///
/// # Errors
///
/// Fails if the threshold argument, bin count or decision threshold is
/// invalid.
///
/// # Example
///
/// ```rust
/// use wxeval_core::ForecastSet;
/// use wxeval_verify::{verification_report, EvaluationConfig};
///
/// let set = ForecastSet::new(vec![0.1, 0.7, 0.4, 0.9], vec![0, 1, 0, 1]).unwrap();
/// let report = verification_report(&set, &EvaluationConfig::default()).unwrap();
/// assert!((report.auc - 1.0).abs() < 1e-12);
/// ```
pub fn verification_report(
    forecasts: &ForecastSet,
    config: &EvaluationConfig,
) -> Result<VerificationReport> {
    check_threshold(config.decision_threshold)?;

    let roc = get_points_in_roc_curve(forecasts, &config.thresholds)?;
    let performance = get_points_in_performance_diagram(forecasts, &config.thresholds)?;
    let reliability = get_points_in_reliability_curve(forecasts, config.num_bins)?;
    let climatology = forecasts.climatology();

    let contingency_table = ContingencyTable::from_probabilities_unchecked(
        forecasts.probabilities(),
        forecasts.labels(),
        config.decision_threshold,
    );

    let report = VerificationReport {
        num_examples: forecasts.len(),
        climatology,
        auc: roc.area_under_curve(),
        max_csi: performance.max_csi(),
        brier_score: get_brier_score(forecasts),
        cross_entropy: get_cross_entropy(forecasts),
        brier_decomposition: reliability.brier_decomposition(climatology)?,
        decision_threshold: config.decision_threshold,
        scores: DeterministicScores::from(&contingency_table),
        contingency_table,
    };
    tracing::debug!(auc = report.auc, max_csi = report.max_csi, "built verification report");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> ForecastSet {
        ForecastSet::new(
            vec![0.05, 0.15, 0.25, 0.35, 0.45, 0.55, 0.65, 0.75, 0.85, 0.95],
            vec![0, 0, 1, 0, 0, 1, 1, 0, 1, 1],
        )
        .unwrap()
    }

    #[test]
    fn test_report_values() {
        let set = sample_set();
        let report = verification_report(&set, &EvaluationConfig::default()).unwrap();

        assert_eq!(report.num_examples, 10);
        assert!((report.climatology - 0.5).abs() < 1e-12);
        // Threshold 0.5: TP=4, FP=1, FN=1, TN=4.
        assert_eq!(report.contingency_table.true_positives, 4);
        assert_eq!(report.contingency_table.false_positives, 1);
        assert!((report.scores.pod - 0.8).abs() < 1e-12);
        assert!((report.scores.csi - 4.0 / 6.0).abs() < 1e-12);
        assert!(report.auc > 0.5 && report.auc <= 1.0);
        assert!(report.max_csi >= report.scores.csi - 1e-12);
        let bss = &report.brier_decomposition;
        let recomposed = bss.uncertainty + bss.reliability - bss.resolution;
        assert!((bss.brier_score - recomposed).abs() < 1e-6);
    }

    #[test]
    fn test_report_rejects_bad_threshold() {
        let config = EvaluationConfig::default().with_decision_threshold(2.0);
        assert!(verification_report(&sample_set(), &config).is_err());
        let config = EvaluationConfig::default().with_num_bins(1);
        assert!(verification_report(&sample_set(), &config).is_err());
    }

    #[test]
    fn test_report_summary() {
        let report = verification_report(&sample_set(), &EvaluationConfig::default()).unwrap();
        let summary = report.summary();
        assert!(summary.contains("Verification Report"));
        assert!(summary.contains("AUC"));
        assert!(summary.contains("Heidke score"));
    }

    #[test]
    fn test_evaluation_config_from_json() {
        let config: EvaluationConfig = serde_json::from_str(
            r#"{"thresholds": {"count": 11}, "bootstrap": {"num_iters": 50}}"#,
        )
        .unwrap();
        assert_eq!(config.thresholds, ThresholdArg::Count(11));
        assert_eq!(config.num_bins, 10);
        assert_eq!(EvaluationConfig::default().num_bins, 10);
        assert_eq!(config.bootstrap.num_iters, 50);
        assert!((config.decision_threshold - DEFAULT_DECISION_THRESHOLD).abs() < 1e-12);
    }
}
