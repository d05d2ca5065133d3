//! Cost functions over class-probability matrices, and bootstrapped costs.
//!
//! A probability matrix has one row per example and one column per class;
//! targets are class indices. Lower cost is better for every function here,
//! which is why AUC enters as its negative.

use ndarray::{Array2, Axis};
use rand::Rng;
use wxeval_core::{draw_sample, CoreError, ForecastSet};
use wxeval_verify::{get_points_in_roc_curve, ThresholdArg};

use crate::error::{check_index, AnalysisError, Result};

/// Probabilities are clipped into `[MIN, 1 - MIN]` before taking logs.
pub const MIN_PROBABILITY: f64 = 1e-15;

fn check_targets(targets: &[usize], probabilities: &Array2<f64>) -> Result<()> {
    if targets.len() != probabilities.nrows() {
        return Err(AnalysisError::ShapeMismatch(format!(
            "{} targets for a probability matrix with {} rows",
            targets.len(),
            probabilities.nrows()
        )));
    }
    if targets.is_empty() {
        return Err(CoreError::EmptyInput("targets").into());
    }
    for &target in targets {
        check_index(target, probabilities.ncols())?;
    }
    Ok(())
}

/// Mean cross-entropy (natural log) of the probability given to each
/// example's true class.
///
/// # Errors
///
/// Fails if the targets do not match the matrix rows or a target is not a
/// valid column.
pub fn cross_entropy_function(targets: &[usize], probabilities: &Array2<f64>) -> Result<f64> {
    check_targets(targets, probabilities)?;

    let total: f64 = targets
        .iter()
        .enumerate()
        .map(|(i, &target)| {
            let p = probabilities[[i, target]].clamp(MIN_PROBABILITY, 1.0 - MIN_PROBABILITY);
            -p.ln()
        })
        .sum();
    Ok(total / targets.len() as f64)
}

/// Negative area under the ROC curve of a binary classifier.
///
/// Uses the probabilities of class 1 with one threshold per unique
/// forecast.
///
/// # Errors
///
/// Fails with [`AnalysisError::UnsupportedClassCount`] unless the matrix has
/// exactly two columns, and on invalid targets or probabilities.
pub fn negative_auc_function(targets: &[usize], probabilities: &Array2<f64>) -> Result<f64> {
    if probabilities.ncols() != 2 {
        return Err(AnalysisError::UnsupportedClassCount {
            expected: 2,
            got: probabilities.ncols(),
        });
    }
    check_targets(targets, probabilities)?;

    let labels = targets.iter().map(|&t| t as u8).collect();
    let forecasts = ForecastSet::new(probabilities.column(1).to_vec(), labels)?;
    let roc = get_points_in_roc_curve(&forecasts, &ThresholdArg::unique())?;
    Ok(-roc.area_under_curve())
}

/// Cost of the predictions, bootstrapped over examples.
///
/// With one replicate this is the cost on the full data; otherwise every
/// replicate is the cost on one resample of the examples (with
/// replacement). Returns exactly `num_replicates` values.
///
/// # Errors
///
/// Fails if `num_replicates` is 0 or `cost_fn` fails.
///
/// # Example
///
/// ```rust
/// use ndarray::array;
/// use wxeval_analysis::{bootstrap_cost, cross_entropy_function};
/// use wxeval_core::Seed;
///
/// let probs = array![[0.8, 0.2], [0.3, 0.7], [0.6, 0.4]];
/// let mut rng = Seed::new(1).to_rng();
/// let costs = bootstrap_cost(&[0, 1, 0], &probs, cross_entropy_function, 50, &mut rng).unwrap();
/// assert_eq!(costs.len(), 50);
/// ```
pub fn bootstrap_cost<C, R>(
    targets: &[usize],
    probabilities: &Array2<f64>,
    cost_fn: C,
    num_replicates: usize,
    rng: &mut R,
) -> Result<Vec<f64>>
where
    C: Fn(&[usize], &Array2<f64>) -> Result<f64>,
    R: Rng + ?Sized,
{
    if num_replicates == 0 {
        return Err(CoreError::invalid("number of bootstrap replicates must be at least 1").into());
    }
    if num_replicates == 1 {
        return Ok(vec![cost_fn(targets, probabilities)?]);
    }

    (0..num_replicates)
        .map(|_| {
            let (sampled_targets, indices) = draw_sample(targets, rng);
            let sampled_probs = probabilities.select(Axis(0), &indices);
            cost_fn(&sampled_targets, &sampled_probs)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use wxeval_core::Seed;

    fn binary_targets() -> Vec<usize> {
        vec![0, 0, 1, 0, 0, 0, 1, 0, 1, 1, 0]
    }

    fn binary_probabilities() -> Array2<f64> {
        array![
            [0.0, 1.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 0.0],
            [0.5, 0.5],
            [0.5, 0.5],
            [0.0, 1.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 0.0],
            [0.5, 0.5]
        ]
    }

    fn ternary_targets() -> Vec<usize> {
        vec![2, 0, 1, 1, 2, 1, 2, 0, 2, 0, 0]
    }

    fn ternary_probabilities() -> Array2<f64> {
        array![
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
            [0.5, 0.25, 0.25],
            [0.25, 0.5, 0.25],
            [1.0 / 3.0, 0.0, 2.0 / 3.0],
            [1.0, 0.0, 0.0],
            [0.0, 0.5, 0.5],
            [0.75, 0.0, 0.25],
            [0.6, 0.2, 0.2]
        ]
    }

    #[test]
    fn test_cross_entropy_binary() {
        let xent = cross_entropy_function(&binary_targets(), &binary_probabilities()).unwrap();
        // Two certain misses clipped at 1e-15, three coin flips.
        assert!((xent - 6.468_817_67).abs() < 1e-4);
    }

    #[test]
    fn test_cross_entropy_ternary() {
        let xent = cross_entropy_function(&ternary_targets(), &ternary_probabilities()).unwrap();
        assert!((xent - 0.461_379_44).abs() < 1e-4);
    }

    #[test]
    fn test_negative_auc_binary() {
        let cost = negative_auc_function(&binary_targets(), &binary_probabilities()).unwrap();
        assert!((cost + 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_negative_auc_rejects_ternary() {
        let err = negative_auc_function(&ternary_targets(), &ternary_probabilities()).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedClassCount { got: 3, .. }));
    }

    #[test]
    fn test_cost_validates_targets() {
        let probs = binary_probabilities();
        assert!(cross_entropy_function(&[0, 1], &probs).is_err());
        let mut targets = binary_targets();
        targets[0] = 2;
        assert!(matches!(
            cross_entropy_function(&targets, &probs).unwrap_err(),
            AnalysisError::IndexOutOfBounds { index: 2, length: 2 }
        ));
    }

    #[test]
    fn test_bootstrap_cost_one_replicate() {
        let mut rng = Seed::new(0).to_rng();
        let costs = bootstrap_cost(
            &binary_targets(),
            &binary_probabilities(),
            negative_auc_function,
            1,
            &mut rng,
        )
        .unwrap();
        assert_eq!(costs.len(), 1);
        assert!((costs[0] + 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_bootstrap_cost_many_replicates() {
        let mut rng = Seed::new(0).to_rng();
        let costs = bootstrap_cost(
            &binary_targets(),
            &binary_probabilities(),
            cross_entropy_function,
            1000,
            &mut rng,
        )
        .unwrap();
        assert_eq!(costs.len(), 1000);
        assert!(costs.iter().all(|c| c.is_finite() && *c >= 0.0));
    }

    #[test]
    fn test_bootstrap_cost_rejects_zero_replicates() {
        let mut rng = Seed::new(0).to_rng();
        let result = bootstrap_cost(
            &binary_targets(),
            &binary_probabilities(),
            cross_entropy_function,
            0,
            &mut rng,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_bootstrap_cost_replicates_follow_draw_sample() {
        let targets = binary_targets();
        let probs = binary_probabilities();
        let positive_rate = |t: &[usize], _: &Array2<f64>| -> Result<f64> {
            Ok(t.iter().sum::<usize>() as f64 / t.len() as f64)
        };

        let mut rng = Seed::new(3).to_rng();
        let costs = bootstrap_cost(&targets, &probs, positive_rate, 5, &mut rng).unwrap();

        let mut rng = Seed::new(3).to_rng();
        for cost in costs {
            let (sample, _) = draw_sample(&targets, &mut rng);
            let expected = sample.iter().sum::<usize>() as f64 / sample.len() as f64;
            assert!((cost - expected).abs() < 1e-12);
        }
    }
}
