//! Single-pass permutation importance over gridded predictor matrices.
//!
//! A model consumes several predictor matrices (e.g. a radar image and a
//! sounding), each with examples on axis 0 and predictors (fields) on the
//! last axis. Permuting one predictor across examples breaks its relation
//! to the target; the more the cost rises, the more the model relies on it.

use ndarray::{Array2, ArrayD, Axis, IxDyn};
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use wxeval_core::{stats, Seed};

use crate::cost::bootstrap_cost;
use crate::error::{check_index, AnalysisError, Result};

/// Predictor matrix: examples on axis 0, predictors on the last axis.
pub type PredictorMatrix = ArrayD<f64>;

/// Merge the last two axes (heights x fields) into one predictor axis.
///
/// The result is field-major: predictor `k = field * num_heights + height`,
/// so each field's heights stay adjacent. Returns the new matrix and the
/// original shape.
///
/// # Errors
///
/// Fails if the matrix has fewer than three axes.
pub fn flatten_last_two_dim(matrix: &PredictorMatrix) -> Result<(PredictorMatrix, Vec<usize>)> {
    let ndim = matrix.ndim();
    if ndim < 3 {
        return Err(AnalysisError::ShapeMismatch(format!(
            "need at least 3 axes to flatten heights and fields, got {ndim}"
        )));
    }

    let orig_shape = matrix.shape().to_vec();
    let (num_heights, num_fields) = (orig_shape[ndim - 2], orig_shape[ndim - 1]);

    let mut axes: Vec<usize> = (0..ndim).collect();
    axes.swap(ndim - 2, ndim - 1);
    let swapped = matrix.view().permuted_axes(IxDyn(&axes));

    let mut new_shape = orig_shape[..ndim - 2].to_vec();
    new_shape.push(num_fields * num_heights);
    let flat = ArrayD::from_shape_vec(IxDyn(&new_shape), swapped.iter().copied().collect())?;
    Ok((flat, orig_shape))
}

/// Inverse of [`flatten_last_two_dim`].
///
/// # Errors
///
/// Fails if `orig_shape` does not match the flattened matrix.
pub fn unflatten_last_two_dim(
    matrix: &PredictorMatrix,
    orig_shape: &[usize],
) -> Result<PredictorMatrix> {
    let ndim = orig_shape.len();
    if ndim < 3 || matrix.ndim() != ndim - 1 {
        return Err(AnalysisError::ShapeMismatch(format!(
            "cannot restore shape {orig_shape:?} from {:?}",
            matrix.shape()
        )));
    }

    let mut field_major = orig_shape.to_vec();
    field_major.swap(ndim - 2, ndim - 1);
    let fields_then_heights =
        ArrayD::from_shape_vec(IxDyn(&field_major), matrix.iter().copied().collect())?;

    let mut axes: Vec<usize> = (0..ndim).collect();
    axes.swap(ndim - 2, ndim - 1);
    let restored = fields_then_heights.permuted_axes(IxDyn(&axes));
    Ok(ArrayD::from_shape_vec(IxDyn(orig_shape), restored.iter().copied().collect())?)
}

/// Axes of a gridded 3-D field: examples, rows, columns, heights, fields.
pub const NUM_AXES_WITH_HEIGHTS: usize = 5;

/// Whether `separate_heights` applies to this matrix. Soundings and 2-D
/// grids keep their own layout.
fn has_separable_heights(matrix: &PredictorMatrix) -> bool {
    matrix.ndim() == NUM_AXES_WITH_HEIGHTS
}

/// Identifies one predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredictorId {
    /// Which predictor matrix.
    pub matrix_index: usize,
    /// Predictor index on the last axis (after flattening, if heights are
    /// separated).
    pub predictor_index: usize,
}

impl PredictorId {
    /// Create a predictor id.
    pub const fn new(matrix_index: usize, predictor_index: usize) -> Self {
        Self {
            matrix_index,
            predictor_index,
        }
    }
}

/// Run `edit` on the (optionally flattened) matrix holding `id`, then write
/// the result back in the original layout.
fn with_predictor_matrix<T>(
    matrices: &mut [PredictorMatrix],
    separate_heights: bool,
    id: PredictorId,
    edit: impl FnOnce(&mut PredictorMatrix) -> Result<T>,
) -> Result<T> {
    check_index(id.matrix_index, matrices.len())?;
    let matrix = &mut matrices[id.matrix_index];
    if matrix.ndim() < 2 {
        return Err(AnalysisError::ShapeMismatch(format!(
            "predictor matrix needs an example axis and a predictor axis, got shape {:?}",
            matrix.shape()
        )));
    }

    if separate_heights && has_separable_heights(matrix) {
        let (mut flat, orig_shape) = flatten_last_two_dim(matrix)?;
        let out = edit(&mut flat)?;
        *matrix = unflatten_last_two_dim(&flat, &orig_shape)?;
        Ok(out)
    } else {
        edit(matrix)
    }
}

/// Permute one predictor across examples, in place.
///
/// With `permuted_values` the predictor is overwritten by those values
/// (typically returned by an earlier call); otherwise its slab is shuffled
/// along the example axis with `rng`. With `separate_heights`, gridded 3-D
/// matrices (five axes) are indexed in their [`flatten_last_two_dim`]
/// layout, so every height of every field is its own predictor.
///
/// Returns the values now held by the predictor. All other predictors are
/// untouched.
///
/// # Errors
///
/// Fails if `id` is out of bounds or `permuted_values` has the wrong shape.
pub fn permute_one_predictor<R: Rng + ?Sized>(
    matrices: &mut [PredictorMatrix],
    separate_heights: bool,
    id: PredictorId,
    permuted_values: Option<&ArrayD<f64>>,
    rng: &mut R,
) -> Result<ArrayD<f64>> {
    with_predictor_matrix(matrices, separate_heights, id, |matrix| {
        let last = Axis(matrix.ndim() - 1);
        check_index(id.predictor_index, matrix.len_of(last))?;

        let new_values = match permuted_values {
            Some(values) => {
                let slab = matrix.index_axis(last, id.predictor_index);
                if values.shape() != slab.shape() {
                    return Err(AnalysisError::ShapeMismatch(format!(
                        "permuted values have shape {:?}, predictor has shape {:?}",
                        values.shape(),
                        slab.shape()
                    )));
                }
                values.clone()
            }
            None => {
                let slab = matrix.index_axis(last, id.predictor_index);
                let mut order: Vec<usize> = (0..slab.len_of(Axis(0))).collect();
                order.shuffle(rng);
                slab.select(Axis(0), &order)
            }
        };

        matrix.index_axis_mut(last, id.predictor_index).assign(&new_values);
        Ok(new_values)
    })
}

/// Restore one predictor from the clean matrices, in place.
///
/// # Errors
///
/// Fails if `id` is out of bounds or the clean matrices do not match.
pub fn unpermute_one_predictor(
    matrices: &mut [PredictorMatrix],
    clean_matrices: &[PredictorMatrix],
    separate_heights: bool,
    id: PredictorId,
) -> Result<()> {
    if matrices.len() != clean_matrices.len() {
        return Err(AnalysisError::ShapeMismatch(format!(
            "{} matrices but {} clean matrices",
            matrices.len(),
            clean_matrices.len()
        )));
    }
    check_index(id.matrix_index, clean_matrices.len())?;

    let clean = &clean_matrices[id.matrix_index];
    let clean = if separate_heights && has_separable_heights(clean) {
        flatten_last_two_dim(clean)?.0
    } else {
        clean.clone()
    };

    with_predictor_matrix(matrices, separate_heights, id, |matrix| {
        if matrix.shape() != clean.shape() {
            return Err(AnalysisError::ShapeMismatch(format!(
                "matrix has shape {:?}, clean matrix has shape {:?}",
                matrix.shape(),
                clean.shape()
            )));
        }
        let last = Axis(matrix.ndim() - 1);
        check_index(id.predictor_index, matrix.len_of(last))?;
        matrix
            .index_axis_mut(last, id.predictor_index)
            .assign(&clean.index_axis(last, id.predictor_index));
        Ok(())
    })
}

/// Every predictor of every matrix, in matrix then predictor order.
pub fn list_predictors(matrices: &[PredictorMatrix], separate_heights: bool) -> Vec<PredictorId> {
    let mut ids = Vec::new();
    for (matrix_index, matrix) in matrices.iter().enumerate() {
        let num_predictors = if separate_heights && has_separable_heights(matrix) {
            let shape = matrix.shape();
            shape[shape.len() - 2] * shape[shape.len() - 1]
        } else {
            matrix.shape().last().copied().unwrap_or(0)
        };
        ids.extend((0..num_predictors).map(|k| PredictorId::new(matrix_index, k)));
    }
    ids
}

/// Configuration for the permutation test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermutationConfig {
    /// Bootstrap replicates of the cost (1 = cost on the full data).
    pub num_bootstrap_reps: usize,
    /// Treat every height of every field as a separate predictor.
    pub separate_heights: bool,
    /// Seed for permutations and resampling.
    pub seed: Seed,
    /// Process predictors on the rayon thread pool.
    pub parallel: bool,
}

impl Default for PermutationConfig {
    fn default() -> Self {
        Self {
            num_bootstrap_reps: 1,
            separate_heights: false,
            seed: Seed::default(),
            parallel: true,
        }
    }
}

impl PermutationConfig {
    /// Set the number of bootstrap replicates.
    #[must_use]
    pub fn with_num_bootstrap_reps(mut self, num_bootstrap_reps: usize) -> Self {
        self.num_bootstrap_reps = num_bootstrap_reps;
        self
    }

    /// Separate heights into their own predictors.
    #[must_use]
    pub fn with_separate_heights(mut self, separate_heights: bool) -> Self {
        self.separate_heights = separate_heights;
        self
    }

    /// Set the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    /// Enable or disable parallel processing.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Cost after permuting one predictor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorImportance {
    /// The permuted predictor.
    pub id: PredictorId,
    /// Cost per bootstrap replicate.
    pub costs: Vec<f64>,
    /// Mean cost.
    pub mean_cost: f64,
}

/// Result of the single-pass permutation test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermutationResult {
    /// Cost per replicate with no predictor permuted.
    pub original_costs: Vec<f64>,
    /// One entry per predictor, most important (highest cost) first.
    pub predictors: Vec<PredictorImportance>,
}

impl PermutationResult {
    /// Mean cost with no predictor permuted.
    pub fn original_mean_cost(&self) -> f64 {
        stats::nan_mean(&self.original_costs)
    }

    /// Display the ranking as text.
    pub fn summary(&self) -> String {
        let mut output = String::new();
        output.push_str("=== Permutation Importance ===\n\n");
        output.push_str(&format!("Original cost: {:.4}\n\n", self.original_mean_cost()));
        output.push_str("  Rank | Matrix | Predictor | Cost     | Increase\n");
        output.push_str("-------+--------+-----------+----------+---------\n");
        for (rank, p) in self.predictors.iter().enumerate() {
            output.push_str(&format!(
                "  {:4} | {:6} | {:9} | {:8.4} | {:+.4}\n",
                rank + 1,
                p.id.matrix_index,
                p.id.predictor_index,
                p.mean_cost,
                p.mean_cost - self.original_mean_cost()
            ));
        }
        output
    }
}

/// Single-pass permutation test.
///
/// Computes the cost of the unpermuted predictions, then for each predictor
/// permutes it (alone), predicts, and bootstraps the cost. Predictor `k`
/// draws from stream `k + 1` of the seed and the baseline from stream 0,
/// so the ranking does not depend on thread scheduling.
///
/// # Arguments
///
/// * `matrices` - Clean predictor matrices, examples on axis 0
/// * `targets` - True class of each example
/// * `predict_fn` - Model: matrices to class-probability matrix
/// * `cost_fn` - Cost of a probability matrix (lower is better)
/// * `config` - Replicates, height separation, seed
///
/// # Errors
///
/// Fails on invalid matrix layouts or if `cost_fn` fails.
pub fn run_permutation_test<P, C>(
    matrices: &[PredictorMatrix],
    targets: &[usize],
    predict_fn: P,
    cost_fn: C,
    config: &PermutationConfig,
) -> Result<PermutationResult>
where
    P: Fn(&[PredictorMatrix]) -> Array2<f64> + Sync,
    C: Fn(&[usize], &Array2<f64>) -> Result<f64> + Sync,
{
    for (i, matrix) in matrices.iter().enumerate() {
        if matrix.ndim() < 2 || matrix.len_of(Axis(0)) != targets.len() {
            return Err(AnalysisError::ShapeMismatch(format!(
                "matrix {i} has shape {:?}, expected {} examples on axis 0 and a predictor axis",
                matrix.shape(),
                targets.len()
            )));
        }
    }

    let ids = list_predictors(matrices, config.separate_heights);
    tracing::debug!(num_predictors = ids.len(), "running permutation test");

    let baseline = predict_fn(matrices);
    let original_costs = bootstrap_cost(
        targets,
        &baseline,
        &cost_fn,
        config.num_bootstrap_reps,
        &mut config.seed.stream_rng(0),
    )?;

    let evaluate = |id: PredictorId, stream: u64| -> Result<PredictorImportance> {
        let mut rng = config.seed.stream_rng(stream);
        let mut permuted = matrices.to_vec();
        permute_one_predictor(&mut permuted, config.separate_heights, id, None, &mut rng)?;

        let probabilities = predict_fn(&permuted);
        let costs = bootstrap_cost(
            targets,
            &probabilities,
            &cost_fn,
            config.num_bootstrap_reps,
            &mut rng,
        )?;
        let mean_cost = stats::nan_mean(&costs);
        tracing::trace!(?id, mean_cost, "permuted predictor");
        Ok(PredictorImportance { id, costs, mean_cost })
    };

    let mut predictors: Vec<PredictorImportance> = if config.parallel {
        ids.par_iter()
            .enumerate()
            .map(|(k, &id)| evaluate(id, k as u64 + 1))
            .collect::<Result<_>>()?
    } else {
        ids.iter()
            .enumerate()
            .map(|(k, &id)| evaluate(id, k as u64 + 1))
            .collect::<Result<_>>()?
    };

    predictors.sort_by(|a, b| b.mean_cost.total_cmp(&a.mean_cost));
    Ok(PermutationResult {
        original_costs,
        predictors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::cross_entropy_function;
    use ndarray::{Array, Array3, Array4};

    /// Reflectivity and vorticity: 4 examples, 6 x 8 grid, 3 heights, 2 fields.
    fn radar_matrix() -> PredictorMatrix {
        let base = ndarray::array![
            [0., 0., 0., 1., 1., 0., 0., 0.],
            [0., 0., 1., 1., 1., 1., 0., 0.],
            [0., 1., 1., 1., 1., 1., 1., 0.],
            [0., 1., 1., 1., 1., 1., 1., 0.],
            [0., 0., 1., 1., 1., 1., 0., 0.],
            [0., 0., 0., 1., 1., 0., 0., 0.]
        ];
        let height_factors = [1.0, 10.0, 5.0];
        let field_factors = [1.0, 0.001];

        let mut radar = Array::zeros(IxDyn(&[4, 6, 8, 3, 2]));
        for e in 0..4 {
            for ((r, c), &v) in base.indexed_iter() {
                for (h, hf) in height_factors.iter().enumerate() {
                    for (f, ff) in field_factors.iter().enumerate() {
                        radar[[e, r, c, h, f]] = ff * (v * hf + 10.0 * e as f64);
                    }
                }
            }
        }
        radar
    }

    /// Temperature and humidity: 4 examples, 7 levels, 2 fields.
    fn sounding_matrix() -> PredictorMatrix {
        Array3::from_shape_fn((4, 7, 2), |(e, level, f)| {
            let celsius = 7.0 * e as f64 + 5.0 - level as f64;
            if f == 0 {
                273.15 + celsius
            } else {
                0.01 * (celsius + 1.0)
            }
        })
        .into_dyn()
    }

    fn predictor_matrices() -> Vec<PredictorMatrix> {
        vec![radar_matrix(), sounding_matrix()]
    }

    fn same_slab(a: &PredictorMatrix, b: &PredictorMatrix, k: usize) -> bool {
        let last = Axis(a.ndim() - 1);
        a.index_axis(last, k)
            .iter()
            .zip(b.index_axis(last, k).iter())
            .all(|(x, y)| (x - y).abs() < 1e-6)
    }

    /// Every predictor other than `id` is unchanged.
    fn assert_only_changed(
        orig: &[PredictorMatrix],
        new: &[PredictorMatrix],
        separate_heights: bool,
        id: PredictorId,
    ) {
        for (i, (a, b)) in orig.iter().zip(new).enumerate() {
            let (a, b) = if separate_heights && i == 0 {
                (flatten_last_two_dim(a).unwrap().0, flatten_last_two_dim(b).unwrap().0)
            } else {
                (a.clone(), b.clone())
            };
            for k in 0..a.shape()[a.ndim() - 1] {
                if i != id.matrix_index || k != id.predictor_index {
                    assert!(same_slab(&a, &b, k), "predictor ({i}, {k}) changed");
                }
            }
        }
    }

    #[test]
    fn test_flatten_last_two_dim() {
        let radar = radar_matrix();
        let (flat, orig_shape) = flatten_last_two_dim(&radar).unwrap();

        assert_eq!(orig_shape, vec![4, 6, 8, 3, 2]);
        assert_eq!(flat.shape(), &[4, 6, 8, 6]);
        for h in 0..3 {
            for f in 0..2 {
                assert_eq!(flat[[2, 3, 4, f * 3 + h]], radar[[2, 3, 4, h, f]]);
            }
        }
        assert_eq!(unflatten_last_two_dim(&flat, &orig_shape).unwrap(), radar);
        assert!(flatten_last_two_dim(&Array2::<f64>::zeros((3, 2)).into_dyn()).is_err());
    }

    #[test]
    fn test_permute_one_predictor() {
        let cases = [
            (true, PredictorId::new(0, 1)),
            (true, PredictorId::new(1, 0)),
            (false, PredictorId::new(0, 1)),
        ];
        for (separate_heights, id) in cases {
            let orig = predictor_matrices();
            let mut new = orig.clone();
            let mut rng = Seed::new(11).to_rng();
            let values =
                permute_one_predictor(&mut new, separate_heights, id, None, &mut rng).unwrap();
            assert_only_changed(&orig, &new, separate_heights, id);

            // Replaying the returned values reproduces the permutation.
            let mut replay = orig.clone();
            permute_one_predictor(&mut replay, separate_heights, id, Some(&values), &mut rng)
                .unwrap();
            assert_eq!(replay, new);
        }
    }

    #[test]
    fn test_permutation_moves_whole_examples() {
        let orig = Array4::from_shape_fn((50, 2, 2, 3), |(e, r, c, f)| {
            (e * 100 + r * 10 + c) as f64 + f as f64 * 0.5
        })
        .into_dyn();
        let mut matrices = vec![orig.clone()];
        let mut rng = Seed::new(5).to_rng();
        permute_one_predictor(&mut matrices, false, PredictorId::new(0, 2), None, &mut rng)
            .unwrap();

        let new = &matrices[0];
        assert!(!same_slab(&orig, new, 2));
        let mut sources: Vec<usize> = (0..50)
            .map(|e| ((new[[e, 0, 0, 2]] - 1.0) / 100.0).round() as usize)
            .collect();
        for e in 0..50 {
            // Each example's grid moves as a block.
            let src = sources[e];
            assert!((new[[e, 1, 1, 2]] - orig[[src, 1, 1, 2]]).abs() < 1e-9);
        }
        sources.sort_unstable();
        assert_eq!(sources, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_unpermute_one_predictor() {
        let cases = [(true, PredictorId::new(0, 4)), (false, PredictorId::new(1, 1))];
        for (separate_heights, id) in cases {
            let clean = predictor_matrices();
            let mut matrices = clean.clone();
            let mut rng = Seed::new(3).to_rng();
            permute_one_predictor(&mut matrices, separate_heights, id, None, &mut rng).unwrap();
            unpermute_one_predictor(&mut matrices, &clean, separate_heights, id).unwrap();
            assert_eq!(matrices, clean);
        }
    }

    #[test]
    fn test_permute_rejects_bad_ids() {
        let mut matrices = predictor_matrices();
        let mut rng = Seed::new(0).to_rng();
        let mut permute = |separate_heights: bool, id: PredictorId, values: Option<&ArrayD<f64>>| {
            permute_one_predictor(&mut matrices, separate_heights, id, values, &mut rng)
        };
        assert!(permute(false, PredictorId::new(2, 0), None).is_err());
        assert!(permute(false, PredictorId::new(0, 2), None).is_err());
        assert!(permute(true, PredictorId::new(0, 5), None).is_ok());

        let wrong = ArrayD::zeros(IxDyn(&[3]));
        assert!(permute(false, PredictorId::new(1, 0), Some(&wrong)).is_err());
    }

    #[test]
    fn test_list_predictors() {
        let matrices = predictor_matrices();
        assert_eq!(list_predictors(&matrices, false).len(), 4);
        assert_eq!(list_predictors(&matrices, true).len(), 8);
    }

    /// Predicts class 1 from the first predictor of a 2-D matrix only.
    fn first_predictor_model(matrices: &[PredictorMatrix]) -> Array2<f64> {
        let x = &matrices[0];
        Array2::from_shape_fn((x.shape()[0], 2), |(i, c)| {
            let p = x[[i, 0]];
            if c == 1 {
                p
            } else {
                1.0 - p
            }
        })
    }

    fn informative_data() -> (Vec<PredictorMatrix>, Vec<usize>) {
        let n = 40;
        let targets: Vec<usize> = (0..n).map(|i| i % 2).collect();
        let x = Array2::from_shape_fn((n, 3), |(i, k)| match k {
            0 => if targets[i] == 1 { 0.9 } else { 0.1 },
            _ => (i * (k + 3) % 7) as f64 / 7.0,
        });
        (vec![x.into_dyn()], targets)
    }

    #[test]
    fn test_permutation_test_ranks_informative_predictor_first() {
        let (matrices, targets) = informative_data();
        let config = PermutationConfig::default().with_seed(Seed::new(9));
        let result = run_permutation_test(
            &matrices,
            &targets,
            first_predictor_model,
            cross_entropy_function,
            &config,
        )
        .unwrap();

        assert_eq!(result.predictors.len(), 3);
        assert_eq!(result.predictors[0].id, PredictorId::new(0, 0));
        assert!(result.predictors[0].mean_cost > result.original_mean_cost());
        // The model ignores the other predictors.
        for p in &result.predictors[1..] {
            assert!((p.mean_cost - result.original_mean_cost()).abs() < 1e-12);
        }
        assert!(result.summary().contains("Permutation Importance"));
    }

    #[test]
    fn test_permutation_test_parallel_matches_sequential() {
        let (matrices, targets) = informative_data();
        let config = PermutationConfig::default()
            .with_seed(Seed::new(2))
            .with_num_bootstrap_reps(20);
        let parallel = run_permutation_test(
            &matrices,
            &targets,
            first_predictor_model,
            cross_entropy_function,
            &config,
        )
        .unwrap();
        let sequential = run_permutation_test(
            &matrices,
            &targets,
            first_predictor_model,
            cross_entropy_function,
            &config.clone().with_parallel(false),
        )
        .unwrap();

        assert_eq!(parallel.original_costs, sequential.original_costs);
        for (a, b) in parallel.predictors.iter().zip(&sequential.predictors) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.costs, b.costs);
            assert_eq!(a.costs.len(), 20);
        }
    }

    #[test]
    fn test_permutation_test_checks_example_count() {
        let (matrices, _) = informative_data();
        let config = PermutationConfig::default();
        let result = run_permutation_test(
            &matrices,
            &[0, 1],
            first_predictor_model,
            cross_entropy_function,
            &config,
        );
        assert!(result.is_err());
    }
}
