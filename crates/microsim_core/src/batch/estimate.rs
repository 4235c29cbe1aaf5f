//! Heuristic reconstruction of an interaction matrix from paired runs.
//!
//! Run `k` of set A and run `k` of set B are two end states of the same
//! community. For every species the log-ratio of its final abundances is
//! regressed on the paired differences of all final abundances:
//!
//! ```text
//! ln((xB_i + eps) / (xA_i + eps)) ~ sum_j A_ij (xB_j - xA_j)
//! ```
//!
//! The ridge solution is then rescaled and sparsified to the requested
//! shape. Nothing guarantees that the true matrix is recovered.

use crate::error::{Result, SimError};
use crate::ensure_param;
use microsim_data::{InteractionMatrix, Trajectory};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EstimateConfig {
    /// Ridge penalty added to the normal equations.
    pub ridge: f64,
    /// Added to abundances before taking logs.
    pub pseudocount: f64,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            ridge: 1e-6,
            pseudocount: 1e-6,
        }
    }
}

pub fn estimate_interaction_from_simulations(
    set_a: &[Trajectory],
    set_b: &[Trajectory],
    scale_off_diagonal: f64,
    diagonal: f64,
    connectance: f64,
) -> Result<InteractionMatrix> {
    estimate_with(
        set_a,
        set_b,
        scale_off_diagonal,
        diagonal,
        connectance,
        &EstimateConfig::default(),
    )
}

pub fn estimate_with(
    set_a: &[Trajectory],
    set_b: &[Trajectory],
    scale_off_diagonal: f64,
    diagonal: f64,
    connectance: f64,
    config: &EstimateConfig,
) -> Result<InteractionMatrix> {
    ensure_param!(
        scale_off_diagonal.is_finite() && scale_off_diagonal >= 0.0,
        "scale_off_diagonal must be finite and non-negative"
    );
    ensure_param!(diagonal.is_finite(), "diagonal must be finite");
    ensure_param!(
        (0.0..=1.0).contains(&connectance),
        "connectance must be in [0.0, 1.0]"
    );
    ensure_param!(
        config.ridge > 0.0 && config.pseudocount > 0.0,
        "ridge and pseudocount must be positive"
    );
    if set_a.len() != set_b.len() {
        return Err(SimError::dimension_mismatch(format!(
            "set A has {} runs, set B has {}",
            set_a.len(),
            set_b.len()
        )));
    }
    let Some(first) = set_a.first() else {
        return Err(SimError::invalid_dimension("no runs to estimate from"));
    };

    let n = first.n_species();
    let m = set_a.len();
    let mut differences = DMatrix::<f64>::zeros(m, n);
    let mut log_ratios = DMatrix::<f64>::zeros(m, n);
    for (k, (a, b)) in set_a.iter().zip(set_b).enumerate() {
        let (xa, xb) = (final_state(a, n)?, final_state(b, n)?);
        for i in 0..n {
            differences[(k, i)] = xb[i] - xa[i];
            log_ratios[(k, i)] =
                ((xb[i] + config.pseudocount) / (xa[i] + config.pseudocount)).ln();
        }
    }

    let normal = differences.tr_mul(&differences) + DMatrix::identity(n, n) * config.ridge;
    let rhs = differences.tr_mul(&log_ratios);
    let weights = normal
        .cholesky()
        .ok_or_else(|| SimError::invalid_parameter("normal equations are not positive definite"))?
        .solve(&rhs);
    let mut estimate = weights.transpose();

    let off_diagonal: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| (0..n).map(move |j| (i, j)))
        .filter(|&(i, j)| i != j)
        .collect();
    let largest = off_diagonal
        .iter()
        .map(|&ij| estimate[ij].abs())
        .fold(0.0_f64, f64::max);
    if largest > 0.0 {
        let factor = scale_off_diagonal / largest;
        for &ij in &off_diagonal {
            estimate[ij] *= factor;
        }
    }

    let keep = (connectance * off_diagonal.len() as f64).round() as usize;
    let mut ranked = off_diagonal;
    ranked.sort_by(|&p, &q| estimate[q].abs().total_cmp(&estimate[p].abs()));
    for &ij in &ranked[keep.min(ranked.len())..] {
        estimate[ij] = 0.0;
    }
    estimate.fill_diagonal(diagonal);

    tracing::debug!(n_species = n, runs = m, kept = keep, "interaction matrix estimated");
    Ok(InteractionMatrix::new(estimate)?)
}

fn final_state(trajectory: &Trajectory, n: usize) -> Result<DVector<f64>> {
    if trajectory.n_species() != n {
        return Err(SimError::dimension_mismatch(format!(
            "run has {} species, expected {n}",
            trajectory.n_species()
        )));
    }
    trajectory
        .final_species()
        .ok_or_else(|| SimError::invalid_dimension("run has no reported points"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use microsim_data::{ModelKind, RunStats, Termination, TrajectoryMetadata};
    use uuid::Uuid;

    fn end_state(values: &[f64]) -> Trajectory {
        Trajectory {
            time: vec![0.0],
            species: DMatrix::from_column_slice(values.len(), 1, values),
            resources: None,
            metadata: TrajectoryMetadata {
                model: ModelKind::Glv,
                run_id: Uuid::nil(),
                seed: None,
                stream: 0,
                fingerprint: String::new(),
                termination: Termination::Completed,
                normalized: false,
                stats: RunStats::default(),
            },
        }
    }

    fn pairs() -> (Vec<Trajectory>, Vec<Trajectory>) {
        let a = [[1.0, 1.0, 1.0], [2.0, 1.0, 0.5], [0.5, 2.0, 1.0], [1.0, 0.2, 2.0]];
        let b = [[1.5, 0.8, 1.0], [1.0, 1.5, 0.7], [0.9, 1.0, 1.4], [2.0, 0.6, 1.1]];
        (
            a.iter().map(|x| end_state(x)).collect(),
            b.iter().map(|x| end_state(x)).collect(),
        )
    }

    #[test]
    fn test_shape_of_estimate() {
        let (a, b) = pairs();
        let est = estimate_interaction_from_simulations(&a, &b, 0.3, -1.0, 0.5).unwrap();
        assert_eq!(est.n_species(), 3);
        assert_eq!(est.diagonal(), vec![-1.0, -1.0, -1.0]);
        assert_eq!(est.off_diagonal_nonzero(), 3);
        let largest = (0..3)
            .flat_map(|i| (0..3).map(move |j| (i, j)))
            .filter(|&(i, j)| i != j)
            .map(|(i, j)| est.get(i, j).abs())
            .fold(0.0_f64, f64::max);
        assert!((largest - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_unequal_run_counts() {
        let (a, mut b) = pairs();
        b.pop();
        assert!(matches!(
            estimate_interaction_from_simulations(&a, &b, 0.3, -1.0, 0.5),
            Err(SimError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_species_count_mismatch() {
        let (a, mut b) = pairs();
        b[0] = end_state(&[1.0, 2.0]);
        assert!(matches!(
            estimate_interaction_from_simulations(&a, &b, 0.3, -1.0, 0.5),
            Err(SimError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_empty_sets_rejected() {
        assert!(matches!(
            estimate_interaction_from_simulations(&[], &[], 0.3, -1.0, 0.5),
            Err(SimError::InvalidDimension(_))
        ));
    }
}
