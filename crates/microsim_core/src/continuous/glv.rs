//! Generalized Lotka-Volterra: `dx_i/dt = x_i (r_i + sum_j A_ij x_j)`.

use super::{integrate, Integration, VectorField};
use crate::config::{check_vector, BoundaryConfig, ModelParams, NoiseConfig, TimeConfig};
use crate::error::Result;
use crate::rng::RngStream;
use crate::{ensure_len, ensure_param};
use microsim_data::{InteractionMatrix, ModelKind, SimulationState, Trajectory};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

pub(crate) fn default_t_step() -> f64 {
    0.1
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GlvParams {
    pub n_species: usize,
    pub interactions: InteractionMatrix,
    pub growth_rates: Vec<f64>,
    pub x0: Vec<f64>,
    #[serde(default)]
    pub time: TimeConfig,
    #[serde(default = "default_t_step")]
    pub t_step: f64,
    #[serde(default)]
    pub stochastic: bool,
    #[serde(default)]
    pub norm: bool,
    #[serde(default)]
    pub boundary: BoundaryConfig,
    #[serde(default)]
    pub noise: NoiseConfig,
}

impl GlvParams {
    /// Unit growth and unit initial abundance for every species.
    #[must_use]
    pub fn new(interactions: InteractionMatrix) -> Self {
        let n = interactions.n_species();
        Self {
            n_species: n,
            interactions,
            growth_rates: vec![1.0; n],
            x0: vec![1.0; n],
            time: TimeConfig::default(),
            t_step: default_t_step(),
            stochastic: false,
            norm: false,
            boundary: BoundaryConfig::default(),
            noise: NoiseConfig::default(),
        }
    }

    fn integration(&self) -> Integration<'_> {
        Integration {
            time: &self.time,
            boundary: &self.boundary,
            noise: &self.noise,
            stochastic: self.stochastic,
            norm: self.norm,
            t_step: self.t_step,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.n_species;
        ensure_param!(n > 0, "n_species must be at least 1");
        ensure_len!("interactions", self.interactions.n_species(), n);
        check_vector("growth_rates", &self.growth_rates, n, false)?;
        check_vector("x0", &self.x0, n, true)?;
        self.integration().validate()
    }
}

pub struct GlvField {
    growth: DVector<f64>,
    interactions: DMatrix<f64>,
}

impl GlvField {
    #[must_use]
    pub fn new(growth_rates: &[f64], interactions: &InteractionMatrix) -> Self {
        Self {
            growth: DVector::from_vec(growth_rates.to_vec()),
            interactions: interactions.as_matrix().clone(),
        }
    }
}

impl VectorField for GlvField {
    fn kind(&self) -> ModelKind {
        ModelKind::Glv
    }

    fn n_species(&self) -> usize {
        self.growth.len()
    }

    fn derivative(&self, x: &DVector<f64>) -> DVector<f64> {
        let per_capita = &self.growth + &self.interactions * x;
        x.component_mul(&per_capita)
    }
}

/// Integrates the gLV system on the configured report grid.
pub fn simulate_glv(params: &GlvParams, rng: &mut RngStream) -> Result<Trajectory> {
    params.validate()?;
    let fingerprint = ModelParams::Glv(params.clone()).fingerprint();
    integrate(
        GlvField::new(&params.growth_rates, &params.interactions),
        SimulationState::from_slices(&params.x0, None),
        &params.integration(),
        fingerprint,
        rng,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    fn two_species() -> GlvParams {
        let mut p = GlvParams::new(InteractionMatrix::from_diagonal(&[-0.5, -0.5]));
        p.growth_rates = vec![0.1, 0.1];
        p.time = TimeConfig {
            t_start: 0.0,
            t_end: 10.0,
            t_store: 5,
        };
        p
    }

    #[test]
    fn test_derivative() {
        let a = InteractionMatrix::from_rows(&[vec![-1.0, 0.5], vec![0.0, -1.0]]).unwrap();
        let field = GlvField::new(&[1.0, 2.0], &a);
        let dx = field.derivative(&DVector::from_vec(vec![1.0, 2.0]));
        // x0 * (1 - 1 + 1) = 1, x1 * (2 - 2) = 0
        assert_eq!(dx.as_slice(), &[1.0, 0.0]);
    }

    #[test]
    fn test_grid_shape() {
        let mut rng = RngStream::new(0);
        let t = simulate_glv(&two_species(), &mut rng).unwrap();
        assert_eq!(t.time, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(t.species.shape(), (2, 6));
        assert_eq!(t.metadata.model, ModelKind::Glv);
    }

    #[test]
    fn test_interaction_size_mismatch() {
        let mut p = two_species();
        p.n_species = 3;
        p.growth_rates = vec![0.1; 3];
        p.x0 = vec![1.0; 3];
        let mut rng = RngStream::new(0);
        assert!(matches!(
            simulate_glv(&p, &mut rng),
            Err(SimError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_negative_x0_rejected() {
        let mut p = two_species();
        p.x0 = vec![1.0, -1.0];
        assert!(matches!(p.validate(), Err(SimError::InvalidParameter(_))));
    }

    fn stiff(a: f64, r: f64, x0: f64) -> GlvParams {
        let mut p = GlvParams::new(InteractionMatrix::from_diagonal(&[a]));
        p.growth_rates = vec![r];
        p.x0 = vec![x0];
        p.t_step = 1.0;
        p.time = TimeConfig {
            t_start: 0.0,
            t_end: 5.0,
            t_store: 5,
        };
        p
    }

    #[test]
    fn test_overflowing_step_diverges() {
        let mut rng = RngStream::new(0);
        let err = simulate_glv(&stiff(-1e300, 0.1, 1e4), &mut rng).unwrap_err();
        let SimError::NumericalDivergence { time, partial } = err else {
            panic!("expected divergence");
        };
        assert_eq!(time, 1.0);
        assert_eq!(partial.series(0), vec![1e4]);
        assert_eq!(partial.metadata.stats.extinctions, 0);
    }

    #[test]
    fn test_unstable_step_below_zero_diverges() {
        // RK4 with h = 1 overshoots to about -3.7e42
        let mut rng = RngStream::new(0);
        let err = simulate_glv(&stiff(-10.0, 1.0, 100.0), &mut rng).unwrap_err();
        assert!(matches!(err, SimError::NumericalDivergence { time, .. } if time == 1.0));
    }

    #[test]
    fn test_mutualism_diverges() {
        let mut p = GlvParams::new(
            InteractionMatrix::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap(),
        );
        p.time.t_end = 50.0;
        p.time.t_store = 50;
        let mut rng = RngStream::new(0);
        let err = simulate_glv(&p, &mut rng).unwrap_err();
        assert!(err.is_recoverable());
        let partial = err.recover_partial().unwrap();
        assert!(partial.n_points() >= 1);
        assert!(partial.species.iter().all(|v| v.is_finite()));
    }
}
