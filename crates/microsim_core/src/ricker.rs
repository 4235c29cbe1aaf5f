//! Ricker map: `x_i[t+1] = x_i[t] exp(r_i + sum_j A_ij x_j[t])`.
//!
//! Every iteration advances time by one unit and is reported, so the grid is
//! `t_start, t_start + 1, ..., t_end`.

use crate::config::{check_vector, BoundaryConfig, ModelParams, NoiseConfig};
use crate::dynamics::{self, Clock, Dynamics, RunOptions, StepOutcome};
use crate::error::{Result, SimError};
use crate::noise::NoiseModel;
use crate::report::ReportGrid;
use crate::rng::RngStream;
use crate::{ensure_len, ensure_param};
use microsim_data::{InteractionMatrix, ModelKind, SimulationState, Trajectory};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

fn default_t_end() -> f64 {
    100.0
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RickerParams {
    pub n_species: usize,
    pub interactions: InteractionMatrix,
    pub growth_rates: Vec<f64>,
    pub x0: Vec<f64>,
    #[serde(default)]
    pub t_start: f64,
    #[serde(default = "default_t_end")]
    pub t_end: f64,
    #[serde(default)]
    pub stochastic: bool,
    #[serde(default)]
    pub norm: bool,
    #[serde(default)]
    pub boundary: BoundaryConfig,
    #[serde(default)]
    pub noise: NoiseConfig,
}

impl RickerParams {
    #[must_use]
    pub fn new(interactions: InteractionMatrix) -> Self {
        let n = interactions.n_species();
        Self {
            n_species: n,
            interactions,
            growth_rates: vec![1.0; n],
            x0: vec![1.0; n],
            t_start: 0.0,
            t_end: default_t_end(),
            stochastic: false,
            norm: false,
            boundary: BoundaryConfig::default(),
            noise: NoiseConfig::default(),
        }
    }

    /// Number of map iterations between `t_start` and `t_end`, if the span is
    /// a positive whole number up to rounding error.
    fn iterations(&self) -> Option<usize> {
        let span = self.t_end - self.t_start;
        let whole = span.round();
        let tol = 1e-9 * self.t_start.abs().max(self.t_end.abs()).max(1.0);
        let valid = self.t_start.is_finite()
            && span.is_finite()
            && whole >= 1.0
            && (span - whole).abs() <= tol;
        valid.then_some(whole as usize)
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.n_species;
        ensure_param!(n > 0, "n_species must be at least 1");
        ensure_len!("interactions", self.interactions.n_species(), n);
        check_vector("growth_rates", &self.growth_rates, n, false)?;
        check_vector("x0", &self.x0, n, true)?;
        ensure_param!(
            self.iterations().is_some(),
            "t_end - t_start must be a positive integer, got {}",
            self.t_end - self.t_start
        );
        self.boundary.validate()?;
        self.noise.validate()
    }
}

pub struct RickerMap {
    growth: DVector<f64>,
    interactions: DMatrix<f64>,
    initial: SimulationState,
    noise: Option<NoiseModel>,
    boundary: BoundaryConfig,
}

impl Dynamics for RickerMap {
    fn kind(&self) -> ModelKind {
        ModelKind::Ricker
    }

    fn initial_state(&self) -> SimulationState {
        self.initial.clone()
    }

    fn step(
        &mut self,
        state: &SimulationState,
        clock: Clock,
        rng: &mut RngStream,
    ) -> Result<StepOutcome> {
        let x = &state.species;
        let exponent = &self.growth + &self.interactions * x;
        let mut next = x.component_mul(&exponent.map(f64::exp));
        if let Some(noise) = &self.noise {
            next.component_mul_assign(&noise.log_normal_factors(rng));
            noise.perturb(&mut next, clock.now, 1.0, rng);
        }
        Ok(StepOutcome::Advanced {
            state: SimulationState::new(next),
            elapsed: 1.0,
            events: 0,
        })
    }

    fn boundary(&self) -> &BoundaryConfig {
        &self.boundary
    }
}

pub fn simulate_ricker(params: &RickerParams, rng: &mut RngStream) -> Result<Trajectory> {
    params.validate()?;
    let iterations = params
        .iterations()
        .ok_or_else(|| SimError::invalid_parameter("t_end - t_start must be a positive integer"))?;
    let noise = if params.stochastic {
        Some(NoiseModel::new(&params.noise, params.n_species)?)
    } else {
        None
    };
    let mut map = RickerMap {
        growth: DVector::from_vec(params.growth_rates.clone()),
        interactions: params.interactions.as_matrix().clone(),
        initial: SimulationState::from_slices(&params.x0, None),
        noise,
        boundary: params.boundary.clone(),
    };
    dynamics::run(
        &mut map,
        RunOptions {
            grid: ReportGrid::unit(params.t_start, iterations),
            error_variance: params.noise.error_variance,
            norm: params.norm,
            fingerprint: ModelParams::Ricker(params.clone()).fingerprint(),
        },
        rng,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Amplitude;

    #[test]
    fn test_single_iteration_matches_formula() {
        let mut p = RickerParams::new(InteractionMatrix::from_diagonal(&[-1.0]));
        p.growth_rates = vec![0.5];
        p.x0 = vec![0.25];
        p.t_end = 1.0;
        let mut rng = RngStream::new(0);
        let t = simulate_ricker(&p, &mut rng).unwrap();
        assert_eq!(t.time, vec![0.0, 1.0]);
        let expected = 0.25 * (0.5_f64 - 0.25).exp();
        assert!((t.series(0)[1] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_converges_to_fixed_point() {
        // Fixed point x* = r / -A_ii = 0.5 is stable for r < 2.
        let mut p = RickerParams::new(InteractionMatrix::from_diagonal(&[-1.0, -2.0]));
        p.growth_rates = vec![0.5, 1.0];
        p.x0 = vec![0.1, 0.1];
        p.t_end = 200.0;
        let mut rng = RngStream::new(0);
        let t = simulate_ricker(&p, &mut rng).unwrap();
        assert_eq!(t.n_points(), 201);
        let last = t.final_species().unwrap();
        assert!((last[0] - 0.5).abs() < 1e-9);
        assert!((last[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_fractional_span_rejected() {
        let mut p = RickerParams::new(InteractionMatrix::from_diagonal(&[-1.0]));
        p.t_end = 10.5;
        assert!(matches!(p.validate(), Err(SimError::InvalidParameter(_))));
    }

    #[test]
    fn test_span_with_rounding_error_accepted() {
        let mut p = RickerParams::new(InteractionMatrix::from_diagonal(&[-1.0]));
        p.t_start = 0.1;
        p.t_end = 1.1;
        assert!(p.validate().is_ok());
        let mut rng = RngStream::new(0);
        let t = simulate_ricker(&p, &mut rng).unwrap();
        assert_eq!(t.n_points(), 2);
        assert_eq!(t.t_start(), Some(0.1));
    }

    #[test]
    fn test_stochastic_non_negative() {
        let mut p = RickerParams::new(InteractionMatrix::from_diagonal(&[-1.0, -1.0]));
        p.stochastic = true;
        p.noise.sigma_drift = Amplitude::Uniform(0.5);
        p.boundary.extinction_threshold = 1e-6;
        p.t_end = 50.0;
        let mut rng = RngStream::new(2);
        let t = simulate_ricker(&p, &mut rng).unwrap();
        assert!(t.min_value() >= 0.0);
    }
}
