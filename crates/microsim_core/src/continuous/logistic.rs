//! Independent logistic growth with linear mortality:
//! `dx_i/dt = b_i x_i (1 - x_i / k_i) - d_i x_i`.
//!
//! Species do not interact, which makes this the null model for the
//! interaction-driven ones. It is usually run with `stochastic = true`.

use super::glv::default_t_step;
use super::{integrate, Integration, VectorField};
use crate::config::{check_vector, BoundaryConfig, ModelParams, NoiseConfig, TimeConfig};
use crate::error::Result;
use crate::ensure_param;
use crate::rng::RngStream;
use microsim_data::{ModelKind, SimulationState, Trajectory};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogisticParams {
    pub n_species: usize,
    pub growth_rates: Vec<f64>,
    pub carrying_capacities: Vec<f64>,
    #[serde(default)]
    pub death_rates: Option<Vec<f64>>,
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

impl LogisticParams {
    #[must_use]
    pub fn new(n_species: usize) -> Self {
        Self {
            n_species,
            growth_rates: vec![1.0; n_species],
            carrying_capacities: vec![1.0; n_species],
            death_rates: None,
            x0: vec![0.1; n_species],
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
        check_vector("growth_rates", &self.growth_rates, n, true)?;
        check_vector("carrying_capacities", &self.carrying_capacities, n, true)?;
        ensure_param!(
            self.carrying_capacities.iter().all(|&k| k > 0.0),
            "carrying capacities must be positive"
        );
        if let Some(death) = &self.death_rates {
            check_vector("death_rates", death, n, true)?;
        }
        check_vector("x0", &self.x0, n, true)?;
        self.integration().validate()
    }
}

pub struct LogisticField {
    growth: DVector<f64>,
    capacity: DVector<f64>,
    death: DVector<f64>,
}

impl LogisticField {
    fn from_params(params: &LogisticParams) -> Self {
        let n = params.n_species;
        Self {
            growth: DVector::from_vec(params.growth_rates.clone()),
            capacity: DVector::from_vec(params.carrying_capacities.clone()),
            death: params
                .death_rates
                .as_ref()
                .map_or_else(|| DVector::zeros(n), |d| DVector::from_vec(d.clone())),
        }
    }
}

impl VectorField for LogisticField {
    fn kind(&self) -> ModelKind {
        ModelKind::Logistic
    }

    fn n_species(&self) -> usize {
        self.growth.len()
    }

    fn derivative(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_fn(x.len(), |i, _| {
            self.growth[i] * x[i] * (1.0 - x[i] / self.capacity[i]) - self.death[i] * x[i]
        })
    }
}

pub fn simulate_logistic(params: &LogisticParams, rng: &mut RngStream) -> Result<Trajectory> {
    params.validate()?;
    let fingerprint = ModelParams::Logistic(params.clone()).fingerprint();
    integrate(
        LogisticField::from_params(params),
        SimulationState::from_slices(&params.x0, None),
        &params.integration(),
        fingerprint,
        rng,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Amplitude;

    #[test]
    fn test_reaches_effective_capacity() {
        // Equilibrium is k (1 - d / b) = 2 * (1 - 0.5) = 1.
        let mut p = LogisticParams::new(1);
        p.carrying_capacities = vec![2.0];
        p.death_rates = Some(vec![0.5]);
        p.time.t_end = 100.0;
        p.time.t_store = 10;
        let mut rng = RngStream::new(0);
        let t = simulate_logistic(&p, &mut rng).unwrap();
        assert!((t.final_species().unwrap()[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_stochastic_run_is_seeded() {
        let mut p = LogisticParams::new(3);
        p.stochastic = true;
        p.noise.sigma_drift = Amplitude::Uniform(0.2);
        p.time.t_end = 10.0;
        p.time.t_store = 10;
        let a = simulate_logistic(&p, &mut RngStream::new(5)).unwrap();
        let b = simulate_logistic(&p, &mut RngStream::new(5)).unwrap();
        let c = simulate_logistic(&p, &mut RngStream::new(6)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.species, c.species);
        assert!(a.min_value() >= 0.0);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut p = LogisticParams::new(2);
        p.carrying_capacities = vec![1.0, 0.0];
        assert!(p.validate().is_err());
    }
}
