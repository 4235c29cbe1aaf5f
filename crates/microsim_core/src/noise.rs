//! Stochastic perturbation terms for the stepped models.
//!
//! `NoiseModel` is resolved once per run from a `NoiseConfig`. It supplies the
//! Euler-Maruyama diffusion increment, the per-step log-normal factor of the
//! stochastic Ricker map, and the discrete shocks (epochs and scheduled
//! external events). Absent species are never perturbed.

use crate::config::{ExternalEvent, NoiseConfig, NoiseKind};
use crate::error::Result;
use crate::rng::RngStream;
use nalgebra::DVector;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

#[derive(Debug, Clone)]
pub struct NoiseModel {
    kind: NoiseKind,
    sigma: Vec<f64>,
    epoch_p: f64,
    sigma_epoch: f64,
    external_events: Vec<ExternalEvent>,
    sigma_external: f64,
}

impl NoiseModel {
    pub fn new(config: &NoiseConfig, n_species: usize) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            kind: config.kind,
            sigma: config.sigma_drift.resolve(n_species)?,
            epoch_p: config.epoch_p,
            sigma_epoch: config.sigma_epoch,
            external_events: config.external_events.clone(),
            sigma_external: config.sigma_external,
        })
    }

    #[must_use]
    pub fn sigma(&self) -> &[f64] {
        &self.sigma
    }

    /// Diffusion increment for one Euler-Maruyama step of size `dt`.
    pub fn diffusion(&self, x: &DVector<f64>, dt: f64, rng: &mut RngStream) -> DVector<f64> {
        let sqrt_dt = dt.sqrt();
        DVector::from_fn(x.len(), |i, _| {
            if x[i] <= 0.0 || self.sigma[i] == 0.0 {
                return 0.0;
            }
            let dw: f64 = StandardNormal.sample(rng);
            match self.kind {
                NoiseKind::Multiplicative => self.sigma[i] * x[i] * sqrt_dt * dw,
                NoiseKind::Additive => self.sigma[i] * sqrt_dt * dw,
            }
        })
    }

    /// `exp(N(0, sigma_i))` for each species.
    pub fn log_normal_factors(&self, rng: &mut RngStream) -> DVector<f64> {
        DVector::from_fn(self.sigma.len(), |i, _| {
            let z: f64 = StandardNormal.sample(rng);
            (self.sigma[i] * z).exp()
        })
    }

    /// Applies epoch and external shocks for the step `[t, t + dt)`.
    ///
    /// Returns `true` when anything was applied.
    pub fn perturb(&self, x: &mut DVector<f64>, t: f64, dt: f64, rng: &mut RngStream) -> bool {
        let mut hit = false;
        if self.epoch_p > 0.0 && rng.gen::<f64>() < self.epoch_p {
            shock(x, self.sigma_epoch, rng);
            hit = true;
        }
        let midpoint = t + 0.5 * dt;
        if self.external_events.iter().any(|e| e.contains(midpoint)) {
            shock(x, self.sigma_external * dt.sqrt(), rng);
            hit = true;
        }
        hit
    }
}

fn shock(x: &mut DVector<f64>, sigma: f64, rng: &mut RngStream) {
    for v in x.iter_mut().filter(|v| **v > 0.0) {
        let z: f64 = StandardNormal.sample(rng);
        *v *= (sigma * z).exp();
    }
}
