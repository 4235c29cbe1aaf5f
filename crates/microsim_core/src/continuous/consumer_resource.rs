//! Consumer-resource dynamics with Monod uptake.
//!
//! Species growth is limited by the scarcest resource it consumes:
//!
//! ```text
//! g_i   = mu_i * min_{k consumed by i} r_k / (K_ik + r_k)
//! dx_i  = x_i (g_i - d_i)
//! dr_k  = inflow_k - outflow_k r_k - sum_i C_ik g_i x_i + sum_i P_ik g_i x_i
//! ```

use super::glv::default_t_step;
use super::{integrate, Integration, VectorField};
use crate::config::{check_vector, BoundaryConfig, ModelParams, NoiseConfig, TimeConfig};
use crate::error::Result;
use crate::rng::RngStream;
use crate::{ensure_len, ensure_param};
use microsim_data::{CouplingMatrices, ModelKind, SimulationState, Trajectory};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConsumerResourceParams {
    pub n_species: usize,
    pub n_resources: usize,
    pub coupling: CouplingMatrices,
    /// Half-saturation constants, `n_species x n_resources`.
    pub monod_constants: Vec<Vec<f64>>,
    pub growth_rates: Vec<f64>,
    pub death_rates: Vec<f64>,
    pub inflow: Vec<f64>,
    pub outflow: Vec<f64>,
    pub x0: Vec<f64>,
    pub resources0: Vec<f64>,
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

impl ConsumerResourceParams {
    /// Unit rates, unit half-saturation, unit initial abundances, no flow.
    #[must_use]
    pub fn new(coupling: CouplingMatrices) -> Self {
        let (n, k) = (coupling.n_species(), coupling.n_resources());
        Self {
            n_species: n,
            n_resources: k,
            coupling,
            monod_constants: vec![vec![1.0; k]; n],
            growth_rates: vec![1.0; n],
            death_rates: vec![0.1; n],
            inflow: vec![0.0; k],
            outflow: vec![0.0; k],
            x0: vec![1.0; n],
            resources0: vec![1.0; k],
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
        let (n, k) = (self.n_species, self.n_resources);
        ensure_param!(n > 0, "n_species must be at least 1");
        ensure_param!(k > 0, "n_resources must be at least 1");
        ensure_len!("coupling species", self.coupling.n_species(), n);
        ensure_len!("coupling resources", self.coupling.n_resources(), k);
        ensure_len!("monod_constants rows", self.monod_constants.len(), n);
        for row in &self.monod_constants {
            ensure_len!("monod_constants row", row.len(), k);
            ensure_param!(
                row.iter().all(|v| v.is_finite() && *v > 0.0),
                "monod constants must be finite and positive"
            );
        }
        check_vector("growth_rates", &self.growth_rates, n, true)?;
        check_vector("death_rates", &self.death_rates, n, true)?;
        check_vector("inflow", &self.inflow, k, true)?;
        check_vector("outflow", &self.outflow, k, true)?;
        check_vector("x0", &self.x0, n, true)?;
        check_vector("resources0", &self.resources0, k, true)?;
        self.integration().validate()
    }
}

pub struct ConsumerResourceField {
    consumption: DMatrix<f64>,
    production: DMatrix<f64>,
    monod: DMatrix<f64>,
    growth: DVector<f64>,
    death: DVector<f64>,
    inflow: DVector<f64>,
    outflow: DVector<f64>,
}

impl ConsumerResourceField {
    fn from_params(params: &ConsumerResourceParams) -> Self {
        let (n, k) = (params.n_species, params.n_resources);
        Self {
            consumption: params.coupling.consumption().clone(),
            production: params.coupling.production().clone(),
            monod: DMatrix::from_fn(n, k, |i, r| params.monod_constants[i][r]),
            growth: DVector::from_vec(params.growth_rates.clone()),
            death: DVector::from_vec(params.death_rates.clone()),
            inflow: DVector::from_vec(params.inflow.clone()),
            outflow: DVector::from_vec(params.outflow.clone()),
        }
    }

    /// Realised growth rate `g_i` of every species.
    fn growth_rates(&self, resources: &[f64]) -> DVector<f64> {
        DVector::from_fn(self.growth.len(), |i, _| {
            let limitation = resources
                .iter()
                .enumerate()
                .filter(|&(r, _)| self.consumption[(i, r)] > 0.0)
                .map(|(r, &level)| {
                    let level = level.max(0.0);
                    level / (self.monod[(i, r)] + level)
                })
                .fold(f64::INFINITY, f64::min);
            if limitation.is_finite() {
                self.growth[i] * limitation
            } else {
                0.0
            }
        })
    }
}

impl VectorField for ConsumerResourceField {
    fn kind(&self) -> ModelKind {
        ModelKind::ConsumerResource
    }

    fn n_species(&self) -> usize {
        self.growth.len()
    }

    fn n_resources(&self) -> usize {
        self.inflow.len()
    }

    fn derivative(&self, y: &DVector<f64>) -> DVector<f64> {
        let n = self.n_species();
        let x = y.rows(0, n);
        let r = y.rows(n, self.n_resources());
        let g = self.growth_rates(&y.as_slice()[n..]);

        let dx = x.component_mul(&(&g - &self.death));
        let flux = g.component_mul(&x);
        let dr = &self.inflow - self.outflow.component_mul(&r) - self.consumption.tr_mul(&flux)
            + self.production.tr_mul(&flux);

        DVector::from_iterator(y.len(), dx.iter().chain(dr.iter()).copied())
    }
}

/// Integrates species and resources together on the configured report grid.
pub fn simulate_consumer_resource(
    params: &ConsumerResourceParams,
    rng: &mut RngStream,
) -> Result<Trajectory> {
    params.validate()?;
    let fingerprint = ModelParams::ConsumerResource(params.clone()).fingerprint();
    integrate(
        ConsumerResourceField::from_params(params),
        SimulationState::from_slices(&params.x0, Some(params.resources0.as_slice())),
        &params.integration(),
        fingerprint,
        rng,
    )
}
