//! Self-organized instability: an interaction-biased birth-death-immigration
//! process on integer counts bounded by a carrying capacity.
//!
//! Per-species propensities, with `N` the community size and
//! `g_i = r_i + sum_j A_ij x_j / K`:
//!
//! ```text
//! immigration  m p_i                        (only while N < K)
//! birth        x_i max(g_i, 0) (1 - N / K)
//! death        x_i (e_i + max(-g_i, 0))
//! ```
//!
//! Each step fires `k_events` elementary events drawn from the propensities
//! frozen at the start of the step, after a `Gamma(k_events, 1 / R)` wait.

use super::check_counts;
use crate::config::{check_vector, BoundaryConfig, ModelParams, TimeConfig};
use crate::dynamics::{self, Clock, Dynamics, RunOptions, StepOutcome};
use crate::error::{Result, SimError};
use crate::rng::RngStream;
use crate::{ensure_len, ensure_param};
use microsim_data::{InteractionMatrix, ModelKind, SimulationState, Trajectory};
use nalgebra::{DMatrix, DVector};
use rand::distributions::WeightedIndex;
use rand_distr::{Distribution, Gamma};
use serde::{Deserialize, Serialize};

fn default_k_events() -> u64 {
    10
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SoiParams {
    pub n_species: usize,
    pub interactions: InteractionMatrix,
    pub growth_rates: Vec<f64>,
    pub death_rates: Vec<f64>,
    pub immigration_rate: f64,
    #[serde(default)]
    pub metacommunity_probability: Option<Vec<f64>>,
    pub carrying_capacity: u64,
    /// Elementary events batched into one step.
    #[serde(default = "default_k_events")]
    pub k_events: u64,
    /// Initial counts; an empty community by default.
    #[serde(default)]
    pub x0: Option<Vec<f64>>,
    #[serde(default)]
    pub time: TimeConfig,
    #[serde(default)]
    pub norm: bool,
}

impl SoiParams {
    #[must_use]
    pub fn new(interactions: InteractionMatrix, carrying_capacity: u64) -> Self {
        let n = interactions.n_species();
        Self {
            n_species: n,
            interactions,
            growth_rates: vec![1.0; n],
            death_rates: vec![0.1; n],
            immigration_rate: 1.0,
            metacommunity_probability: None,
            carrying_capacity,
            k_events: default_k_events(),
            x0: None,
            time: TimeConfig::default(),
            norm: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.n_species;
        ensure_param!(n > 0, "n_species must be at least 1");
        ensure_len!("interactions", self.interactions.n_species(), n);
        check_vector("growth_rates", &self.growth_rates, n, false)?;
        check_vector("death_rates", &self.death_rates, n, true)?;
        ensure_param!(
            self.immigration_rate.is_finite() && self.immigration_rate >= 0.0,
            "immigration_rate must be finite and non-negative"
        );
        if let Some(p) = &self.metacommunity_probability {
            check_vector("metacommunity_probability", p, n, true)?;
        }
        ensure_param!(self.carrying_capacity > 0, "carrying_capacity must be positive");
        ensure_param!(self.k_events > 0, "k_events must be at least 1");
        if let Some(x0) = &self.x0 {
            ensure_len!("x0", x0.len(), n);
            check_counts("x0", x0)?;
            ensure_param!(
                x0.iter().sum::<f64>() <= self.carrying_capacity as f64,
                "x0 exceeds carrying_capacity"
            );
        }
        self.time.validate()
    }
}

pub struct Soi {
    interactions: DMatrix<f64>,
    growth: DVector<f64>,
    death: DVector<f64>,
    immigration: DVector<f64>,
    capacity: f64,
    k_events: u64,
    initial: SimulationState,
    boundary: BoundaryConfig,
}

impl Soi {
    fn from_params(params: &SoiParams) -> Self {
        let n = params.n_species;
        let p = params
            .metacommunity_probability
            .clone()
            .unwrap_or_else(|| vec![1.0 / n as f64; n]);
        let x0 = params.x0.clone().unwrap_or_else(|| vec![0.0; n]);
        Self {
            interactions: params.interactions.as_matrix().clone(),
            growth: DVector::from_vec(params.growth_rates.clone()),
            death: DVector::from_vec(params.death_rates.clone()),
            immigration: DVector::from_vec(p) * params.immigration_rate,
            capacity: params.carrying_capacity as f64,
            k_events: params.k_events,
            initial: SimulationState::from_slices(&x0, None),
            boundary: BoundaryConfig::event_driven(),
        }
    }

    /// Immigration, birth and death propensities, in that order.
    fn propensities(&self, x: &DVector<f64>) -> Vec<f64> {
        let n = x.len();
        let total = x.sum();
        let room = (1.0 - total / self.capacity).max(0.0);
        let g = &self.growth + &self.interactions * x / self.capacity;
        let mut rates = Vec::with_capacity(3 * n);
        rates.extend((0..n).map(|i| {
            if total < self.capacity {
                self.immigration[i]
            } else {
                0.0
            }
        }));
        rates.extend((0..n).map(|i| x[i] * g[i].max(0.0) * room));
        rates.extend((0..n).map(|i| x[i] * (self.death[i] + (-g[i]).max(0.0))));
        rates
    }
}

impl Dynamics for Soi {
    fn kind(&self) -> ModelKind {
        ModelKind::Soi
    }

    fn initial_state(&self) -> SimulationState {
        self.initial.clone()
    }

    fn prepare(&mut self, state: &SimulationState) -> Result<()> {
        if self.propensities(&state.species).iter().sum::<f64>() <= 0.0 {
            return Err(SimError::invalid_rates(
                "every event rate is zero at the initial state",
            ));
        }
        Ok(())
    }

    fn step(
        &mut self,
        state: &SimulationState,
        _clock: Clock,
        rng: &mut RngStream,
    ) -> Result<StepOutcome> {
        let rates = self.propensities(&state.species);
        let total_rate: f64 = rates.iter().sum();
        if total_rate <= 0.0 {
            return Ok(StepOutcome::Absorbed);
        }
        let events = WeightedIndex::<f64>::new(&rates)
            .map_err(|e| SimError::invalid_rates(e.to_string()))?;
        let wait = Gamma::new(self.k_events as f64, 1.0 / total_rate)
            .map_err(|e| SimError::invalid_rates(e.to_string()))?;

        let n = state.n_species();
        let mut x = state.species.clone();
        let mut size = x.sum();
        for _ in 0..self.k_events {
            let event = events.sample(rng);
            let species = event % n;
            if event < 2 * n {
                if size < self.capacity {
                    x[species] += 1.0;
                    size += 1.0;
                }
            } else if x[species] > 0.0 {
                x[species] -= 1.0;
                size -= 1.0;
            }
        }
        Ok(StepOutcome::Advanced {
            state: SimulationState::new(x),
            elapsed: wait.sample(rng),
            events: self.k_events,
        })
    }

    fn boundary(&self) -> &BoundaryConfig {
        &self.boundary
    }
}

pub fn simulate_soi(params: &SoiParams, rng: &mut RngStream) -> Result<Trajectory> {
    params.validate()?;
    let mut model = Soi::from_params(params);
    dynamics::run(
        &mut model,
        RunOptions {
            grid: params.time.grid(),
            error_variance: 0.0,
            norm: params.norm,
            fingerprint: ModelParams::Soi(params.clone()).fingerprint(),
        },
        rng,
    )
}
