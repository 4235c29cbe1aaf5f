//! Hubbell neutral community.
//!
//! A zero-sum local community of exactly `carrying_capacity` individuals
//! drawn from a metacommunity of `metacommunity_size` species. Every event
//! kills one individual and replaces it, either with a migrant from the
//! metacommunity or with the offspring of a local individual.

use super::{check_counts, weighted_choice};
use crate::config::{check_vector, BoundaryConfig, ModelParams, TimeConfig};
use crate::dynamics::{self, Clock, Dynamics, RunOptions, StepOutcome};
use crate::error::{Result, SimError};
use crate::rng::RngStream;
use crate::{ensure_len, ensure_param};
use microsim_data::{ModelKind, SimulationState, Trajectory};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};

/// How the dying individual is chosen.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeathSelection {
    /// Uniform over individuals, so abundant species die more often.
    #[default]
    Individual,
    /// Uniform over the species currently present.
    Species,
}

/// Time between consecutive events.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventClock {
    /// Constant increment; `None` spreads `k_events` evenly over the window.
    Fixed {
        #[serde(default)]
        increment: Option<f64>,
    },
    /// Exponential waiting times with the given rate.
    Exponential { rate: f64 },
}

impl Default for EventClock {
    fn default() -> Self {
        Self::Fixed { increment: None }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HubbellParams {
    /// Species present in the initial local community.
    pub n_species: usize,
    pub metacommunity_size: usize,
    pub carrying_capacity: u64,
    pub k_events: u64,
    #[serde(default)]
    pub migration_p: f64,
    /// Relative abundances in the metacommunity; uniform when absent.
    #[serde(default)]
    pub metacommunity_probability: Option<Vec<f64>>,
    /// Initial counts of the first `n_species` species; must sum to
    /// `carrying_capacity`. Defaults to an even split.
    #[serde(default)]
    pub x0: Option<Vec<f64>>,
    #[serde(default)]
    pub death: DeathSelection,
    #[serde(default)]
    pub clock: EventClock,
    #[serde(default)]
    pub time: TimeConfig,
    #[serde(default)]
    pub norm: bool,
}

impl HubbellParams {
    #[must_use]
    pub fn new(
        n_species: usize,
        metacommunity_size: usize,
        carrying_capacity: u64,
        k_events: u64,
    ) -> Self {
        Self {
            n_species,
            metacommunity_size,
            carrying_capacity,
            k_events,
            migration_p: 0.0,
            metacommunity_probability: None,
            x0: None,
            death: DeathSelection::default(),
            clock: EventClock::default(),
            time: TimeConfig::default(),
            norm: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let (n, m) = (self.n_species, self.metacommunity_size);
        ensure_param!(n > 0, "n_species must be at least 1");
        ensure_param!(
            m >= n,
            "metacommunity_size ({m}) must cover the {n} local species"
        );
        ensure_param!(self.carrying_capacity > 0, "carrying_capacity must be positive");
        ensure_param!(self.k_events > 0, "k_events must be at least 1");
        ensure_param!(
            (0.0..=1.0).contains(&self.migration_p),
            "migration_p must be in [0.0, 1.0]"
        );
        if let Some(p) = &self.metacommunity_probability {
            check_vector("metacommunity_probability", p, m, true)?;
        }
        if let Some(x0) = &self.x0 {
            ensure_len!("x0", x0.len(), n);
            check_counts("x0", x0)?;
            let total: f64 = x0.iter().sum();
            ensure_param!(
                total == self.carrying_capacity as f64,
                "x0 sums to {total}, expected carrying_capacity {}",
                self.carrying_capacity
            );
        }
        match self.clock {
            EventClock::Fixed { increment: Some(dt) } => {
                ensure_param!(dt.is_finite() && dt > 0.0, "event increment must be positive");
            }
            EventClock::Fixed { increment: None } => {}
            EventClock::Exponential { rate } => {
                ensure_param!(rate.is_finite() && rate >= 0.0, "event rate must be finite");
                if rate == 0.0 {
                    return Err(SimError::invalid_rates("event rate is zero"));
                }
            }
        }
        if self.migration_p > 0.0 && self.metacommunity().iter().all(|&p| p == 0.0) {
            return Err(SimError::invalid_rates(
                "migration is enabled but the metacommunity is empty",
            ));
        }
        self.time.validate()
    }

    fn metacommunity(&self) -> Vec<f64> {
        self.metacommunity_probability
            .clone()
            .unwrap_or_else(|| vec![1.0; self.metacommunity_size])
    }

    /// Initial counts over the whole metacommunity.
    fn initial_counts(&self) -> Vec<f64> {
        let mut counts = vec![0.0; self.metacommunity_size];
        match &self.x0 {
            Some(x0) => counts[..x0.len()].copy_from_slice(x0),
            None => {
                let n = self.n_species as u64;
                let (share, rest) = (self.carrying_capacity / n, self.carrying_capacity % n);
                for c in counts.iter_mut().take(self.n_species) {
                    *c = share as f64;
                }
                counts[0] += rest as f64;
            }
        }
        counts
    }
}

enum Waiting {
    Fixed(f64),
    Exponential(Exp<f64>),
}

pub struct Hubbell {
    initial: SimulationState,
    metacommunity: Vec<f64>,
    migration_p: f64,
    death: DeathSelection,
    waiting: Waiting,
    k_events: u64,
    fired: u64,
    boundary: BoundaryConfig,
}

impl Hubbell {
    fn from_params(params: &HubbellParams) -> Result<Self> {
        let waiting = match params.clock {
            EventClock::Fixed { increment } => Waiting::Fixed(increment.unwrap_or(
                (params.time.t_end - params.time.t_start) / params.k_events as f64,
            )),
            EventClock::Exponential { rate } => Waiting::Exponential(
                Exp::new(rate).map_err(|e| SimError::invalid_rates(e.to_string()))?,
            ),
        };
        Ok(Self {
            initial: SimulationState::from_slices(&params.initial_counts(), None),
            metacommunity: params.metacommunity(),
            migration_p: params.migration_p,
            death: params.death,
            waiting,
            k_events: params.k_events,
            fired: 0,
            boundary: BoundaryConfig::event_driven(),
        })
    }
}

impl Dynamics for Hubbell {
    fn kind(&self) -> ModelKind {
        ModelKind::Hubbell
    }

    fn initial_state(&self) -> SimulationState {
        self.initial.clone()
    }

    fn step(
        &mut self,
        state: &SimulationState,
        _clock: Clock,
        rng: &mut RngStream,
    ) -> Result<StepOutcome> {
        if self.fired >= self.k_events {
            return Ok(StepOutcome::Exhausted);
        }
        let mut x = state.species.clone();
        let dead = match self.death {
            DeathSelection::Individual => weighted_choice(x.as_slice(), rng),
            DeathSelection::Species => {
                let present: Vec<usize> = (0..x.len()).filter(|&i| x[i] > 0.0).collect();
                present.choose(rng).copied()
            }
        };
        let Some(dead) = dead else {
            return Ok(StepOutcome::Absorbed);
        };
        x[dead] -= 1.0;

        let migrant = self.migration_p > 0.0 && rng.gen_bool(self.migration_p);
        let newcomer = if migrant {
            weighted_choice(&self.metacommunity, rng)
        } else {
            weighted_choice(x.as_slice(), rng)
        };
        // a community of one replaces itself
        x[newcomer.unwrap_or(dead)] += 1.0;
        self.fired += 1;

        let elapsed = match &self.waiting {
            Waiting::Fixed(dt) => *dt,
            Waiting::Exponential(exp) => exp.sample(rng),
        };
        Ok(StepOutcome::Advanced {
            state: SimulationState::new(x),
            elapsed,
            events: 1,
        })
    }

    fn boundary(&self) -> &BoundaryConfig {
        &self.boundary
    }
}

pub fn simulate_hubbell(params: &HubbellParams, rng: &mut RngStream) -> Result<Trajectory> {
    params.validate()?;
    let mut model = Hubbell::from_params(params)?;
    dynamics::run(
        &mut model,
        RunOptions {
            grid: params.time.grid(),
            error_variance: 0.0,
            norm: params.norm,
            fingerprint: ModelParams::Hubbell(params.clone()).fingerprint(),
        },
        rng,
    )
}
