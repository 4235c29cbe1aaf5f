//! Fixed-step integration of the continuous models.
//!
//! Deterministic runs use classical RK4. Stochastic runs use Euler-Maruyama
//! with the diffusion term and shocks supplied by [`NoiseModel`]. In both
//! modes each report interval is split into equal sub-steps no longer than
//! `t_step`, so every grid time is hit exactly.

pub mod consumer_resource;
pub mod glv;
pub mod logistic;

use crate::config::{BoundaryConfig, NoiseConfig, TimeConfig};
use crate::dynamics::{self, Clock, Dynamics, RunOptions, StepOutcome};
use crate::ensure_param;
use crate::error::Result;
use crate::noise::NoiseModel;
use crate::rng::RngStream;
use microsim_data::{ModelKind, SimulationState, Trajectory};
use nalgebra::DVector;

/// Right-hand side of an autonomous ODE over `y = [species; resources]`.
pub trait VectorField {
    fn kind(&self) -> ModelKind;
    fn n_species(&self) -> usize;
    fn n_resources(&self) -> usize {
        0
    }
    fn derivative(&self, y: &DVector<f64>) -> DVector<f64>;
}

/// One classical Runge-Kutta step of size `h`.
pub fn rk4<F: VectorField + ?Sized>(field: &F, y: &DVector<f64>, h: f64) -> DVector<f64> {
    let k1 = field.derivative(y);
    let k2 = field.derivative(&(y + &k1 * (h / 2.0)));
    let k3 = field.derivative(&(y + &k2 * (h / 2.0)));
    let k4 = field.derivative(&(y + &k3 * h));
    y + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0)
}

/// Settings shared by every continuous parameter set.
pub(crate) struct Integration<'a> {
    pub time: &'a TimeConfig,
    pub boundary: &'a BoundaryConfig,
    pub noise: &'a NoiseConfig,
    pub stochastic: bool,
    pub norm: bool,
    pub t_step: f64,
}

impl Integration<'_> {
    pub fn validate(&self) -> Result<()> {
        ensure_param!(
            self.t_step.is_finite() && self.t_step > 0.0,
            "t_step must be finite and positive, got {}",
            self.t_step
        );
        self.time.validate()?;
        self.boundary.validate()?;
        self.noise.validate()
    }
}

pub struct ContinuousIntegrator<F> {
    field: F,
    initial: SimulationState,
    t_step: f64,
    noise: Option<NoiseModel>,
    boundary: BoundaryConfig,
}

impl<F: VectorField> ContinuousIntegrator<F> {
    pub fn new(
        field: F,
        initial: SimulationState,
        t_step: f64,
        noise: Option<NoiseModel>,
        boundary: BoundaryConfig,
    ) -> Self {
        Self {
            field,
            initial,
            t_step,
            noise,
            boundary,
        }
    }

    fn pack(&self, state: &SimulationState) -> DVector<f64> {
        match &state.resources {
            Some(r) => DVector::from_iterator(
                state.n_species() + r.len(),
                state.species.iter().chain(r.iter()).copied(),
            ),
            None => state.species.clone(),
        }
    }

    fn unpack(&self, y: DVector<f64>) -> SimulationState {
        let n = self.field.n_species();
        if self.field.n_resources() == 0 {
            return SimulationState::new(y);
        }
        SimulationState::with_resources(y.rows(0, n).into_owned(), y.rows(n, y.len() - n).into_owned())
    }

    /// Sub-step length that divides the remaining report interval evenly.
    fn sub_step(&self, clock: Clock) -> f64 {
        let remaining = clock.next_report - clock.now;
        let pieces = (remaining / self.t_step - 1e-9).ceil().max(1.0);
        remaining / pieces
    }
}

impl<F: VectorField> Dynamics for ContinuousIntegrator<F> {
    fn kind(&self) -> ModelKind {
        self.field.kind()
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
        let dt = self.sub_step(clock);
        let y = self.pack(state);
        let n = self.field.n_species();
        let y = match &self.noise {
            None => rk4(&self.field, &y, dt),
            Some(noise) => {
                let mut next = &y + self.field.derivative(&y) * dt;
                let species = y.rows(0, n).into_owned();
                let mut shifted = next.rows(0, n) + noise.diffusion(&species, dt, rng);
                noise.perturb(&mut shifted, clock.now, dt, rng);
                next.rows_mut(0, n).copy_from(&shifted);
                next
            }
        };
        Ok(StepOutcome::Advanced {
            state: self.unpack(y),
            elapsed: dt,
            events: 0,
        })
    }

    fn boundary(&self) -> &BoundaryConfig {
        &self.boundary
    }
}

/// Builds the integrator and runs it over the configured grid.
pub(crate) fn integrate<F: VectorField>(
    field: F,
    initial: SimulationState,
    settings: &Integration<'_>,
    fingerprint: String,
    rng: &mut RngStream,
) -> Result<Trajectory> {
    let noise = if settings.stochastic {
        Some(NoiseModel::new(settings.noise, field.n_species())?)
    } else {
        None
    };
    let mut integrator = ContinuousIntegrator::new(
        field,
        initial,
        settings.t_step,
        noise,
        settings.boundary.clone(),
    );
    dynamics::run(
        &mut integrator,
        RunOptions {
            grid: settings.time.grid(),
            error_variance: settings.noise.error_variance,
            norm: settings.norm,
            fingerprint,
        },
        rng,
    )
}
