//! Common stepping interface and the single run loop shared by every model.
//!
//! A model only knows how to advance its own state by one step. `run` owns
//! everything else: the report grid, step-interpolated recording, boundary
//! rules, divergence detection and post-processing.

use crate::config::BoundaryConfig;
use crate::error::{Result, SimError};
use crate::metrics::RunMetrics;
use crate::report::{self, ReportGrid, TrajectoryStore};
use crate::rng::RngStream;
use microsim_data::{ModelKind, SimulationState, Termination, Trajectory, TrajectoryMetadata};
use rand::seq::SliceRandom;
use rand::Rng;

/// Where the run stands when a step is requested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    pub now: f64,
    /// Next grid time still to be reported.
    pub next_report: f64,
    pub t_end: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The state after `elapsed` time units, having fired `events` events.
    Advanced {
        state: SimulationState,
        elapsed: f64,
        events: u64,
    },
    /// The event budget is spent; the run stops at the current time.
    Exhausted,
    /// No further change is possible; the state holds until `t_end`.
    Absorbed,
}

pub trait Dynamics {
    fn kind(&self) -> ModelKind;

    fn initial_state(&self) -> SimulationState;

    /// Called once with the initial state before the first step.
    fn prepare(&mut self, _state: &SimulationState) -> Result<()> {
        Ok(())
    }

    fn step(
        &mut self,
        state: &SimulationState,
        clock: Clock,
        rng: &mut RngStream,
    ) -> Result<StepOutcome>;

    /// Reported view of a state.
    fn report(&self, state: &SimulationState) -> SimulationState {
        state.clone()
    }

    fn boundary(&self) -> &BoundaryConfig;
}

/// Output settings for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub grid: ReportGrid,
    pub error_variance: f64,
    pub norm: bool,
    pub fingerprint: String,
}

/// Drives `model` across `options.grid` and returns the recorded trajectory.
///
/// Grid times that fall strictly between two steps report the state held
/// before the later step. On divergence the trajectory up to the last finite
/// state is returned inside `SimError::NumericalDivergence`.
pub fn run<D: Dynamics>(
    model: &mut D,
    options: RunOptions,
    rng: &mut RngStream,
) -> Result<Trajectory> {
    let times = options.grid.times().to_vec();
    let (Some(&t_start), Some(&t_end)) = (times.first(), times.last()) else {
        return Err(SimError::invalid_dimension("report grid is empty"));
    };
    let tol = options.grid.tolerance();

    let mut state = model.initial_state();
    model.prepare(&state)?;

    tracing::debug!(
        model = %model.kind(),
        seed = rng.seed(),
        stream = rng.stream(),
        points = times.len(),
        "run started"
    );

    let mut store = TrajectoryStore::for_state(&state, times.len());
    let mut metrics = RunMetrics::new();
    store.record(t_start, &model.report(&state));
    let mut next = 1;
    let mut now = t_start;

    let termination = loop {
        if next >= times.len() {
            break Termination::Completed;
        }
        let clock = Clock {
            now,
            next_report: times[next],
            t_end,
        };
        match model.step(&state, clock, rng)? {
            StepOutcome::Advanced {
                state: mut advanced,
                elapsed,
                events,
            } => {
                let t_next = now + elapsed;
                while next < times.len() && times[next] < t_next - tol {
                    store.record(times[next], &model.report(&state));
                    next += 1;
                }

                metrics.record_step(events);

                // raw state, before clamping
                let bound = model.boundary().explosion_bound;
                if !advanced.is_finite() || advanced.max_abs() > bound {
                    tracing::warn!(
                        model = %model.kind(),
                        time = t_next,
                        "state diverged, returning partial trajectory"
                    );
                    if store.last_time().map_or(true, |last| now > last) {
                        store.record(now, &model.report(&state));
                    }
                    let partial = finish(
                        model,
                        store,
                        &options,
                        Termination::Diverged { time: t_next },
                        &metrics,
                        rng,
                    );
                    return Err(SimError::NumericalDivergence {
                        time: t_next,
                        partial: Box::new(partial),
                    });
                }

                apply_boundary(&mut advanced, model.boundary(), &mut metrics, rng);

                now = t_next;
                if next < times.len() && (times[next] - now).abs() <= tol {
                    now = times[next];
                    store.record(now, &model.report(&advanced));
                    next += 1;
                }
                state = advanced;
            }
            StepOutcome::Exhausted => {
                if store.last_time().map_or(true, |last| now > last) {
                    store.record(now, &model.report(&state));
                }
                break Termination::EventsExhausted { time: now };
            }
            StepOutcome::Absorbed => {
                tracing::debug!(model = %model.kind(), time = now, "absorbing state reached");
                for &t in &times[next..] {
                    store.record(t, &model.report(&state));
                }
                break Termination::Completed;
            }
        }
    };

    Ok(finish(model, store, &options, termination, &metrics, rng))
}

fn finish<D: Dynamics>(
    model: &D,
    store: TrajectoryStore,
    options: &RunOptions,
    termination: Termination,
    metrics: &RunMetrics,
    rng: &mut RngStream,
) -> Trajectory {
    metrics.log_summary(model.kind(), store.len());
    let metadata = TrajectoryMetadata {
        model: model.kind(),
        run_id: rng.run_id(),
        seed: Some(rng.seed()),
        stream: rng.stream(),
        fingerprint: options.fingerprint.clone(),
        termination,
        normalized: false,
        stats: metrics.stats(),
    };
    let mut trajectory = store.finish(metadata);
    report::apply_measurement_error(&mut trajectory, options.error_variance, rng);
    if options.norm {
        report::normalize(&mut trajectory);
    }
    trajectory
}

/// Extinction clamping of species and resources, then random migration.
fn apply_boundary(
    state: &mut SimulationState,
    boundary: &BoundaryConfig,
    metrics: &mut RunMetrics,
    rng: &mut RngStream,
) {
    for (i, v) in state.species.iter_mut().enumerate() {
        if *v != 0.0 && (*v < 0.0 || *v < boundary.extinction_threshold) {
            *v = 0.0;
            metrics.record_extinction(i);
        }
    }
    if let Some(resources) = state.resources.as_mut() {
        for v in resources
            .iter_mut()
            .filter(|v| **v < 0.0 || **v < boundary.extinction_threshold)
        {
            *v = 0.0;
        }
    }

    if boundary.migration_p > 0.0 && rng.gen_bool(boundary.migration_p) {
        let absent: Vec<usize> = state.absent_species().collect();
        if let Some(&species) = absent.choose(rng) {
            state.species[species] = boundary.migration_abundance;
            metrics.record_migration(species);
        }
    }
}
