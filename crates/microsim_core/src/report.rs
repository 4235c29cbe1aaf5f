//! Reporting time grid and trajectory recording.
//!
//! Every simulator reports through the same contract: a fixed grid of output
//! times chosen up front, independent of how the model advances internally.
//! `TrajectoryStore` collects one column per reported time and owns the
//! result until the run hands it out as a `Trajectory`.

use crate::rng::RngStream;
use microsim_data::{SimulationState, Trajectory, TrajectoryMetadata};
use nalgebra::DMatrix;
use rand_distr::{Distribution, Normal};

/// Fixed, strictly increasing set of output times.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportGrid {
    times: Vec<f64>,
}

impl ReportGrid {
    /// `intervals + 1` evenly spaced points; the last is exactly `t_end`.
    #[must_use]
    pub fn even(t_start: f64, t_end: f64, intervals: usize) -> Self {
        let intervals = intervals.max(1);
        let width = (t_end - t_start) / intervals as f64;
        let mut times: Vec<f64> = (0..intervals)
            .map(|k| t_start + k as f64 * width)
            .collect();
        times.push(t_end);
        Self { times }
    }

    /// One point per unit of time, for maps that report every iteration.
    #[must_use]
    pub fn unit(t_start: f64, iterations: usize) -> Self {
        Self {
            times: (0..=iterations).map(|k| t_start + k as f64).collect(),
        }
    }

    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Tolerance used to decide that a step landed on a grid time.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        let scale = self
            .times
            .iter()
            .fold(1.0_f64, |acc, t| acc.max(t.abs()));
        1e-9 * scale
    }
}

/// Column recorder for one run.
#[derive(Debug, Clone)]
pub struct TrajectoryStore {
    n_species: usize,
    n_resources: Option<usize>,
    time: Vec<f64>,
    species: Vec<f64>,
    resources: Vec<f64>,
}

impl TrajectoryStore {
    /// Sized after the shape of `state`.
    #[must_use]
    pub fn for_state(state: &SimulationState, capacity: usize) -> Self {
        let n_species = state.n_species();
        let n_resources = state.resources.as_ref().map(|r| r.len());
        Self {
            n_species,
            n_resources,
            time: Vec::with_capacity(capacity),
            species: Vec::with_capacity(capacity * n_species),
            resources: Vec::with_capacity(capacity * n_resources.unwrap_or(0)),
        }
    }

    /// Appends one column. Times must be strictly increasing.
    pub fn record(&mut self, time: f64, state: &SimulationState) {
        debug_assert!(
            self.time.last().map_or(true, |&last| time > last),
            "report times must be strictly increasing"
        );
        debug_assert_eq!(state.n_species(), self.n_species);
        self.time.push(time);
        self.species.extend(state.species.iter());
        if let (Some(_), Some(resources)) = (self.n_resources, state.resources.as_ref()) {
            self.resources.extend(resources.iter());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    #[must_use]
    pub fn last_time(&self) -> Option<f64> {
        self.time.last().copied()
    }

    /// Consumes the store. Columns were pushed in time order, which is
    /// exactly nalgebra's column-major layout.
    #[must_use]
    pub fn finish(self, metadata: TrajectoryMetadata) -> Trajectory {
        let n_points = self.time.len();
        let species = DMatrix::from_vec(self.n_species, n_points, self.species);
        let resources = self
            .n_resources
            .map(|n| DMatrix::from_vec(n, n_points, self.resources));
        Trajectory {
            time: self.time,
            species,
            resources,
            metadata,
        }
    }
}

/// Adds Gaussian measurement error to every reported value, then clamps at
/// zero so reported abundances stay non-negative.
pub fn apply_measurement_error(trajectory: &mut Trajectory, variance: f64, rng: &mut RngStream) {
    if variance <= 0.0 {
        return;
    }
    let Ok(normal) = Normal::new(0.0, variance.sqrt()) else {
        return;
    };
    let perturb = |m: &mut DMatrix<f64>, rng: &mut RngStream| {
        for v in m.iter_mut() {
            *v = (*v + normal.sample(rng)).max(0.0);
        }
    };
    perturb(&mut trajectory.species, rng);
    if let Some(resources) = trajectory.resources.as_mut() {
        perturb(resources, rng);
    }
}

/// Converts species counts to relative abundances column by column.
///
/// Columns summing to zero (a fully extinct community) are left at zero.
pub fn normalize(trajectory: &mut Trajectory) {
    for mut column in trajectory.species.column_iter_mut() {
        let total = column.sum();
        if total > 0.0 {
            column /= total;
        }
    }
    trajectory.metadata.normalized = true;
}
