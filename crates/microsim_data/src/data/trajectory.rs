use super::rows;
use super::state::SimulationState;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
/// Which simulator produced a trajectory.
pub enum ModelKind {
    /// Generalized Lotka-Volterra ODE/SDE.
    Glv,
    /// Consumer-resource ODE/SDE with Monod kinetics.
    ConsumerResource,
    /// Independent logistic growth ODE/SDE.
    Logistic,
    /// Ricker discrete-time map.
    Ricker,
    /// Hubbell neutral zero-sum community.
    Hubbell,
    /// Self-organized instability birth-death-immigration process.
    Soi,
}

impl ModelKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Glv => "glv",
            Self::ConsumerResource => "consumer_resource",
            Self::Logistic => "logistic",
            Self::Ricker => "ricker",
            Self::Hubbell => "hubbell",
            Self::Soi => "soi",
        }
    }

    /// Event-driven models advance by waiting times instead of fixed steps.
    #[must_use]
    pub fn is_event_driven(self) -> bool {
        matches!(self, Self::Hubbell | Self::Soi)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
/// How a run ended.
pub enum Termination {
    /// Reached `t_end`.
    #[default]
    Completed,
    /// Ran out of events before `t_end`.
    EventsExhausted { time: f64 },
    /// State became non-finite or exceeded the explosion bound.
    Diverged { time: f64 },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Counters collected while a run executes.
pub struct RunStats {
    pub steps: u64,
    pub events: u64,
    pub extinctions: u64,
    pub migrations: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrajectoryMetadata {
    pub model: ModelKind,
    pub run_id: Uuid,
    pub seed: Option<u64>,
    /// Substream index within the seed; batch runs use the run index.
    #[serde(default)]
    pub stream: u64,
    /// SHA-256 of the parameter set, hex encoded.
    pub fingerprint: String,
    pub termination: Termination,
    pub normalized: bool,
    pub stats: RunStats,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
/// Reported output of one simulation run.
///
/// `species` has one row per species and one column per entry of `time`;
/// `resources` follows the same layout for consumer-resource runs.
pub struct Trajectory {
    pub time: Vec<f64>,
    #[serde(with = "rows::matrix")]
    pub species: DMatrix<f64>,
    #[serde(with = "rows::optional_matrix", default)]
    pub resources: Option<DMatrix<f64>>,
    pub metadata: TrajectoryMetadata,
}

impl Trajectory {
    #[must_use]
    pub fn n_points(&self) -> usize {
        self.time.len()
    }

    #[must_use]
    pub fn n_species(&self) -> usize {
        self.species.nrows()
    }

    #[must_use]
    pub fn n_resources(&self) -> usize {
        self.resources.as_ref().map_or(0, DMatrix::nrows)
    }

    #[must_use]
    pub fn t_start(&self) -> Option<f64> {
        self.time.first().copied()
    }

    #[must_use]
    pub fn t_end(&self) -> Option<f64> {
        self.time.last().copied()
    }

    /// Species abundances at the given reporting index.
    #[must_use]
    pub fn species_at(&self, point: usize) -> DVector<f64> {
        self.species.column(point).into_owned()
    }

    #[must_use]
    pub fn final_species(&self) -> Option<DVector<f64>> {
        self.n_points()
            .checked_sub(1)
            .map(|last| self.species_at(last))
    }

    #[must_use]
    pub fn state_at(&self, point: usize) -> SimulationState {
        SimulationState {
            species: self.species_at(point),
            resources: self
                .resources
                .as_ref()
                .map(|r| r.column(point).into_owned()),
        }
    }

    /// Time series of a single species.
    #[must_use]
    pub fn series(&self, species: usize) -> Vec<f64> {
        self.species.row(species).iter().copied().collect()
    }

    /// Sum over species at each reporting time.
    #[must_use]
    pub fn column_totals(&self) -> Vec<f64> {
        self.species.column_iter().map(|c| c.sum()).collect()
    }

    /// Smallest value over species and resources.
    #[must_use]
    pub fn min_value(&self) -> f64 {
        self.species
            .iter()
            .chain(self.resources.iter().flat_map(|r| r.iter()))
            .copied()
            .fold(f64::INFINITY, f64::min)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.metadata.termination == Termination::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Trajectory {
        Trajectory {
            time: vec![0.0, 1.0, 2.0],
            species: DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 0.5, 0.0, 0.0]),
            resources: None,
            metadata: TrajectoryMetadata {
                model: ModelKind::Glv,
                run_id: Uuid::nil(),
                seed: Some(7),
                stream: 0,
                fingerprint: String::new(),
                termination: Termination::Completed,
                normalized: false,
                stats: RunStats::default(),
            },
        }
    }

    #[test]
    fn test_accessors() {
        let t = sample();
        assert_eq!(t.n_points(), 3);
        assert_eq!(t.n_species(), 2);
        assert_eq!(t.series(1), vec![0.5, 0.0, 0.0]);
        assert_eq!(t.column_totals(), vec![1.5, 2.0, 3.0]);
        assert_eq!(t.final_species().unwrap().as_slice(), &[3.0, 0.0]);
        assert_eq!(t.min_value(), 0.0);
        assert!(t.is_complete());
    }

    #[test]
    fn test_json_layout_is_row_major() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["species"][0], serde_json::json!([1.0, 2.0, 3.0]));
        assert_eq!(json["metadata"]["model"], "glv");
        assert_eq!(json["metadata"]["termination"]["status"], "completed");
    }
}
