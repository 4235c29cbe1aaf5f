//! Core data structures for the microsim engine.
//!
//! Everything in this crate is plain data: matrices consumed by the
//! simulators, the state a simulator mutates, and the trajectory it reports.
//! Behaviour lives in `microsim_core`.

pub mod data;

pub use data::matrix::{CouplingMatrices, InteractionMatrix, ShapeError};
pub use data::state::SimulationState;
pub use data::trajectory::{ModelKind, RunStats, Termination, Trajectory, TrajectoryMetadata};
