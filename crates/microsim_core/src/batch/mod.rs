//! Repeated runs over parameter sweeps, and the inverse problem of
//! recovering an interaction matrix from their end states.

pub mod estimate;
pub mod sweep;

pub use estimate::{estimate_interaction_from_simulations, estimate_with, EstimateConfig};
pub use sweep::{expand_sweep, generate_simulations, ParamSweep};
