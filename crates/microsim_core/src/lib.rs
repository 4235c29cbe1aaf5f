//! Simulation engine for microbial community dynamics.
//!
//! Six models share one run loop ([`dynamics::run`]) and one output type
//! ([`Trajectory`]):
//!
//! - continuous: generalized Lotka-Volterra, consumer-resource and logistic
//!   growth, integrated with RK4 or Euler-Maruyama;
//! - discrete: the Ricker map;
//! - event-driven: the Hubbell neutral model and the self-organized
//!   instability process.
//!
//! Every run draws from its own [`RngStream`], so a `(seed, stream)` pair
//! reproduces a trajectory exactly.

pub mod batch;
pub mod config;
pub mod continuous;
pub mod dynamics;
pub mod error;
pub mod event;
pub mod matrix;
pub mod metrics;
pub mod noise;
pub mod report;
pub mod ricker;
pub mod rng;
pub mod simulate;

pub use batch::{
    estimate_interaction_from_simulations, generate_simulations, EstimateConfig, ParamSweep,
};
pub use config::{
    Amplitude, BoundaryConfig, ExternalEvent, ModelParams, NoiseConfig, NoiseKind, Scenario,
    TimeConfig,
};
pub use continuous::consumer_resource::{simulate_consumer_resource, ConsumerResourceParams};
pub use continuous::glv::{simulate_glv, GlvParams};
pub use continuous::logistic::{simulate_logistic, LogisticParams};
pub use error::{Result, SimError};
pub use event::hubbell::{simulate_hubbell, DeathSelection, EventClock, HubbellParams};
pub use event::soi::{simulate_soi, SoiParams};
pub use matrix::{
    generate_coupling_matrices, generate_interaction_matrix, CouplingConfig,
    InteractionConfig, InteractionDistribution, RateDistribution,
};
pub use microsim_data::{
    CouplingMatrices, InteractionMatrix, ModelKind, RunStats, SimulationState, Termination,
    Trajectory, TrajectoryMetadata,
};
pub use ricker::{simulate_ricker, RickerParams};
pub use rng::RngStream;
pub use simulate::simulate;
