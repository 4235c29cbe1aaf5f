//! Entry point dispatching a parameter set to its simulator.

use crate::continuous::consumer_resource::simulate_consumer_resource;
use crate::continuous::glv::simulate_glv;
use crate::continuous::logistic::simulate_logistic;
use crate::config::ModelParams;
use crate::error::Result;
use crate::event::hubbell::simulate_hubbell;
use crate::event::soi::simulate_soi;
use crate::ricker::simulate_ricker;
use crate::rng::RngStream;
use microsim_data::Trajectory;

/// Runs the model `params` describes on its own report grid.
pub fn simulate(params: &ModelParams, rng: &mut RngStream) -> Result<Trajectory> {
    match params {
        ModelParams::Glv(p) => simulate_glv(p, rng),
        ModelParams::ConsumerResource(p) => simulate_consumer_resource(p, rng),
        ModelParams::Logistic(p) => simulate_logistic(p, rng),
        ModelParams::Ricker(p) => simulate_ricker(p, rng),
        ModelParams::Hubbell(p) => simulate_hubbell(p, rng),
        ModelParams::Soi(p) => simulate_soi(p, rng),
    }
}
