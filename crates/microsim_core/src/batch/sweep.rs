use crate::config::ModelParams;
use crate::error::{Result, SimError};
use crate::ensure_param;
use crate::metrics::BatchMetrics;
use crate::rng::RngStream;
use crate::simulate::simulate;
use microsim_data::Trajectory;
use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Parameter name (dotted path) to the sequence of values it takes.
///
/// All sequences have the same length `L` and are zipped: combination `c`
/// applies the `c`-th value of every entry. This is not a Cartesian product.
pub type ParamSweep = BTreeMap<String, Vec<serde_json::Value>>;

/// Parameter sets in sweep order. An empty sweep yields `base` alone.
pub fn expand_sweep(base: &ModelParams, sweep: &ParamSweep) -> Result<Vec<ModelParams>> {
    let mut lengths = sweep.values().map(Vec::len);
    let Some(len) = lengths.next() else {
        return Ok(vec![base.clone()]);
    };
    if let Some((name, values)) = sweep.iter().find(|(_, v)| v.len() != len) {
        return Err(SimError::dimension_mismatch(format!(
            "sweep entry `{name}` has {} values, expected {len}",
            values.len()
        )));
    }
    ensure_param!(len > 0, "sweep entries must not be empty");

    (0..len)
        .map(|c| {
            let params = sweep
                .iter()
                .try_fold(base.clone(), |params, (name, values)| {
                    params.with_override(name, &values[c])
                })?;
            params.validate()?;
            Ok(params)
        })
        .collect()
}

/// Runs every sweep combination `n_instances` times.
///
/// Run `k = combination * n_instances + instance` draws from
/// `RngStream::with_stream(seed, k)`, and the output is in that order no
/// matter how the runs are scheduled. A diverged run contributes its partial
/// trajectory; any other error aborts the batch.
pub fn generate_simulations(
    base: &ModelParams,
    sweep: &ParamSweep,
    n_instances: usize,
    seed: u64,
) -> Result<Vec<Trajectory>> {
    ensure_param!(n_instances > 0, "n_instances must be at least 1");
    let combinations = expand_sweep(base, sweep)?;
    let jobs: Vec<(u64, &ModelParams)> = combinations
        .iter()
        .flat_map(|params| std::iter::repeat(params).take(n_instances))
        .enumerate()
        .map(|(k, params)| (k as u64, params))
        .collect();

    tracing::info!(
        model = %base.kind(),
        combinations = combinations.len(),
        n_instances,
        seed,
        "batch started"
    );

    let metrics = BatchMetrics::new();
    let run_one = |&(stream, params): &(u64, &ModelParams)| -> Result<Trajectory> {
        let mut rng = RngStream::with_stream(seed, stream);
        match simulate(params, &mut rng) {
            Ok(trajectory) => {
                metrics.record_completed();
                Ok(trajectory)
            }
            Err(err) if err.is_recoverable() => {
                metrics.record_diverged();
                err.recover_partial()
            }
            Err(err) => Err(err),
        }
    };

    #[cfg(feature = "parallel")]
    let results: Vec<Result<Trajectory>> = jobs.par_iter().map(run_one).collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<Result<Trajectory>> = jobs.iter().map(run_one).collect();

    metrics.log_summary(base.kind());
    results.into_iter().collect()
}
