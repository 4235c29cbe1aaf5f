use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use microsim_core::{
    simulate, InteractionConfig, InteractionDistribution, InteractionMatrix, RngStream, Scenario,
};
use microsim_data::Trajectory;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a scenario file and print the trajectory as JSON
    Run {
        scenario: PathBuf,

        /// Overrides the seed in the scenario file
        #[arg(short, long)]
        seed: Option<u64>,

        #[arg(long)]
        pretty: bool,
    },
    /// Print a random interaction matrix as JSON rows
    RandomA {
        #[arg(short, long, default_value_t = 10)]
        n_species: usize,

        #[arg(long, default_value_t = -0.5, allow_hyphen_values = true)]
        diagonal: f64,

        #[arg(short, long, default_value_t = 0.2)]
        connectance: f64,

        /// Standard deviation of the off-diagonal entries
        #[arg(long, default_value_t = 0.1)]
        scale: f64,

        #[arg(long, default_value_t = 0.0)]
        alpha: f64,

        #[arg(long)]
        symmetric: bool,

        #[arg(short, long)]
        seed: Option<u64>,
    },
}

/// Loads a scenario and runs it. A diverged run yields its partial
/// trajectory.
pub fn run_scenario(path: &Path, seed: Option<u64>) -> Result<Trajectory> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    let mut scenario = Scenario::from_toml(&content)
        .with_context(|| format!("parsing scenario {}", path.display()))?;
    if seed.is_some() {
        scenario.seed = seed;
    }
    let mut rng = scenario.rng();
    match simulate(&scenario.params, &mut rng) {
        Ok(trajectory) => Ok(trajectory),
        Err(err) if err.is_recoverable() => {
            tracing::warn!("{err}; keeping the partial trajectory");
            Ok(err.recover_partial()?)
        }
        Err(err) => Err(err.into()),
    }
}

pub fn random_interactions(
    config: &InteractionConfig,
    seed: Option<u64>,
) -> Result<InteractionMatrix> {
    let mut rng = seed.map_or_else(RngStream::from_entropy, RngStream::new);
    Ok(config.generate(&mut rng)?)
}

pub fn execute(args: Args) -> Result<()> {
    match args.command {
        Command::Run {
            scenario,
            seed,
            pretty,
        } => {
            let trajectory = run_scenario(&scenario, seed)?;
            let json = if pretty {
                serde_json::to_string_pretty(&trajectory)?
            } else {
                serde_json::to_string(&trajectory)?
            };
            println!("{json}");
        }
        Command::RandomA {
            n_species,
            diagonal,
            connectance,
            scale,
            alpha,
            symmetric,
            seed,
        } => {
            let config = InteractionConfig {
                n_species,
                diagonal,
                connectance,
                distribution: InteractionDistribution::PowerLawNormal { scale, alpha },
                symmetric,
            };
            let matrix = random_interactions(&config, seed)?;
            println!("{}", serde_json::to_string(&matrix)?);
        }
    }
    Ok(())
}
