//! Random generators for interaction and coupling matrices.

use crate::error::{Result, SimError};
use crate::ensure_param;
use crate::rng::RngStream;
use microsim_data::{CouplingMatrices, InteractionMatrix};
use nalgebra::DMatrix;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Beta, Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};

/// Source of the nonzero off-diagonal interaction strengths.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionDistribution {
    /// `N(0, scale) / n_species^alpha`.
    PowerLawNormal { scale: f64, alpha: f64 },
    /// Values drawn without replacement from a fixed pool.
    Pool { values: Vec<f64> },
}

impl Default for InteractionDistribution {
    fn default() -> Self {
        Self::PowerLawNormal {
            scale: 0.1,
            alpha: 0.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct InteractionConfig {
    pub n_species: usize,
    /// Exact value of every self-interaction term.
    pub diagonal: f64,
    /// Probability that an off-diagonal entry is nonzero.
    pub connectance: f64,
    pub distribution: InteractionDistribution,
    /// Mirror the upper triangle so `A == A^T`.
    pub symmetric: bool,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            n_species: 10,
            diagonal: -0.5,
            connectance: 0.2,
            distribution: InteractionDistribution::default(),
            symmetric: false,
        }
    }
}

impl InteractionConfig {
    pub fn validate(&self) -> Result<()> {
        let n = self.n_species;
        ensure_param!(n > 0, "n_species must be at least 1");
        ensure_param!(self.diagonal.is_finite(), "diagonal must be finite");
        ensure_param!(
            (0.0..=1.0).contains(&self.connectance),
            "connectance must be in [0.0, 1.0], got {}",
            self.connectance
        );
        match &self.distribution {
            InteractionDistribution::PowerLawNormal { scale, alpha } => {
                ensure_param!(
                    scale.is_finite() && *scale >= 0.0,
                    "scale must be finite and non-negative"
                );
                ensure_param!(alpha.is_finite(), "alpha must be finite");
            }
            InteractionDistribution::Pool { values } => {
                let slots = n * (n - 1);
                if values.len() < slots {
                    return Err(SimError::invalid_dimension(format!(
                        "interaction pool has {} values, {} off-diagonal slots need filling",
                        values.len(),
                        slots
                    )));
                }
                ensure_param!(
                    values.iter().all(|v| v.is_finite()),
                    "interaction pool must be finite"
                );
            }
        }
        Ok(())
    }

    pub fn generate(&self, rng: &mut RngStream) -> Result<InteractionMatrix> {
        self.validate()?;
        let n = self.n_species;
        let mut strengths = StrengthSource::new(&self.distribution, n, rng)?;
        let mut matrix = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            matrix[(i, i)] = self.diagonal;
        }
        for i in 0..n {
            let start = if self.symmetric { i + 1 } else { 0 };
            for j in start..n {
                if i == j || !rng.gen_bool(self.connectance) {
                    continue;
                }
                let value = strengths.next(rng);
                matrix[(i, j)] = value;
                if self.symmetric {
                    matrix[(j, i)] = value;
                }
            }
        }
        tracing::debug!(
            n_species = n,
            connectance = self.connectance,
            symmetric = self.symmetric,
            "generated interaction matrix"
        );
        Ok(InteractionMatrix::new(matrix)?)
    }
}

enum StrengthSource {
    Normal { normal: Normal<f64>, divisor: f64 },
    Pool { values: Vec<f64>, next: usize },
}

impl StrengthSource {
    fn new(distribution: &InteractionDistribution, n: usize, rng: &mut RngStream) -> Result<Self> {
        Ok(match distribution {
            InteractionDistribution::PowerLawNormal { scale, alpha } => Self::Normal {
                normal: Normal::new(0.0, *scale)
                    .map_err(|e| SimError::invalid_parameter(e.to_string()))?,
                divisor: (n as f64).powf(*alpha),
            },
            InteractionDistribution::Pool { values } => {
                let mut values = values.clone();
                values.shuffle(rng);
                Self::Pool { values, next: 0 }
            }
        })
    }

    fn next(&mut self, rng: &mut RngStream) -> f64 {
        match self {
            Self::Normal { normal, divisor } => normal.sample(rng) / *divisor,
            Self::Pool { values, next } => {
                // validate() guarantees one pool value per off-diagonal slot
                let value = values[*next];
                *next += 1;
                value
            }
        }
    }
}

/// Convenience wrapper over [`InteractionConfig::generate`] for asymmetric
/// matrices.
pub fn generate_interaction_matrix(
    n_species: usize,
    diagonal: f64,
    connectance: f64,
    distribution: &InteractionDistribution,
    rng: &mut RngStream,
) -> Result<InteractionMatrix> {
    InteractionConfig {
        n_species,
        diagonal,
        connectance,
        distribution: distribution.clone(),
        symmetric: false,
    }
    .generate(rng)
}

/// Distribution family for consumption and production rates.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateDistribution {
    /// Exponential with the supplied mean.
    #[default]
    Exponential,
    /// `Beta(m * concentration, (1 - m) * concentration)`; mean `m` in (0, 1).
    Beta { concentration: f64 },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CouplingConfig {
    pub n_species: usize,
    pub n_resources: usize,
    pub mean_consumption: f64,
    /// Zero disables production entirely.
    pub mean_production: f64,
    pub consumption_p: f64,
    pub production_p: f64,
    pub distribution: RateDistribution,
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self {
            n_species: 10,
            n_resources: 5,
            mean_consumption: 1.0,
            mean_production: 0.0,
            consumption_p: 0.5,
            production_p: 0.5,
            distribution: RateDistribution::Exponential,
        }
    }
}

impl CouplingConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_param!(self.n_species > 0, "n_species must be at least 1");
        ensure_param!(self.n_resources > 0, "n_resources must be at least 1");
        ensure_param!(
            self.mean_consumption.is_finite() && self.mean_consumption > 0.0,
            "mean_consumption must be finite and positive"
        );
        ensure_param!(
            self.mean_production.is_finite() && self.mean_production >= 0.0,
            "mean_production must be finite and non-negative"
        );
        for (name, p) in [
            ("consumption_p", self.consumption_p),
            ("production_p", self.production_p),
        ] {
            ensure_param!((0.0..=1.0).contains(&p), "{name} must be in [0.0, 1.0]");
        }
        if let RateDistribution::Beta { concentration } = self.distribution {
            ensure_param!(
                concentration.is_finite() && concentration > 0.0,
                "beta concentration must be finite and positive"
            );
            ensure_param!(
                self.mean_consumption < 1.0 && self.mean_production < 1.0,
                "beta means must lie in (0, 1)"
            );
        }
        Ok(())
    }

    pub fn generate(&self, rng: &mut RngStream) -> Result<CouplingMatrices> {
        self.validate()?;
        let (n, k) = (self.n_species, self.n_resources);
        let consume = RateSampler::new(self.distribution, self.mean_consumption)?;
        let mut consumption = DMatrix::<f64>::zeros(n, k);
        for i in 0..n {
            for r in 0..k {
                if rng.gen_bool(self.consumption_p) {
                    consumption[(i, r)] = consume.draw(rng);
                }
            }
            if consumption.row(i).iter().all(|&v| v == 0.0) {
                let r = rng.gen_range(0..k);
                consumption[(i, r)] = consume.draw(rng);
            }
        }

        let mut production = DMatrix::<f64>::zeros(n, k);
        if self.mean_production > 0.0 {
            let produce = RateSampler::new(self.distribution, self.mean_production)?;
            for i in 0..n {
                for r in 0..k {
                    if consumption[(i, r)] == 0.0 && rng.gen_bool(self.production_p) {
                        production[(i, r)] = produce.draw(rng);
                    }
                }
            }
        }
        Ok(CouplingMatrices::new(consumption, production)?)
    }
}

enum RateSampler {
    Exponential(Exp<f64>),
    Beta(Beta<f64>),
}

impl RateSampler {
    fn new(distribution: RateDistribution, mean: f64) -> Result<Self> {
        Ok(match distribution {
            RateDistribution::Exponential => Self::Exponential(
                Exp::new(1.0 / mean).map_err(|e| SimError::invalid_parameter(e.to_string()))?,
            ),
            RateDistribution::Beta { concentration } => Self::Beta(
                Beta::new(mean * concentration, (1.0 - mean) * concentration)
                    .map_err(|e| SimError::invalid_parameter(e.to_string()))?,
            ),
        })
    }

    /// Strictly positive draw.
    fn draw(&self, rng: &mut RngStream) -> f64 {
        loop {
            let v = match self {
                Self::Exponential(exp) => exp.sample(rng),
                Self::Beta(beta) => beta.sample(rng),
            };
            if v > 0.0 {
                return v;
            }
        }
    }
}

/// Convenience wrapper over [`CouplingConfig::generate`] using the default
/// probabilities and exponential rates.
pub fn generate_coupling_matrices(
    n_species: usize,
    n_resources: usize,
    mean_consumption: f64,
    mean_production: f64,
    rng: &mut RngStream,
) -> Result<CouplingMatrices> {
    CouplingConfig {
        n_species,
        n_resources,
        mean_consumption,
        mean_production,
        ..Default::default()
    }
    .generate(rng)
}
