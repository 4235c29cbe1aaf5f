//! Configuration management for simulation parameters.
//!
//! Every model has a strongly-typed parameter struct living next to the model
//! itself; this module holds the pieces they share (time bounds, boundary
//! rules, noise) and the `ModelParams` enum that ties them together.
//!
//! ## Configuration Hierarchy
//!
//! 1. Default values (hardcoded in `Default` impls)
//! 2. A scenario TOML file (overrides defaults)
//! 3. Batch sweep overrides (`ModelParams::with_override`)
//!
//! ## Example scenario
//!
//! ```toml
//! seed = 42
//!
//! [params]
//! model = "glv"
//! n_species = 2
//! interactions = [[-0.5, 0.0], [0.0, -0.5]]
//! growth_rates = [0.1, 0.1]
//! x0 = [1.0, 1.0]
//!
//! [params.time]
//! t_end = 10.0
//! t_store = 5
//! ```

use crate::continuous::consumer_resource::ConsumerResourceParams;
use crate::continuous::glv::GlvParams;
use crate::continuous::logistic::LogisticParams;
use crate::error::{Result, SimError};
use crate::event::hubbell::HubbellParams;
use crate::event::soi::SoiParams;
use crate::report::ReportGrid;
use crate::ricker::RickerParams;
use crate::rng::RngStream;
use crate::{ensure_len, ensure_param};
use microsim_data::ModelKind;
use serde::{Deserialize, Serialize};

/// Reporting window shared by continuous and event-driven models.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TimeConfig {
    pub t_start: f64,
    pub t_end: f64,
    /// Number of reporting intervals; the grid has `t_store + 1` points.
    pub t_store: usize,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            t_start: 0.0,
            t_end: 1000.0,
            t_store: 1000,
        }
    }
}

impl TimeConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_param!(
            self.t_start.is_finite() && self.t_end.is_finite(),
            "time bounds must be finite"
        );
        ensure_param!(
            self.t_end > self.t_start,
            "t_end ({}) must be greater than t_start ({})",
            self.t_end,
            self.t_start
        );
        ensure_param!(self.t_store >= 1, "t_store must be at least 1");
        Ok(())
    }

    #[must_use]
    pub fn grid(&self) -> ReportGrid {
        ReportGrid::even(self.t_start, self.t_end, self.t_store)
    }
}

/// In-range numerical rules applied after every step of the stepped models.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Values below this are clamped to exactly zero.
    pub extinction_threshold: f64,
    /// Per-step probability of seeding one absent species.
    pub migration_p: f64,
    /// Abundance given to a seeded species.
    pub migration_abundance: f64,
    /// Any state value above this counts as divergence.
    pub explosion_bound: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            extinction_threshold: 0.0,
            migration_p: 0.0,
            migration_abundance: 0.01,
            explosion_bound: 1e8,
        }
    }
}

impl BoundaryConfig {
    /// Event models keep integer counts and have their own migration.
    #[must_use]
    pub fn event_driven() -> Self {
        Self {
            explosion_bound: f64::MAX,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_param!(
            self.extinction_threshold.is_finite() && self.extinction_threshold >= 0.0,
            "extinction_threshold must be finite and non-negative"
        );
        ensure_param!(
            (0.0..=1.0).contains(&self.migration_p),
            "migration_p must be in [0.0, 1.0]"
        );
        ensure_param!(
            self.migration_abundance.is_finite()
                && self.migration_abundance > 0.0
                && self.migration_abundance >= self.extinction_threshold,
            "migration_abundance must be positive and at least the extinction threshold"
        );
        ensure_param!(
            self.explosion_bound.is_finite() && self.explosion_bound > 0.0,
            "explosion_bound must be finite and positive"
        );
        Ok(())
    }
}

/// Noise amplitude: one value for every species or one per species.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Amplitude {
    Uniform(f64),
    PerSpecies(Vec<f64>),
}

impl Default for Amplitude {
    fn default() -> Self {
        Self::Uniform(0.01)
    }
}

impl Amplitude {
    pub fn resolve(&self, n_species: usize) -> Result<Vec<f64>> {
        let values = match self {
            Self::Uniform(sigma) => vec![*sigma; n_species],
            Self::PerSpecies(values) => {
                ensure_len!("noise amplitude", values.len(), n_species);
                values.clone()
            }
        };
        ensure_param!(
            values.iter().all(|s| s.is_finite() && *s >= 0.0),
            "noise amplitudes must be finite and non-negative"
        );
        Ok(values)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    /// `sigma_i * x_i * dW`: extinct species stay extinct.
    #[default]
    Multiplicative,
    /// `sigma_i * dW` on present species.
    Additive,
}

/// Window during which external perturbations hit the community.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ExternalEvent {
    pub start: f64,
    pub duration: f64,
}

impl ExternalEvent {
    #[must_use]
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.start + self.duration
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NoiseConfig {
    pub kind: NoiseKind,
    /// Euler-Maruyama drift amplitude (continuous) or log-scale sigma (Ricker).
    pub sigma_drift: Amplitude,
    /// Per-step probability of a community-wide log-normal shock.
    pub epoch_p: f64,
    pub sigma_epoch: f64,
    pub external_events: Vec<ExternalEvent>,
    pub sigma_external: f64,
    /// Variance of Gaussian measurement error added to reported values.
    pub error_variance: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            kind: NoiseKind::Multiplicative,
            sigma_drift: Amplitude::default(),
            epoch_p: 0.0,
            sigma_epoch: 0.1,
            external_events: Vec::new(),
            sigma_external: 0.3,
            error_variance: 0.0,
        }
    }
}

impl NoiseConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_param!(
            (0.0..=1.0).contains(&self.epoch_p),
            "epoch_p must be in [0.0, 1.0]"
        );
        ensure_param!(
            self.sigma_epoch.is_finite() && self.sigma_epoch >= 0.0,
            "sigma_epoch must be finite and non-negative"
        );
        ensure_param!(
            self.sigma_external.is_finite() && self.sigma_external >= 0.0,
            "sigma_external must be finite and non-negative"
        );
        ensure_param!(
            self.error_variance.is_finite() && self.error_variance >= 0.0,
            "error_variance must be finite and non-negative"
        );
        for event in &self.external_events {
            ensure_param!(
                event.start.is_finite() && event.duration.is_finite() && event.duration > 0.0,
                "external event windows need a finite start and positive duration"
            );
        }
        Ok(())
    }
}

/// Checks a per-species vector: right length, finite, optionally non-negative.
pub(crate) fn check_vector(
    name: &str,
    values: &[f64],
    expected: usize,
    non_negative: bool,
) -> Result<()> {
    ensure_len!(name, values.len(), expected);
    ensure_param!(
        values.iter().all(|v| v.is_finite()),
        "{name} must be finite"
    );
    if non_negative {
        ensure_param!(
            values.iter().all(|&v| v >= 0.0),
            "{name} must be non-negative"
        );
    }
    Ok(())
}

/// Parameter set for any of the supported models.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ModelParams {
    Glv(GlvParams),
    ConsumerResource(ConsumerResourceParams),
    Logistic(LogisticParams),
    Ricker(RickerParams),
    Hubbell(HubbellParams),
    Soi(SoiParams),
}

impl ModelParams {
    #[must_use]
    pub fn kind(&self) -> ModelKind {
        match self {
            Self::Glv(_) => ModelKind::Glv,
            Self::ConsumerResource(_) => ModelKind::ConsumerResource,
            Self::Logistic(_) => ModelKind::Logistic,
            Self::Ricker(_) => ModelKind::Ricker,
            Self::Hubbell(_) => ModelKind::Hubbell,
            Self::Soi(_) => ModelKind::Soi,
        }
    }

    /// Validates all parameters before any computation starts.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Glv(p) => p.validate(),
            Self::ConsumerResource(p) => p.validate(),
            Self::Logistic(p) => p.validate(),
            Self::Ricker(p) => p.validate(),
            Self::Hubbell(p) => p.validate(),
            Self::Soi(p) => p.validate(),
        }
    }

    /// Copy with one parameter replaced.
    ///
    /// `name` is a dotted path into the serialized parameters, for example
    /// `"growth_rates"` or `"time.t_end"`. Unknown names are rejected.
    pub fn with_override(&self, name: &str, value: &serde_json::Value) -> Result<Self> {
        ensure_param!(name != "model", "the model kind cannot be overridden");
        let mut tree = serde_json::to_value(self)
            .map_err(|e| SimError::invalid_parameter(format!("serializing parameters: {e}")))?;
        let slot = name
            .split('.')
            .try_fold(&mut tree, |node, key| node.get_mut(key))
            .ok_or_else(|| SimError::invalid_parameter(format!("unknown parameter `{name}`")))?;
        *slot = value.clone();
        serde_json::from_value(tree)
            .map_err(|e| SimError::invalid_parameter(format!("override `{name}`: {e}")))
    }

    /// SHA-256 over the serialized parameters, hex encoded.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        fingerprint_of(self)
    }
}

pub(crate) fn fingerprint_of<T: Serialize>(params: &T) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    if let Ok(bytes) = serde_json::to_vec(params) {
        hasher.update(&bytes);
    }
    hex::encode(hasher.finalize())
}

/// A runnable scenario: parameters plus an optional seed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Scenario {
    pub seed: Option<u64>,
    pub params: ModelParams,
}

impl Scenario {
    /// Parses and validates a scenario from TOML.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let scenario = toml::from_str::<Self>(content)?;
        scenario.params.validate()?;
        Ok(scenario)
    }

    /// Stream for this scenario; entropy-seeded when no seed is set.
    #[must_use]
    pub fn rng(&self) -> RngStream {
        self.seed.map_or_else(RngStream::from_entropy, RngStream::new)
    }
}
