//! Error types for microsim_core.
//!
//! Every kind is raised at the point of detection and never retried: these
//! are configuration or numerical-stability faults, not transient failures.
//! `NumericalDivergence` is the one recoverable kind and carries the partial
//! trajectory up to the last finite step.

use microsim_data::{ShapeError, Trajectory};
use thiserror::Error;

/// Main error type for simulation runs.
#[derive(Error, Debug)]
pub enum SimError {
    /// Matrix or vector shape is unusable on its own.
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    /// Two inputs disagree about a dimension.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Every event rate is zero, so the simulation cannot progress.
    #[error("Invalid rate configuration: {0}")]
    InvalidRateConfiguration(String),

    /// State became non-finite or exceeded the explosion bound.
    #[error("Numerical divergence at t = {time}")]
    NumericalDivergence {
        time: f64,
        partial: Box<Trajectory>,
    },

    /// A scalar parameter is out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for microsim_core operations.
pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    #[must_use]
    pub fn invalid_dimension<S: Into<String>>(msg: S) -> Self {
        Self::InvalidDimension(msg.into())
    }

    #[must_use]
    pub fn dimension_mismatch<S: Into<String>>(msg: S) -> Self {
        Self::DimensionMismatch(msg.into())
    }

    #[must_use]
    pub fn invalid_rates<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRateConfiguration(msg.into())
    }

    #[must_use]
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Only divergence leaves usable output behind.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NumericalDivergence { .. })
    }

    /// Turns a divergence into its partial trajectory; other kinds pass through.
    pub fn recover_partial(self) -> Result<Trajectory> {
        match self {
            Self::NumericalDivergence { partial, .. } => Ok(*partial),
            other => Err(other),
        }
    }
}

impl From<ShapeError> for SimError {
    fn from(err: ShapeError) -> Self {
        Self::InvalidDimension(err.to_string())
    }
}

/// Returns `SimError::InvalidParameter` unless the condition holds.
#[macro_export]
macro_rules! ensure_param {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::SimError::InvalidParameter(format!($($arg)+)));
        }
    };
}

/// Returns `SimError::DimensionMismatch` unless the two lengths agree.
#[macro_export]
macro_rules! ensure_len {
    ($what:expr, $found:expr, $expected:expr) => {
        if $found != $expected {
            return Err($crate::error::SimError::DimensionMismatch(format!(
                "{} has length {}, expected {}",
                $what, $found, $expected
            )));
        }
    };
}
