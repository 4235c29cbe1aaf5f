//! Discrete stochastic event simulators.
//!
//! States hold integer counts stored as `f64`. Time advances by event waiting
//! times rather than fixed steps; the run loop reports the count held at each
//! grid time.

pub mod hubbell;
pub mod soi;

use crate::error::{Result, SimError};
use crate::rng::RngStream;
use rand::distributions::{Distribution, WeightedIndex};

/// Checks that `x0` holds non-negative whole counts.
pub(crate) fn check_counts(name: &str, values: &[f64]) -> Result<()> {
    if values
        .iter()
        .any(|v| !v.is_finite() || *v < 0.0 || v.fract() != 0.0)
    {
        return Err(SimError::invalid_parameter(format!(
            "{name} must hold non-negative whole counts"
        )));
    }
    Ok(())
}

/// Index drawn proportionally to `weights`, or `None` when every weight is
/// zero.
pub(crate) fn weighted_choice(weights: &[f64], rng: &mut RngStream) -> Option<usize> {
    WeightedIndex::<f64>::new(weights).ok().map(|w| w.sample(rng))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_choice_skips_zero_weights() {
        let mut rng = RngStream::new(1);
        for _ in 0..100 {
            assert_eq!(weighted_choice(&[0.0, 3.0, 0.0], &mut rng), Some(1));
        }
        assert_eq!(weighted_choice(&[0.0, 0.0], &mut rng), None);
    }

    #[test]
    fn test_check_counts() {
        assert!(check_counts("x0", &[0.0, 3.0]).is_ok());
        assert!(check_counts("x0", &[1.5]).is_err());
        assert!(check_counts("x0", &[-1.0]).is_err());
    }
}
