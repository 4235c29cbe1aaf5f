use super::rows;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
/// Abundances at a single instant: species, plus resources for
/// consumer-resource models.
pub struct SimulationState {
    #[serde(with = "rows::vector")]
    pub species: DVector<f64>,
    #[serde(with = "rows::optional_vector", default)]
    pub resources: Option<DVector<f64>>,
}

impl SimulationState {
    #[must_use]
    pub fn new(species: DVector<f64>) -> Self {
        Self {
            species,
            resources: None,
        }
    }

    #[must_use]
    pub fn with_resources(species: DVector<f64>, resources: DVector<f64>) -> Self {
        Self {
            species,
            resources: Some(resources),
        }
    }

    #[must_use]
    pub fn from_slices(species: &[f64], resources: Option<&[f64]>) -> Self {
        Self {
            species: DVector::from_vec(species.to_vec()),
            resources: resources.map(|r| DVector::from_vec(r.to_vec())),
        }
    }

    #[must_use]
    pub fn n_species(&self) -> usize {
        self.species.len()
    }

    #[must_use]
    pub fn n_resources(&self) -> usize {
        self.resources.as_ref().map_or(0, DVector::len)
    }

    /// Sum of species abundances.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.species.sum()
    }

    /// Indices of species with zero abundance.
    pub fn absent_species(&self) -> impl Iterator<Item = usize> + '_ {
        self.species
            .iter()
            .enumerate()
            .filter(|(_, &x)| x == 0.0)
            .map(|(i, _)| i)
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.values().all(f64::is_finite)
    }

    /// Largest absolute value over species and resources.
    #[must_use]
    pub fn max_abs(&self) -> f64 {
        self.values().fold(0.0, |acc, v| acc.max(v.abs()))
    }

    /// Species values followed by resource values.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.species
            .iter()
            .chain(self.resources.iter().flat_map(|r| r.iter()))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_chain_species_then_resources() {
        let state = SimulationState::from_slices(&[1.0, 0.0], Some(&[3.0][..]));
        assert_eq!(state.values().collect::<Vec<_>>(), vec![1.0, 0.0, 3.0]);
        assert_eq!(state.absent_species().collect::<Vec<_>>(), vec![1]);
        assert_eq!(state.n_resources(), 1);
    }

    #[test]
    fn test_non_finite_detected() {
        let state = SimulationState::from_slices(&[1.0, f64::NAN], None);
        assert!(!state.is_finite());
        assert_eq!(SimulationState::from_slices(&[-4.0, 2.0], None).max_abs(), 4.0);
    }
}
