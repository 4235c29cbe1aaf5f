use super::rows::{self, CouplingRows};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shape or content violation found while building a matrix.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("row {row} has {found} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("interaction matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("consumption is {consumption:?} but production is {production:?}")]
    CouplingShape {
        consumption: (usize, usize),
        production: (usize, usize),
    },

    #[error("entry ({row}, {col}) is not finite")]
    NonFinite { row: usize, col: usize },

    #[error("rate at ({row}, {col}) is negative: {value}")]
    NegativeRate { row: usize, col: usize, value: f64 },

    #[error("species {0} consumes no resource")]
    NoConsumption(usize),
}

fn check_finite(matrix: &DMatrix<f64>) -> Result<(), ShapeError> {
    for (col, column) in matrix.column_iter().enumerate() {
        if let Some(row) = column.iter().position(|v| !v.is_finite()) {
            return Err(ShapeError::NonFinite { row, col });
        }
    }
    Ok(())
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
/// Square species-by-species matrix of pairwise effects.
///
/// `A[(i, j)]` is the effect of species `j` on the per-capita growth of
/// species `i`. Diagonal entries are self-limitation terms.
pub struct InteractionMatrix {
    matrix: DMatrix<f64>,
}

impl InteractionMatrix {
    pub fn new(matrix: DMatrix<f64>) -> Result<Self, ShapeError> {
        if !matrix.is_square() {
            return Err(ShapeError::NotSquare {
                rows: matrix.nrows(),
                cols: matrix.ncols(),
            });
        }
        check_finite(&matrix)?;
        Ok(Self { matrix })
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ShapeError> {
        Self::new(rows::from_rows(rows)?)
    }

    #[must_use]
    pub fn zeros(n_species: usize) -> Self {
        Self {
            matrix: DMatrix::zeros(n_species, n_species),
        }
    }

    /// Diagonal-only matrix: no cross-species interactions.
    #[must_use]
    pub fn from_diagonal(values: &[f64]) -> Self {
        let n = values.len();
        Self {
            matrix: DMatrix::from_fn(n, n, |i, j| if i == j { values[i] } else { 0.0 }),
        }
    }

    #[must_use]
    pub fn n_species(&self) -> usize {
        self.matrix.nrows()
    }

    #[must_use]
    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    #[must_use]
    pub fn into_inner(self) -> DMatrix<f64> {
        self.matrix
    }

    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix[(i, j)]
    }

    #[must_use]
    pub fn diagonal(&self) -> Vec<f64> {
        self.matrix.diagonal().iter().copied().collect()
    }

    /// Number of nonzero off-diagonal entries.
    #[must_use]
    pub fn off_diagonal_nonzero(&self) -> usize {
        let n = self.n_species();
        (0..n)
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .filter(|&(i, j)| i != j && self.matrix[(i, j)] != 0.0)
            .count()
    }

    /// Realised connectance: nonzero fraction of the off-diagonal slots.
    #[must_use]
    pub fn connectance(&self) -> f64 {
        let n = self.n_species();
        if n < 2 {
            return 0.0;
        }
        self.off_diagonal_nonzero() as f64 / (n * (n - 1)) as f64
    }

    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        rows::to_rows(&self.matrix)
    }
}

impl TryFrom<Vec<Vec<f64>>> for InteractionMatrix {
    type Error = ShapeError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Self::from_rows(&rows)
    }
}

impl From<InteractionMatrix> for Vec<Vec<f64>> {
    fn from(matrix: InteractionMatrix) -> Self {
        matrix.to_rows()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "CouplingRows", into = "CouplingRows")]
/// Species-by-resource consumption and production rates.
///
/// Both matrices share the shape `n_species x n_resources`, every entry is
/// nonnegative, and every species consumes at least one resource.
pub struct CouplingMatrices {
    consumption: DMatrix<f64>,
    production: DMatrix<f64>,
}

impl CouplingMatrices {
    pub fn new(consumption: DMatrix<f64>, production: DMatrix<f64>) -> Result<Self, ShapeError> {
        if consumption.shape() != production.shape() {
            return Err(ShapeError::CouplingShape {
                consumption: consumption.shape(),
                production: production.shape(),
            });
        }
        for matrix in [&consumption, &production] {
            check_finite(matrix)?;
            for (col, column) in matrix.column_iter().enumerate() {
                if let Some(row) = column.iter().position(|&v| v < 0.0) {
                    return Err(ShapeError::NegativeRate {
                        row,
                        col,
                        value: column[row],
                    });
                }
            }
        }
        if let Some(species) = consumption
            .row_iter()
            .position(|row| row.iter().all(|&v| v == 0.0))
        {
            return Err(ShapeError::NoConsumption(species));
        }
        Ok(Self {
            consumption,
            production,
        })
    }

    #[must_use]
    pub fn n_species(&self) -> usize {
        self.consumption.nrows()
    }

    #[must_use]
    pub fn n_resources(&self) -> usize {
        self.consumption.ncols()
    }

    #[must_use]
    pub fn consumption(&self) -> &DMatrix<f64> {
        &self.consumption
    }

    #[must_use]
    pub fn production(&self) -> &DMatrix<f64> {
        &self.production
    }

    #[must_use]
    pub fn consumes(&self, species: usize, resource: usize) -> bool {
        self.consumption[(species, resource)] > 0.0
    }
}

impl TryFrom<CouplingRows> for CouplingMatrices {
    type Error = ShapeError;

    fn try_from(raw: CouplingRows) -> Result<Self, Self::Error> {
        Self::new(
            rows::from_rows(&raw.consumption)?,
            rows::from_rows(&raw.production)?,
        )
    }
}

impl From<CouplingMatrices> for CouplingRows {
    fn from(coupling: CouplingMatrices) -> Self {
        Self {
            consumption: rows::to_rows(&coupling.consumption),
            production: rows::to_rows(&coupling.production),
        }
    }
}
