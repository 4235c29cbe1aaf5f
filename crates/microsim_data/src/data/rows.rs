//! Row-major serde representation for `nalgebra` matrices and vectors.
//!
//! `nalgebra` serializes a `DMatrix` as a flat column-major buffer plus
//! dimensions, which is unreadable in scenario files. Everything in this crate
//! goes through these helpers instead, so a 2x2 matrix reads as
//! `[[-0.5, 0.0], [0.0, -0.5]]`.

use super::matrix::ShapeError;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Copies a matrix into a list of rows.
#[must_use]
pub fn to_rows(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

/// Builds a matrix from a list of equally long rows.
pub fn from_rows(rows: &[Vec<f64>]) -> Result<DMatrix<f64>, ShapeError> {
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some(row) = rows.iter().position(|r| r.len() != ncols) {
        return Err(ShapeError::Ragged {
            row,
            expected: ncols,
            found: rows[row].len(),
        });
    }
    Ok(DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j]))
}

/// Serialized form of a consumption/production pair.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CouplingRows {
    pub consumption: Vec<Vec<f64>>,
    pub production: Vec<Vec<f64>>,
}

/// `#[serde(with = "rows::matrix")]`
pub mod matrix {
    use nalgebra::DMatrix;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(matrix: &DMatrix<f64>, s: S) -> Result<S::Ok, S::Error> {
        super::to_rows(matrix).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DMatrix<f64>, D::Error> {
        let rows = Vec::<Vec<f64>>::deserialize(d)?;
        super::from_rows(&rows).map_err(D::Error::custom)
    }
}

/// `#[serde(with = "rows::optional_matrix")]`
pub mod optional_matrix {
    use nalgebra::DMatrix;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        matrix: &Option<DMatrix<f64>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        matrix.as_ref().map(super::to_rows).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DMatrix<f64>>, D::Error> {
        match Option::<Vec<Vec<f64>>>::deserialize(d)? {
            Some(rows) => super::from_rows(&rows).map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

/// `#[serde(with = "rows::vector")]`
pub mod vector {
    use nalgebra::DVector;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(vector: &DVector<f64>, s: S) -> Result<S::Ok, S::Error> {
        vector.as_slice().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DVector<f64>, D::Error> {
        Vec::<f64>::deserialize(d).map(DVector::from_vec)
    }
}

/// `#[serde(with = "rows::optional_vector")]`
pub mod optional_vector {
    use nalgebra::DVector;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        vector: &Option<DVector<f64>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        vector.as_ref().map(|v| v.as_slice()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DVector<f64>>, D::Error> {
        Ok(Option::<Vec<f64>>::deserialize(d)?.map(DVector::from_vec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_row_major() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(to_rows(&m), vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(
            err,
            ShapeError::Ragged {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_empty_rows_give_empty_matrix() {
        let m = from_rows(&[]).unwrap();
        assert_eq!(m.shape(), (0, 0));
    }
}
