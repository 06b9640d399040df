//! Exact rational matrices.
//!
//! Used to recover statement iterators from schedule equalities without
//! rounding.

use num_rational::Rational64;
use num_traits::{Signed, Zero};
use std::fmt;

/// A matrix with rational entries, used for exact arithmetic in polyhedral operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RationalMatrix {
    data: Vec<Vec<Rational64>>,
    rows: usize,
    cols: usize,
}

impl RationalMatrix {
    /// Create a matrix from integer rows. All rows must have the same length.
    pub fn from_vec(data: Vec<Vec<i64>>) -> Self {
        let rows = data.len();
        let cols = data.first().map_or(0, |r| r.len());
        let data = data
            .into_iter()
            .map(|row| row.into_iter().map(Rational64::from_integer).collect())
            .collect();
        Self { data, rows, cols }
    }

    /// Get the number of rows.
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Get the number of columns.
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Get an element.
    pub fn get(&self, row: usize, col: usize) -> Option<&Rational64> {
        self.data.get(row)?.get(col)
    }

    /// Get a row as a slice.
    pub fn row(&self, row: usize) -> Option<&[Rational64]> {
        self.data.get(row).map(|r| r.as_slice())
    }

    /// Bring the first `pivot_limit` columns into reduced row echelon form
    /// with Gauss-Jordan elimination.
    ///
    /// Row operations are applied to whole rows, so trailing columns carry
    /// along as an augmented block. Returns, for each of the first
    /// `pivot_limit` columns, the row holding its pivot (if any).
    pub fn reduce_columns(&mut self, pivot_limit: usize) -> Vec<Option<usize>> {
        let mut pivots = vec![None; pivot_limit.min(self.cols)];
        let mut next_row = 0;

        for col in 0..pivots.len() {
            if next_row >= self.rows {
                break;
            }
            // Prefer the smallest non-zero magnitude to keep entries small.
            let candidate = (next_row..self.rows)
                .filter(|&r| !self.data[r][col].is_zero())
                .min_by(|&a, &b| self.data[a][col].abs().cmp(&self.data[b][col].abs()));
            let Some(pivot_row) = candidate else { continue };

            self.data.swap(next_row, pivot_row);
            let pivot = self.data[next_row][col];
            for value in self.data[next_row].iter_mut() {
                *value /= pivot;
            }
            let pivot_values = self.data[next_row].clone();
            for r in 0..self.rows {
                if r == next_row {
                    continue;
                }
                let factor = self.data[r][col];
                if factor.is_zero() {
                    continue;
                }
                for (value, p) in self.data[r].iter_mut().zip(&pivot_values) {
                    *value -= factor * p;
                }
            }
            pivots[col] = Some(next_row);
            next_row += 1;
        }

        pivots
    }

    /// Check if all entries are integers.
    pub fn is_integer(&self) -> bool {
        self.data.iter().all(|row| row.iter().all(|r| r.is_integer()))
    }
}

impl fmt::Display for RationalMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[")?;
        for row in &self.data {
            let cells: Vec<String> = row.iter()
                .map(|v| if v.is_integer() {
                    v.numer().to_string()
                } else {
                    format!("{}/{}", v.numer(), v.denom())
                })
                .collect();
            writeln!(f, "  [{}]", cells.join(", "))?;
        }
        write!(f, "]")
    }
}
