//! Affine maps for schedules.

use crate::polyhedral::space::Space;
use crate::polyhedral::expr::AffineExpr;
use serde::{Serialize, Deserialize};
use std::fmt;

/// An affine map from one space to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffineMap {
    pub space: Space,
    /// Output expressions (one per output dimension)
    pub outputs: Vec<AffineExpr>,
}

impl AffineMap {
    /// Create an identity map of given dimension.
    pub fn identity(n_dim: usize, n_param: usize) -> Self {
        let outputs = (0..n_dim)
            .map(|i| AffineExpr::var(i, n_dim, n_param))
            .collect();
        Self::from_outputs(n_dim, n_param, outputs)
    }

    /// Create from output expressions.
    pub fn from_outputs(n_in: usize, n_param: usize, outputs: Vec<AffineExpr>) -> Self {
        debug_assert!(outputs.iter().all(|e| e.n_dim() == n_in && e.n_param() == n_param));
        Self {
            space: Space::map(n_in, outputs.len(), n_param),
            outputs,
        }
    }

    /// Classic "2d+1" schedule: `[c0, i0, c1, i1, ..., cn]` with the given
    /// scalar positions interleaved around the input dimensions.
    pub fn interleaved(n_in: usize, n_param: usize, scalars: &[i64]) -> Self {
        let mut outputs = Vec::with_capacity(2 * n_in + 1);
        for i in 0..=n_in {
            let scalar = scalars.get(i).copied().unwrap_or(0);
            outputs.push(AffineExpr::constant(scalar, n_in, n_param));
            if i < n_in {
                outputs.push(AffineExpr::var(i, n_in, n_param));
            }
        }
        Self::from_outputs(n_in, n_param, outputs)
    }

    /// Get input dimensions.
    pub fn n_in(&self) -> usize { self.space.n_in }

    /// Get output dimensions.
    pub fn n_out(&self) -> usize { self.outputs.len() }

    /// Get number of parameters.
    pub fn n_param(&self) -> usize { self.space.n_param }

    /// Apply the map to a point.
    pub fn apply(&self, input: &[i64], params: &[i64]) -> Vec<i64> {
        self.outputs.iter()
            .map(|expr| expr.evaluate(input, params))
            .collect()
    }

    /// The value of output `dim` if it does not depend on inputs or parameters.
    ///
    /// Output dimensions past the end count as constant zero.
    pub fn scalar_output(&self, dim: usize) -> Option<i64> {
        match self.outputs.get(dim) {
            Some(expr) => expr.as_constant(),
            None => Some(0),
        }
    }

    /// Swap two output dimensions.
    pub fn interchange(&self, dim1: usize, dim2: usize) -> Self {
        assert!(dim1 < self.n_out() && dim2 < self.n_out());
        let mut outputs = self.outputs.clone();
        outputs.swap(dim1, dim2);
        Self {
            space: self.space.clone(),
            outputs,
        }
    }
}

impl fmt::Display for AffineMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let in_names: Vec<String> = (0..self.n_in()).map(|i| format!("i{}", i)).collect();
        let param_names = self.space.all_param_names();
        let outs: Vec<String> = self.outputs.iter()
            .map(|e| e.to_string_with_names(&in_names, &param_names))
            .collect();
        write!(f, "{{ [{}] -> [{}] }}", in_names.join(", "), outs.join(", "))
    }
}

/// A schedule for a set of statements: one named map per statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionMap {
    pub parts: Vec<(String, AffineMap)>,
}

impl UnionMap {
    pub fn new() -> Self { Self::default() }

    /// Add (or replace) the schedule of a statement.
    pub fn insert(&mut self, name: impl Into<String>, map: AffineMap) {
        let name = name.into();
        match self.parts.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = map,
            None => self.parts.push((name, map)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, map: AffineMap) -> Self {
        self.insert(name, map);
        self
    }

    pub fn get(&self, name: &str) -> Option<&AffineMap> {
        self.parts.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    pub fn is_empty(&self) -> bool { self.parts.is_empty() }
}
