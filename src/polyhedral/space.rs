//! Polyhedral spaces define the dimensions of iteration domains.
//!
//! A space describes the structure of an iteration domain or map:
//! - Input dimensions (for maps)
//! - Output dimensions
//! - Parameter dimensions (symbolic constants)

use serde::{Serialize, Deserialize};
use std::fmt;

/// A polyhedral space describes the dimensionality and structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    /// Number of set/output dimensions
    pub n_dim: usize,
    /// Number of parameter dimensions
    pub n_param: usize,
    /// Number of input dimensions (for maps only)
    #[serde(default)]
    pub n_in: usize,
    /// Names of dimensions (optional, for debugging)
    #[serde(default)]
    pub dim_names: Vec<String>,
    /// Names of parameters (optional)
    #[serde(default)]
    pub param_names: Vec<String>,
}

impl Space {
    /// Create a new set space with parameters.
    pub fn set(n_dim: usize, n_param: usize) -> Self {
        Self {
            n_dim,
            n_param,
            n_in: 0,
            dim_names: Vec::new(),
            param_names: Vec::new(),
        }
    }

    /// Create a new map space with parameters.
    pub fn map(n_in: usize, n_out: usize, n_param: usize) -> Self {
        Self { n_in, ..Self::set(n_out, n_param) }
    }

    /// Parameter-only space, as used by contexts.
    pub fn params(n_param: usize) -> Self {
        Self::set(0, n_param)
    }

    /// Check if this is a map space (has input dimensions).
    pub fn is_map(&self) -> bool {
        self.n_in > 0
    }

    /// Set dimension names.
    pub fn with_dim_names(mut self, names: Vec<String>) -> Self {
        self.dim_names = names;
        self
    }

    /// Set parameter names.
    pub fn with_param_names(mut self, names: Vec<String>) -> Self {
        self.param_names = names;
        self
    }

    /// Get all dimension names with defaults.
    pub fn all_dim_names(&self) -> Vec<String> {
        Self::names_or_default(&self.dim_names, self.n_dim, "d")
    }

    /// Get all parameter names with defaults.
    pub fn all_param_names(&self) -> Vec<String> {
        Self::names_or_default(&self.param_names, self.n_param, "p")
    }

    fn names_or_default(names: &[String], count: usize, prefix: &str) -> Vec<String> {
        (0..count)
            .map(|i| names.get(i).cloned().unwrap_or_else(|| format!("{}{}", prefix, i)))
            .collect()
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.n_param > 0 {
            write!(f, "[{}] -> ", self.all_param_names().join(", "))?;
        }
        if self.is_map() {
            write!(f, "[{}] -> ", self.n_in)?;
        }
        write!(f, "[{}]", self.all_dim_names().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_space() {
        let space = Space::map(2, 3, 1);
        assert!(space.is_map());
        assert_eq!(space.n_in, 2);
        assert_eq!(space.n_dim, 3);
    }

    #[test]
    fn test_default_names() {
        let space = Space::set(2, 1).with_dim_names(vec!["i".to_string()]);
        assert_eq!(space.all_dim_names(), vec!["i", "d1"]);
        assert_eq!(space.all_param_names(), vec!["p0"]);
        assert_eq!(space.to_string(), "[p0] -> [i, d1]");
    }
}
