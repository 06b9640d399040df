//! Integer sets (polyhedra) for iteration domains.

use crate::polyhedral::space::Space;
use crate::polyhedral::constraint::{Constraint, ConstraintSystem};
use serde::{Serialize, Deserialize};
use std::fmt;

/// An integer set defined by affine constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegerSet {
    pub space: Space,
    pub constraints: ConstraintSystem,
}

impl IntegerSet {
    pub fn universe(n_dim: usize, n_param: usize) -> Self {
        Self::from_space(Space::set(n_dim, n_param))
    }

    /// The unconstrained parameter context.
    pub fn params_universe(n_param: usize) -> Self {
        Self::from_space(Space::params(n_param))
    }

    pub fn from_space(space: Space) -> Self {
        let constraints = ConstraintSystem::new(space.n_dim, space.n_param);
        Self { space, constraints }
    }

    pub fn from_constraints(space: Space, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        let mut set = Self::from_space(space);
        for c in constraints {
            set.add_constraint(c);
        }
        set
    }

    pub fn dim(&self) -> usize { self.space.n_dim }
    pub fn n_param(&self) -> usize { self.space.n_param }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.add(constraint);
    }

    pub fn contains(&self, point: &[i64], params: &[i64]) -> bool {
        self.constraints.is_satisfied(point, params)
    }

    pub fn dim_names(&self) -> Vec<String> { self.space.all_dim_names() }
    pub fn param_names(&self) -> Vec<String> { self.space.all_param_names() }

    pub fn with_dim_names(mut self, names: Vec<String>) -> Self {
        self.space = self.space.with_dim_names(names);
        self
    }

    pub fn with_param_names(mut self, names: Vec<String>) -> Self {
        self.space = self.space.with_param_names(names);
        self
    }
}

impl fmt::Display for IntegerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dim_names = self.dim_names();
        let param_names = self.param_names();
        if !param_names.is_empty() {
            write!(f, "[{}] -> ", param_names.join(", "))?;
        }
        write!(f, "{{ [{}]", dim_names.join(", "))?;
        if !self.constraints.is_empty() {
            let rendered: Vec<String> = self.constraints.constraints.iter()
                .map(|c| c.to_string_with_names(&dim_names, &param_names))
                .collect();
            write!(f, " : {}", rendered.join(" and "))?;
        }
        write!(f, " }}")
    }
}

/// A set of statement instances: one named integer set per statement.
///
/// All parts live in the same space (the iterators and parameters of one
/// iteration vector).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionSet {
    pub parts: Vec<(String, IntegerSet)>,
}

impl UnionSet {
    pub fn new() -> Self { Self::default() }

    /// Add (or replace) the domain of a statement.
    pub fn insert(&mut self, name: impl Into<String>, set: IntegerSet) {
        let name = name.into();
        match self.parts.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = set,
            None => self.parts.push((name, set)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, set: IntegerSet) -> Self {
        self.insert(name, set);
        self
    }

    pub fn get(&self, name: &str) -> Option<&IntegerSet> {
        self.parts.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn is_empty(&self) -> bool { self.parts.is_empty() }
    pub fn len(&self) -> usize { self.parts.len() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IntegerSet)> {
        self.parts.iter().map(|(n, s)| (n.as_str(), s))
    }
}
