//! Iteration vector and statement map: the caller-provided inputs of a
//! lowering pass.

use crate::ir::{Expr, IrBuilder, Stmt, Type, Variable};
use crate::utils::errors::{LowerError, LowerErrorKind};
use std::collections::BTreeMap;

/// Statement name to the IR statement emitted for each of its instances.
pub type StatementMap = BTreeMap<String, Stmt>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Iterator,
    Parameter,
}

/// A named slot of the iteration vector and the IR expression it denotes.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub expr: Expr,
    pub kind: ElementKind,
}

/// Loop iterators followed by symbolic parameters.
///
/// Slot 0 is the constant term and has no name, so `size()` is one more
/// than the number of named elements. Names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IterationVector {
    iterators: Vec<Element>,
    params: Vec<Element>,
}

impl IterationVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterators named `iterators` and parameters named `params`, each bound
    /// to a fresh `int<4>` variable.
    pub fn with_fresh_variables(
        builder: &mut IrBuilder,
        iterators: &[&str],
        params: &[&str],
    ) -> Result<Self, LowerError> {
        let mut iv = Self::new();
        for name in iterators {
            iv.add_iterator(*name, Expr::Var(builder.variable(Type::int4())))?;
        }
        for name in params {
            iv.add_param(*name, Expr::Var(builder.variable(Type::int4())))?;
        }
        Ok(iv)
    }

    /// Append an iterator; returns its slot index.
    pub fn add_iterator(&mut self, name: impl Into<String>, expr: Expr) -> Result<usize, LowerError> {
        let name = self.check_unique(name.into())?;
        self.iterators.push(Element { name, expr, kind: ElementKind::Iterator });
        Ok(self.iterators.len())
    }

    /// Append a parameter; returns its slot index.
    pub fn add_param(&mut self, name: impl Into<String>, expr: Expr) -> Result<usize, LowerError> {
        let name = self.check_unique(name.into())?;
        self.params.push(Element { name, expr, kind: ElementKind::Parameter });
        Ok(self.size() - 1)
    }

    fn check_unique(&self, name: String) -> Result<String, LowerError> {
        if self.get(&name).is_some() {
            return Err(LowerError::new(
                LowerErrorKind::AlreadyBound,
                format!("iteration vector already has an element named '{}'", name),
            ));
        }
        Ok(name)
    }

    /// Number of slots, the constant slot included.
    pub fn size(&self) -> usize {
        1 + self.iterators.len() + self.params.len()
    }

    pub fn iterators(&self) -> &[Element] {
        &self.iterators
    }

    pub fn params(&self) -> &[Element] {
        &self.params
    }

    pub fn iterator(&self, index: usize) -> Option<&Element> {
        self.iterators.get(index)
    }

    /// Variable behind iterator `index`, when it is one.
    pub fn iterator_var(&self, index: usize) -> Option<&Variable> {
        self.iterator(index).and_then(|e| e.expr.as_var())
    }

    /// Named elements in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.iterators.iter().chain(&self.params)
    }

    pub fn get(&self, name: &str) -> Option<&Element> {
        self.iter().find(|e| e.name == name)
    }

    pub fn param_names(&self) -> Vec<String> {
        self.params.iter().map(|e| e.name.clone()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.iter().map(|e| e.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_counts_constant_slot() {
        let mut b = IrBuilder::new();
        let iv = IterationVector::with_fresh_variables(&mut b, &["i", "j"], &["N"]).unwrap();
        assert_eq!(iv.size(), 4);
        assert_eq!(iv.iter().count(), iv.size() - 1);
        assert_eq!(iv.names(), vec!["i", "j", "N"]);
        assert_eq!(iv.param_names(), vec!["N"]);
        assert_eq!(iv.get("N").map(|e| e.kind), Some(ElementKind::Parameter));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let mut b = IrBuilder::new();
        let err = IterationVector::with_fresh_variables(&mut b, &["i"], &["i"]).unwrap_err();
        assert_eq!(err.kind, LowerErrorKind::AlreadyBound);
    }

    #[test]
    fn test_slot_indices() {
        let mut b = IrBuilder::new();
        let mut iv = IterationVector::new();
        assert_eq!(iv.add_iterator("i", Expr::Var(b.variable(Type::int4()))).unwrap(), 1);
        assert_eq!(iv.add_param("N", Expr::Var(b.variable(Type::int4()))).unwrap(), 2);
        assert!(iv.iterator_var(0).is_some());
        assert!(iv.iterator_var(1).is_none());
    }
}
