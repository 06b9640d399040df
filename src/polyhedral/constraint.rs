//! Linear constraints for polyhedral representation.
//!
//! A constraint is a linear inequality or equality:
//! - Inequality: expr >= 0
//! - Equality: expr = 0

use crate::polyhedral::expr::AffineExpr;
use serde::{Serialize, Deserialize};
use std::fmt;

/// A linear constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    /// The affine expression (constraint is: expr >= 0 or expr = 0)
    pub expr: AffineExpr,
    /// Kind of constraint
    pub kind: ConstraintKind,
}

/// Kind of constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Greater than or equal: expr >= 0
    Inequality,
    /// Equal: expr = 0
    Equality,
}

/// Outcome of normalizing a single constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// Holds for every point.
    Tautology,
    /// Holds for no integer point.
    Contradiction,
    /// Still a real restriction.
    Constraint(Constraint),
}

impl Constraint {
    /// Create a new constraint.
    pub fn new(expr: AffineExpr, kind: ConstraintKind) -> Self {
        Self { expr, kind }
    }

    /// Create an inequality constraint: expr >= 0
    pub fn ge_zero(expr: AffineExpr) -> Self {
        Self::new(expr, ConstraintKind::Inequality)
    }

    /// Create an equality constraint: expr = 0
    pub fn eq_zero(expr: AffineExpr) -> Self {
        Self::new(expr, ConstraintKind::Equality)
    }

    /// Create a constraint: lhs >= rhs
    pub fn ge(lhs: AffineExpr, rhs: AffineExpr) -> Self {
        Self::ge_zero(lhs - rhs)
    }

    /// Create a constraint: lhs <= rhs
    pub fn le(lhs: AffineExpr, rhs: AffineExpr) -> Self {
        Self::ge_zero(rhs - lhs)
    }

    /// Create a constraint: lhs = rhs
    pub fn eq(lhs: AffineExpr, rhs: AffineExpr) -> Self {
        Self::eq_zero(lhs - rhs)
    }

    /// Check if this is an equality constraint.
    pub fn is_equality(&self) -> bool {
        matches!(self.kind, ConstraintKind::Equality)
    }

    /// Check if this constraint is satisfied by the given point.
    pub fn is_satisfied(&self, dim_values: &[i64], param_values: &[i64]) -> bool {
        let value = self.expr.evaluate(dim_values, param_values);
        match self.kind {
            ConstraintKind::Inequality => value >= 0,
            ConstraintKind::Equality => value == 0,
        }
    }

    /// Apply a rewrite to the underlying expression, keeping the kind.
    pub fn map_expr(&self, f: impl FnOnce(&AffineExpr) -> AffineExpr) -> Self {
        Self::new(f(&self.expr), self.kind)
    }

    /// Divide through by the coefficient gcd.
    ///
    /// For inequalities the constant is rounded down, which tightens the
    /// constraint to the same set of integer points. An equality whose
    /// constant is not a multiple of the gcd has no integer solution.
    pub fn normalize(&self) -> Normalized {
        let g = self.expr.coeff_gcd();
        if g == 0 {
            let holds = match self.kind {
                ConstraintKind::Inequality => self.expr.constant >= 0,
                ConstraintKind::Equality => self.expr.constant == 0,
            };
            return if holds { Normalized::Tautology } else { Normalized::Contradiction };
        }

        let constant = match self.kind {
            ConstraintKind::Inequality => self.expr.constant.div_euclid(g),
            ConstraintKind::Equality => {
                if self.expr.constant % g != 0 {
                    return Normalized::Contradiction;
                }
                self.expr.constant / g
            }
        };
        let mut expr = AffineExpr::from_parts(
            self.expr.coeffs.iter().map(|c| c / g).collect(),
            self.expr.param_coeffs.iter().map(|c| c / g).collect(),
            constant,
        );

        // Equalities get a canonical sign so that `e = 0` and `-e = 0` dedupe.
        if self.is_equality() {
            let leading = expr.coeffs.iter()
                .chain(&expr.param_coeffs)
                .find(|&&c| c != 0)
                .copied()
                .unwrap_or(0);
            if leading < 0 {
                expr = -expr;
            }
        }
        Normalized::Constraint(Self::new(expr, self.kind))
    }

    /// Get the number of dimensions.
    pub fn n_dim(&self) -> usize {
        self.expr.n_dim()
    }

    /// Get the number of parameters.
    pub fn n_param(&self) -> usize {
        self.expr.n_param()
    }

    /// Convert to string with given names.
    pub fn to_string_with_names(&self, dim_names: &[String], param_names: &[String]) -> String {
        let expr_str = self.expr.to_string_with_names(dim_names, param_names);
        match self.kind {
            ConstraintKind::Inequality => format!("{} >= 0", expr_str),
            ConstraintKind::Equality => format!("{} = 0", expr_str),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_with_names(&[], &[]))
    }
}

/// A system of constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSystem {
    /// All constraints in the system
    pub constraints: Vec<Constraint>,
    /// Number of dimensions
    pub n_dim: usize,
    /// Number of parameters
    pub n_param: usize,
}

impl ConstraintSystem {
    /// Create an empty constraint system.
    pub fn new(n_dim: usize, n_param: usize) -> Self {
        Self {
            constraints: Vec::new(),
            n_dim,
            n_param,
        }
    }

    /// Add a constraint.
    pub fn add(&mut self, constraint: Constraint) {
        assert_eq!(constraint.n_dim(), self.n_dim);
        assert_eq!(constraint.n_param(), self.n_param);
        self.constraints.push(constraint);
    }

    /// Add multiple constraints.
    pub fn add_all(&mut self, constraints: impl IntoIterator<Item = Constraint>) {
        for c in constraints {
            self.add(c);
        }
    }

    /// Get all equality constraints.
    pub fn equalities(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(|c| c.is_equality())
    }

    /// Get all inequality constraints.
    pub fn inequalities(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(|c| !c.is_equality())
    }

    /// Check if a point satisfies all constraints.
    pub fn is_satisfied(&self, dim_values: &[i64], param_values: &[i64]) -> bool {
        self.constraints.iter().all(|c| c.is_satisfied(dim_values, param_values))
    }

    /// Check if the system is empty (has no constraints).
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Get the number of constraints.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(coeffs: &[i64], constant: i64) -> AffineExpr {
        AffineExpr::from_parts(coeffs.to_vec(), vec![], constant)
    }

    #[test]
    fn test_bounds() {
        // 0 <= i <= 10
        let lower = Constraint::ge(expr(&[1], 0), expr(&[0], 0));
        let upper = Constraint::le(expr(&[1], 0), expr(&[0], 10));
        assert!(lower.is_satisfied(&[0], &[]));
        assert!(!lower.is_satisfied(&[-1], &[]));
        assert!(upper.is_satisfied(&[10], &[]));
        assert!(!upper.is_satisfied(&[11], &[]));
    }

    #[test]
    fn test_normalize_tightens_inequality() {
        // 2i - 3 >= 0  ==>  i - 2 >= 0
        let c = Constraint::ge_zero(expr(&[2], -3));
        assert_eq!(
            c.normalize(),
            Normalized::Constraint(Constraint::ge_zero(expr(&[1], -2)))
        );
    }

    #[test]
    fn test_normalize_equality() {
        let c = Constraint::eq_zero(expr(&[-2], 4));
        assert_eq!(
            c.normalize(),
            Normalized::Constraint(Constraint::eq_zero(expr(&[1], -2)))
        );
        assert_eq!(Constraint::eq_zero(expr(&[2], 1)).normalize(), Normalized::Contradiction);
    }

    #[test]
    fn test_normalize_constants() {
        assert_eq!(Constraint::ge_zero(expr(&[0], 3)).normalize(), Normalized::Tautology);
        assert_eq!(Constraint::ge_zero(expr(&[0], -1)).normalize(), Normalized::Contradiction);
    }

    #[test]
    fn test_constraint_system() {
        let mut sys = ConstraintSystem::new(2, 0);
        sys.add(Constraint::ge_zero(expr(&[1, 0], 0)));
        sys.add(Constraint::ge_zero(expr(&[-1, 0], 9)));
        sys.add(Constraint::eq_zero(expr(&[1, -1], 0)));

        assert_eq!(sys.equalities().count(), 1);
        assert_eq!(sys.inequalities().count(), 2);
        assert!(sys.is_satisfied(&[5, 5], &[]));
        assert!(!sys.is_satisfied(&[5, 4], &[]));
        assert!(!sys.is_satisfied(&[10, 10], &[]));
    }
}
