//! Affine expressions for polyhedral representation.
//!
//! An affine expression is a linear combination of variables plus a constant:
//! `aff(x) = c0 + c1*x1 + c2*x2 + ... + cn*xn + p1*N1 + ...`

use num_integer::Integer;
use serde::{Serialize, Deserialize};
use std::fmt;
use std::ops::{Add, Sub, Neg};

/// An affine expression: constant + sum(coeff[i] * var[i]) + sum(param_coeff[j] * param[j])
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AffineExpr {
    /// Constant term
    pub constant: i64,
    /// Coefficients for each dimension (index = dimension index)
    pub coeffs: Vec<i64>,
    /// Coefficients for parameters (index = parameter index)
    pub param_coeffs: Vec<i64>,
}

impl AffineExpr {
    /// Create a zero expression.
    pub fn zero(n_dim: usize, n_param: usize) -> Self {
        Self {
            constant: 0,
            coeffs: vec![0; n_dim],
            param_coeffs: vec![0; n_param],
        }
    }

    /// Create a constant expression.
    pub fn constant(value: i64, n_dim: usize, n_param: usize) -> Self {
        Self { constant: value, ..Self::zero(n_dim, n_param) }
    }

    /// Create an expression for a single dimension variable.
    pub fn var(dim: usize, n_dim: usize, n_param: usize) -> Self {
        let mut expr = Self::zero(n_dim, n_param);
        expr.set_coeff(dim, 1);
        expr
    }

    /// Create an expression for a parameter.
    pub fn param(param_idx: usize, n_dim: usize, n_param: usize) -> Self {
        let mut expr = Self::zero(n_dim, n_param);
        expr.set_param_coeff(param_idx, 1);
        expr
    }

    /// Create an expression from explicit coefficient vectors.
    pub fn from_parts(coeffs: Vec<i64>, param_coeffs: Vec<i64>, constant: i64) -> Self {
        Self { constant, coeffs, param_coeffs }
    }

    /// Check if this is a constant expression.
    pub fn is_constant(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0) &&
        self.param_coeffs.iter().all(|&c| c == 0)
    }

    /// Get the constant value if this is a constant expression.
    pub fn as_constant(&self) -> Option<i64> {
        if self.is_constant() {
            Some(self.constant)
        } else {
            None
        }
    }

    /// True when no set dimension appears with a non-zero coefficient.
    pub fn is_param_only(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }

    /// Highest dimension with a non-zero coefficient.
    pub fn last_dim(&self) -> Option<usize> {
        self.coeffs.iter().rposition(|&c| c != 0)
    }

    /// Get the number of dimensions.
    pub fn n_dim(&self) -> usize {
        self.coeffs.len()
    }

    /// Get the number of parameters.
    pub fn n_param(&self) -> usize {
        self.param_coeffs.len()
    }

    /// Get coefficient for a dimension.
    pub fn coeff(&self, dim: usize) -> i64 {
        self.coeffs.get(dim).copied().unwrap_or(0)
    }

    /// Get coefficient for a parameter.
    pub fn param_coeff(&self, idx: usize) -> i64 {
        self.param_coeffs.get(idx).copied().unwrap_or(0)
    }

    /// Set coefficient for a dimension.
    pub fn set_coeff(&mut self, dim: usize, value: i64) {
        if dim < self.coeffs.len() {
            self.coeffs[dim] = value;
        }
    }

    /// Set coefficient for a parameter.
    pub fn set_param_coeff(&mut self, idx: usize, value: i64) {
        if idx < self.param_coeffs.len() {
            self.param_coeffs[idx] = value;
        }
    }

    /// Evaluate the expression given concrete values.
    pub fn evaluate(&self, dim_values: &[i64], param_values: &[i64]) -> i64 {
        let dims = self.coeffs.iter().zip(dim_values).map(|(c, v)| c * v);
        let params = self.param_coeffs.iter().zip(param_values).map(|(c, v)| c * v);
        self.constant + dims.sum::<i64>() + params.sum::<i64>()
    }

    /// Scale the expression by a constant.
    pub fn scale(&self, factor: i64) -> Self {
        Self {
            constant: self.constant * factor,
            coeffs: self.coeffs.iter().map(|&c| c * factor).collect(),
            param_coeffs: self.param_coeffs.iter().map(|&c| c * factor).collect(),
        }
    }

    /// Scale the expression by a constant, or `None` on `i64` overflow.
    pub fn checked_scale(&self, factor: i64) -> Option<Self> {
        Some(Self {
            constant: self.constant.checked_mul(factor)?,
            coeffs: self.coeffs.iter().map(|&c| c.checked_mul(factor)).collect::<Option<_>>()?,
            param_coeffs: self.param_coeffs.iter().map(|&c| c.checked_mul(factor)).collect::<Option<_>>()?,
        })
    }

    /// Sum of two expressions over the same space, or `None` on `i64` overflow.
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        debug_assert_eq!(self.coeffs.len(), other.coeffs.len());
        debug_assert_eq!(self.param_coeffs.len(), other.param_coeffs.len());
        Some(Self {
            constant: self.constant.checked_add(other.constant)?,
            coeffs: self.coeffs.iter().zip(&other.coeffs)
                .map(|(&a, &b)| a.checked_add(b))
                .collect::<Option<_>>()?,
            param_coeffs: self.param_coeffs.iter().zip(&other.param_coeffs)
                .map(|(&a, &b)| a.checked_add(b))
                .collect::<Option<_>>()?,
        })
    }

    /// GCD of the variable and parameter coefficients (constant excluded).
    ///
    /// Zero when every coefficient is zero.
    pub fn coeff_gcd(&self) -> i64 {
        self.coeffs.iter()
            .chain(&self.param_coeffs)
            .fold(0i64, |g, &c| g.gcd(&c))
    }

    /// Insert `count` zero dimensions before dimension `pos`.
    pub fn insert_dims(&self, pos: usize, count: usize) -> Self {
        let mut coeffs = self.coeffs.clone();
        let pos = pos.min(coeffs.len());
        for _ in 0..count {
            coeffs.insert(pos, 0);
        }
        Self { coeffs, ..self.clone() }
    }

    /// Drop the dimensions in `pos..pos + count`.
    ///
    /// Callers are expected to have eliminated these dimensions first.
    pub fn remove_dims(&self, pos: usize, count: usize) -> Self {
        let mut coeffs = self.coeffs.clone();
        let end = (pos + count).min(coeffs.len());
        coeffs.drain(pos.min(end)..end);
        Self { coeffs, ..self.clone() }
    }

    /// Replace dimension `dim` by the expression `value`.
    pub fn substitute_dim(&self, dim: usize, value: &AffineExpr) -> Self {
        let c = self.coeff(dim);
        if c == 0 {
            return self.clone();
        }
        let mut base = self.clone();
        base.set_coeff(dim, 0);
        base + value.scale(c)
    }

    /// `substitute_dim`, or `None` on `i64` overflow.
    pub fn checked_substitute_dim(&self, dim: usize, value: &AffineExpr) -> Option<Self> {
        let c = self.coeff(dim);
        if c == 0 {
            return Some(self.clone());
        }
        let mut base = self.clone();
        base.set_coeff(dim, 0);
        base.checked_add(&value.checked_scale(c)?)
    }

    /// Convert to string with given dimension and parameter names.
    pub fn to_string_with_names(&self, dim_names: &[String], param_names: &[String]) -> String {
        let dim_terms = self.coeffs.iter().enumerate().map(|(i, &c)| {
            let name = dim_names.get(i).cloned().unwrap_or_else(|| format!("d{}", i));
            (c, name)
        });
        let param_terms = self.param_coeffs.iter().enumerate().map(|(i, &c)| {
            let name = param_names.get(i).cloned().unwrap_or_else(|| format!("p{}", i));
            (c, name)
        });

        let mut parts: Vec<String> = dim_terms
            .chain(param_terms)
            .filter(|(c, _)| *c != 0)
            .map(|(c, name)| match c {
                1 => name,
                -1 => format!("-{}", name),
                _ => format!("{}*{}", c, name),
            })
            .collect();
        if self.constant != 0 || parts.is_empty() {
            parts.push(self.constant.to_string());
        }
        parts.join(" + ").replace("+ -", "- ")
    }
}

impl Add for AffineExpr {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        assert_eq!(self.coeffs.len(), other.coeffs.len());
        assert_eq!(self.param_coeffs.len(), other.param_coeffs.len());
        Self {
            constant: self.constant + other.constant,
            coeffs: self.coeffs.iter().zip(&other.coeffs)
                .map(|(&a, &b)| a + b).collect(),
            param_coeffs: self.param_coeffs.iter().zip(&other.param_coeffs)
                .map(|(&a, &b)| a + b).collect(),
        }
    }
}

impl Sub for AffineExpr {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self + (-other)
    }
}

impl Neg for AffineExpr {
    type Output = Self;

    fn neg(self) -> Self {
        self.scale(-1)
    }
}

impl fmt::Display for AffineExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_with_names(&[], &[]))
    }
}
