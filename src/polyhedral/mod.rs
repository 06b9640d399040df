//! Integer-set algebra used to describe what gets scanned.
//!
//! This module provides the pieces the lowering pipeline consumes:
//! - Affine expressions and constraints over iterators and parameters
//! - Integer sets (iteration domains) and affine maps (schedules)
//! - Per-statement unions of both
//! - Schedule restriction and Fourier-Motzkin projection

pub mod space;
pub mod expr;
pub mod constraint;
pub mod set;
pub mod map;
pub mod operations;

pub use space::Space;
pub use expr::AffineExpr;
pub use constraint::{Constraint, ConstraintKind, ConstraintSystem};
pub use set::{IntegerSet, UnionSet};
pub use map::{AffineMap, UnionMap};
pub use operations::{restrict, ScheduledRelation, ScheduledStatement};
