//! Error types for the lowering pipeline.
//!
//! Every error is fatal for the lowering pass that raised it: there is no
//! partial or best-effort result for a region that failed to lower.

use thiserror::Error;
use std::fmt;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum PolyLowerError {
    /// Scan AST generation failed
    #[error("Scan generation error: {0}")]
    Scan(#[from] ScanError),

    /// Lowering the scan AST into IR failed
    #[error("Lowering error: {0}")]
    Lower(#[from] LowerError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error raised while building the scan AST from a scheduled relation.
#[derive(Error, Debug, Clone)]
pub struct ScanError {
    /// The error message
    pub message: String,
    /// The kind of generation error
    pub kind: ScanErrorKind,
}

impl ScanError {
    pub fn new(kind: ScanErrorKind, message: impl Into<String>) -> Self {
        Self { message: message.into(), kind }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.message, self.kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanErrorKind {
    /// No statement instance survives restriction
    EmptyRelation,
    /// Domain, schedule and context spaces disagree
    DimensionMismatch,
    /// Iterators cannot be recovered from the schedule, or the schedule
    /// mixes scalar and loop dimensions at one level
    UnsupportedSchedule,
    /// A scanned dimension lacks a lower or an upper bound
    Unbounded,
    /// Constraint arithmetic exceeded the range of `i64`
    Overflow,
}

/// Error raised while lowering a scan AST into IR.
///
/// These signal a contract breach between the scan generator and the
/// lowering engine; messages are aimed at whoever debugs that contract.
#[derive(Error, Debug, Clone)]
pub struct LowerError {
    /// The error message
    pub message: String,
    /// The kind of lowering error
    pub kind: LowerErrorKind,
}

impl LowerError {
    pub fn new(kind: LowerErrorKind, message: impl Into<String>) -> Self {
        Self { message: message.into(), kind }
    }
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.message, self.kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowerErrorKind {
    /// A scan AST name has no binding
    UnboundName,
    /// A statement reference has no entry in the statement map
    UnknownStatement,
    /// A loop or assignment tries to bind a name that is already bound
    AlreadyBound,
    /// A reduction has the wrong number of operands for its operator
    OperandCount,
    /// A substitution source variable has reference type
    ReferenceSubstitution,
    /// More substitutions than iteration vector iterators, or an iterator
    /// that is not a plain variable
    MissingIterator,
    /// An expression visit produced no value
    MissingValue,
}

/// Result type using PolyLowerError.
pub type PolyResult<T> = Result<T, PolyLowerError>;
