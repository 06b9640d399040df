//! Utility modules shared across the pipeline:
//! - Error types
//! - Exact rational matrices
//! - Pretty-printing helpers

pub mod errors;
pub mod matrix;
pub mod pretty;

// Re-exports
pub use errors::*;
pub use matrix::RationalMatrix;
pub use self::pretty::{CodeFormatter, PrettyPrint};
