//! Lowering of scheduled polyhedral regions into IR.
//!
//! - `iter_vec`: iteration vector and statement map given by the caller
//! - `engine`: the scan AST visitor that builds IR
//! - `driver`: restriction, scanning and lowering in one call

pub mod iter_vec;
pub mod engine;
pub mod driver;

pub use iter_vec::{Element, ElementKind, IterationVector, StatementMap};
pub use engine::{lower_scan, Bindings, LoweringEngine};
pub use driver::{scan, to_ir, to_ir_with_config};
