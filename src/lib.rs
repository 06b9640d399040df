//! # polylower - lowering of scheduled polyhedral regions into IR
//!
//! Takes an iteration vector, a map from statement names to IR statements,
//! a parameter context, per-statement iteration domains and schedules, and
//! produces one structured IR statement that executes every statement
//! instance in schedule order.
//!
//! ## Architecture
//!
//! ```text
//! domain + schedule → restrict → scan AST generator → scan AST → lowering engine → IR
//! ```
//!
//! - `polyhedral`: affine expressions, constraints, sets, maps, restriction
//! - `codegen`: scan AST, its visitor framework, debug printer and generator
//! - `lower`: iteration vector, lowering engine, driver
//! - `ir`: the target IR, its builder, substitution, evaluator and printer
//! - `scop`: JSON region descriptions used by the command line tool
//!
//! ## Example
//!
//! ```rust,ignore
//! use polylower::prelude::*;
//!
//! let mut builder = IrBuilder::new();
//! let iter_vec = IterationVector::with_fresh_variables(&mut builder, &["i"], &["N"])?;
//! let stmt = polylower::to_ir(&mut builder, &stmt_map, &iter_vec, &context, &domain, &schedule)?;
//! println!("{}", stmt);
//! ```

#![warn(clippy::all)]

pub mod polyhedral;
pub mod codegen;
pub mod ir;
pub mod lower;
pub mod scop;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::codegen::{print_scan_ast, ScanAst, ScanExpr, ScanStmt, ScanVisitor};
    pub use crate::ir::{Expr, Interpreter, IrBuilder, Stmt, Type, Variable};
    pub use crate::lower::{IterationVector, LoweringEngine, StatementMap};
    pub use crate::polyhedral::{
        AffineExpr, AffineMap, Constraint, IntegerSet, Space, UnionMap, UnionSet,
    };
    pub use crate::scop::{Scop, ScopDescription};
    pub use crate::utils::errors::*;
    pub use crate::LoweringConfig;
}

pub use lower::{to_ir, to_ir_with_config};

use anyhow::{Context, Result};

/// Configuration of a lowering pass.
#[derive(Debug, Clone)]
pub struct LoweringConfig {
    /// Wrap consecutive statement instances in one block
    pub merge_blocks: bool,
    /// Prefix of generated loop variable names
    pub loop_prefix: String,
    /// Log the scan AST at info level before lowering it
    pub dump_scan_ast: bool,
    /// Verbosity level (0-3)
    pub verbosity: u8,
}

impl Default for LoweringConfig {
    fn default() -> Self {
        Self {
            merge_blocks: true,
            loop_prefix: "c".to_string(),
            dump_scan_ast: false,
            verbosity: 0,
        }
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Scan AST and IR of one region.
#[derive(Debug, Clone)]
pub struct LoweredRegion {
    pub scan: codegen::ScanAst,
    pub ir: ir::Stmt,
}

/// Full pipeline: read a JSON region description, scan it and lower it.
pub fn lower_description(json: &str, config: &LoweringConfig) -> Result<LoweredRegion> {
    let description = scop::ScopDescription::from_json(json)
        .context("Failed to parse SCoP description")?;
    let mut builder = ir::IrBuilder::new();
    let region = description.build(&mut builder)
        .context("Invalid SCoP description")?;
    let scan = region.scan(config)
        .context("Scan AST generation failed")?;
    let ir = lower::lower_scan(&mut builder, &region.stmt_map, &region.iter_vec, &scan)
        .context("Lowering the scan AST failed")?;
    Ok(LoweredRegion { scan, ir })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_lower_description_reports_context() {
        let err = lower_description("not json", &LoweringConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse SCoP description"));
    }
}
