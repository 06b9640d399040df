//! Entry points of the lowering pipeline: restrict, scan, lower.

use crate::codegen::ast::ScanAst;
use crate::codegen::printer::print_scan_ast;
use crate::codegen::scanner::{generate, ScanOptions};
use crate::ir::{IrBuilder, Stmt};
use crate::lower::engine::LoweringEngine;
use crate::lower::iter_vec::{IterationVector, StatementMap};
use crate::polyhedral::{restrict, IntegerSet, UnionMap, UnionSet};
use crate::utils::errors::{PolyResult, ScanError};
use crate::LoweringConfig;
use log::{debug, info, log_enabled, Level};

/// Lower the instances of `domain` ordered by `schedule` into one compound
/// IR statement, with the default configuration.
pub fn to_ir(
    builder: &mut IrBuilder,
    stmt_map: &StatementMap,
    iter_vec: &IterationVector,
    context: &IntegerSet,
    domain: &UnionSet,
    schedule: &UnionMap,
) -> PolyResult<Stmt> {
    to_ir_with_config(builder, stmt_map, iter_vec, context, domain, schedule, &LoweringConfig::default())
}

/// Lower the instances of `domain` ordered by `schedule`.
///
/// Parameters of the relation are named after the iteration vector's
/// parameters, in order. Every statement the scan references must be in
/// `stmt_map`.
pub fn to_ir_with_config(
    builder: &mut IrBuilder,
    stmt_map: &StatementMap,
    iter_vec: &IterationVector,
    context: &IntegerSet,
    domain: &UnionSet,
    schedule: &UnionMap,
    config: &LoweringConfig,
) -> PolyResult<Stmt> {
    let ast = scan(iter_vec, context, domain, schedule, config)?;

    if config.dump_scan_ast || config.verbosity >= 2 {
        info!("scan AST:\n{}", print_scan_ast(&ast));
    } else if log_enabled!(Level::Debug) {
        debug!("scan AST:\n{}", print_scan_ast(&ast));
    }

    let stmt = LoweringEngine::new(builder, stmt_map, iter_vec).lower(&ast)?;
    Ok(stmt)
}

/// Restrict `schedule` to `domain` and generate its scan AST.
///
/// Generated loop names never clash with iteration vector names.
pub fn scan(
    iter_vec: &IterationVector,
    context: &IntegerSet,
    domain: &UnionSet,
    schedule: &UnionMap,
    config: &LoweringConfig,
) -> Result<ScanAst, ScanError> {
    let relation = restrict(context, schedule, domain)?;
    debug!(
        "restricted relation: {} statements, {} time dimensions, {} parameters",
        relation.statements.len(), relation.n_time, relation.n_param
    );

    let options = ScanOptions {
        merge_blocks: config.merge_blocks,
        loop_prefix: config.loop_prefix.clone(),
    };
    generate(&relation, &iter_vec.param_names(), &iter_vec.names(), &options)
}
