//! Scan AST generation.
//!
//! `scanner` turns a scheduled relation into a scan AST, a C-like loop
//! nest whose leaves reference user statements. `visitor` is the traversal
//! framework shared by the debug `printer` and the IR lowering.

pub mod ast;
pub mod visitor;
pub mod printer;
pub mod scanner;

pub use ast::{ScanAst, ScanExpr, ScanStmt};
pub use visitor::ScanVisitor;
pub use printer::print_scan_ast;
pub use scanner::{generate, ScanOptions};
