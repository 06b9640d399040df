//! Target intermediate representation.
//!
//! This module defines the structured statement IR that scan ASTs are
//! lowered into:
//! - `ast`: types, expressions and statements
//! - `builder`: node construction with fresh variable identities
//! - `substitute`: structural variable replacement
//! - `interp`: a reference evaluator
//! - `pretty`: C-like rendering

pub mod ast;
pub mod builder;
pub mod substitute;
pub mod interp;
pub mod pretty;

pub use ast::*;
pub use builder::IrBuilder;
pub use substitute::{substitute, SubEnv, SubVars};
pub use interp::{Interpreter, InterpError, TraceEntry, Value};
