//! SCoP description files.
//!
//! A description names the iterators and parameters of one region and
//! gives a parameter context plus, per statement, an iteration domain and a
//! schedule. Constraint rows use the OpenScop layout
//! `[flag, iterator coeffs.., parameter coeffs.., constant]`, where flag 0
//! marks an equality `= 0` and flag 1 an inequality `>= 0`. Schedule rows
//! are `[iterator coeffs.., parameter coeffs.., constant]`, one per output
//! dimension.
//!
//! ```json
//! {
//!   "iterators": ["i"],
//!   "parameters": ["N"],
//!   "context": [[1, 1, -1]],
//!   "statements": [
//!     { "name": "S0", "domain": [[1, 1, 0, 0], [1, -1, 1, -1]], "schedule": [[1, 0, 0]] }
//!   ]
//! }
//! ```

use crate::codegen::ast::ScanAst;
use crate::ir::{IrBuilder, Stmt, Type};
use crate::lower::{self, IterationVector, StatementMap};
use crate::polyhedral::{AffineExpr, AffineMap, Constraint, IntegerSet, Space, UnionMap, UnionSet};
use crate::utils::errors::{LowerError, PolyResult, ScanError};
use crate::LoweringConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScopError {
    #[error("malformed SCoP description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{what}, row {row}: {found} columns, expected {expected}")]
    RowWidth { what: String, row: usize, found: usize, expected: usize },

    #[error("{what}, row {row}: constraint flag {flag}, expected 0 or 1")]
    BadFlag { what: String, row: usize, flag: i64 },

    #[error("duplicate statement '{0}'")]
    DuplicateStatement(String),

    #[error(transparent)]
    Names(#[from] LowerError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopDescription {
    #[serde(default)]
    pub iterators: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Constraint rows over the parameters only
    #[serde(default)]
    pub context: Vec<Vec<i64>>,
    pub statements: Vec<StatementDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementDescription {
    pub name: String,
    pub domain: Vec<Vec<i64>>,
    pub schedule: Vec<Vec<i64>>,
}

/// Everything a lowering pass needs for one region.
#[derive(Debug, Clone)]
pub struct Scop {
    pub iter_vec: IterationVector,
    pub stmt_map: StatementMap,
    pub context: IntegerSet,
    pub domain: UnionSet,
    pub schedule: UnionMap,
}

impl ScopDescription {
    pub fn from_json(text: &str) -> Result<Self, ScopError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ScopError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build the iteration vector, statement map and polyhedral inputs.
    ///
    /// Iterators and parameters get fresh `int<4>` variables from `builder`.
    /// Statement `S` maps to the external call `S(i, j, ..)` over all
    /// iterators.
    pub fn build(&self, builder: &mut IrBuilder) -> Result<Scop, ScopError> {
        let n_iter = self.iterators.len();
        let n_param = self.parameters.len();
        let iterators: Vec<&str> = self.iterators.iter().map(String::as_str).collect();
        let parameters: Vec<&str> = self.parameters.iter().map(String::as_str).collect();
        let iter_vec = IterationVector::with_fresh_variables(builder, &iterators, &parameters)?;

        let mut context = IntegerSet::from_space(Space::params(n_param).with_param_names(self.parameters.clone()));
        for (row, values) in self.context.iter().enumerate() {
            context.add_constraint(constraint_row(values, 0, n_param, "context", row)?);
        }

        let space = Space::set(n_iter, n_param)
            .with_dim_names(self.iterators.clone())
            .with_param_names(self.parameters.clone());
        let args: Vec<_> = iter_vec.iterators().iter().map(|e| e.expr.clone()).collect();

        let mut stmt_map = StatementMap::new();
        let mut domain = UnionSet::new();
        let mut schedule = UnionMap::new();
        for stmt in &self.statements {
            if stmt_map.contains_key(&stmt.name) {
                return Err(ScopError::DuplicateStatement(stmt.name.clone()));
            }
            let what = format!("statement {} domain", stmt.name);
            let constraints = stmt.domain.iter().enumerate()
                .map(|(row, values)| constraint_row(values, n_iter, n_param, &what, row))
                .collect::<Result<Vec<_>, _>>()?;
            domain.insert(stmt.name.clone(), IntegerSet::from_constraints(space.clone(), constraints));

            let what = format!("statement {} schedule", stmt.name);
            let outputs = stmt.schedule.iter().enumerate()
                .map(|(row, values)| affine_row(values, n_iter, n_param, &what, row))
                .collect::<Result<Vec<_>, _>>()?;
            schedule.insert(stmt.name.clone(), AffineMap::from_outputs(n_iter, n_param, outputs));

            let call = builder.call_external(&stmt.name, vec![Type::int4(); n_iter], Type::Unit, args.clone());
            stmt_map.insert(stmt.name.clone(), builder.expr_stmt(call));
        }

        Ok(Scop { iter_vec, stmt_map, context, domain, schedule })
    }
}

impl Scop {
    /// Generate the scan AST of this region.
    pub fn scan(&self, config: &LoweringConfig) -> Result<ScanAst, ScanError> {
        lower::scan(&self.iter_vec, &self.context, &self.domain, &self.schedule, config)
    }

    /// Lower this region into one compound IR statement.
    pub fn lower(&self, builder: &mut IrBuilder, config: &LoweringConfig) -> PolyResult<Stmt> {
        lower::to_ir_with_config(
            builder,
            &self.stmt_map,
            &self.iter_vec,
            &self.context,
            &self.domain,
            &self.schedule,
            config,
        )
    }
}

fn check_width(values: &[i64], expected: usize, what: &str, row: usize) -> Result<(), ScopError> {
    if values.len() != expected {
        return Err(ScopError::RowWidth { what: what.to_string(), row, found: values.len(), expected });
    }
    Ok(())
}

fn affine_row(values: &[i64], n_dim: usize, n_param: usize, what: &str, row: usize) -> Result<AffineExpr, ScopError> {
    check_width(values, n_dim + n_param + 1, what, row)?;
    Ok(AffineExpr::from_parts(
        values[..n_dim].to_vec(),
        values[n_dim..n_dim + n_param].to_vec(),
        values[n_dim + n_param],
    ))
}

fn constraint_row(values: &[i64], n_dim: usize, n_param: usize, what: &str, row: usize) -> Result<Constraint, ScopError> {
    check_width(values, n_dim + n_param + 2, what, row)?;
    let expr = affine_row(&values[1..], n_dim, n_param, what, row)?;
    match values[0] {
        0 => Ok(Constraint::eq_zero(expr)),
        1 => Ok(Constraint::ge_zero(expr)),
        flag => Err(ScopError::BadFlag { what: what.to_string(), row, flag }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Interpreter;

    const LINE: &str = r#"{
        "iterators": ["i"],
        "parameters": ["N"],
        "context": [[1, 1, -1]],
        "statements": [
            { "name": "S0", "domain": [[1, 1, 0, 0], [1, -1, 1, -1]], "schedule": [[1, 0, 0]] }
        ]
    }"#;

    #[test]
    fn test_build_from_json() {
        let desc = ScopDescription::from_json(LINE).unwrap();
        let mut b = IrBuilder::new();
        let scop = desc.build(&mut b).unwrap();
        assert_eq!(scop.iter_vec.size(), 3);
        assert_eq!(scop.domain.len(), 1);
        assert!(scop.stmt_map.contains_key("S0"));
        assert_eq!(scop.context.constraints.len(), 1);

        let ir = scop.lower(&mut b, &LoweringConfig::default()).unwrap();
        let n = scop.iter_vec.params()[0].expr.as_var().cloned().unwrap();
        let mut interp = Interpreter::new().with_binding(&n, 2);
        interp.exec(&ir).unwrap();
        let trace: Vec<String> = interp.trace().iter().map(|t| t.to_string()).collect();
        assert_eq!(trace, vec!["S0(0)", "S0(1)"]);
    }

    #[test]
    fn test_json_round_trip() {
        let desc = ScopDescription::from_json(LINE).unwrap();
        let again = ScopDescription::from_json(&desc.to_json().unwrap()).unwrap();
        assert_eq!(desc, again);
    }

    #[test]
    fn test_rejects_bad_rows() {
        let mut b = IrBuilder::new();
        let wide = LINE.replace("[[1, 0, 0]]", "[[1, 0, 0, 0]]");
        let err = ScopDescription::from_json(&wide).unwrap().build(&mut b).unwrap_err();
        assert!(matches!(err, ScopError::RowWidth { expected: 3, found: 4, .. }));

        let flag = LINE.replace("[1, 1, 0, 0]", "[2, 1, 0, 0]");
        let err = ScopDescription::from_json(&flag).unwrap().build(&mut b).unwrap_err();
        assert!(matches!(err, ScopError::BadFlag { flag: 2, .. }));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(ScopDescription::from_json("{ \"iterators\": 3 }"), Err(ScopError::Json(_))));
    }
}
