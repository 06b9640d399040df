//! Scan AST to IR lowering.
//!
//! `LoweringEngine` is a `ScanVisitor` whose expression visits yield IR
//! expressions and whose statement visits append IR statements to the list
//! on top of its statement stack. Every construct with a body (loop, guard,
//! block, statement reference) pushes a list on entry and pops it into a
//! compound statement on exit, so a statement visit never changes the
//! stack depth.

use crate::codegen::ast::*;
use crate::codegen::visitor::{walk_stmt, ScanVisitor};
use crate::ir::{Expr, IrBuilder, Stmt, SubEnv, SubVars, Type};
use crate::lower::iter_vec::{IterationVector, StatementMap};
use crate::utils::errors::{LowerError, LowerErrorKind};
use log::trace;
use std::collections::HashMap;

/// Scan AST names to the IR expressions they denote.
///
/// Binding a name shadows its previous binding until it is unbound.
#[derive(Debug, Default)]
pub struct Bindings {
    scopes: HashMap<String, Vec<Expr>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, expr: Expr) {
        self.scopes.entry(name.into()).or_default().push(expr);
    }

    /// Drop the innermost binding of `name`, restoring the one it shadowed.
    pub fn unbind(&mut self, name: &str) -> Option<Expr> {
        let stack = self.scopes.get_mut(name)?;
        let expr = stack.pop();
        if stack.is_empty() {
            self.scopes.remove(name);
        }
        expr
    }

    pub fn lookup(&self, name: &str) -> Option<&Expr> {
        self.scopes.get(name).and_then(|stack| stack.last())
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

/// State of one lowering pass.
pub struct LoweringEngine<'a> {
    builder: &'a mut IrBuilder,
    stmt_map: &'a StatementMap,
    iter_vec: &'a IterationVector,
    bindings: Bindings,
    /// In-progress statement lists, innermost last
    stmt_stack: Vec<Vec<Stmt>>,
    /// Names bound by assignments, per chain being visited
    chain_locals: Vec<Vec<String>>,
}

impl<'a> LoweringEngine<'a> {
    /// Create an engine with every iteration vector element bound to its
    /// expression and one empty statement list.
    pub fn new(builder: &'a mut IrBuilder, stmt_map: &'a StatementMap, iter_vec: &'a IterationVector) -> Self {
        let mut bindings = Bindings::new();
        for element in iter_vec.iter() {
            bindings.bind(element.name.clone(), element.expr.clone());
        }
        Self {
            builder,
            stmt_map,
            iter_vec,
            bindings,
            stmt_stack: vec![Vec::new()],
            chain_locals: Vec::new(),
        }
    }

    /// Lower a whole scan and return it as one compound statement.
    pub fn lower(mut self, ast: &ScanAst) -> Result<Stmt, LowerError> {
        self.visit_chain(&ast.chain)?;
        Ok(self.finish())
    }

    /// Wrap the top-level list into a compound statement.
    pub fn finish(mut self) -> Stmt {
        debug_assert_eq!(self.stmt_stack.len(), 1, "unbalanced statement stack");
        let stmts = self.stmt_stack.pop().unwrap_or_default();
        self.builder.compound(stmts)
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Current statement stack depth.
    pub fn depth(&self) -> usize {
        self.stmt_stack.len()
    }

    /// Lower an expression that must produce a value.
    pub fn lower_expr(&mut self, expr: &ScanExpr) -> Result<Expr, LowerError> {
        self.visit_expr(expr)?.ok_or_else(|| {
            LowerError::new(LowerErrorKind::MissingValue, format!("expression '{}' produced no value", expr))
        })
    }

    fn lower_equation(&mut self, eq: &Equation) -> Result<Expr, LowerError> {
        self.visit_equation(eq)?.ok_or_else(|| {
            LowerError::new(LowerErrorKind::MissingValue, "condition produced no value")
        })
    }

    fn append(&mut self, stmt: Stmt) {
        if let Some(top) = self.stmt_stack.last_mut() {
            top.push(stmt);
        }
    }

    fn push_list(&mut self) {
        self.stmt_stack.push(Vec::new());
    }

    fn pop_list(&mut self) -> Vec<Stmt> {
        self.stmt_stack.pop().unwrap_or_default()
    }

    /// Lower `body` into a fresh list and return it as a compound statement.
    fn lower_body(&mut self, body: &[ScanStmt]) -> Result<Stmt, LowerError> {
        self.push_list();
        let result = self.visit_chain(body);
        let stmts = self.pop_list();
        result?;
        Ok(self.builder.compound(stmts))
    }

    fn check_unbound(&self, name: &str) -> Result<(), LowerError> {
        if self.bindings.is_bound(name) {
            return Err(LowerError::new(
                LowerErrorKind::AlreadyBound,
                format!("name '{}' is already bound", name),
            ));
        }
        Ok(())
    }

    /// Substitution from each iterator to the lowered value it takes.
    fn substitution_env(&mut self, substitutions: &[Assignment]) -> Result<SubEnv, LowerError> {
        let mut env = SubEnv::new();
        for (k, sub) in substitutions.iter().enumerate() {
            let source = self.iter_vec.iterator_var(k).cloned().ok_or_else(|| {
                LowerError::new(
                    LowerErrorKind::MissingIterator,
                    format!("substitution {} has no iterator variable in the iteration vector", k),
                )
            })?;
            if source.ty.is_ref() {
                return Err(LowerError::new(
                    LowerErrorKind::ReferenceSubstitution,
                    format!("iterator {} has reference type {}", source.id, source.ty),
                ));
            }
            let target = self.lower_expr(&sub.rhs)?;
            env.insert(source.id, target);
        }
        Ok(env)
    }
}

impl ScanVisitor for LoweringEngine<'_> {
    type Value = Option<Expr>;
    type Error = LowerError;

    fn visit_chain(&mut self, chain: &[ScanStmt]) -> Result<(), LowerError> {
        self.chain_locals.push(Vec::new());
        let mut result = Ok(());
        for stmt in chain {
            result = self.visit_stmt(stmt);
            if result.is_err() {
                break;
            }
        }
        for name in self.chain_locals.pop().unwrap_or_default() {
            self.bindings.unbind(&name);
        }
        result
    }

    fn visit_stmt(&mut self, stmt: &ScanStmt) -> Result<(), LowerError> {
        let depth = self.stmt_stack.len();
        walk_stmt(self, stmt)?;
        debug_assert_eq!(self.stmt_stack.len(), depth, "statement stack depth changed by {:?}", stmt);
        Ok(())
    }

    fn visit_assignment(&mut self, assignment: &Assignment) -> Result<(), LowerError> {
        let value = self.lower_expr(&assignment.rhs)?;
        let Some(name) = &assignment.lhs else {
            let stmt = self.builder.expr_stmt(value);
            self.append(stmt);
            return Ok(());
        };
        self.check_unbound(name)?;
        let var = self.builder.variable(Type::int4());
        trace!("binding '{}' to {}", name, var.id);
        let decl = self.builder.decl(var.clone(), value);
        self.append(decl);
        self.bindings.bind(name.clone(), Expr::Var(var));
        if let Some(locals) = self.chain_locals.last_mut() {
            locals.push(name.clone());
        }
        Ok(())
    }

    fn visit_block(&mut self, body: &[ScanStmt]) -> Result<(), LowerError> {
        let block = self.lower_body(body)?;
        self.append(block);
        Ok(())
    }

    fn visit_user(&mut self, user: &UserStmt) -> Result<(), LowerError> {
        let stmt = self.stmt_map.get(&user.statement).cloned().ok_or_else(|| {
            LowerError::new(
                LowerErrorKind::UnknownStatement,
                format!("statement '{}' is not in the statement map", user.statement),
            )
        })?;
        let env = self.substitution_env(&user.substitutions)?;
        self.append(stmt.sub_vars(&env));
        Ok(())
    }

    fn visit_for(&mut self, for_loop: &ForLoop) -> Result<(), LowerError> {
        let name = &for_loop.iterator;
        self.check_unbound(name)?;
        let var = self.builder.variable(Type::int4());
        trace!("loop '{}' uses {}", name, var.id);
        self.bindings.bind(name.clone(), Expr::Var(var.clone()));

        let start = self.lower_expr(&for_loop.lb)?;
        let ub = self.lower_expr(&for_loop.ub)?;
        // Inclusive bound in the scan, exclusive in the IR.
        let end = self.builder.add(ub, self.builder.int_lit(1));
        let step = self.builder.int_lit(for_loop.stride);
        let body = self.lower_body(&for_loop.body)?;

        let stmt = self.builder.for_stmt(var, start, end, step, body);
        self.bindings.unbind(name);
        self.append(stmt);
        Ok(())
    }

    fn visit_guard(&mut self, guard: &Guard) -> Result<(), LowerError> {
        let (first, rest) = guard.conditions.split_first().ok_or_else(|| {
            LowerError::new(LowerErrorKind::OperandCount, "guard without conditions")
        })?;
        let mut cond = self.lower_equation(first)?;
        for next in rest {
            let next = self.lower_equation(next)?;
            cond = self.builder.logic_and(cond, self.builder.closure(next));
        }

        let body = self.lower_body(&guard.body)?;
        let stmt = self.builder.if_stmt(cond, body, None);
        self.append(stmt);
        Ok(())
    }

    fn visit_name(&mut self, name: &str) -> Result<Option<Expr>, LowerError> {
        let expr = self.bindings.lookup(name).cloned().ok_or_else(|| {
            LowerError::new(LowerErrorKind::UnboundName, format!("name '{}' is not bound", name))
        })?;
        Ok(Some(self.builder.deref(expr)))
    }

    fn visit_term(&mut self, coeff: i64, var: Option<&ScanExpr>) -> Result<Option<Expr>, LowerError> {
        let lit = self.builder.int_lit(coeff);
        let Some(var) = var else { return Ok(Some(lit)) };
        let value = self.lower_expr(var)?;
        Ok(Some(match coeff {
            1 => value,
            _ => self.builder.mul(lit, value),
        }))
    }

    fn visit_binary(&mut self, op: BinaryOp, lhs: &ScanExpr, rhs: i64) -> Result<Option<Expr>, LowerError> {
        let lhs = self.lower_expr(lhs)?;
        let rhs = self.builder.int_lit(rhs);
        let b = &*self.builder;
        Ok(Some(match op {
            BinaryOp::FloorDiv => b.floor_div(lhs, rhs),
            BinaryOp::CeilDiv => b.ceil_div(lhs, rhs),
            BinaryOp::Div => b.div(lhs, rhs),
            BinaryOp::Mod => b.modulo(lhs, rhs),
        }))
    }

    fn visit_reduction(&mut self, op: ReductionOp, elts: &[ScanExpr]) -> Result<Option<Expr>, LowerError> {
        let mut operands = Vec::with_capacity(elts.len());
        for elt in elts {
            operands.push(self.lower_expr(elt)?);
        }
        let b = &*self.builder;
        let combined = match op {
            ReductionOp::Min => match <[Expr; 2]>::try_from(operands) {
                Ok([lhs, rhs]) => Some(b.min(lhs, rhs)),
                Err(operands) => {
                    return Err(LowerError::new(
                        LowerErrorKind::OperandCount,
                        format!("min over {} operands, expected 2", operands.len()),
                    ))
                }
            },
            ReductionOp::Sum => operands.into_iter().reduce(|acc, e| b.add(acc, e)),
            ReductionOp::Max => operands.into_iter().reduce(|acc, e| b.max(acc, e)),
        };
        combined.map(Some).ok_or_else(|| {
            LowerError::new(LowerErrorKind::OperandCount, format!("{:?} without operands", op))
        })
    }

    fn visit_equation(&mut self, eq: &Equation) -> Result<Option<Expr>, LowerError> {
        let lhs = self.lower_expr(&eq.lhs)?;
        let rhs = self.lower_expr(&eq.rhs)?;
        let b = &*self.builder;
        Ok(Some(match eq.sign {
            Sign::Le => b.le(lhs, rhs),
            Sign::Eq => b.eq(lhs, rhs),
            Sign::Ge => b.ge(lhs, rhs),
        }))
    }
}

/// Lower `ast` with a fresh engine.
pub fn lower_scan(
    builder: &mut IrBuilder,
    stmt_map: &StatementMap,
    iter_vec: &IterationVector,
    ast: &ScanAst,
) -> Result<Stmt, LowerError> {
    LoweringEngine::new(builder, stmt_map, iter_vec).lower(ast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Interpreter, Primitive, Value};

    struct Fixture {
        builder: IrBuilder,
        stmt_map: StatementMap,
        iter_vec: IterationVector,
    }

    /// Iterator `i`, parameters `N`, `a`, `b`, and `S0(i)` in the map.
    fn fixture() -> Fixture {
        let mut builder = IrBuilder::new();
        let iter_vec = IterationVector::with_fresh_variables(&mut builder, &["i"], &["N", "a", "b"]).unwrap();
        let i = iter_vec.iterators()[0].expr.clone();
        let call = builder.call_external("S0", vec![Type::int4()], Type::Unit, vec![i]);
        let mut stmt_map = StatementMap::new();
        stmt_map.insert("S0".to_string(), builder.expr_stmt(call));
        Fixture { builder, stmt_map, iter_vec }
    }

    fn user(args: Vec<ScanExpr>) -> ScanStmt {
        ScanStmt::User(UserStmt {
            statement: "S0".into(),
            substitutions: args.into_iter().map(|rhs| Assignment { lhs: None, rhs }).collect(),
        })
    }

    fn simple_loop(iterator: &str, body: Vec<ScanStmt>) -> ScanStmt {
        ScanStmt::For(ForLoop {
            iterator: iterator.into(),
            lb: ScanExpr::constant(0),
            ub: ScanExpr::sum(vec![ScanExpr::name("N"), ScanExpr::constant(-1)]),
            stride: 1,
            body,
        })
    }

    fn var_of(iv: &IterationVector, name: &str) -> Expr {
        iv.get(name).map(|e| e.expr.clone()).unwrap()
    }

    #[test]
    fn test_unit_coefficient_is_elided() {
        let mut f = fixture();
        let n = var_of(&f.iter_vec, "N");
        let mut engine = LoweringEngine::new(&mut f.builder, &f.stmt_map, &f.iter_vec);

        let one = engine.lower_expr(&ScanExpr::term(1, "N")).unwrap();
        assert_eq!(one, n);

        let two = engine.lower_expr(&ScanExpr::term(2, "N")).unwrap();
        let call = two.as_call().unwrap();
        assert!(two.is_primitive_call(Primitive::IntMul));
        assert_eq!(call.args[0].as_literal().and_then(|l| l.as_int()), Some(2));
        assert_eq!(call.args[1], n);
    }

    #[test]
    fn test_unbound_name_fails() {
        let mut f = fixture();
        let mut engine = LoweringEngine::new(&mut f.builder, &f.stmt_map, &f.iter_vec);
        let err = engine.lower_expr(&ScanExpr::name("M")).unwrap_err();
        assert_eq!(err.kind, LowerErrorKind::UnboundName);
    }

    #[test]
    fn test_reference_binding_is_dereferenced() {
        let mut f = fixture();
        let r = f.builder.variable(Type::Ref(Box::new(Type::int4())));
        f.iter_vec.add_param("M", Expr::Var(r.clone())).unwrap();
        let mut engine = LoweringEngine::new(&mut f.builder, &f.stmt_map, &f.iter_vec);
        let e = engine.lower_expr(&ScanExpr::name("M")).unwrap();
        assert!(e.is_primitive_call(Primitive::Deref));
        assert_eq!(e.ty(), Type::int4());
    }

    #[test]
    fn test_single_operand_reduction_collapses() {
        let mut f = fixture();
        let mut engine = LoweringEngine::new(&mut f.builder, &f.stmt_map, &f.iter_vec);
        let single = engine.lower_expr(&ScanExpr::max(vec![ScanExpr::term(3, "N")])).unwrap();
        let direct = engine.lower_expr(&ScanExpr::term(3, "N")).unwrap();
        assert_eq!(single, direct);
    }

    #[test]
    fn test_min_selects_smaller_operand() {
        let mut f = fixture();
        let a = f.iter_vec.get("a").and_then(|e| e.expr.as_var()).cloned().unwrap();
        let b = f.iter_vec.get("b").and_then(|e| e.expr.as_var()).cloned().unwrap();
        let mut engine = LoweringEngine::new(&mut f.builder, &f.stmt_map, &f.iter_vec);
        let min = engine.lower_expr(&ScanExpr::min(ScanExpr::name("a"), ScanExpr::name("b"))).unwrap();
        assert!(min.is_primitive_call(Primitive::Ite));

        let mut interp = Interpreter::new().with_binding(&a, 3).with_binding(&b, 7);
        assert_eq!(interp.eval(&min), Ok(Value::Int(3)));
        let mut interp = Interpreter::new().with_binding(&a, 7).with_binding(&b, 3);
        assert_eq!(interp.eval(&min), Ok(Value::Int(3)));
    }

    #[test]
    fn test_min_requires_two_operands() {
        let mut f = fixture();
        let mut engine = LoweringEngine::new(&mut f.builder, &f.stmt_map, &f.iter_vec);
        let three = ScanExpr::reduction(
            ReductionOp::Min,
            vec![ScanExpr::name("a"), ScanExpr::name("b"), ScanExpr::name("N")],
        );
        assert_eq!(engine.lower_expr(&three).unwrap_err().kind, LowerErrorKind::OperandCount);
    }

    #[test]
    fn test_sum_and_max_fold_left() {
        let mut f = fixture();
        let mut engine = LoweringEngine::new(&mut f.builder, &f.stmt_map, &f.iter_vec);
        let sum = engine
            .lower_expr(&ScanExpr::sum(vec![ScanExpr::name("a"), ScanExpr::name("b"), ScanExpr::constant(1)]))
            .unwrap();
        let outer = sum.as_call().unwrap();
        assert!(sum.is_primitive_call(Primitive::IntAdd));
        assert!(outer.args[0].is_primitive_call(Primitive::IntAdd));

        let max = engine
            .lower_expr(&ScanExpr::max(vec![ScanExpr::name("a"), ScanExpr::name("b"), ScanExpr::name("N")]))
            .unwrap();
        let outer = max.as_call().unwrap();
        assert_eq!(outer.callee.name(), "max");
        assert_eq!(outer.args[0].as_call().map(|c| c.callee.name()), Some("max"));
    }

    #[test]
    fn test_division_operators() {
        let mut f = fixture();
        let mut engine = LoweringEngine::new(&mut f.builder, &f.stmt_map, &f.iter_vec);
        fn lower(engine: &mut LoweringEngine<'_>, op: BinaryOp) -> Expr {
            engine.lower_expr(&ScanExpr::binary(op, ScanExpr::name("N"), 4)).unwrap()
        }
        assert_eq!(lower(&mut engine, BinaryOp::FloorDiv).as_call().map(|c| c.callee.name()), Some("floor"));
        assert_eq!(lower(&mut engine, BinaryOp::CeilDiv).as_call().map(|c| c.callee.name()), Some("ceil"));
        assert!(lower(&mut engine, BinaryOp::Div).is_primitive_call(Primitive::IntDiv));
        assert!(lower(&mut engine, BinaryOp::Mod).is_primitive_call(Primitive::IntMod));
    }

    #[test]
    fn test_guard_folds_conditions_left() {
        let mut f = fixture();
        let guard = ScanStmt::Guard(Guard {
            conditions: vec![
                Equation::new(ScanExpr::name("a"), Sign::Ge, ScanExpr::constant(0)),
                Equation::new(ScanExpr::name("b"), Sign::Le, ScanExpr::name("N")),
                Equation::new(ScanExpr::name("a"), Sign::Eq, ScanExpr::name("b")),
            ],
            body: vec![user(vec![ScanExpr::name("a")])],
        });
        let stmt = lower_scan(&mut f.builder, &f.stmt_map, &f.iter_vec, &ScanAst::new(vec![guard])).unwrap();

        let Stmt::If { cond, then_body, else_body } = &stmt.as_compound().unwrap()[0] else {
            panic!("expected an if statement");
        };
        assert!(else_body.is_none());
        assert!(cond.is_primitive_call(Primitive::LogicAnd));
        let outer = cond.as_call().unwrap();
        assert!(matches!(outer.args[1], Expr::Closure(_)));
        let inner = outer.args[0].as_call().unwrap();
        assert!(outer.args[0].is_primitive_call(Primitive::LogicAnd));
        assert!(inner.args[0].is_primitive_call(Primitive::IntGe));
        assert!(matches!(inner.args[1], Expr::Closure(_)));
        assert_eq!(then_body.as_compound().map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_sibling_loops_reuse_name_with_fresh_variables() {
        let mut f = fixture();
        let ast = ScanAst::new(vec![
            simple_loop("c1", vec![user(vec![ScanExpr::name("c1")])]),
            simple_loop("c1", vec![user(vec![ScanExpr::name("c1")])]),
        ]);
        let mut engine = LoweringEngine::new(&mut f.builder, &f.stmt_map, &f.iter_vec);
        engine.visit_chain(&ast.chain).unwrap();
        assert!(!engine.bindings().is_bound("c1"));
        let stmt = engine.finish();

        let loops: Vec<_> = stmt.as_compound().unwrap().iter().filter_map(Stmt::as_for).collect();
        assert_eq!(loops.len(), 2);
        assert_ne!(loops[0].var.id, loops[1].var.id);
    }

    #[test]
    fn test_nested_rebinding_fails() {
        let mut f = fixture();
        let ast = ScanAst::new(vec![simple_loop("c1", vec![simple_loop("c1", Vec::new())])]);
        let err = lower_scan(&mut f.builder, &f.stmt_map, &f.iter_vec, &ast).unwrap_err();
        assert_eq!(err.kind, LowerErrorKind::AlreadyBound);
    }

    #[test]
    fn test_loop_upper_bound_is_exclusive() {
        let mut f = fixture();
        let ast = ScanAst::new(vec![ScanStmt::For(ForLoop {
            iterator: "c1".into(),
            lb: ScanExpr::constant(5),
            ub: ScanExpr::constant(9),
            stride: 1,
            body: vec![user(vec![ScanExpr::name("c1")])],
        })]);
        let stmt = lower_scan(&mut f.builder, &f.stmt_map, &f.iter_vec, &ast).unwrap();
        let for_loop = stmt.as_compound().and_then(|s| s[0].as_for()).unwrap();
        let end = for_loop.end.as_call().unwrap();
        assert!(for_loop.end.is_primitive_call(Primitive::IntAdd));
        assert_eq!(end.args[0].as_literal().and_then(|l| l.as_int()), Some(9));
        assert_eq!(end.args[1].as_literal().and_then(|l| l.as_int()), Some(1));
        assert_eq!(for_loop.start.as_literal().and_then(|l| l.as_int()), Some(5));
        assert_eq!(for_loop.step.as_literal().and_then(|l| l.as_int()), Some(1));
    }

    #[test]
    fn test_user_statement_substitutes_iterators() {
        let mut f = fixture();
        let ast = ScanAst::new(vec![user(vec![ScanExpr::term(2, "N")])]);
        let n = var_of(&f.iter_vec, "N");
        let stmt = lower_scan(&mut f.builder, &f.stmt_map, &f.iter_vec, &ast).unwrap();

        let b = IrBuilder::new();
        let expected_arg = b.mul(b.int_lit(2), n);
        let expected = b.expr_stmt(b.call_external("S0", vec![Type::int4()], Type::Unit, vec![expected_arg]));
        assert_eq!(stmt, b.compound(vec![expected]));
    }

    #[test]
    fn test_compound_statement_is_appended_whole() {
        let mut f = fixture();
        let i = f.iter_vec.iterators()[0].expr.clone();
        let first = f.builder.call_external("S0", vec![Type::int4()], Type::Unit, vec![i.clone()]);
        let second = f.builder.call_external("T0", vec![Type::int4()], Type::Unit, vec![i]);
        let body = f.builder.compound(vec![f.builder.expr_stmt(first), f.builder.expr_stmt(second)]);
        f.stmt_map.insert("S0".to_string(), body);

        let ast = ScanAst::new(vec![user(vec![ScanExpr::constant(3)])]);
        let stmt = lower_scan(&mut f.builder, &f.stmt_map, &f.iter_vec, &ast).unwrap();

        let b = IrBuilder::new();
        let expected = b.compound(vec![
            b.expr_stmt(b.call_external("S0", vec![Type::int4()], Type::Unit, vec![b.int_lit(3)])),
            b.expr_stmt(b.call_external("T0", vec![Type::int4()], Type::Unit, vec![b.int_lit(3)])),
        ]);
        assert_eq!(stmt, b.compound(vec![expected]));
    }

    #[test]
    fn test_unknown_statement_fails() {
        let mut f = fixture();
        let ast = ScanAst::new(vec![ScanStmt::User(UserStmt { statement: "S9".into(), substitutions: Vec::new() })]);
        let err = lower_scan(&mut f.builder, &f.stmt_map, &f.iter_vec, &ast).unwrap_err();
        assert_eq!(err.kind, LowerErrorKind::UnknownStatement);
    }

    #[test]
    fn test_too_many_substitutions_fail() {
        let mut f = fixture();
        let ast = ScanAst::new(vec![user(vec![ScanExpr::constant(0), ScanExpr::constant(1)])]);
        let err = lower_scan(&mut f.builder, &f.stmt_map, &f.iter_vec, &ast).unwrap_err();
        assert_eq!(err.kind, LowerErrorKind::MissingIterator);
    }

    #[test]
    fn test_reference_iterator_substitution_fails() {
        let mut builder = IrBuilder::new();
        let mut iter_vec = IterationVector::new();
        let r = builder.variable(Type::Ref(Box::new(Type::int4())));
        iter_vec.add_iterator("i", Expr::Var(r)).unwrap();
        let mut stmt_map = StatementMap::new();
        stmt_map.insert("S0".to_string(), builder.compound(Vec::new()));

        let ast = ScanAst::new(vec![user(vec![ScanExpr::constant(0)])]);
        let err = lower_scan(&mut builder, &stmt_map, &iter_vec, &ast).unwrap_err();
        assert_eq!(err.kind, LowerErrorKind::ReferenceSubstitution);
    }

    #[test]
    fn test_assignment_is_scoped_to_chain() {
        let mut f = fixture();
        let block = ScanStmt::Block(vec![
            ScanStmt::Assignment(Assignment { lhs: Some("c1".into()), rhs: ScanExpr::name("N") }),
            user(vec![ScanExpr::name("c1")]),
        ]);
        let ast = ScanAst::new(vec![block.clone(), block]);
        let stmt = lower_scan(&mut f.builder, &f.stmt_map, &f.iter_vec, &ast).unwrap();

        let blocks = stmt.as_compound().unwrap();
        assert_eq!(blocks.len(), 2);
        let first = blocks[0].as_compound().unwrap();
        assert!(matches!(first[0], Stmt::Decl { .. }));
    }

    #[test]
    fn test_stack_depth_is_preserved_by_every_statement_kind() {
        let guard = ScanStmt::Guard(Guard {
            conditions: vec![Equation::new(ScanExpr::name("N"), Sign::Ge, ScanExpr::constant(1))],
            body: vec![user(vec![ScanExpr::constant(0)])],
        });
        let kinds = vec![
            ScanStmt::Root,
            ScanStmt::Assignment(Assignment { lhs: Some("c9".into()), rhs: ScanExpr::constant(4) }),
            ScanStmt::Block(vec![user(vec![ScanExpr::constant(1)])]),
            user(vec![ScanExpr::name("N")]),
            simple_loop("c1", vec![user(vec![ScanExpr::name("c1")])]),
            guard,
        ];
        for kind in &kinds {
            let mut f = fixture();
            let mut engine = LoweringEngine::new(&mut f.builder, &f.stmt_map, &f.iter_vec);
            let before = engine.depth();
            engine.visit_stmt(kind).unwrap();
            assert_eq!(engine.depth(), before, "depth changed by {:?}", kind);
        }
    }

    #[test]
    fn test_root_produces_nothing() {
        let mut f = fixture();
        let stmt = lower_scan(&mut f.builder, &f.stmt_map, &f.iter_vec, &ScanAst::new(Vec::new())).unwrap();
        assert_eq!(stmt, Stmt::Compound(Vec::new()));
    }
}
