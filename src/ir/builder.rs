//! Construction helpers for IR nodes.
//!
//! `IrBuilder` hands out fresh variable identities and builds typed calls to
//! the primitives and externals the lowering needs.

use crate::ir::ast::*;

/// External function names emitted by the builder.
pub mod externals {
    pub const MAX: &str = "max";
    pub const FLOOR: &str = "floor";
    pub const CEIL: &str = "ceil";
}

/// IR node factory.
#[derive(Debug)]
pub struct IrBuilder {
    /// Next variable id to hand out
    next_id: u64,
}

impl IrBuilder {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Create a variable with a fresh identity.
    pub fn variable(&mut self, ty: Type) -> Variable {
        let id = VarId(self.next_id);
        self.next_id += 1;
        Variable { id, ty }
    }

    // ==================== Literals ====================

    pub fn literal(&self, value: impl Into<String>, ty: Type) -> Expr {
        Expr::Literal(Literal { value: value.into(), ty })
    }

    /// A 4-byte signed integer literal.
    pub fn int_lit(&self, value: i64) -> Expr {
        self.literal(value.to_string(), Type::int4())
    }

    // ==================== Calls ====================

    pub fn call(&self, callee: Callee, args: Vec<Expr>, ty: Type) -> Expr {
        Expr::Call(Box::new(CallExpr { callee, args, ty }))
    }

    pub fn call_primitive(&self, prim: Primitive, args: Vec<Expr>, ty: Type) -> Expr {
        self.call(Callee::Primitive(prim), args, ty)
    }

    /// Call an external function of type `(params) -> ret` by name.
    pub fn call_external(&self, name: &str, params: Vec<Type>, ret: Type, args: Vec<Expr>) -> Expr {
        let fn_ty = Type::Function { params, ret: Box::new(ret.clone()) };
        let callee = Callee::External(Literal { value: name.to_string(), ty: fn_ty });
        self.call(callee, args, ret)
    }

    fn arith(&self, prim: Primitive, lhs: Expr, rhs: Expr) -> Expr {
        let ty = arith_type(&lhs.ty(), &rhs.ty());
        self.call_primitive(prim, vec![lhs, rhs], ty)
    }

    fn compare(&self, prim: Primitive, lhs: Expr, rhs: Expr) -> Expr {
        self.call_primitive(prim, vec![lhs, rhs], Type::Bool)
    }

    pub fn add(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.arith(Primitive::IntAdd, lhs, rhs)
    }

    pub fn mul(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.arith(Primitive::IntMul, lhs, rhs)
    }

    pub fn div(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.arith(Primitive::IntDiv, lhs, rhs)
    }

    pub fn modulo(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.arith(Primitive::IntMod, lhs, rhs)
    }

    pub fn lt(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.compare(Primitive::IntLt, lhs, rhs)
    }

    pub fn le(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.compare(Primitive::IntLe, lhs, rhs)
    }

    pub fn ge(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.compare(Primitive::IntGe, lhs, rhs)
    }

    pub fn eq(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.compare(Primitive::IntEq, lhs, rhs)
    }

    /// `bool.and(lhs, rhs)`; `rhs` must already be a closure.
    pub fn logic_and(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.call_primitive(Primitive::LogicAnd, vec![lhs, rhs], Type::Bool)
    }

    /// `ite(cond, then, else)` over two closures.
    pub fn ite(&self, cond: Expr, then_branch: Expr, else_branch: Expr) -> Expr {
        let ty = then_branch.ty().return_type().clone();
        self.call_primitive(Primitive::Ite, vec![cond, then_branch, else_branch], ty)
    }

    /// `min(a, b)` as `ite(a < b, || a, || b)`, evaluating only the chosen operand.
    pub fn min(&self, lhs: Expr, rhs: Expr) -> Expr {
        let cond = self.lt(lhs.clone(), rhs.clone());
        let then_branch = self.closure(lhs);
        let else_branch = self.closure(rhs);
        self.ite(cond, then_branch, else_branch)
    }

    /// Call to the generic external `max(int<'a>, int<'a>) -> int<'a>`.
    pub fn max(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.call_external(
            externals::MAX,
            vec![Type::GenInt, Type::GenInt],
            Type::GenInt,
            vec![lhs, rhs],
        )
    }

    /// Call to the external `floor(real<8>, real<8>) -> int<'a>`, the
    /// quotient rounded toward negative infinity.
    pub fn floor_div(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.call_external(
            externals::FLOOR,
            vec![Type::Real(8), Type::Real(8)],
            Type::GenInt,
            vec![lhs, rhs],
        )
    }

    /// Call to the external `ceil(real<8>, real<8>) -> int<'a>`, the quotient
    /// rounded toward positive infinity.
    pub fn ceil_div(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.call_external(
            externals::CEIL,
            vec![Type::Real(8), Type::Real(8)],
            Type::GenInt,
            vec![lhs, rhs],
        )
    }

    /// Load the value behind a reference. Non-reference expressions are
    /// returned unchanged.
    pub fn deref(&self, expr: Expr) -> Expr {
        match expr.ty() {
            Type::Ref(inner) => self.call_primitive(Primitive::Deref, vec![expr], *inner),
            _ => expr,
        }
    }

    /// Zero-argument closure returning `expr`.
    pub fn closure(&self, expr: Expr) -> Expr {
        let ty = expr.ty();
        Expr::Closure(Box::new(Closure { body: Stmt::Return(expr), ty }))
    }

    // ==================== Statements ====================

    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        Stmt::Expr(expr)
    }

    pub fn decl(&self, var: Variable, init: Expr) -> Stmt {
        Stmt::Decl { var, init }
    }

    pub fn compound(&self, stmts: Vec<Stmt>) -> Stmt {
        Stmt::Compound(stmts)
    }

    pub fn if_stmt(&self, cond: Expr, then_body: Stmt, else_body: Option<Stmt>) -> Stmt {
        Stmt::If {
            cond,
            then_body: Box::new(then_body),
            else_body: else_body.map(Box::new),
        }
    }

    /// `for var = start .. end step step { body }` with `end` exclusive.
    pub fn for_stmt(&self, var: Variable, start: Expr, end: Expr, step: Expr, body: Stmt) -> Stmt {
        Stmt::For(Box::new(ForLoop { var, start, end, step, body }))
    }
}

impl Default for IrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Result type of integer arithmetic: the wider of two fixed-width operands,
/// generic otherwise.
fn arith_type(lhs: &Type, rhs: &Type) -> Type {
    match (lhs.deref_target(), rhs.deref_target()) {
        (Type::Int(a), Type::Int(b)) => Type::Int((*a).max(*b)),
        _ => Type::GenInt,
    }
}
