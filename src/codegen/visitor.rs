//! Visitor framework over the scan AST.
//!
//! Statement visits return `Result<(), Error>` and expression visits return
//! `Result<Value, Error>`. Every method has a structurally recursive default,
//! so an implementation overrides only the node kinds it cares about.

use crate::codegen::ast::*;

pub trait ScanVisitor {
    /// Result of visiting an expression.
    type Value: Default;
    type Error;

    /// Visit a sibling chain in order.
    fn visit_chain(&mut self, chain: &[ScanStmt]) -> Result<(), Self::Error> {
        for stmt in chain {
            self.visit_stmt(stmt)?;
        }
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &ScanStmt) -> Result<(), Self::Error> {
        walk_stmt(self, stmt)
    }

    fn visit_root(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_assignment(&mut self, assignment: &Assignment) -> Result<(), Self::Error> {
        self.visit_expr(&assignment.rhs)?;
        Ok(())
    }

    fn visit_block(&mut self, body: &[ScanStmt]) -> Result<(), Self::Error> {
        self.visit_chain(body)
    }

    fn visit_user(&mut self, user: &UserStmt) -> Result<(), Self::Error> {
        for sub in &user.substitutions {
            self.visit_expr(&sub.rhs)?;
        }
        Ok(())
    }

    /// Lower bound, upper bound, then the body.
    fn visit_for(&mut self, for_loop: &ForLoop) -> Result<(), Self::Error> {
        self.visit_expr(&for_loop.lb)?;
        self.visit_expr(&for_loop.ub)?;
        self.visit_chain(&for_loop.body)
    }

    /// The body, then both sides of each condition.
    fn visit_guard(&mut self, guard: &Guard) -> Result<(), Self::Error> {
        self.visit_chain(&guard.body)?;
        for cond in &guard.conditions {
            self.visit_expr(&cond.lhs)?;
            self.visit_expr(&cond.rhs)?;
        }
        Ok(())
    }

    fn visit_expr(&mut self, expr: &ScanExpr) -> Result<Self::Value, Self::Error> {
        walk_expr(self, expr)
    }

    fn visit_name(&mut self, _name: &str) -> Result<Self::Value, Self::Error> {
        Ok(Self::Value::default())
    }

    fn visit_term(&mut self, _coeff: i64, var: Option<&ScanExpr>) -> Result<Self::Value, Self::Error> {
        if let Some(var) = var {
            self.visit_expr(var)?;
        }
        Ok(Self::Value::default())
    }

    fn visit_binary(&mut self, _op: BinaryOp, lhs: &ScanExpr, _rhs: i64) -> Result<Self::Value, Self::Error> {
        self.visit_expr(lhs)?;
        Ok(Self::Value::default())
    }

    /// Only called with two or more operands.
    fn visit_reduction(&mut self, _op: ReductionOp, elts: &[ScanExpr]) -> Result<Self::Value, Self::Error> {
        for elt in elts {
            self.visit_expr(elt)?;
        }
        Ok(Self::Value::default())
    }

    fn visit_equation(&mut self, eq: &Equation) -> Result<Self::Value, Self::Error> {
        self.visit_expr(&eq.lhs)?;
        self.visit_expr(&eq.rhs)?;
        Ok(Self::Value::default())
    }
}

/// Dispatch a statement to the matching visit method.
pub fn walk_stmt<V: ScanVisitor + ?Sized>(visitor: &mut V, stmt: &ScanStmt) -> Result<(), V::Error> {
    match stmt {
        ScanStmt::Root => visitor.visit_root(),
        ScanStmt::Assignment(assignment) => visitor.visit_assignment(assignment),
        ScanStmt::Block(body) => visitor.visit_block(body),
        ScanStmt::User(user) => visitor.visit_user(user),
        ScanStmt::For(for_loop) => visitor.visit_for(for_loop),
        ScanStmt::Guard(guard) => visitor.visit_guard(guard),
    }
}

/// Dispatch an expression to the matching visit method.
///
/// A reduction over a single operand is that operand: it is visited
/// directly and `visit_reduction` is not called.
pub fn walk_expr<V: ScanVisitor + ?Sized>(visitor: &mut V, expr: &ScanExpr) -> Result<V::Value, V::Error> {
    match expr {
        ScanExpr::Name(name) => visitor.visit_name(name),
        ScanExpr::Term { coeff, var } => visitor.visit_term(*coeff, var.as_deref()),
        ScanExpr::Binary { op, lhs, rhs } => visitor.visit_binary(*op, lhs, *rhs),
        ScanExpr::Reduction { op, elts } => match elts.as_slice() {
            [only] => visitor.visit_expr(only),
            _ => visitor.visit_reduction(*op, elts),
        },
    }
}
