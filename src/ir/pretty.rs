//! C-like rendering of IR nodes.
//!
//! Variables print as `v<id>`, closures as `|| expr`, and binary primitives
//! as parenthesized infix operations.

use crate::ir::ast::*;
use crate::utils::pretty::{PrettyPrint, DEFAULT_WIDTH};
use pretty::{DocAllocator, DocBuilder};
use std::fmt;

const INDENT: isize = 2;

impl PrettyPrint for Expr {
    fn to_doc<'a, D: DocAllocator<'a>>(&self, alloc: &'a D) -> DocBuilder<'a, D> {
        match self {
            Expr::Literal(lit) => alloc.text(lit.value.clone()),
            Expr::Var(var) => alloc.text(var.id.to_string()),
            Expr::Closure(closure) => {
                let body = match &closure.body {
                    Stmt::Return(e) => e.to_doc(alloc),
                    other => other.to_doc(alloc),
                };
                alloc.text("|| ").append(body)
            }
            Expr::Call(call) => call_doc(call, alloc),
        }
    }
}

fn call_doc<'a, D: DocAllocator<'a>>(call: &CallExpr, alloc: &'a D) -> DocBuilder<'a, D> {
    if let Callee::Primitive(prim) = &call.callee {
        if let (Some(op), [lhs, rhs]) = (prim.infix(), call.args.as_slice()) {
            return alloc.text("(")
                .append(lhs.to_doc(alloc))
                .append(alloc.text(format!(" {} ", op)))
                .append(rhs.to_doc(alloc))
                .append(alloc.text(")"));
        }
        if let (Primitive::Deref, [target]) = (prim, call.args.as_slice()) {
            return alloc.text("*").append(target.to_doc(alloc));
        }
    }
    let args = call.args.iter().map(|a| a.to_doc(alloc));
    alloc.text(call.callee.name().to_string())
        .append(alloc.text("("))
        .append(alloc.intersperse(args, ", "))
        .append(alloc.text(")"))
        .group()
}

impl PrettyPrint for Stmt {
    fn to_doc<'a, D: DocAllocator<'a>>(&self, alloc: &'a D) -> DocBuilder<'a, D> {
        match self {
            Stmt::Expr(e) => e.to_doc(alloc).append(alloc.text(";")),
            Stmt::Decl { var, init } => alloc.text(format!("{} {} = ", var.ty, var.id))
                .append(init.to_doc(alloc))
                .append(alloc.text(";")),
            Stmt::Compound(stmts) => block_doc(stmts, alloc),
            Stmt::If { cond, then_body, else_body } => {
                let doc = alloc.text("if (")
                    .append(cond.to_doc(alloc))
                    .append(alloc.text(") "))
                    .append(then_body.to_doc(alloc));
                match else_body {
                    Some(else_body) => doc.append(alloc.text(" else ")).append(else_body.to_doc(alloc)),
                    None => doc,
                }
            }
            Stmt::For(for_loop) => {
                let var = for_loop.var.id.to_string();
                alloc.text(format!("for ({} {} = ", for_loop.var.ty, var))
                    .append(for_loop.start.to_doc(alloc))
                    .append(alloc.text(format!("; {} < ", var)))
                    .append(for_loop.end.to_doc(alloc))
                    .append(alloc.text(format!("; {} += ", var)))
                    .append(for_loop.step.to_doc(alloc))
                    .append(alloc.text(") "))
                    .append(for_loop.body.to_doc(alloc))
            }
            Stmt::Return(e) => alloc.text("return ")
                .append(e.to_doc(alloc))
                .append(alloc.text(";")),
        }
    }
}

fn block_doc<'a, D: DocAllocator<'a>>(stmts: &[Stmt], alloc: &'a D) -> DocBuilder<'a, D> {
    if stmts.is_empty() {
        return alloc.text("{ }");
    }
    let body = stmts.iter().map(|s| alloc.hardline().append(s.to_doc(alloc)));
    alloc.text("{")
        .append(alloc.concat(body).nest(INDENT))
        .append(alloc.hardline())
        .append(alloc.text("}"))
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(DEFAULT_WIDTH, f)
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(DEFAULT_WIDTH, f)
    }
}
