//! Structural variable substitution over IR statements and expressions.

use crate::ir::ast::*;
use std::collections::BTreeMap;

/// Substitution environment: variable id to replacement expression.
pub type SubEnv = BTreeMap<VarId, Expr>;

pub trait SubVars {
    /// Replace every use of a variable in `env` by its replacement.
    ///
    /// Uses inside closures are replaced too. Binding occurrences
    /// (declared and loop variables) are left alone.
    fn sub_vars(self, env: &SubEnv) -> Self where Self: Sized;
}

impl SubVars for Expr {
    fn sub_vars(self, env: &SubEnv) -> Expr {
        match self {
            Expr::Var(var) => match env.get(&var.id) {
                Some(replacement) => replacement.clone(),
                None => Expr::Var(var),
            },
            Expr::Literal(_) => self,
            Expr::Call(call) => {
                let CallExpr { callee, args, ty } = *call;
                let args = args.into_iter().map(|a| a.sub_vars(env)).collect();
                Expr::Call(Box::new(CallExpr { callee, args, ty }))
            }
            Expr::Closure(closure) => {
                let Closure { body, ty } = *closure;
                Expr::Closure(Box::new(Closure { body: body.sub_vars(env), ty }))
            }
        }
    }
}

impl SubVars for Stmt {
    fn sub_vars(self, env: &SubEnv) -> Stmt {
        match self {
            Stmt::Expr(e) => Stmt::Expr(e.sub_vars(env)),
            Stmt::Decl { var, init } => Stmt::Decl { var, init: init.sub_vars(env) },
            Stmt::Compound(stmts) => {
                Stmt::Compound(stmts.into_iter().map(|s| s.sub_vars(env)).collect())
            }
            Stmt::If { cond, then_body, else_body } => Stmt::If {
                cond: cond.sub_vars(env),
                then_body: Box::new(then_body.sub_vars(env)),
                else_body: else_body.map(|s| Box::new(s.sub_vars(env))),
            },
            Stmt::For(for_loop) => {
                let ForLoop { var, start, end, step, body } = *for_loop;
                Stmt::For(Box::new(ForLoop {
                    var,
                    start: start.sub_vars(env),
                    end: end.sub_vars(env),
                    step: step.sub_vars(env),
                    body: body.sub_vars(env),
                }))
            }
            Stmt::Return(e) => Stmt::Return(e.sub_vars(env)),
        }
    }
}

/// Replace every use of `var` in `stmt` by `replacement`.
pub fn substitute(stmt: Stmt, var: &Variable, replacement: Expr) -> Stmt {
    let mut env = SubEnv::new();
    env.insert(var.id, replacement);
    stmt.sub_vars(&env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::IrBuilder;

    #[test]
    fn test_substitutes_inside_calls_and_closures() {
        let mut b = IrBuilder::new();
        let i = b.variable(Type::int4());
        let c1 = b.variable(Type::int4());
        let body = b.expr_stmt(b.min(Expr::Var(i.clone()), b.int_lit(4)));

        let result = substitute(body, &i, Expr::Var(c1.clone()));
        let Stmt::Expr(Expr::Call(call)) = result else { panic!("expected call statement") };
        assert!(call.args[0].is_primitive_call(Primitive::IntLt));
        let Expr::Closure(closure) = &call.args[1] else { panic!("expected closure") };
        assert_eq!(closure.body, Stmt::Return(Expr::Var(c1)));
    }

    #[test]
    fn test_leaves_other_variables() {
        let mut b = IrBuilder::new();
        let i = b.variable(Type::int4());
        let j = b.variable(Type::int4());
        let stmt = b.expr_stmt(b.add(Expr::Var(j.clone()), b.int_lit(1)));
        let result = substitute(stmt.clone(), &i, b.int_lit(0));
        assert_eq!(result, stmt);
    }
}
