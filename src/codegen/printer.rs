//! Debug dump of a scan AST as C-like pseudo code.

use crate::codegen::ast::*;
use crate::codegen::visitor::ScanVisitor;
use crate::utils::pretty::CodeFormatter;
use std::convert::Infallible;

/// Render a scan AST, one statement per line.
pub fn print_scan_ast(ast: &ScanAst) -> String {
    let mut printer = ScanPrinter::new();
    match printer.visit_chain(&ast.chain) {
        Ok(()) => printer.finish(),
        Err(never) => match never {},
    }
}

/// Render a single expression.
pub fn render_expr(expr: &ScanExpr) -> String {
    let mut printer = ScanPrinter::new();
    match printer.visit_expr(expr) {
        Ok(s) => s,
        Err(never) => match never {},
    }
}

/// Scan AST visitor that writes pseudo code into a `CodeFormatter`.
pub struct ScanPrinter {
    fmt: CodeFormatter,
}

impl ScanPrinter {
    pub fn new() -> Self {
        Self { fmt: CodeFormatter::default_indent() }
    }

    pub fn finish(self) -> String {
        self.fmt.finish()
    }

    fn open(&mut self, header: &str) {
        self.fmt.write(header);
        self.fmt.writeln(" {");
        self.fmt.indent();
    }

    fn close(&mut self) {
        self.fmt.dedent();
        self.fmt.writeln("}");
    }
}

impl Default for ScanPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanVisitor for ScanPrinter {
    type Value = String;
    type Error = Infallible;

    fn visit_assignment(&mut self, assignment: &Assignment) -> Result<(), Infallible> {
        let rhs = self.visit_expr(&assignment.rhs)?;
        match &assignment.lhs {
            Some(lhs) => self.fmt.writeln(&format!("{} = {};", lhs, rhs)),
            None => self.fmt.writeln(&format!("{};", rhs)),
        }
        Ok(())
    }

    fn visit_block(&mut self, body: &[ScanStmt]) -> Result<(), Infallible> {
        self.fmt.writeln("{");
        self.fmt.indent();
        self.visit_chain(body)?;
        self.close();
        Ok(())
    }

    fn visit_user(&mut self, user: &UserStmt) -> Result<(), Infallible> {
        let mut args = Vec::with_capacity(user.substitutions.len());
        for sub in &user.substitutions {
            args.push(self.visit_expr(&sub.rhs)?);
        }
        self.fmt.writeln(&format!("{}({});", user.statement, args.join(", ")));
        Ok(())
    }

    fn visit_for(&mut self, for_loop: &ForLoop) -> Result<(), Infallible> {
        let it = &for_loop.iterator;
        let lb = self.visit_expr(&for_loop.lb)?;
        let ub = self.visit_expr(&for_loop.ub)?;
        let step = match for_loop.stride {
            1 => format!("{}++", it),
            s => format!("{} += {}", it, s),
        };
        self.open(&format!("for ({} = {}; {} <= {}; {})", it, lb, it, ub, step));
        self.visit_chain(&for_loop.body)?;
        self.close();
        Ok(())
    }

    fn visit_guard(&mut self, guard: &Guard) -> Result<(), Infallible> {
        let mut conds = Vec::with_capacity(guard.conditions.len());
        for cond in &guard.conditions {
            conds.push(self.visit_equation(cond)?);
        }
        self.open(&format!("if ({})", conds.join(" && ")));
        self.visit_chain(&guard.body)?;
        self.close();
        Ok(())
    }

    fn visit_name(&mut self, name: &str) -> Result<String, Infallible> {
        Ok(name.to_string())
    }

    fn visit_term(&mut self, coeff: i64, var: Option<&ScanExpr>) -> Result<String, Infallible> {
        let Some(var) = var else { return Ok(coeff.to_string()) };
        let var = self.visit_expr(var)?;
        Ok(match coeff {
            1 => var,
            -1 => format!("-{}", var),
            c => format!("{}*{}", c, var),
        })
    }

    fn visit_binary(&mut self, op: BinaryOp, lhs: &ScanExpr, rhs: i64) -> Result<String, Infallible> {
        let lhs = self.visit_expr(lhs)?;
        Ok(match op {
            BinaryOp::FloorDiv => format!("floord({}, {})", lhs, rhs),
            BinaryOp::CeilDiv => format!("ceild({}, {})", lhs, rhs),
            BinaryOp::Div => format!("({})/{}", lhs, rhs),
            BinaryOp::Mod => format!("({})%{}", lhs, rhs),
        })
    }

    fn visit_reduction(&mut self, op: ReductionOp, elts: &[ScanExpr]) -> Result<String, Infallible> {
        let mut parts = Vec::with_capacity(elts.len());
        for elt in elts {
            parts.push(self.visit_expr(elt)?);
        }
        Ok(match op {
            ReductionOp::Sum => parts.join(" + ").replace("+ -", "- "),
            ReductionOp::Min => format!("min({})", parts.join(", ")),
            ReductionOp::Max => format!("max({})", parts.join(", ")),
        })
    }

    fn visit_equation(&mut self, eq: &Equation) -> Result<String, Infallible> {
        let lhs = self.visit_expr(&eq.lhs)?;
        let rhs = self.visit_expr(&eq.rhs)?;
        Ok(format!("{} {} {}", lhs, eq.sign.symbol(), rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_nest() {
        let ast = ScanAst::new(vec![ScanStmt::For(ForLoop {
            iterator: "c1".into(),
            lb: ScanExpr::constant(0),
            ub: ScanExpr::sum(vec![ScanExpr::name("N"), ScanExpr::constant(-1)]),
            stride: 1,
            body: vec![ScanStmt::Guard(Guard {
                conditions: vec![
                    Equation::new(ScanExpr::name("c1"), Sign::Ge, ScanExpr::constant(2)),
                    Equation::new(ScanExpr::name("M"), Sign::Eq, ScanExpr::constant(3)),
                ],
                body: vec![ScanStmt::User(UserStmt {
                    statement: "S0".into(),
                    substitutions: vec![Assignment { lhs: None, rhs: ScanExpr::name("c1") }],
                })],
            })],
        })]);
        let expected = "\
for (c1 = 0; c1 <= N - 1; c1++) {
  if (c1 >= 2 && M == 3) {
    S0(c1);
  }
}
";
        assert_eq!(print_scan_ast(&ast), expected);
    }

    #[test]
    fn test_print_assignment_and_block() {
        let ast = ScanAst::new(vec![ScanStmt::Block(vec![
            ScanStmt::Assignment(Assignment {
                lhs: Some("c1".into()),
                rhs: ScanExpr::binary(BinaryOp::CeilDiv, ScanExpr::name("N"), 2),
            }),
        ])]);
        assert_eq!(print_scan_ast(&ast), "{\n  c1 = ceild(N, 2);\n}\n");
    }
}
