//! Scanning generator: builds a scan AST from a scheduled relation.
//!
//! Each statement's iterators are first recovered from its schedule and
//! domain equalities, so that every statement lives in the common time
//! space. Time dimensions
//! are then scanned outermost first:
//! - a dimension that is constant for every statement orders statements
//!   without producing a loop;
//! - a dimension fixed by a unit equality becomes an assignment;
//! - any other dimension becomes a loop whose bounds come from the
//!   Fourier-Motzkin projection onto the enclosing dimensions.
//!
//! Statements sharing a loop use the hull of their bounds and are guarded
//! by their own bounds where these differ.

use crate::codegen::ast::*;
use crate::polyhedral::constraint::{Constraint, ConstraintSystem, Normalized};
use crate::polyhedral::expr::AffineExpr;
use crate::polyhedral::operations::{project_onto_prefix, simplify, ScheduledRelation, ScheduledStatement};
use crate::utils::errors::{ScanError, ScanErrorKind};
use crate::utils::matrix::RationalMatrix;
use log::{debug, trace};

/// Generator options.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Wrap consecutive statement references in one block
    pub merge_blocks: bool,
    /// Loop variables are named `<prefix><depth>`
    pub loop_prefix: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            merge_blocks: true,
            loop_prefix: "c".to_string(),
        }
    }
}

/// Generate the scan AST of `relation`.
///
/// `param_names` names the relation's parameters in order. Generated loop
/// names never take the form `<prefix><digits>` of a reserved or parameter
/// name; the prefix is extended until they cannot.
pub fn generate(
    relation: &ScheduledRelation,
    param_names: &[String],
    reserved_names: &[String],
    options: &ScanOptions,
) -> Result<ScanAst, ScanError> {
    if relation.is_empty() {
        return Err(ScanError::new(ScanErrorKind::EmptyRelation, "no statement instance to scan"));
    }
    if param_names.len() != relation.n_param {
        return Err(ScanError::new(
            ScanErrorKind::DimensionMismatch,
            format!("{} parameter names for {} parameters", param_names.len(), relation.n_param),
        ));
    }

    let context: Vec<Constraint> = relation.context.constraints.iter()
        .filter_map(|c| match c.map_expr(|e| e.insert_dims(0, relation.n_time)).normalize() {
            Normalized::Constraint(c) => Some(c),
            _ => None,
        })
        .collect();

    let mut statements = Vec::with_capacity(relation.statements.len());
    for stmt in &relation.statements {
        match prepare_statement(stmt, relation, &context)? {
            Some(prepared) => statements.push(prepared),
            None => trace!("statement {} is empty in time space, dropped", stmt.name),
        }
    }
    if statements.is_empty() {
        return Err(ScanError::new(ScanErrorKind::EmptyRelation, "every statement domain is empty"));
    }

    let taken: Vec<&str> = reserved_names.iter().chain(param_names).map(String::as_str).collect();
    let prefix = loop_prefix(&options.loop_prefix, &taken);
    debug!(
        "scanning {} statements over {} time dimensions (loop prefix '{}')",
        statements.len(), relation.n_time, prefix
    );

    let mut generator = Generator {
        n_time: relation.n_time,
        param_names,
        merge_blocks: options.merge_blocks,
        prefix,
        dim_names: vec![None; relation.n_time],
    };
    let body = generator.scan(0, 0, statements)?;
    Ok(ScanAst::new(body))
}

/// Extend `base` until no name in `taken` reads as `<prefix><digits>`.
fn loop_prefix(base: &str, taken: &[&str]) -> String {
    let mut prefix = base.to_string();
    while taken.iter().any(|name| is_generated_name(name, &prefix)) {
        prefix.push('_');
    }
    prefix
}

fn is_generated_name(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .map_or(false, |rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// A statement moved into the time space.
#[derive(Debug, Clone)]
struct TimedStatement {
    name: String,
    /// Value of each time dimension when the schedule fixes it to a constant
    scalars: Vec<Option<i64>>,
    /// Constraints over the time dimensions, constant dimensions substituted
    polyhedron: ConstraintSystem,
    /// Each original iterator as a function of the time dimensions
    iterators: Vec<AffineExpr>,
    /// Conditions checked right before the statement runs
    guards: Vec<Constraint>,
}

impl TimedStatement {
    fn add_guard(&mut self, constraint: &Constraint) {
        if !self.guards.contains(constraint) {
            self.guards.push(constraint.clone());
        }
    }
}

fn prepare_statement(
    stmt: &ScheduledStatement,
    relation: &ScheduledRelation,
    context: &[Constraint],
) -> Result<Option<TimedStatement>, ScanError> {
    let n_time = relation.n_time;
    let n_iter = relation.n_iter;
    let n_param = relation.n_param;

    let scalars: Vec<Option<i64>> = (0..n_time).map(|k| stmt.schedule.scalar_output(k)).collect();
    let overflow = || ScanError::new(
        ScanErrorKind::Overflow,
        format!("statement {}: coefficient overflow while substituting iterators", stmt.name),
    );
    let fix_scalars = |expr: AffineExpr| -> Result<AffineExpr, ScanError> {
        scalars.iter().enumerate().try_fold(expr, |e, (k, s)| match s {
            Some(v) => e.checked_substitute_dim(k, &AffineExpr::constant(*v, n_time, n_param))
                .ok_or_else(overflow),
            None => Ok(e),
        })
    };

    let iterators: Vec<AffineExpr> = solve_iterators(stmt, n_time)?
        .into_iter()
        .map(&fix_scalars)
        .collect::<Result<_, _>>()?;

    let mut system = ConstraintSystem::new(n_time, n_param);
    for c in &stmt.polyhedron.constraints {
        let mut expr = c.expr.clone();
        for (j, iterator) in iterators.iter().enumerate() {
            expr = expr.checked_substitute_dim(n_time + j, &iterator.insert_dims(n_time, n_iter))
                .ok_or_else(overflow)?;
        }
        let expr = fix_scalars(expr.remove_dims(n_time, n_iter))?;
        system.add(Constraint::new(expr, c.kind));
    }
    let Some(system) = simplify(&system) else { return Ok(None) };
    if project_onto_prefix(&system, 0)?.is_none() {
        return Ok(None);
    }

    let (param_only, polyhedron): (Vec<Constraint>, Vec<Constraint>) = system.constraints
        .into_iter()
        .partition(|c| c.expr.is_param_only());
    let guards = param_only.into_iter().filter(|c| !context.contains(c)).collect();
    let mut time_system = ConstraintSystem::new(n_time, n_param);
    time_system.add_all(polyhedron);

    Ok(Some(TimedStatement {
        name: stmt.name.clone(),
        scalars,
        polyhedron: time_system,
        iterators,
        guards,
    }))
}

/// Express every iterator of `stmt` as an affine function of the time
/// dimensions.
///
/// Solves `t = A i + B p + c` for `i` by exact Gauss-Jordan elimination.
/// Equalities of the statement's own polyhedron follow the schedule rows,
/// so iterators the domain fixes (`k = 0`) are recovered even when the
/// schedule ignores them. The result has `n_time` dimensions and the
/// schedule's parameters.
fn solve_iterators(stmt: &ScheduledStatement, n_time: usize) -> Result<Vec<AffineExpr>, ScanError> {
    let schedule = &stmt.schedule;
    let name = &stmt.name;
    let n_iter = schedule.n_in();
    let n_param = schedule.n_param();
    if n_iter == 0 {
        return Ok(Vec::new());
    }

    // Row k: [A_k | e_k | -B_k | -c_k], i.e. A_k i = t_k - B_k p - c_k.
    let mut rows: Vec<Vec<i64>> = schedule.outputs.iter().enumerate()
        .map(|(k, out)| {
            let mut row = out.coeffs.clone();
            row.extend((0..n_time).map(|t| if t == k { 1 } else { 0 }));
            row.extend(out.param_coeffs.iter().map(|b| -b));
            row.push(-out.constant);
            row
        })
        .collect();
    // a_t t + A i + B p + c = 0, i.e. A i = -a_t t - B p - c.
    for eq in stmt.polyhedron.equalities() {
        let e = &eq.expr;
        let mut row: Vec<i64> = (n_time..n_time + n_iter).map(|d| e.coeff(d)).collect();
        if row.iter().all(|&a| a == 0) {
            continue;
        }
        row.extend((0..n_time).map(|t| -e.coeff(t)));
        row.extend((0..n_param).map(|p| -e.param_coeff(p)));
        row.push(-e.constant);
        rows.push(row);
    }
    let mut matrix = RationalMatrix::from_vec(rows);
    let pivots = matrix.reduce_columns(n_iter);

    let unsupported = |why: &str| ScanError::new(
        ScanErrorKind::UnsupportedSchedule,
        format!("statement {}: {}", name, why),
    );

    let mut iterators = Vec::with_capacity(n_iter);
    for (j, pivot) in pivots.iter().copied().enumerate() {
        let row = pivot
            .and_then(|r| matrix.row(r))
            .ok_or_else(|| unsupported(&format!("iterator {} is not determined by the schedule or the domain", j)))?;
        let solution = &row[n_iter..];
        if solution.iter().any(|v| !v.is_integer()) {
            return Err(unsupported(&format!("iterator {} is not an integer function of the schedule", j)));
        }
        let values: Vec<i64> = solution.iter().map(|v| v.to_integer()).collect();
        let (time, rest) = values.split_at(n_time);
        let (params, constant) = rest.split_at(n_param);
        iterators.push(AffineExpr::from_parts(time.to_vec(), params.to_vec(), constant[0]));
    }
    Ok(iterators)
}

/// `t >= ceil(num / div)` or `t <= floor(num / div)`, with `div > 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Bound {
    num: AffineExpr,
    div: i64,
}

/// What one statement's projection says about one time dimension.
#[derive(Debug, Default)]
struct LevelBounds {
    lowers: Vec<Bound>,
    uppers: Vec<Bound>,
    /// `t = expr` from an equality with a unit coefficient
    equality: Option<AffineExpr>,
    /// Every constraint involving the dimension
    constraints: Vec<Constraint>,
}

impl LevelBounds {
    fn collect(system: &ConstraintSystem, dim: usize) -> Self {
        let mut bounds = LevelBounds::default();
        for c in &system.constraints {
            let a = c.expr.coeff(dim);
            if a == 0 {
                continue;
            }
            bounds.constraints.push(c.clone());
            // a * t + rest (>= or ==) 0
            let mut rest = c.expr.clone();
            rest.set_coeff(dim, 0);
            let (num, div) = if a > 0 { (-rest, a) } else { (rest, -a) };
            if c.is_equality() {
                if div == 1 && bounds.equality.is_none() {
                    bounds.equality = Some(num.clone());
                }
                bounds.lowers.push(Bound { num: num.clone(), div });
                bounds.uppers.push(Bound { num, div });
            } else if a > 0 {
                bounds.lowers.push(Bound { num, div });
            } else {
                bounds.uppers.push(Bound { num, div });
            }
        }
        bounds
    }
}

struct Generator<'a> {
    n_time: usize,
    param_names: &'a [String],
    merge_blocks: bool,
    prefix: String,
    /// Loop variable of each time dimension while it is in scope
    dim_names: Vec<Option<String>>,
}

impl<'a> Generator<'a> {
    fn scan(&mut self, level: usize, depth: usize, group: Vec<TimedStatement>) -> Result<Vec<ScanStmt>, ScanError> {
        if group.is_empty() {
            return Ok(Vec::new());
        }
        if level == self.n_time {
            return self.leaves(group);
        }

        let constant = group.iter().filter(|s| s.scalars[level].is_some()).count();
        if constant == group.len() {
            return self.split_scalar(level, depth, group);
        }
        if constant > 0 {
            return Err(ScanError::new(
                ScanErrorKind::UnsupportedSchedule,
                format!("time dimension {} is constant for some statements only", level),
            ));
        }
        self.scan_dimension(level, depth, group)
    }

    /// Order statements by the value of a constant dimension.
    fn split_scalar(&mut self, level: usize, depth: usize, mut group: Vec<TimedStatement>) -> Result<Vec<ScanStmt>, ScanError> {
        group.sort_by_key(|s| s.scalars[level]);
        let mut out = Vec::new();
        let mut run: Vec<TimedStatement> = Vec::new();
        for stmt in group {
            if run.last().map_or(false, |last| last.scalars[level] != stmt.scalars[level]) {
                out.extend(self.scan(level + 1, depth, std::mem::take(&mut run))?);
            }
            run.push(stmt);
        }
        out.extend(self.scan(level + 1, depth, run)?);
        Ok(self.merge_leaves(out))
    }

    fn scan_dimension(&mut self, level: usize, depth: usize, group: Vec<TimedStatement>) -> Result<Vec<ScanStmt>, ScanError> {
        let name = format!("{}{}", self.prefix, depth + 1);

        let mut entries = Vec::with_capacity(group.len());
        for stmt in group {
            match project_onto_prefix(&stmt.polyhedron, level + 1)? {
                Some(projected) => {
                    let bounds = LevelBounds::collect(&projected, level);
                    entries.push((stmt, bounds));
                }
                None => trace!("statement {} has no points at dimension {}", stmt.name, level),
            }
        }
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let common_equality = entries[0].1.equality.clone()
            .filter(|eq| entries.iter().all(|(_, b)| b.equality.as_ref() == Some(eq)));
        if let Some(eq) = common_equality {
            trace!("dimension {} fixed by {} = {}", level, name, eq);
            let rhs = self.affine_to_scan(&eq)?;
            let mut statements = Vec::with_capacity(entries.len());
            for (mut stmt, bounds) in entries {
                // The other constraints on this dimension become conditions
                // on the assigned value.
                for c in &bounds.constraints {
                    let fixes = c.is_equality() && c.expr.coeff(level).abs() == 1 && {
                        let mut rest = c.expr.clone();
                        rest.set_coeff(level, 0);
                        rest.scale(-c.expr.coeff(level)) == eq
                    };
                    if !fixes {
                        stmt.add_guard(c);
                    }
                }
                statements.push(stmt);
            }
            self.dim_names[level] = Some(name.clone());
            let inner = self.scan(level + 1, depth + 1, statements);
            self.dim_names[level] = None;

            let mut block = vec![ScanStmt::Assignment(Assignment { lhs: Some(name), rhs })];
            block.extend(inner?);
            return Ok(vec![ScanStmt::Block(block)]);
        }

        let mut lowers = Vec::with_capacity(entries.len());
        let mut uppers = Vec::with_capacity(entries.len());
        for (stmt, bounds) in &entries {
            if bounds.lowers.is_empty() || bounds.uppers.is_empty() {
                let side = if bounds.lowers.is_empty() { "lower" } else { "upper" };
                return Err(ScanError::new(
                    ScanErrorKind::Unbounded,
                    format!("statement {}: time dimension {} has no {} bound", stmt.name, level, side),
                ));
            }
            lowers.push(self.lower_bound(&bounds.lowers)?);
            uppers.push(self.upper_bound(&bounds.uppers)?);
        }

        let same_lower = lowers.iter().all(|lb| *lb == lowers[0]);
        let same_upper = uppers.iter().all(|ub| *ub == uppers[0]);
        let lb = if same_lower { lowers[0].clone() } else { hull(lowers, ReductionOp::Min) };
        let ub = if same_upper { uppers[0].clone() } else { hull(uppers, ReductionOp::Max) };

        let mut statements = Vec::with_capacity(entries.len());
        for (mut stmt, bounds) in entries {
            for c in &bounds.constraints {
                let a = c.expr.coeff(level);
                let guarded = c.is_equality() && !(same_lower && same_upper)
                    || a > 0 && !same_lower
                    || a < 0 && !same_upper;
                if guarded {
                    stmt.add_guard(c);
                }
            }
            statements.push(stmt);
        }

        self.dim_names[level] = Some(name.clone());
        let body = self.scan(level + 1, depth + 1, statements);
        self.dim_names[level] = None;

        Ok(vec![ScanStmt::For(ForLoop { iterator: name, lb, ub, stride: 1, body: body? })])
    }

    fn leaves(&mut self, group: Vec<TimedStatement>) -> Result<Vec<ScanStmt>, ScanError> {
        let mut out = Vec::with_capacity(group.len());
        for stmt in group {
            let mut substitutions = Vec::with_capacity(stmt.iterators.len());
            for iterator in &stmt.iterators {
                substitutions.push(Assignment { lhs: None, rhs: self.affine_to_scan(iterator)? });
            }
            let user = ScanStmt::User(UserStmt { statement: stmt.name.clone(), substitutions });
            if stmt.guards.is_empty() {
                out.push(user);
                continue;
            }
            let mut conditions = Vec::with_capacity(stmt.guards.len());
            for c in &stmt.guards {
                conditions.push(self.condition(c)?);
            }
            out.push(ScanStmt::Guard(Guard { conditions, body: vec![user] }));
        }
        Ok(self.merge_leaves(out))
    }

    /// Wrap runs of consecutive statement references into blocks.
    fn merge_leaves(&self, stmts: Vec<ScanStmt>) -> Vec<ScanStmt> {
        if !self.merge_blocks {
            return stmts;
        }
        let mut out = Vec::with_capacity(stmts.len());
        let mut run = Vec::new();
        for stmt in stmts {
            if matches!(stmt, ScanStmt::User(_)) {
                run.push(stmt);
                continue;
            }
            flush_run(&mut out, &mut run);
            out.push(stmt);
        }
        flush_run(&mut out, &mut run);
        out
    }

    fn lower_bound(&self, bounds: &[Bound]) -> Result<ScanExpr, ScanError> {
        let mut exprs: Vec<ScanExpr> = Vec::with_capacity(bounds.len());
        for b in bounds {
            let num = self.affine_to_scan(&b.num)?;
            let e = if b.div == 1 { num } else { ScanExpr::binary(BinaryOp::CeilDiv, num, b.div) };
            if !exprs.contains(&e) {
                exprs.push(e);
            }
        }
        Ok(if exprs.len() == 1 { exprs.remove(0) } else { ScanExpr::max(exprs) })
    }

    fn upper_bound(&self, bounds: &[Bound]) -> Result<ScanExpr, ScanError> {
        let mut exprs: Vec<ScanExpr> = Vec::with_capacity(bounds.len());
        for b in bounds {
            let num = self.affine_to_scan(&b.num)?;
            let e = if b.div == 1 { num } else { ScanExpr::binary(BinaryOp::FloorDiv, num, b.div) };
            if !exprs.contains(&e) {
                exprs.push(e);
            }
        }
        Ok(hull(exprs, ReductionOp::Min))
    }

    /// `expr >= 0` or `expr == 0` as an equation with the constant moved right.
    fn condition(&self, c: &Constraint) -> Result<Equation, ScanError> {
        let mut linear = c.expr.clone();
        linear.constant = 0;
        let sign = if c.is_equality() { Sign::Eq } else { Sign::Ge };
        Ok(Equation::new(self.affine_to_scan(&linear)?, sign, ScanExpr::constant(-c.expr.constant)))
    }

    fn affine_to_scan(&self, expr: &AffineExpr) -> Result<ScanExpr, ScanError> {
        let mut terms = Vec::new();
        for (k, &c) in expr.coeffs.iter().enumerate() {
            if c == 0 {
                continue;
            }
            let name = self.dim_names.get(k).cloned().flatten().ok_or_else(|| ScanError::new(
                ScanErrorKind::UnsupportedSchedule,
                format!("time dimension {} is referenced outside its loop", k),
            ))?;
            terms.push(ScanExpr::term(c, name));
        }
        for (p, &c) in expr.param_coeffs.iter().enumerate() {
            if c == 0 {
                continue;
            }
            let name = self.param_names.get(p).cloned().ok_or_else(|| ScanError::new(
                ScanErrorKind::DimensionMismatch,
                format!("parameter {} has no name", p),
            ))?;
            terms.push(ScanExpr::term(c, name));
        }
        if expr.constant != 0 || terms.is_empty() {
            terms.push(ScanExpr::constant(expr.constant));
        }
        Ok(if terms.len() == 1 { terms.remove(0) } else { ScanExpr::sum(terms) })
    }
}

fn flush_run(out: &mut Vec<ScanStmt>, run: &mut Vec<ScanStmt>) {
    match run.len() {
        0 => {}
        1 => out.append(run),
        _ => out.push(ScanStmt::Block(std::mem::take(run))),
    }
}

/// Combine bound expressions: `min` nests binary reductions, `max` is n-ary.
fn hull(mut exprs: Vec<ScanExpr>, op: ReductionOp) -> ScanExpr {
    exprs.dedup();
    if exprs.len() == 1 {
        return exprs.remove(0);
    }
    match op {
        ReductionOp::Min => {
            let mut iter = exprs.into_iter();
            let first = iter.next().unwrap_or_else(|| ScanExpr::constant(0));
            iter.fold(first, ScanExpr::min)
        }
        _ => ScanExpr::reduction(op, exprs),
    }
}
