//! Polyhedral operations: schedule restriction, simplification and
//! Fourier-Motzkin projection.

use crate::polyhedral::set::{IntegerSet, UnionSet};
use crate::polyhedral::map::{AffineMap, UnionMap};
use crate::polyhedral::expr::AffineExpr;
use crate::polyhedral::constraint::{Constraint, ConstraintSystem, Normalized};
use crate::utils::errors::{ScanError, ScanErrorKind};
use log::trace;

/// One statement of a schedule-restricted relation.
#[derive(Debug, Clone)]
pub struct ScheduledStatement {
    /// Statement name shared by the domain and the schedule
    pub name: String,
    /// Schedule padded to the relation's time dimensionality
    pub schedule: AffineMap,
    /// Constraints over `[t_0 .. t_{T-1}, i_0 .. i_{I-1}]` plus parameters
    pub polyhedron: ConstraintSystem,
}

/// The schedule intersected with the iteration domain.
#[derive(Debug, Clone)]
pub struct ScheduledRelation {
    /// Number of time (schedule output) dimensions
    pub n_time: usize,
    /// Number of iterators (schedule input dimensions)
    pub n_iter: usize,
    /// Number of parameters
    pub n_param: usize,
    /// Parameter context constraints
    pub context: ConstraintSystem,
    /// Restricted statements, in domain order
    pub statements: Vec<ScheduledStatement>,
}

impl ScheduledRelation {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Restrict `schedule` to `domain` under the parameter `context`.
///
/// Statements missing from either side are dropped, as are statements whose
/// combined constraints are trivially infeasible.
pub fn restrict(
    context: &IntegerSet,
    schedule: &UnionMap,
    domain: &UnionSet,
) -> Result<ScheduledRelation, ScanError> {
    let n_param = context.n_param();
    if context.dim() != 0 {
        return Err(ScanError::new(
            ScanErrorKind::DimensionMismatch,
            format!("context must be a parameter set, found {} dimensions", context.dim()),
        ));
    }

    let paired: Vec<(&str, &IntegerSet, &AffineMap)> = domain.iter()
        .filter_map(|(name, set)| match schedule.get(name) {
            Some(map) => Some((name, set, map)),
            None => {
                trace!("statement {} has no schedule, dropped", name);
                None
            }
        })
        .collect();

    let n_iter = paired.first().map_or(0, |(_, set, _)| set.dim());
    let n_time = paired.iter().map(|(_, _, map)| map.n_out()).max().unwrap_or(0);

    let mut statements = Vec::with_capacity(paired.len());
    for (name, set, map) in paired {
        if set.dim() != n_iter || map.n_in() != n_iter {
            return Err(ScanError::new(
                ScanErrorKind::DimensionMismatch,
                format!(
                    "statement {}: domain has {} dims and schedule {} inputs, expected {}",
                    name, set.dim(), map.n_in(), n_iter
                ),
            ));
        }
        if set.n_param() != n_param || map.n_param() != n_param {
            return Err(ScanError::new(
                ScanErrorKind::DimensionMismatch,
                format!("statement {}: parameter count differs from the context ({})", name, n_param),
            ));
        }

        let padded = pad_schedule(map, n_time);
        let mut system = ConstraintSystem::new(n_time + n_iter, n_param);
        for c in &context.constraints.constraints {
            system.add(c.map_expr(|e| e.insert_dims(0, n_time + n_iter)));
        }
        for c in &set.constraints.constraints {
            system.add(c.map_expr(|e| e.insert_dims(0, n_time)));
        }
        for (k, out) in padded.outputs.iter().enumerate() {
            let time = AffineExpr::var(k, n_time + n_iter, n_param);
            system.add(Constraint::eq(time, out.insert_dims(0, n_time)));
        }

        match simplify(&system) {
            Some(polyhedron) => statements.push(ScheduledStatement {
                name: name.to_string(),
                schedule: padded,
                polyhedron,
            }),
            None => trace!("statement {} has an empty domain, dropped", name),
        }
    }

    Ok(ScheduledRelation {
        n_time,
        n_iter,
        n_param,
        context: context.constraints.clone(),
        statements,
    })
}

fn pad_schedule(map: &AffineMap, n_time: usize) -> AffineMap {
    let mut outputs = map.outputs.clone();
    while outputs.len() < n_time {
        outputs.push(AffineExpr::zero(map.n_in(), map.n_param()));
    }
    AffineMap::from_outputs(map.n_in(), map.n_param(), outputs)
}

/// Normalize every constraint, drop tautologies and duplicates, and fuse
/// opposite inequality pairs into equalities.
///
/// Returns `None` if some constraint has no integer solution.
pub fn simplify(system: &ConstraintSystem) -> Option<ConstraintSystem> {
    let mut kept: Vec<Constraint> = Vec::new();
    for c in &system.constraints {
        match c.normalize() {
            Normalized::Tautology => {}
            Normalized::Contradiction => return None,
            Normalized::Constraint(c) => {
                if c.is_equality() {
                    kept.retain(|k| k.is_equality() || (k.expr != c.expr && k.expr != -c.expr.clone()));
                    if !kept.contains(&c) {
                        kept.push(c);
                    }
                    continue;
                }
                let opposite = -c.expr.clone();
                let covered = kept.iter().any(|k| {
                    k.is_equality() && (k.expr == c.expr || k.expr == opposite)
                });
                if covered || kept.contains(&c) {
                    continue;
                }
                if let Some(pos) = kept.iter().position(|k| !k.is_equality() && k.expr == opposite) {
                    if let Normalized::Constraint(eq) = Constraint::eq_zero(opposite).normalize() {
                        kept.remove(pos);
                        if !kept.contains(&eq) {
                            kept.push(eq);
                        }
                        continue;
                    }
                }
                kept.push(c);
            }
        }
    }

    let mut out = ConstraintSystem::new(system.n_dim, system.n_param);
    out.add_all(kept);
    Some(out)
}

/// Eliminate dimension `dim` by Fourier-Motzkin.
///
/// An equality involving `dim` is used as the pivot when one exists;
/// otherwise every lower bound is combined with every upper bound. The
/// result keeps the same number of dimensions with `dim` absent from every
/// constraint. Returns `Ok(None)` if the projection is infeasible, and an
/// `Overflow` error if a combined coefficient leaves the `i64` range.
pub fn eliminate_dim(system: &ConstraintSystem, dim: usize) -> Result<Option<ConstraintSystem>, ScanError> {
    let mut out = ConstraintSystem::new(system.n_dim, system.n_param);

    let pivot = system.equalities()
        .filter(|c| c.expr.coeff(dim) != 0)
        .min_by_key(|c| c.expr.coeff(dim).abs());

    if let Some(pivot) = pivot {
        let a = pivot.expr.coeff(dim);
        for c in system.constraints.iter().filter(|c| *c != pivot) {
            let b = c.expr.coeff(dim);
            if b == 0 {
                out.add(c.clone());
                continue;
            }
            let combined = combine(&c.expr, a.abs(), &pivot.expr, -(a.signum() * b), dim)?;
            out.add(Constraint::new(combined, c.kind));
        }
        return Ok(simplify(&out));
    }

    let mut lowers = Vec::new();
    let mut uppers = Vec::new();
    for c in &system.constraints {
        match c.expr.coeff(dim) {
            0 => out.add(c.clone()),
            a if a > 0 => lowers.push(c),
            _ => uppers.push(c),
        }
    }
    for lower in &lowers {
        for upper in &uppers {
            let a = lower.expr.coeff(dim);
            let b = -upper.expr.coeff(dim);
            out.add(Constraint::ge_zero(combine(&lower.expr, b, &upper.expr, a, dim)?));
        }
    }
    Ok(simplify(&out))
}

/// `x * fx + y * fy`, checked.
fn combine(x: &AffineExpr, fx: i64, y: &AffineExpr, fy: i64, dim: usize) -> Result<AffineExpr, ScanError> {
    x.checked_scale(fx)
        .zip(y.checked_scale(fy))
        .and_then(|(x, y)| x.checked_add(&y))
        .ok_or_else(|| ScanError::new(
            ScanErrorKind::Overflow,
            format!("coefficient overflow while eliminating dimension {}", dim),
        ))
}

/// Project onto the first `keep` dimensions by eliminating the others,
/// innermost first. Dimensionality is unchanged.
pub fn project_onto_prefix(system: &ConstraintSystem, keep: usize) -> Result<Option<ConstraintSystem>, ScanError> {
    let Some(mut current) = simplify(system) else { return Ok(None) };
    for dim in (keep..system.n_dim).rev() {
        match eliminate_dim(&current, dim)? {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyhedral::space::Space;

    fn ge(coeffs: &[i64], params: &[i64], constant: i64) -> Constraint {
        Constraint::ge_zero(AffineExpr::from_parts(coeffs.to_vec(), params.to_vec(), constant))
    }

    #[test]
    fn test_simplify_fuses_opposite_pair() {
        let mut sys = ConstraintSystem::new(1, 0);
        sys.add(ge(&[1], &[], -3));
        sys.add(ge(&[-1], &[], 3));
        sys.add(ge(&[2], &[], -6));
        let simplified = simplify(&sys).expect("feasible");
        assert_eq!(simplified.len(), 1);
        assert!(simplified.constraints[0].is_equality());
    }

    #[test]
    fn test_simplify_detects_contradiction() {
        let mut sys = ConstraintSystem::new(1, 0);
        sys.add(ge(&[0], &[], -1));
        assert!(simplify(&sys).is_none());
    }

    #[test]
    fn test_fourier_motzkin() {
        // 0 <= j <= i <= N - 1, eliminate i: j >= 0, N - 1 - j >= 0
        let mut sys = ConstraintSystem::new(2, 1);
        sys.add(ge(&[0, 1], &[0], 0));
        sys.add(ge(&[1, -1], &[0], 0));
        sys.add(ge(&[-1, 0], &[1], -1));
        let projected = eliminate_dim(&sys, 0).unwrap().expect("feasible");
        assert!(projected.constraints.iter().all(|c| c.expr.coeff(0) == 0));
        assert!(projected.constraints.contains(&ge(&[0, -1], &[1], -1)));
        assert!(projected.constraints.contains(&ge(&[0, 1], &[0], 0)));
    }

    #[test]
    fn test_eliminate_with_equality_pivot() {
        // t = i + 2, 0 <= i <= 5: eliminate i
        let mut sys = ConstraintSystem::new(2, 0);
        sys.add(Constraint::eq_zero(AffineExpr::from_parts(vec![1, -1], vec![], -2)));
        sys.add(ge(&[0, 1], &[], 0));
        sys.add(ge(&[0, -1], &[], 5));
        let projected = eliminate_dim(&sys, 1).unwrap().expect("feasible");
        assert!(projected.constraints.contains(&ge(&[1, 0], &[], -2)));
        assert!(projected.constraints.contains(&ge(&[-1, 0], &[], 7)));
    }

    #[test]
    fn test_elimination_overflow_is_an_error() {
        // 4000000007 i - 4000000009 j >= 0, -i + 3000000001 j >= 0
        let mut sys = ConstraintSystem::new(2, 0);
        sys.add(ge(&[4_000_000_007, -4_000_000_009], &[], 0));
        sys.add(ge(&[-1, 3_000_000_001], &[], 0));
        sys.add(ge(&[-1, 0], &[], 10));
        let err = eliminate_dim(&sys, 1).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::Overflow);
        assert_eq!(project_onto_prefix(&sys, 0).unwrap_err().kind, ScanErrorKind::Overflow);
    }

    #[test]
    fn test_restrict_identity() {
        let domain_set = IntegerSet::from_constraints(Space::set(1, 1), vec![
            ge(&[1], &[0], 0),
            ge(&[-1], &[1], -1),
        ]);
        let domain = UnionSet::new().with("S0", domain_set);
        let schedule = UnionMap::new()
            .with("S0", AffineMap::identity(1, 1))
            .with("S9", AffineMap::identity(1, 1));
        let relation = restrict(&IntegerSet::params_universe(1), &schedule, &domain)
            .expect("restricts");
        assert_eq!(relation.n_time, 1);
        assert_eq!(relation.n_iter, 1);
        assert_eq!(relation.statements.len(), 1);
        // [t, i]: t = i, i >= 0, N - 1 - i >= 0
        assert!(relation.statements[0].polyhedron.is_satisfied(&[3, 3], &[4]));
        assert!(!relation.statements[0].polyhedron.is_satisfied(&[3, 2], &[4]));
    }

    #[test]
    fn test_restrict_dimension_mismatch() {
        let domain = UnionSet::new().with("S0", IntegerSet::universe(2, 0));
        let schedule = UnionMap::new().with("S0", AffineMap::identity(1, 0));
        let err = restrict(&IntegerSet::params_universe(0), &schedule, &domain).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::DimensionMismatch);
    }
}
