//! Scan AST: the loop nest produced by scanning a scheduled relation.
//!
//! Statements are loops, guards, assignments, blocks and references to
//! user statements. Expressions are affine terms, names, integer
//! division or modulo by a constant, and n-ary reductions.

use std::fmt;

/// A generated scan: a chain of statements that starts with `Root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanAst {
    pub chain: Vec<ScanStmt>,
}

impl ScanAst {
    /// Create a scan whose root is followed by `body`.
    pub fn new(body: Vec<ScanStmt>) -> Self {
        let mut chain = Vec::with_capacity(body.len() + 1);
        chain.push(ScanStmt::Root);
        chain.extend(body);
        Self { chain }
    }

    /// Statements following the root.
    pub fn body(&self) -> &[ScanStmt] {
        match self.chain.split_first() {
            Some((ScanStmt::Root, rest)) => rest,
            _ => &self.chain,
        }
    }
}

/// A statement of the scan AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStmt {
    /// Start of a scan; carries nothing
    Root,
    Assignment(Assignment),
    Block(Vec<ScanStmt>),
    User(UserStmt),
    For(ForLoop),
    Guard(Guard),
}

/// `lhs = rhs`. Substitution assignments of a user statement have no `lhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub lhs: Option<String>,
    pub rhs: ScanExpr,
}

/// Reference to a user statement instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStmt {
    /// Statement name, as found in the statement map
    pub statement: String,
    /// Value of each original iterator, in iteration vector order
    pub substitutions: Vec<Assignment>,
}

/// `for (iterator = lb; iterator <= ub; iterator += stride)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForLoop {
    pub iterator: String,
    pub lb: ScanExpr,
    /// Inclusive upper bound
    pub ub: ScanExpr,
    pub stride: i64,
    pub body: Vec<ScanStmt>,
}

/// Body executed only when every condition holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    pub conditions: Vec<Equation>,
    pub body: Vec<ScanStmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Le,
    Eq,
    Ge,
}

impl Sign {
    pub fn symbol(&self) -> &'static str {
        match self {
            Sign::Le => "<=",
            Sign::Eq => "==",
            Sign::Ge => ">=",
        }
    }
}

/// `lhs <sign> rhs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equation {
    pub lhs: ScanExpr,
    pub rhs: ScanExpr,
    pub sign: Sign,
}

/// Division or modulo by a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Quotient rounded toward negative infinity
    FloorDiv,
    /// Quotient rounded toward positive infinity
    CeilDiv,
    /// Quotient rounded toward zero
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReductionOp {
    Sum,
    Min,
    Max,
}

/// An expression of the scan AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanExpr {
    Name(String),
    /// `coeff * var`, or the constant `coeff` when there is no `var`
    Term {
        coeff: i64,
        var: Option<Box<ScanExpr>>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<ScanExpr>,
        rhs: i64,
    },
    Reduction {
        op: ReductionOp,
        elts: Vec<ScanExpr>,
    },
}

impl ScanExpr {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn constant(value: i64) -> Self {
        Self::Term { coeff: value, var: None }
    }

    /// `coeff * name`
    pub fn term(coeff: i64, name: impl Into<String>) -> Self {
        Self::Term { coeff, var: Some(Box::new(Self::name(name))) }
    }

    pub fn binary(op: BinaryOp, lhs: ScanExpr, rhs: i64) -> Self {
        Self::Binary { op, lhs: Box::new(lhs), rhs }
    }

    pub fn reduction(op: ReductionOp, elts: Vec<ScanExpr>) -> Self {
        Self::Reduction { op, elts }
    }

    pub fn sum(elts: Vec<ScanExpr>) -> Self {
        Self::reduction(ReductionOp::Sum, elts)
    }

    pub fn min(lhs: ScanExpr, rhs: ScanExpr) -> Self {
        Self::reduction(ReductionOp::Min, vec![lhs, rhs])
    }

    pub fn max(elts: Vec<ScanExpr>) -> Self {
        Self::reduction(ReductionOp::Max, elts)
    }
}

impl Equation {
    pub fn new(lhs: ScanExpr, sign: Sign, rhs: ScanExpr) -> Self {
        Self { lhs, rhs, sign }
    }
}

impl fmt::Display for ScanExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::codegen::printer::render_expr(self))
    }
}
