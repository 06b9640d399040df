//! Target IR node definitions.
//!
//! The IR is a small structured statement language:
//! - Typed literals and variables with unique identities
//! - Calls to built-in primitives or to named external functions
//! - Zero-argument closures wrapping a single statement
//! - Declarations, compounds, `if` and `for` statements

use std::fmt;

/// A unique identifier for IR variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u64);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// IR type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Signed integer of the given byte width
    Int(u8),
    /// Integer of unspecified width, used by generic externals
    GenInt,
    Bool,
    /// Real number of the given byte width
    Real(u8),
    Unit,
    /// Mutable reference to a value of the inner type
    Ref(Box<Type>),
    Function {
        params: Vec<Type>,
        ret: Box<Type>,
    },
}

impl Type {
    /// The 4-byte signed integer type used for induction variables.
    pub fn int4() -> Self {
        Type::Int(4)
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Type::Ref(_))
    }

    /// Type of the value a reference points to; other types are returned as is.
    pub fn deref_target(&self) -> &Type {
        match self {
            Type::Ref(inner) => inner,
            other => other,
        }
    }

    /// Return type of a function type; other types are returned as is.
    pub fn return_type(&self) -> &Type {
        match self {
            Type::Function { ret, .. } => ret,
            other => other,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int(width) => write!(f, "int<{}>", width),
            Type::GenInt => write!(f, "int<'a>"),
            Type::Bool => write!(f, "bool"),
            Type::Real(width) => write!(f, "real<{}>", width),
            Type::Unit => write!(f, "unit"),
            Type::Ref(inner) => write!(f, "ref<{}>", inner),
            Type::Function { params, ret } => {
                let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
                write!(f, "({}) -> {}", params.join(", "), ret)
            }
        }
    }
}

/// A typed variable. Two variables are the same only if their ids match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub id: VarId,
    pub ty: Type,
}

/// A literal whose value is kept in textual form.
///
/// External functions are literals of function type named by their value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub value: String,
    pub ty: Type,
}

impl Literal {
    /// Integer value of the literal, if it parses as one.
    pub fn as_int(&self) -> Option<i64> {
        self.value.parse().ok()
    }
}

/// Built-in operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    IntAdd,
    IntMul,
    /// Truncating division
    IntDiv,
    IntMod,
    IntLt,
    IntLe,
    IntGe,
    IntEq,
    /// Logical and; the second operand is a closure
    LogicAnd,
    /// `ite(cond, then, else)` with closure branches, evaluating one of them
    Ite,
    /// Load the value behind a reference
    Deref,
}

impl Primitive {
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::IntAdd => "int.add",
            Primitive::IntMul => "int.mul",
            Primitive::IntDiv => "int.div",
            Primitive::IntMod => "int.mod",
            Primitive::IntLt => "int.lt",
            Primitive::IntLe => "int.le",
            Primitive::IntGe => "int.ge",
            Primitive::IntEq => "int.eq",
            Primitive::LogicAnd => "bool.and",
            Primitive::Ite => "ite",
            Primitive::Deref => "ref.deref",
        }
    }

    /// Infix operator used when rendering binary primitives.
    pub fn infix(&self) -> Option<&'static str> {
        match self {
            Primitive::IntAdd => Some("+"),
            Primitive::IntMul => Some("*"),
            Primitive::IntDiv => Some("/"),
            Primitive::IntMod => Some("%"),
            Primitive::IntLt => Some("<"),
            Primitive::IntLe => Some("<="),
            Primitive::IntGe => Some(">="),
            Primitive::IntEq => Some("=="),
            Primitive::LogicAnd => Some("&&"),
            Primitive::Ite | Primitive::Deref => None,
        }
    }
}

/// What a call invokes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Callee {
    Primitive(Primitive),
    /// An external function, identified by a literal of function type
    External(Literal),
}

impl Callee {
    pub fn name(&self) -> &str {
        match self {
            Callee::Primitive(p) => p.name(),
            Callee::External(lit) => &lit.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallExpr {
    pub callee: Callee,
    pub args: Vec<Expr>,
    /// Result type of the call
    pub ty: Type,
}

/// A zero-argument closure whose body is one statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Closure {
    pub body: Stmt,
    /// Type of the value the closure returns
    pub ty: Type,
}

/// IR expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Literal(Literal),
    Var(Variable),
    Call(Box<CallExpr>),
    Closure(Box<Closure>),
}

impl Expr {
    /// Static type of the expression.
    pub fn ty(&self) -> Type {
        match self {
            Expr::Literal(lit) => lit.ty.clone(),
            Expr::Var(var) => var.ty.clone(),
            Expr::Call(call) => call.ty.clone(),
            Expr::Closure(closure) => Type::Function {
                params: Vec::new(),
                ret: Box::new(closure.ty.clone()),
            },
        }
    }

    pub fn as_var(&self) -> Option<&Variable> {
        match self {
            Expr::Var(var) => Some(var),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&CallExpr> {
        match self {
            Expr::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expr::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// Check if this is a call to the given primitive.
    pub fn is_primitive_call(&self, prim: Primitive) -> bool {
        matches!(self, Expr::Call(call) if call.callee == Callee::Primitive(prim))
    }
}

/// A counted `for` loop: `var` runs from `start` (inclusive) to `end`
/// (exclusive) by `step`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForLoop {
    pub var: Variable,
    pub start: Expr,
    pub end: Expr,
    pub step: Expr,
    pub body: Stmt,
}

/// IR statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stmt {
    Expr(Expr),
    Decl {
        var: Variable,
        init: Expr,
    },
    Compound(Vec<Stmt>),
    If {
        cond: Expr,
        then_body: Box<Stmt>,
        else_body: Option<Box<Stmt>>,
    },
    For(Box<ForLoop>),
    Return(Expr),
}

impl Stmt {
    pub fn as_compound(&self) -> Option<&[Stmt]> {
        match self {
            Stmt::Compound(stmts) => Some(stmts),
            _ => None,
        }
    }

    pub fn as_for(&self) -> Option<&ForLoop> {
        match self {
            Stmt::For(for_loop) => Some(for_loop),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(Type::int4().to_string(), "int<4>");
        assert_eq!(Type::Ref(Box::new(Type::int4())).to_string(), "ref<int<4>>");
        let max = Type::Function {
            params: vec![Type::GenInt, Type::GenInt],
            ret: Box::new(Type::GenInt),
        };
        assert_eq!(max.to_string(), "(int<'a>, int<'a>) -> int<'a>");
    }

    #[test]
    fn test_closure_type() {
        let closure = Expr::Closure(Box::new(Closure {
            body: Stmt::Return(Expr::Literal(Literal { value: "1".into(), ty: Type::int4() })),
            ty: Type::int4(),
        }));
        assert_eq!(closure.ty().return_type(), &Type::int4());
    }

    #[test]
    fn test_deref_target() {
        let r = Type::Ref(Box::new(Type::Int(8)));
        assert!(r.is_ref());
        assert_eq!(r.deref_target(), &Type::Int(8));
        assert_eq!(Type::Bool.deref_target(), &Type::Bool);
    }
}
