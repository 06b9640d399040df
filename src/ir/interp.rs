//! Reference evaluator for IR statements.
//!
//! Executes lowered loop nests over concrete parameter values. Calls to
//! external functions other than the arithmetic helpers are not executed;
//! they are recorded, in order, as a trace of statement instances.

use crate::ir::ast::*;
use crate::ir::builder::externals;
use num_integer::Integer;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Evaluation error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpError {
    #[error("variable {0} has no value")]
    UnboundVariable(VarId),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: String },

    #[error("literal '{0}' is not an integer")]
    BadLiteral(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("loop step must be positive, found {0}")]
    NonPositiveStep(i64),

    #[error("call to {callee} expects {expected} arguments, found {found}")]
    Arity { callee: String, expected: usize, found: usize },
}

/// A runtime value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Unit,
    Closure(Box<Closure>),
}

impl Value {
    fn kind(&self) -> String {
        match self {
            Value::Int(v) => format!("int {}", v),
            Value::Bool(b) => format!("bool {}", b),
            Value::Unit => "unit".to_string(),
            Value::Closure(_) => "closure".to_string(),
        }
    }

    pub fn as_int(&self) -> Result<i64, InterpError> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(InterpError::TypeMismatch { expected: "int", found: other.kind() }),
        }
    }

    pub fn as_bool(&self) -> Result<bool, InterpError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(InterpError::TypeMismatch { expected: "bool", found: other.kind() }),
        }
    }
}

/// One recorded call to an opaque external function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub name: String,
    pub args: Vec<i64>,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
        write!(f, "{}({})", self.name, args.join(", "))
    }
}

/// Tree-walking IR interpreter.
#[derive(Debug, Default)]
pub struct Interpreter {
    env: HashMap<VarId, i64>,
    trace: Vec<TraceEntry>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `var` an integer value (parameters, or values behind references).
    pub fn bind(&mut self, var: &Variable, value: i64) {
        self.env.insert(var.id, value);
    }

    pub fn with_binding(mut self, var: &Variable, value: i64) -> Self {
        self.bind(var, value);
        self
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    pub fn into_trace(self) -> Vec<TraceEntry> {
        self.trace
    }

    /// Execute a statement. A `return` outside a closure stops execution of
    /// the enclosing statements.
    pub fn exec(&mut self, stmt: &Stmt) -> Result<(), InterpError> {
        self.exec_stmt(stmt).map(|_| ())
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Option<Value>, InterpError> {
        match stmt {
            Stmt::Expr(e) => {
                self.eval(e)?;
                Ok(None)
            }
            Stmt::Decl { var, init } => {
                let value = self.eval(init)?.as_int()?;
                self.env.insert(var.id, value);
                Ok(None)
            }
            Stmt::Compound(stmts) => {
                for s in stmts {
                    if let Some(v) = self.exec_stmt(s)? {
                        return Ok(Some(v));
                    }
                }
                Ok(None)
            }
            Stmt::If { cond, then_body, else_body } => {
                if self.eval(cond)?.as_bool()? {
                    self.exec_stmt(then_body)
                } else if let Some(else_body) = else_body {
                    self.exec_stmt(else_body)
                } else {
                    Ok(None)
                }
            }
            Stmt::For(for_loop) => self.exec_for(for_loop),
            Stmt::Return(e) => Ok(Some(self.eval(e)?)),
        }
    }

    fn exec_for(&mut self, for_loop: &ForLoop) -> Result<Option<Value>, InterpError> {
        let start = self.eval(&for_loop.start)?.as_int()?;
        let step = self.eval(&for_loop.step)?.as_int()?;
        if step <= 0 {
            return Err(InterpError::NonPositiveStep(step));
        }
        let saved = self.env.get(&for_loop.var.id).copied();

        let mut result = None;
        let mut i = start;
        // The end bound is re-evaluated on every iteration.
        while i < self.eval(&for_loop.end)?.as_int()? {
            self.env.insert(for_loop.var.id, i);
            if let Some(v) = self.exec_stmt(&for_loop.body)? {
                result = Some(v);
                break;
            }
            i += step;
        }

        match saved {
            Some(v) => self.env.insert(for_loop.var.id, v),
            None => self.env.remove(&for_loop.var.id),
        };
        Ok(result)
    }

    /// Evaluate an expression.
    pub fn eval(&mut self, expr: &Expr) -> Result<Value, InterpError> {
        match expr {
            Expr::Literal(lit) => match lit.ty {
                Type::Bool => Ok(Value::Bool(lit.value == "true")),
                _ => lit.as_int()
                    .map(Value::Int)
                    .ok_or_else(|| InterpError::BadLiteral(lit.value.clone())),
            },
            Expr::Var(var) => self.env.get(&var.id)
                .map(|v| Value::Int(*v))
                .ok_or(InterpError::UnboundVariable(var.id)),
            Expr::Closure(closure) => Ok(Value::Closure(closure.clone())),
            Expr::Call(call) => self.eval_call(call),
        }
    }

    fn call_closure(&mut self, value: Value) -> Result<Value, InterpError> {
        match value {
            Value::Closure(closure) => Ok(self.exec_stmt(&closure.body)?.unwrap_or(Value::Unit)),
            other => Err(InterpError::TypeMismatch { expected: "closure", found: other.kind() }),
        }
    }

    fn eval_call(&mut self, call: &CallExpr) -> Result<Value, InterpError> {
        match &call.callee {
            Callee::Primitive(prim) => self.eval_primitive(*prim, &call.args),
            Callee::External(lit) => self.eval_external(&lit.value, &call.args),
        }
    }

    fn int_args<const N: usize>(&mut self, name: &str, args: &[Expr]) -> Result<[i64; N], InterpError> {
        if args.len() != N {
            return Err(InterpError::Arity { callee: name.to_string(), expected: N, found: args.len() });
        }
        let mut values = [0; N];
        for (slot, arg) in values.iter_mut().zip(args) {
            *slot = self.eval(arg)?.as_int()?;
        }
        Ok(values)
    }

    fn eval_primitive(&mut self, prim: Primitive, args: &[Expr]) -> Result<Value, InterpError> {
        let name = prim.name();
        match prim {
            Primitive::IntAdd => {
                let [a, b] = self.int_args::<2>(name, args)?;
                Ok(Value::Int(a + b))
            }
            Primitive::IntMul => {
                let [a, b] = self.int_args::<2>(name, args)?;
                Ok(Value::Int(a * b))
            }
            Primitive::IntDiv => {
                let [a, b] = self.int_args::<2>(name, args)?;
                a.checked_div(b).map(Value::Int).ok_or(InterpError::DivisionByZero)
            }
            Primitive::IntMod => {
                let [a, b] = self.int_args::<2>(name, args)?;
                a.checked_rem(b).map(Value::Int).ok_or(InterpError::DivisionByZero)
            }
            Primitive::IntLt => {
                let [a, b] = self.int_args::<2>(name, args)?;
                Ok(Value::Bool(a < b))
            }
            Primitive::IntLe => {
                let [a, b] = self.int_args::<2>(name, args)?;
                Ok(Value::Bool(a <= b))
            }
            Primitive::IntGe => {
                let [a, b] = self.int_args::<2>(name, args)?;
                Ok(Value::Bool(a >= b))
            }
            Primitive::IntEq => {
                let [a, b] = self.int_args::<2>(name, args)?;
                Ok(Value::Bool(a == b))
            }
            Primitive::LogicAnd => {
                let [lhs, rhs] = expect_args::<2>(name, args)?;
                if !self.eval(lhs)?.as_bool()? {
                    return Ok(Value::Bool(false));
                }
                let rhs = self.eval(rhs)?;
                Ok(Value::Bool(self.call_closure(rhs)?.as_bool()?))
            }
            Primitive::Ite => {
                let [cond, then_branch, else_branch] = expect_args::<3>(name, args)?;
                let chosen = if self.eval(cond)?.as_bool()? { then_branch } else { else_branch };
                let closure = self.eval(chosen)?;
                self.call_closure(closure)
            }
            Primitive::Deref => {
                let [target] = expect_args::<1>(name, args)?;
                self.eval(target)
            }
        }
    }

    fn eval_external(&mut self, name: &str, args: &[Expr]) -> Result<Value, InterpError> {
        match name {
            externals::MAX => {
                let [a, b] = self.int_args::<2>(name, args)?;
                Ok(Value::Int(a.max(b)))
            }
            externals::FLOOR => {
                let [a, b] = self.int_args::<2>(name, args)?;
                if b == 0 {
                    return Err(InterpError::DivisionByZero);
                }
                Ok(Value::Int(Integer::div_floor(&a, &b)))
            }
            externals::CEIL => {
                let [a, b] = self.int_args::<2>(name, args)?;
                if b == 0 {
                    return Err(InterpError::DivisionByZero);
                }
                Ok(Value::Int(-Integer::div_floor(&-a, &b)))
            }
            _ => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?.as_int()?);
                }
                self.trace.push(TraceEntry { name: name.to_string(), args: values });
                Ok(Value::Unit)
            }
        }
    }
}

fn expect_args<'e, const N: usize>(name: &str, args: &'e [Expr]) -> Result<&'e [Expr; N], InterpError> {
    args.try_into().map_err(|_| InterpError::Arity {
        callee: name.to_string(),
        expected: N,
        found: args.len(),
    })
}
