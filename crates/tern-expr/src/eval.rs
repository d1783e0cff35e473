//! Tree-walking evaluator.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::ExprError;
use std::fmt;

/// A value produced by evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalValue {
    /// 64-bit signed integer.
    Int(i64),
    /// String.
    Str(String),
}

impl EvalValue {
    /// Truthiness: non-zero integer or non-empty string.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Int(i) => *i != 0,
            Self::Str(s) => !s.is_empty(),
        }
    }

    /// The integer content, if this is an integer.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Str(_) => None,
        }
    }
}

impl fmt::Display for EvalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Symbol environment consulted for identifier references.
pub trait Env {
    /// Value of `name`, or `None` if the setting is undefined.
    fn lookup(&self, name: &str) -> Option<EvalValue>;
}

/// The empty environment: every identifier is undefined.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyEnv;

impl Env for EmptyEnv {
    fn lookup(&self, _name: &str) -> Option<EvalValue> {
        None
    }
}

/// Shared empty environment.
pub const EMPTY_ENV: EmptyEnv = EmptyEnv;

/// Expression evaluator over an environment.
///
/// Undefined identifiers evaluate to `0` by default; with
/// [`Evaluator::strict`] they fail instead, which is how
/// unknown-expression-identifier errors are surfaced to callers that
/// demand it.
pub struct Evaluator<'a> {
    env: &'a dyn Env,
    strict: bool,
}

impl fmt::Debug for Evaluator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

impl<'a> Evaluator<'a> {
    /// Evaluator with lenient identifier lookup.
    #[must_use]
    pub fn new(env: &'a dyn Env) -> Self {
        Self { env, strict: false }
    }

    /// Fail on identifiers the environment does not define.
    #[must_use]
    pub const fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Evaluate an expression tree.
    pub fn eval(&self, expr: &Expr) -> Result<EvalValue, ExprError> {
        match expr {
            Expr::Int(i) => Ok(EvalValue::Int(*i)),
            Expr::Str(s) => Ok(EvalValue::Str(s.clone())),
            Expr::Ident(name) => match self.env.lookup(name) {
                Some(value) => Ok(value),
                None if self.strict => Err(ExprError::eval(format!(
                    "unknown identifier `{name}`"
                ))),
                None => Ok(EvalValue::Int(0)),
            },
            Expr::Unary { op, operand } => self.eval_unary(*op, operand),
            Expr::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs),
        }
    }

    fn eval_unary(&self, op: UnaryOp, operand: &Expr) -> Result<EvalValue, ExprError> {
        let value = self.eval(operand)?;
        match op {
            UnaryOp::Not => Ok(EvalValue::Int(i64::from(!value.is_truthy()))),
            UnaryOp::Neg => match value.as_int() {
                Some(i) => i
                    .checked_neg()
                    .map(EvalValue::Int)
                    .ok_or_else(|| ExprError::eval("integer overflow in negation")),
                None => Err(ExprError::eval("unary `-` requires an integer operand")),
            },
        }
    }

    fn eval_binary(&self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<EvalValue, ExprError> {
        // Boolean operators short-circuit; everything else is strict.
        match op {
            BinaryOp::And => {
                let left = self.eval(lhs)?;
                if !left.is_truthy() {
                    return Ok(EvalValue::Int(0));
                }
                let right = self.eval(rhs)?;
                return Ok(EvalValue::Int(i64::from(right.is_truthy())));
            }
            BinaryOp::Or => {
                let left = self.eval(lhs)?;
                if left.is_truthy() {
                    return Ok(EvalValue::Int(1));
                }
                let right = self.eval(rhs)?;
                return Ok(EvalValue::Int(i64::from(right.is_truthy())));
            }
            _ => {}
        }

        let left = self.eval(lhs)?;
        let right = self.eval(rhs)?;

        match op {
            BinaryOp::Eq => Ok(EvalValue::Int(i64::from(values_equal(&left, &right)))),
            BinaryOp::Ne => Ok(EvalValue::Int(i64::from(!values_equal(&left, &right)))),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let (a, b) = int_operands(op, &left, &right)?;
                let holds = match op {
                    BinaryOp::Lt => a < b,
                    BinaryOp::Le => a <= b,
                    BinaryOp::Gt => a > b,
                    BinaryOp::Ge => a >= b,
                    _ => unreachable!("filtered above"),
                };
                Ok(EvalValue::Int(i64::from(holds)))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                let (a, b) = int_operands(op, &left, &right)?;
                let result = match op {
                    BinaryOp::Add => a.checked_add(b),
                    BinaryOp::Sub => a.checked_sub(b),
                    BinaryOp::Mul => a.checked_mul(b),
                    BinaryOp::Div => {
                        if b == 0 {
                            return Err(ExprError::eval("division by zero"));
                        }
                        a.checked_div(b)
                    }
                    _ => unreachable!("filtered above"),
                };
                result
                    .map(EvalValue::Int)
                    .ok_or_else(|| ExprError::eval(format!("integer overflow in `{op}`")))
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }
}

/// `==`/`!=` compare integers numerically; any string operand switches both
/// sides to string comparison.
fn values_equal(left: &EvalValue, right: &EvalValue) -> bool {
    match (left, right) {
        (EvalValue::Int(a), EvalValue::Int(b)) => a == b,
        _ => left.to_string() == right.to_string(),
    }
}

/// Ordering and arithmetic operators require integers on both sides.
fn int_operands(
    op: BinaryOp,
    left: &EvalValue,
    right: &EvalValue,
) -> Result<(i64, i64), ExprError> {
    match (left.as_int(), right.as_int()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(ExprError::eval(format!(
            "`{op}` requires integer operands, got `{left}` and `{right}`"
        ))),
    }
}
