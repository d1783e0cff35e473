//! Boolean/arithmetic expression engine for conditional configuration.
//!
//! Descriptor keys may carry conditional suffixes (`pkg.deps.BLE_HOST`,
//! `syscfg.vals.(LOG_LEVEL > 1)`); this crate lexes, parses, and evaluates
//! those expressions over a symbol environment, typically the flattened
//! syscfg.
//!
//! The pipeline is a one-pass scanner ([`token::lex`]), a classical
//! precedence-climbing parser ([`parser::parse`]), and a tree-walking
//! evaluator ([`eval::Evaluator`]). Truthiness is non-zero integer or
//! non-empty string.

pub mod ast;
pub mod error;
pub mod eval;
pub mod parser;
pub mod token;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use error::ExprError;
pub use eval::{Env, EvalValue, Evaluator, EMPTY_ENV};
pub use parser::parse;
pub use token::{Token, lex};

/// Lex, parse, and evaluate `input` in one call.
pub fn eval_str(input: &str, env: &dyn Env) -> Result<EvalValue, ExprError> {
    let expr = parse(input)?;
    Evaluator::new(env).eval(&expr)
}

/// Lex, parse, and evaluate `input`, reducing the result to truthiness.
pub fn eval_truthy(input: &str, env: &dyn Env) -> Result<bool, ExprError> {
    Ok(eval_str(input, env)?.is_truthy())
}
