//! Per-expression analysis results
//!
//! Each expression is evaluated on its own. A domain error in one
//! expression is recorded in its outcome and the rest still run.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::core::{EvalMethod, Sampler};
use crate::expr::{EvalError, Expression, LimitCheck};
use crate::stack::Stack;

/// Optional analyses to run for every expression
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub sensitivity: bool,
    pub contributions: bool,
}

/// Computed values for one expression
#[derive(Debug, Clone, Serialize)]
pub struct ExpressionResult {
    pub name: String,
    pub note: Option<String>,
    pub expression: String,
    pub expansion: String,
    #[serde(serialize_with = "method_code")]
    pub method: EvalMethod,
    pub nominal: f64,
    pub center: f64,
    pub lower_tol: f64,
    pub upper_tol: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// `None` when unspecified
    pub lower_limit: Option<f64>,
    pub upper_limit: Option<f64>,
    pub check: LimitCheck,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivities: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributions: Option<BTreeMap<String, f64>>,
}

/// Result of analysing one expression
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExpressionOutcome {
    Evaluated(ExpressionResult),
    Failed {
        name: String,
        note: Option<String>,
        expression: String,
        #[serde(serialize_with = "error_message")]
        error: EvalError,
    },
}

impl ExpressionOutcome {
    pub fn name(&self) -> &str {
        match self {
            ExpressionOutcome::Evaluated(result) => &result.name,
            ExpressionOutcome::Failed { name, .. } => name,
        }
    }

    /// True when the expression evaluated and met its limits
    pub fn passed(&self) -> bool {
        matches!(self, ExpressionOutcome::Evaluated(result) if result.passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ExpressionOutcome::Failed { .. })
    }
}

fn method_code<S: Serializer>(method: &EvalMethod, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(method.code())
}

fn error_message<S: Serializer>(error: &EvalError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

fn finite(limit: f64) -> Option<f64> {
    limit.is_finite().then_some(limit)
}

/// Evaluate every expression in the stack, in input order
pub fn analyze(stack: &Stack, options: &AnalysisOptions, sampler: &mut Sampler) -> Vec<ExpressionOutcome> {
    stack
        .expressions()
        .iter()
        .map(|expression| match evaluate(stack, expression, options, sampler) {
            Ok(result) => {
                log::info!(
                    "{}: {} [{:.6}, {:.6}] {}",
                    result.name,
                    result.method,
                    result.lower_bound,
                    result.upper_bound,
                    if result.passed { "pass" } else { "fail" }
                );
                ExpressionOutcome::Evaluated(result)
            }
            Err(error) => {
                log::info!("{}: {}", expression.key, error);
                ExpressionOutcome::Failed {
                    name: expression.key.clone(),
                    note: expression.note.clone(),
                    expression: expression.expr.clone(),
                    error,
                }
            }
        })
        .collect()
}

fn evaluate(
    stack: &Stack,
    expression: &Expression,
    options: &AnalysisOptions,
    sampler: &mut Sampler,
) -> Result<ExpressionResult, EvalError> {
    let symbols = stack.symbols();
    let method = expression.method;
    let value = expression.evaluate(symbols, sampler)?;
    let check = expression.check(&value);

    let sensitivities = if options.sensitivity {
        Some(expression.sensitivities(symbols)?)
    } else {
        None
    };
    let contributions = if options.contributions {
        Some(expression.contributions(symbols, sampler)?)
    } else {
        None
    };

    Ok(ExpressionResult {
        name: expression.key.clone(),
        note: expression.note.clone(),
        expression: expression.expr.clone(),
        expansion: expression.expand(symbols),
        method,
        nominal: value.nom(),
        center: value.center(method),
        lower_tol: value.lower_tol(method),
        upper_tol: value.upper_tol(method),
        lower_bound: value.lower(method),
        upper_bound: value.upper(method),
        lower_limit: finite(expression.lower),
        upper_limit: finite(expression.upper),
        check,
        passed: check.passed(),
        sensitivities,
        contributions,
    })
}
