//! Expression evaluation - tolerance propagation, derivatives and contributions
//!
//! Every query re-walks the tree. Nothing is cached between calls, so a
//! statistical result depends on the sampler state at the time of the call.

use miette::Diagnostic;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::core::algebra::DEG;
use crate::core::quantity::APPROX_TOL;
use crate::core::{EvalMethod, Quantity, QuantityError, Sampler};
use crate::expr::symbols::SymbolTable;
use crate::expr::token::{BinaryOp, UnaryOp};
use crate::expr::tree::{looks_numeric, Node, NodeId};

/// Errors raised while evaluating an expression
#[derive(Debug, Clone, Error, Diagnostic, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Domain(#[from] QuantityError),

    #[error("expression '{expression}': invalid leaf token '{token}'")]
    #[diagnostic(code(tolstack::eval::invalid_leaf))]
    InvalidLeaf { token: String, expression: String },
}

/// Pass/fail of each computed bound against the expression's limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LimitCheck {
    pub lower: bool,
    pub upper: bool,
}

impl LimitCheck {
    pub fn passed(&self) -> bool {
        self.lower && self.upper
    }
}

/// A named derived quantity defined by an infix expression
#[derive(Debug, Clone)]
pub struct Expression {
    /// Expression name
    pub key: String,

    /// Infix text as written by the user
    pub expr: String,

    /// Root node in the symbol table's arena
    pub root: NodeId,

    /// Lower limit, `-inf` when unspecified
    pub lower: f64,

    /// Upper limit, `+inf` when unspecified
    pub upper: f64,

    pub method: EvalMethod,

    pub note: Option<String>,
}

/// Leaf resolved for evaluation
enum Leaf<'a> {
    Value(&'a Quantity),
    Literal(f64),
}

impl Expression {
    /// Propagate tolerances through the tree
    pub fn evaluate(&self, symbols: &SymbolTable, sampler: &mut Sampler) -> Result<Quantity, EvalError> {
        self.eval_node(symbols, self.root, None, sampler)
    }

    /// Evaluate with one variable pinned at its center value
    pub fn evaluate_ideal(
        &self,
        symbols: &SymbolTable,
        var: &str,
        sampler: &mut Sampler,
    ) -> Result<Quantity, EvalError> {
        self.eval_node(symbols, self.root, Some(var), sampler)
    }

    /// Partial derivative with respect to `var` at the center operating point
    pub fn derivative(&self, symbols: &SymbolTable, var: &str) -> Result<f64, EvalError> {
        let centers = self.centers(symbols);
        self.diff_node(symbols, self.root, var, &centers)
            .map(|(_, partial)| partial)
    }

    /// Partial derivative for every referenced variable
    pub fn sensitivities(&self, symbols: &SymbolTable) -> Result<BTreeMap<String, f64>, EvalError> {
        let centers = self.centers(symbols);
        centers
            .keys()
            .map(|var| {
                let (_, partial) = self.diff_node(symbols, self.root, var, &centers)?;
                Ok((var.clone(), partial))
            })
            .collect()
    }

    /// Center of each referenced quantity, computed once per query
    fn centers(&self, symbols: &SymbolTable) -> HashMap<String, f64> {
        self.referenced_values(symbols)
            .into_iter()
            .filter_map(|var| {
                let center = symbols.value(&var)?.center(self.method);
                Some((var, center))
            })
            .collect()
    }

    /// Half the range reduction from pinning each referenced variable
    ///
    /// Monte Carlo noise can make the pinned range marginally wider than
    /// the base range; such contributions are clamped to zero.
    pub fn contributions(
        &self,
        symbols: &SymbolTable,
        sampler: &mut Sampler,
    ) -> Result<BTreeMap<String, f64>, EvalError> {
        let base = self.evaluate(symbols, sampler)?;
        let base_range = base.range(self.method);

        let mut contributions = BTreeMap::new();
        for var in self.referenced_values(symbols) {
            let fixed = symbols
                .value(&var)
                .is_none_or(|q| q.range(EvalMethod::WorstCase) == 0.0);
            if fixed {
                contributions.insert(var, 0.0);
                continue;
            }

            let pinned = self.evaluate_ideal(symbols, &var, sampler)?;
            let delta = (base_range - pinned.range(self.method)) / 2.0;
            if delta < 0.0 {
                log::debug!("'{}': contribution of '{}' clamped from {:e}", self.key, var, delta);
            }
            contributions.insert(var, delta.max(0.0));
        }
        Ok(contributions)
    }

    /// Canonical infix rendering of the tree
    pub fn expand(&self, symbols: &SymbolTable) -> String {
        symbols.tree().render(self.root)
    }

    /// Sorted names of every symbol-table quantity the tree references
    pub fn referenced_values(&self, symbols: &SymbolTable) -> Vec<String> {
        symbols
            .tree()
            .leaves(self.root)
            .into_iter()
            .filter(|token| symbols.value(token).is_some())
            .collect()
    }

    /// Compare a computed result against this expression's limits
    pub fn check(&self, value: &Quantity) -> LimitCheck {
        let low = value.lower(self.method);
        let high = value.upper(self.method);
        LimitCheck {
            lower: self.lower <= low || (self.lower - low).abs() <= APPROX_TOL,
            upper: self.upper >= high || (self.upper - high).abs() <= APPROX_TOL,
        }
    }

    fn leaf<'a>(&self, symbols: &'a SymbolTable, token: &str) -> Result<Leaf<'a>, EvalError> {
        if let Some(q) = symbols.value(token) {
            return Ok(Leaf::Value(q));
        }
        match token.parse::<f64>() {
            Ok(v) if looks_numeric(token) => Ok(Leaf::Literal(v)),
            _ => Err(EvalError::InvalidLeaf {
                token: token.to_string(),
                expression: self.key.clone(),
            }),
        }
    }

    fn eval_node(
        &self,
        symbols: &SymbolTable,
        id: NodeId,
        ideal: Option<&str>,
        sampler: &mut Sampler,
    ) -> Result<Quantity, EvalError> {
        match symbols.tree().node(id) {
            Node::Leaf(token) => Ok(match self.leaf(symbols, token)? {
                Leaf::Value(q) if ideal == Some(token.as_str()) => q.ideal(self.method, sampler),
                Leaf::Value(q) => q.clone(),
                Leaf::Literal(v) => Quantity::constant(token.clone(), v, sampler),
            }),
            Node::Unary { op, operand } => {
                let x = self.eval_node(symbols, *operand, ideal, sampler)?;
                Ok(match op {
                    UnaryOp::Neg => x.neg(sampler),
                    UnaryOp::Sin => x.sin(sampler),
                    UnaryOp::Cos => x.cos(sampler),
                    UnaryOp::Tan => x.tan(sampler)?,
                    UnaryOp::SinDeg => x.sind(sampler),
                    UnaryOp::CosDeg => x.cosd(sampler),
                    UnaryOp::TanDeg => x.tand(sampler)?,
                })
            }
            Node::Binary { op, left, right } => {
                let l = self.eval_node(symbols, *left, ideal, sampler)?;
                let r = self.eval_node(symbols, *right, ideal, sampler)?;
                Ok(match op {
                    BinaryOp::Add => l.add(&r, sampler),
                    BinaryOp::Sub => l.sub(&r, sampler),
                    BinaryOp::Mul => l.mul(&r, sampler),
                    BinaryOp::Div => l.div(&r, sampler)?,
                    BinaryOp::Pow => l.pow(&r, sampler),
                })
            }
        }
    }

    /// Forward-mode differentiation, returning `(value, partial)`
    fn diff_node(
        &self,
        symbols: &SymbolTable,
        id: NodeId,
        var: &str,
        centers: &HashMap<String, f64>,
    ) -> Result<(f64, f64), EvalError> {
        match symbols.tree().node(id) {
            Node::Leaf(token) => Ok(match self.leaf(symbols, token)? {
                Leaf::Value(q) => {
                    let seed = if q.key() == var { 1.0 } else { 0.0 };
                    let center = match centers.get(token.as_str()) {
                        Some(&c) => c,
                        None => q.center(self.method),
                    };
                    (center, seed)
                }
                Leaf::Literal(v) => (v, 0.0),
            }),
            Node::Unary { op, operand } => {
                let (x, dx) = self.diff_node(symbols, *operand, var, centers)?;
                Ok(match op {
                    UnaryOp::Neg => (-x, -dx),
                    UnaryOp::Sin => (x.sin(), x.cos() * dx),
                    UnaryOp::Cos => (x.cos(), -x.sin() * dx),
                    UnaryOp::Tan => (x.tan(), dx / x.cos().powi(2)),
                    UnaryOp::SinDeg => ((x * DEG).sin(), (x * DEG).cos() * dx * DEG),
                    UnaryOp::CosDeg => ((x * DEG).cos(), -(x * DEG).sin() * dx * DEG),
                    UnaryOp::TanDeg => ((x * DEG).tan(), dx * DEG / (x * DEG).cos().powi(2)),
                })
            }
            Node::Binary { op, left, right } => {
                let (l, dl) = self.diff_node(symbols, *left, var, centers)?;
                let (r, dr) = self.diff_node(symbols, *right, var, centers)?;
                Ok(match op {
                    BinaryOp::Add => (l + r, dl + dr),
                    BinaryOp::Sub => (l - r, dl - dr),
                    BinaryOp::Mul => (l * r, l * dr + r * dl),
                    BinaryOp::Div => (l / r, (r * dl - l * dr) / (r * r)),
                    BinaryOp::Pow => {
                        let value = l.powf(r);
                        // skip zero terms so ln(l) of a constant base never poisons the result
                        let mut rate = 0.0;
                        if dl != 0.0 {
                            rate += dl * r / l;
                        }
                        if dr != 0.0 {
                            rate += dr * l.ln();
                        }
                        (value, value * rate)
                    }
                })
            }
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.note {
            Some(note) => write!(f, "{} {}", self.expr, note),
            None => write!(f, "{}", self.expr),
        }
    }
}
