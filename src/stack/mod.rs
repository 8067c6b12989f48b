//! Stack module - builds quantities and expressions from input rows
//!
//! Constants and dimensions are defined before any expression tree is built.
//! Expressions may reference quantities and earlier expressions, never later
//! ones.

pub mod analysis;
pub mod file;
pub mod rows;

pub use analysis::{analyze, AnalysisOptions, ExpressionOutcome, ExpressionResult};
pub use file::{AnalysisInfo, StackFile, StackFileError, StackOptions};
pub use rows::{Row, RowError, RowErrorKind, Rows, Section};

use miette::Diagnostic;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::core::{Quantity, Sampler};
use crate::expr::{Expression, SymbolTable};

/// Every row error found while building a stack
#[derive(Debug, Error, Diagnostic)]
#[error("stack definition has {summary}")]
#[diagnostic(
    code(tolstack::stack::invalid),
    help("fix the rows listed below; `tolstack check` lists them without running an analysis")
)]
pub struct StackErrors {
    summary: String,

    #[related]
    errors: Vec<RowError>,
}

impl StackErrors {
    pub fn new(errors: Vec<RowError>) -> Self {
        let summary = if errors.len() == 1 {
            "1 error".to_string()
        } else {
            format!("{} errors", errors.len())
        };
        Self { summary, errors }
    }

    pub fn errors(&self) -> &[RowError] {
        &self.errors
    }
}

/// Constants, dimensions and expressions with their shared symbol table
#[derive(Debug, Clone, Default)]
pub struct Stack {
    constants: Vec<String>,
    dimensions: Vec<String>,
    expressions: Vec<Expression>,
    symbols: SymbolTable,
    where_used: BTreeMap<String, BTreeSet<String>>,
}

impl Stack {
    /// Build a stack, failing if any row is invalid
    pub fn parse(rows: &Rows, sampler: &mut Sampler) -> Result<Self, StackErrors> {
        let (stack, errors) = Self::parse_partial(rows, sampler);
        if errors.is_empty() {
            Ok(stack)
        } else {
            Err(StackErrors::new(errors))
        }
    }

    /// Build as much of a stack as possible, collecting every row error
    ///
    /// Invalid rows are skipped. Expressions that reference a skipped row
    /// fail in turn with an unresolved-name error.
    pub fn parse_partial(rows: &Rows, sampler: &mut Sampler) -> (Self, Vec<RowError>) {
        let mut stack = Stack::default();
        let mut errors = Vec::new();

        for (i, row) in rows.constants.iter().enumerate() {
            let result = stack
                .ensure_new(row.name())
                .and_then(|_| rows::parse_constant(row, sampler));
            match result {
                Ok(q) => {
                    stack.constants.push(q.key().to_string());
                    stack.symbols.insert(q);
                }
                Err(kind) => errors.push(RowError::new(Section::Constants, i + 1, row.name(), kind)),
            }
        }

        for (i, row) in rows.dimensions.iter().enumerate() {
            let result = stack
                .ensure_new(row.name())
                .and_then(|_| rows::parse_dimension(row, sampler));
            match result {
                Ok(q) => {
                    stack.dimensions.push(q.key().to_string());
                    stack.symbols.insert(q);
                }
                Err(kind) => errors.push(RowError::new(Section::Dimensions, i + 1, row.name(), kind)),
            }
        }

        for (i, row) in rows.expressions.iter().enumerate() {
            if let Err(kind) = stack.add_expression(row) {
                errors.push(RowError::new(Section::Expressions, i + 1, row.name(), kind));
            }
        }

        for err in &errors {
            log::debug!("skipping {}", err);
        }
        log::info!(
            "parsed stack: {} constants, {} dimensions, {} expressions ({} rows rejected)",
            stack.constants.len(),
            stack.dimensions.len(),
            stack.expressions.len(),
            errors.len()
        );

        (stack, errors)
    }

    fn ensure_new(&self, name: &str) -> Result<(), RowErrorKind> {
        if !name.is_empty() && self.symbols.is_defined(name) {
            return Err(RowErrorKind::Duplicate(name.to_string()));
        }
        Ok(())
    }

    fn add_expression(&mut self, row: &Row) -> Result<(), RowErrorKind> {
        let fields = rows::parse_expression(row)?;
        self.ensure_new(&fields.key)?;
        let root = self.symbols.construct(&fields.key, &fields.expr)?;

        let expression = Expression {
            key: fields.key,
            expr: fields.expr,
            root,
            lower: fields.lower,
            upper: fields.upper,
            method: fields.method,
            note: fields.note,
        };

        for var in expression.referenced_values(&self.symbols) {
            self.where_used
                .entry(var)
                .or_default()
                .insert(expression.key.clone());
        }
        self.expressions.push(expression);
        Ok(())
    }

    /// Constants in input order
    pub fn constants(&self) -> impl Iterator<Item = &Quantity> {
        self.constants.iter().filter_map(|k| self.symbols.value(k))
    }

    /// Dimensions in input order
    pub fn dimensions(&self) -> impl Iterator<Item = &Quantity> {
        self.dimensions.iter().filter_map(|k| self.symbols.value(k))
    }

    /// Expressions in input order
    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    pub fn expression(&self, name: &str) -> Option<&Expression> {
        self.expressions.iter().find(|e| e.key == name)
    }

    /// A constant or dimension by name
    pub fn value(&self, name: &str) -> Option<&Quantity> {
        self.symbols.value(name)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Expressions that reference each constant or dimension
    pub fn where_used(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.where_used
    }

    /// Expressions that reference `name`, empty when unused
    pub fn used_in(&self, name: &str) -> Vec<&str> {
        self.where_used
            .get(name)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DistType, EvalMethod};
    use crate::expr::TreeError;

    fn sampler() -> Sampler {
        Sampler::seeded(5_000, 17)
    }

    fn rows() -> Rows {
        Rows {
            constants: vec![Row::new(["K", "2", "scale"])],
            dimensions: vec![
                Row::new(["D1", "10", "0.1", "-0.1"]),
                Row::new(["D2", "4", "0.05", "-0.05", "3S", "PN-2"]),
                Row::new(["D3", "1", "0.01", "-0.01"]),
            ],
            expressions: vec![
                Row::new(["GAP", "D1 - D2 * K", "1.5", "2.5", "W", "gap"]),
                Row::new(["HALF", "GAP / K", "", "", "3S"]),
            ],
        }
    }

    #[test]
    fn test_parse_builds_in_order() {
        let mut s = sampler();
        let stack = Stack::parse(&rows(), &mut s).unwrap();

        let constants: Vec<_> = stack.constants().map(|q| q.key()).collect();
        let dimensions: Vec<_> = stack.dimensions().map(|q| q.key()).collect();
        assert_eq!(constants, vec!["K"]);
        assert_eq!(dimensions, vec!["D1", "D2", "D3"]);
        assert_eq!(stack.expressions().len(), 2);

        let d2 = stack.value("D2").unwrap();
        assert_eq!(d2.dist_type(), DistType::Normal3S);
        assert_eq!(d2.part_number(), Some("PN-2"));

        let half = stack.expression("HALF").unwrap();
        assert_eq!(half.method, EvalMethod::Statistical3S);
        assert!(half.lower.is_infinite());
    }

    #[test]
    fn test_where_used() {
        let mut s = sampler();
        let stack = Stack::parse(&rows(), &mut s).unwrap();
        assert_eq!(stack.used_in("D1"), vec!["GAP", "HALF"]);
        assert_eq!(stack.used_in("K"), vec!["GAP", "HALF"]);
        assert!(stack.used_in("D3").is_empty());
        assert!(!stack.where_used().contains_key("GAP"));
    }

    #[test]
    fn test_composite_expression_evaluates() {
        let mut s = sampler();
        let stack = Stack::parse(&rows(), &mut s).unwrap();
        let half = stack.expression("HALF").unwrap();
        let q = half.evaluate(stack.symbols(), &mut s).unwrap();
        assert!((q.nom() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial_collects_every_error() {
        let mut s = sampler();
        let mut input = rows();
        input.constants.push(Row::new(["BAD", "x"]));
        input.dimensions.push(Row::new(["D1", "1", "0.1", "-0.1"]));
        input.expressions.push(Row::new(["E3", "D1 + NOPE"]));

        let (stack, errors) = Stack::parse_partial(&input, &mut s);
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].section, Section::Constants);
        assert_eq!(errors[0].row, 2);
        assert_eq!(errors[1].kind, RowErrorKind::Duplicate("D1".into()));
        assert!(matches!(
            &errors[2].kind,
            RowErrorKind::Tree(TreeError::Unresolved { token, .. }) if token == "NOPE"
        ));

        // valid rows still land
        assert_eq!(stack.expressions().len(), 2);
        assert_eq!(stack.dimensions().count(), 3);
    }

    #[test]
    fn test_strict_parse_aggregates() {
        let mut s = sampler();
        let mut input = rows();
        input.dimensions.push(Row::new(["D9", "1", "-0.1", "0.1"]));
        input.expressions.push(Row::new(["E9", "D9 * 2"]));

        let err = Stack::parse(&input, &mut s).unwrap_err();
        assert_eq!(err.errors().len(), 2);
        assert_eq!(err.to_string(), "stack definition has 2 errors");
    }

    #[test]
    fn test_expression_name_clash() {
        let mut s = sampler();
        let mut input = rows();
        input.expressions.push(Row::new(["K", "D1 + D2"]));
        let (_, errors) = Stack::parse_partial(&input, &mut s);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, RowErrorKind::Duplicate("K".into()));
    }

    #[test]
    fn test_expressions_cannot_reference_later_ones() {
        let mut s = sampler();
        let input = Rows {
            constants: vec![],
            dimensions: vec![Row::new(["D1", "10", "0.1", "-0.1"])],
            expressions: vec![Row::new(["E1", "E2 * 2"]), Row::new(["E2", "D1 + 1"])],
        };

        let (stack, errors) = Stack::parse_partial(&input, &mut s);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].section, Section::Expressions);
        assert_eq!(errors[0].name, "E1");
        assert!(matches!(
            &errors[0].kind,
            RowErrorKind::Tree(TreeError::Unresolved { token, expression })
                if token == "E2" && expression == "E1"
        ));

        assert!(stack.expression("E1").is_none());
        let e2 = stack.expression("E2").unwrap();
        let q = e2.evaluate(stack.symbols(), &mut s).unwrap();
        assert!((q.nom() - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_unreferenceable_names_fail_on_their_own_row() {
        let mut s = sampler();
        let input = Rows {
            constants: vec![],
            dimensions: vec![
                Row::new(["sin", "1", "0.1", "-0.1"]),
                Row::new(["D-1", "2", "0.1", "-0.1"]),
                Row::new(["D2", "3", "0.1", "-0.1"]),
            ],
            expressions: vec![Row::new(["E", "D2 * 2"])],
        };

        let (stack, errors) = Stack::parse_partial(&input, &mut s);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].section, Section::Dimensions);
        assert_eq!(errors[0].kind, RowErrorKind::ReservedName("sin".into()));
        assert_eq!(errors[1].row, 2);
        assert_eq!(errors[1].kind, RowErrorKind::InvalidName("D-1".into()));
        assert_eq!(stack.dimensions().count(), 1);
        assert_eq!(stack.expressions().len(), 1);
    }
}
