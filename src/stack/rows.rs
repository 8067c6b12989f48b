//! Input rows - raw text records and their conversion to quantities

use miette::Diagnostic;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::core::{DistType, EvalMethod, Quantity, QuantityError, Sampler};
use crate::expr::{TreeError, UnaryOp};

/// A name an expression can refer to
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap_or_else(|e| panic!("invalid name pattern: {e}"))
});

/// Section of a stack a row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Constants,
    Dimensions,
    Expressions,
}

impl Section {
    /// Maximum number of comma-separated fields; the last one absorbs extra commas
    pub fn field_limit(&self) -> usize {
        match self {
            Section::Constants => 3,
            Section::Dimensions => 7,
            Section::Expressions => 6,
        }
    }

    /// Minimum number of fields for a usable row
    pub fn required_fields(&self) -> usize {
        match self {
            Section::Constants => 2,
            Section::Dimensions => 4,
            Section::Expressions => 2,
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Section::Constants => write!(f, "constants"),
            Section::Dimensions => write!(f, "dimensions"),
            Section::Expressions => write!(f, "expressions"),
        }
    }
}

/// One input record: text fields in column order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    pub fields: Vec<String>,
}

impl Row {
    pub fn new<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a line on commas, keeping at most `limit` fields
    pub fn split(line: &str, limit: usize) -> Self {
        Self::new(line.splitn(limit.max(1), ','))
    }

    /// Trimmed field, `None` when absent or blank
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields
            .get(index)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Trimmed row name, empty when absent
    pub fn name(&self) -> &str {
        self.fields.first().map(|s| s.trim()).unwrap_or("")
    }

    /// Fields joined back with commas
    pub fn join(&self) -> String {
        self.fields.join(",")
    }
}

/// The three ordered row collections that define a stack
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rows {
    pub constants: Vec<Row>,
    pub dimensions: Vec<Row>,
    pub expressions: Vec<Row>,
}

impl Rows {
    pub fn section(&self, section: Section) -> &[Row] {
        match section {
            Section::Constants => &self.constants,
            Section::Dimensions => &self.dimensions,
            Section::Expressions => &self.expressions,
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut Vec<Row> {
        match section {
            Section::Constants => &mut self.constants,
            Section::Dimensions => &mut self.dimensions,
            Section::Expressions => &mut self.expressions,
        }
    }

    pub fn len(&self) -> usize {
        self.constants.len() + self.dimensions.len() + self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What went wrong with a row
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RowErrorKind {
    #[error("expected at least {expected} fields, found {found}")]
    MissingFields { expected: usize, found: usize },

    #[error("name is empty")]
    EmptyName,

    #[error("'{0}' cannot be used in expressions (use letters, digits and '_', not starting with a digit)")]
    InvalidName(String),

    #[error("'{0}' is a function name")]
    ReservedName(String),

    #[error("{field} '{value}' is not a number")]
    MalformedNumber { field: &'static str, value: String },

    #[error("{field} '{value}' is not a valid percentage")]
    MalformedPercent { field: &'static str, value: String },

    #[error("unknown distribution code '{0}' (expected U, 1S, 2S, 3S or C)")]
    UnknownDistribution(String),

    #[error("unknown evaluation method '{0}' (expected W, 1S, 2S or 3S)")]
    UnknownMethod(String),

    #[error("'{0}' is already defined")]
    Duplicate(String),

    #[error(transparent)]
    Quantity(#[from] QuantityError),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// A row that could not be turned into a constant, dimension or expression
#[derive(Debug, Clone, Error, Diagnostic, PartialEq)]
#[error("{section} row {row} '{name}': {kind}")]
#[diagnostic(code(tolstack::row::invalid))]
pub struct RowError {
    pub section: Section,
    /// 1-based position within the section
    pub row: usize,
    pub name: String,
    pub kind: RowErrorKind,
}

impl RowError {
    pub fn new(section: Section, row: usize, name: impl Into<String>, kind: impl Into<RowErrorKind>) -> Self {
        Self {
            section,
            row,
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// Parsed expression row, before its tree is built
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionFields {
    pub key: String,
    pub expr: String,
    pub lower: f64,
    pub upper: f64,
    pub method: EvalMethod,
    pub note: Option<String>,
}

fn number(field: &'static str, value: &str) -> Result<f64, RowErrorKind> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| RowErrorKind::MalformedNumber {
            field,
            value: value.trim().to_string(),
        })
}

/// Absolute tolerance: a plain number, or a percentage of the nominal
fn tolerance(field: &'static str, value: &str, nom: f64) -> Result<f64, RowErrorKind> {
    let value = value.trim();
    match value.strip_suffix('%') {
        Some(percent) => percent
            .trim()
            .parse::<f64>()
            .map(|p| p / 100.0 * nom)
            .map_err(|_| RowErrorKind::MalformedPercent {
                field,
                value: value.to_string(),
            }),
        None => number(field, value),
    }
}

fn check_fields(row: &Row, section: Section) -> Result<(), RowErrorKind> {
    let required = section.required_fields();
    if row.fields.len() < required {
        return Err(RowErrorKind::MissingFields {
            expected: required,
            found: row.fields.len(),
        });
    }
    let name = row.name();
    if name.is_empty() {
        return Err(RowErrorKind::EmptyName);
    }
    if !NAME_RE.is_match(name) {
        return Err(RowErrorKind::InvalidName(name.to_string()));
    }
    if UnaryOp::function(name).is_some() {
        return Err(RowErrorKind::ReservedName(name.to_string()));
    }
    Ok(())
}

/// `name, value, note?` into a constant
pub fn parse_constant(row: &Row, sampler: &Sampler) -> Result<Quantity, RowErrorKind> {
    check_fields(row, Section::Constants)?;
    let value = number("value", row.field(1).unwrap_or(""))?;

    let mut quantity = Quantity::constant(row.name(), value, sampler);
    if let Some(note) = row.field(2) {
        quantity = quantity.with_note(note);
    }
    Ok(quantity)
}

/// `name, nominal, plus, minus, dist?, part number?, note?` into a dimension
pub fn parse_dimension(row: &Row, sampler: &mut Sampler) -> Result<Quantity, RowErrorKind> {
    check_fields(row, Section::Dimensions)?;
    let nom = number("nominal", row.field(1).unwrap_or(""))?;
    let plus = tolerance("plus", row.field(2).unwrap_or(""), nom)?;
    let minus = tolerance("minus", row.field(3).unwrap_or(""), nom)?;

    let dist = match row.field(4) {
        None => DistType::Uniform,
        Some(code) => {
            DistType::from_code(code).ok_or_else(|| RowErrorKind::UnknownDistribution(code.to_string()))?
        }
    };

    let mut quantity = Quantity::new(row.name(), nom, plus, minus, dist, sampler)?;
    if let Some(pn) = row.field(5) {
        quantity = quantity.with_part_number(pn);
    }
    if let Some(note) = row.field(6) {
        quantity = quantity.with_note(note);
    }
    Ok(quantity)
}

/// `name, expression, lower?, upper?, method?, note?`
pub fn parse_expression(row: &Row) -> Result<ExpressionFields, RowErrorKind> {
    check_fields(row, Section::Expressions)?;
    let expr = row.field(1).unwrap_or("").to_string();

    let lower = match row.field(2) {
        Some(v) => number("lower", v)?,
        None => f64::NEG_INFINITY,
    };
    let upper = match row.field(3) {
        Some(v) => number("upper", v)?,
        None => f64::INFINITY,
    };
    let method = match row.field(4) {
        Some(code) => {
            EvalMethod::from_code(code).ok_or_else(|| RowErrorKind::UnknownMethod(code.to_string()))?
        }
        None => EvalMethod::WorstCase,
    };

    Ok(ExpressionFields {
        key: row.name().to_string(),
        expr,
        lower,
        upper,
        method,
        note: row.field(5).map(str::to_string),
    })
}
