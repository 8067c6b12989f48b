//! Toleranced quantity - nominal value, asymmetric tolerance and Monte Carlo samples
//!
//! A quantity is immutable once built. Every arithmetic operation in
//! [`crate::core::algebra`] constructs a new quantity from its operands.

use miette::Diagnostic;
use std::rc::Rc;
use thiserror::Error;

use crate::core::sampler::{quantile, tail_probabilities, Sampler};
use crate::core::types::{DistType, EvalMethod};

/// Absolute tolerance used when comparing quantities
pub const APPROX_TOL: f64 = 1e-9;

/// Errors raised while building or combining quantities
#[derive(Debug, Clone, Error, Diagnostic, PartialEq)]
pub enum QuantityError {
    #[error("'{key}': plus tolerance {plus} is less than minus tolerance {minus}")]
    #[diagnostic(
        code(tolstack::domain::inverted_band),
        help("the plus tolerance must be greater than or equal to the minus tolerance")
    )]
    InvertedBand { key: String, plus: f64, minus: f64 },

    #[error("'{key}': derived distributions cannot be declared on input values")]
    #[diagnostic(code(tolstack::domain::derived_input))]
    DerivedInput { key: String },

    #[error("{func} is discontinuous within [{lower}, {upper}] of '{key}'")]
    #[diagnostic(
        code(tolstack::domain::tan_discontinuity),
        help("the tolerance band spans an odd multiple of π/2")
    )]
    TanDiscontinuity {
        func: &'static str,
        key: String,
        lower: f64,
        upper: f64,
    },

    #[error("divisor '{key}' may be zero within [{lower}, {upper}]")]
    #[diagnostic(code(tolstack::domain::division_by_zero))]
    DivisionByZero { key: String, lower: f64, upper: f64 },
}

/// A value with nominal, asymmetric tolerance, distribution and samples
#[derive(Debug, Clone)]
pub struct Quantity {
    nom: f64,
    plus: f64,
    minus: f64,
    dist: DistType,
    data: Rc<[f64]>,
    part_number: Option<String>,
    note: Option<String>,
    key: String,
}

impl Quantity {
    /// Create an input quantity whose samples are drawn from its declared distribution
    pub fn new(
        key: impl Into<String>,
        nom: f64,
        plus: f64,
        minus: f64,
        dist: DistType,
        sampler: &mut Sampler,
    ) -> Result<Self, QuantityError> {
        let key = key.into();
        if plus - minus < 0.0 {
            return Err(QuantityError::InvertedBand { key, plus, minus });
        }
        if dist == DistType::Derived {
            return Err(QuantityError::DerivedInput { key });
        }
        Ok(Self::closed_form(key, nom, plus, minus, dist, sampler))
    }

    /// Create a zero-tolerance constant
    pub fn constant(key: impl Into<String>, value: f64, sampler: &Sampler) -> Self {
        Self {
            nom: value,
            plus: 0.0,
            minus: 0.0,
            dist: DistType::Constant,
            data: sampler.constant(value).into(),
            part_number: None,
            note: None,
            key: key.into(),
        }
    }

    /// Quantity with a closed-form distribution; callers guarantee `plus >= minus`
    pub(crate) fn closed_form(
        key: String,
        nom: f64,
        plus: f64,
        minus: f64,
        dist: DistType,
        sampler: &mut Sampler,
    ) -> Self {
        let data = draw(nom, plus, minus, dist, sampler);
        log::debug!("drew {} {} samples for '{}'", data.len(), dist, key);
        Self {
            nom,
            plus,
            minus,
            dist,
            data: data.into(),
            part_number: None,
            note: None,
            key,
        }
    }

    /// Result of an operation, carrying its own samples
    pub(crate) fn derived(key: String, nom: f64, plus: f64, minus: f64, data: Vec<f64>) -> Self {
        Self {
            nom,
            plus,
            minus,
            dist: DistType::Derived,
            data: data.into(),
            part_number: None,
            note: Some("Derived.".to_string()),
            key,
        }
    }

    /// Attach a part number
    pub fn with_part_number(mut self, part_number: impl Into<String>) -> Self {
        self.part_number = Some(part_number.into());
        self
    }

    /// Attach a free-text note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn nom(&self) -> f64 {
        self.nom
    }

    pub fn plus(&self) -> f64 {
        self.plus
    }

    pub fn minus(&self) -> f64 {
        self.minus
    }

    pub fn dist_type(&self) -> DistType {
        self.dist
    }

    pub fn part_number(&self) -> Option<&str> {
        self.part_number.as_deref()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Identifier or composed expression signature (e.g. `"-dim"`, `"dim+dim"`)
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The samples held by this quantity
    pub fn samples(&self) -> &[f64] {
        &self.data
    }

    /// A sample array for use in one operation
    ///
    /// Closed-form and constant quantities draw fresh samples on every call.
    /// Derived quantities have no closed form, so they return a random
    /// permutation of their stored samples. Operations combine samples
    /// elementwise, so a quantity used twice in one tree is paired against
    /// differently ordered copies of itself, approximating independent draws
    /// from its marginal. This holds while tree depth is much smaller than N.
    pub fn dist(&self, sampler: &mut Sampler) -> Vec<f64> {
        match self.dist {
            DistType::Derived => sampler.permute(&self.data),
            dist => draw(self.nom, self.plus, self.minus, dist, sampler),
        }
    }

    /// Center value: nominal for worst case, sample median for statistical methods
    pub fn center(&self, method: EvalMethod) -> f64 {
        match method {
            EvalMethod::WorstCase => self.nom,
            _ => quantile(&self.data, 0.5),
        }
    }

    /// Lower bound under the given method
    pub fn lower(&self, method: EvalMethod) -> f64 {
        match tail_probabilities(method) {
            None => self.nom + self.minus,
            Some((low, _)) => quantile(&self.data, low),
        }
    }

    /// Upper bound under the given method
    pub fn upper(&self, method: EvalMethod) -> f64 {
        match tail_probabilities(method) {
            None => self.nom + self.plus,
            Some((_, high)) => quantile(&self.data, high),
        }
    }

    pub fn lower_tol(&self, method: EvalMethod) -> f64 {
        self.lower(method) - self.center(method)
    }

    pub fn upper_tol(&self, method: EvalMethod) -> f64 {
        self.upper(method) - self.center(method)
    }

    /// Width between the lower and upper bounds
    pub fn range(&self, method: EvalMethod) -> f64 {
        self.upper(method) - self.lower(method)
    }

    /// A zero-tolerance copy pinned at the current center value
    pub fn ideal(&self, method: EvalMethod, sampler: &Sampler) -> Self {
        Self::constant(self.key.clone(), self.center(method), sampler).with_note("Ideal.")
    }

    /// Compare distribution, nominal and tolerances within [`APPROX_TOL`]
    pub fn approx_eq(&self, other: &Quantity) -> bool {
        self.dist == other.dist
            && (self.nom - other.nom).abs() <= APPROX_TOL
            && (self.plus - other.plus).abs() <= APPROX_TOL
            && (self.minus - other.minus).abs() <= APPROX_TOL
    }

    pub(crate) fn renamed(mut self, key: String) -> Self {
        self.key = key;
        self
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let note = self.note.as_deref().unwrap_or("");
        if self.dist == DistType::Constant {
            write!(f, "{:>10.4} {}", self.nom, note)
        } else {
            write!(
                f,
                "{:>10.4}{:>+8.4}{:>+8.4}{:>5}{:>10} {}",
                self.nom,
                self.plus,
                self.minus,
                self.dist.code(),
                self.part_number.as_deref().unwrap_or(""),
                note
            )
        }
    }
}

/// Draw N samples from a closed-form distribution
fn draw(nom: f64, plus: f64, minus: f64, dist: DistType, sampler: &mut Sampler) -> Vec<f64> {
    match dist {
        DistType::Constant | DistType::Derived => sampler.constant(nom),
        DistType::Uniform => sampler.uniform(nom + minus, nom + plus),
        normal => {
            let k = normal.sigma().unwrap_or(1.0);
            // center of the band, not the nominal
            let mean = nom + 0.5 * (plus + minus);
            let sigma = (plus - minus) / (2.0 * k);
            sampler.normal(mean, sigma)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampler() -> Sampler {
        Sampler::seeded(20_000, 1234)
    }

    #[test]
    fn test_quantity_creation() {
        let mut s = sampler();
        let q = Quantity::new("D1", 5.0, 0.1, -0.2, DistType::Uniform, &mut s).unwrap();
        assert_eq!(q.nom(), 5.0);
        assert_eq!(q.plus(), 0.1);
        assert_eq!(q.minus(), -0.2);
        assert_eq!(q.dist_type(), DistType::Uniform);
        assert_eq!(q.key(), "D1");
        assert_eq!(q.samples().len(), 20_000);
        assert!(q.part_number().is_none());
    }

    #[test]
    fn test_inverted_band_rejected() {
        let mut s = sampler();
        let err = Quantity::new("D1", 5.0, -0.2, 0.1, DistType::Uniform, &mut s).unwrap_err();
        assert!(matches!(err, QuantityError::InvertedBand { .. }));
    }

    #[test]
    fn test_derived_input_rejected() {
        let mut s = sampler();
        let err = Quantity::new("D1", 5.0, 0.1, -0.1, DistType::Derived, &mut s).unwrap_err();
        assert!(matches!(err, QuantityError::DerivedInput { .. }));
    }

    #[test]
    fn test_identity() {
        let mut s = sampler();
        let a = Quantity::new("a", 5.0, 0.1, -0.2, DistType::Uniform, &mut s).unwrap();
        let b = Quantity::new("b", 5.0, 0.1, -0.2, DistType::Uniform, &mut s).unwrap();
        assert!(a.approx_eq(&b));
        let c = Quantity::new("c", 5.0, 0.1, -0.2, DistType::Normal3S, &mut s).unwrap();
        assert!(!a.approx_eq(&c));
    }

    #[test]
    fn test_worst_case_accessors() {
        let mut s = sampler();
        let q = Quantity::new("D1", 5.0, 0.1, -0.2, DistType::Uniform, &mut s).unwrap();
        let m = EvalMethod::WorstCase;
        assert_eq!(q.center(m), 5.0);
        assert!((q.lower(m) - 4.8).abs() < 1e-12);
        assert!((q.upper(m) - 5.1).abs() < 1e-12);
        assert!((q.lower_tol(m) + 0.2).abs() < 1e-12);
        assert!((q.upper_tol(m) - 0.1).abs() < 1e-12);
        assert!((q.range(m) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_statistical_accessors_normal() {
        let mut s = sampler();
        // ±3σ band of 0.3 centered at 10 => σ = 0.1
        let q = Quantity::new("D1", 10.0, 0.3, -0.3, DistType::Normal3S, &mut s).unwrap();
        let m = EvalMethod::Statistical1S;
        assert!((q.center(m) - 10.0).abs() < 0.01);
        assert!((q.upper(m) - 10.1).abs() < 0.01);
        assert!((q.lower(m) - 9.9).abs() < 0.01);
    }

    #[test]
    fn test_normal_centered_on_band() {
        let mut s = sampler();
        let q = Quantity::new("D1", 10.0, 0.4, 0.0, DistType::Normal2S, &mut s).unwrap();
        assert!((q.center(EvalMethod::Statistical2S) - 10.2).abs() < 0.01);
    }

    #[test]
    fn test_constant_samples() {
        let s = sampler();
        let c = Quantity::constant("K", 2.5, &s);
        assert_eq!(c.dist_type(), DistType::Constant);
        assert!(c.samples().iter().all(|&x| x == 2.5));
        assert_eq!(c.range(EvalMethod::Statistical3S), 0.0);
    }

    #[test]
    fn test_closed_form_dist_is_fresh() {
        let mut s = sampler();
        let q = Quantity::new("D1", 1.0, 0.5, -0.5, DistType::Uniform, &mut s).unwrap();
        let a = q.dist(&mut s);
        let b = q.dist(&mut s);
        assert_ne!(a, b);
    }

    #[test]
    fn test_derived_dist_is_permutation() {
        let mut s = sampler();
        let q = Quantity::derived("x".into(), 0.0, 1.0, -1.0, vec![1.0, 2.0, 3.0, 4.0]);
        let mut p = q.dist(&mut s);
        p.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(p, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_ideal_pins_center() {
        let mut s = sampler();
        let q = Quantity::new("D1", 5.0, 0.1, -0.2, DistType::Uniform, &mut s).unwrap();
        let ideal = q.ideal(EvalMethod::WorstCase, &s);
        assert_eq!(ideal.dist_type(), DistType::Constant);
        assert_eq!(ideal.nom(), 5.0);
        assert_eq!(ideal.range(EvalMethod::WorstCase), 0.0);
        assert_eq!(ideal.key(), "D1");
        assert_eq!(ideal.note(), Some("Ideal."));
    }
}
