//! Tolerance algebra - worst-case bounds and Monte Carlo propagation
//!
//! Binary operations assume independent operands. Worst-case bounds come from
//! closed forms (addition) or from enumerating the four tolerance extremes
//! (multiplication, division, exponentiation). Samples are combined
//! elementwise between the two operands' [`Quantity::dist`] arrays.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::core::quantity::{Quantity, QuantityError};
use crate::core::sampler::Sampler;
use crate::core::types::DistType;

const TWO_PI: f64 = 2.0 * PI;

/// Degrees to radians
pub const DEG: f64 = PI / 180.0;

/// Whether some angle congruent to `theta` (mod 2π) lies in `[lower, upper]`
pub fn angle_in_range(theta: f64, lower: f64, upper: f64) -> bool {
    ((lower - theta) / TWO_PI).ceil() <= ((upper - theta) / TWO_PI).floor()
}

/// Max and min of `op` over the four tolerance extremes, relative to `nom`
///
/// Returns `(plus, minus)`.
fn combination(a: &Quantity, b: &Quantity, nom: f64, op: impl Fn(f64, f64) -> f64) -> (f64, f64) {
    let xs = [a.nom() + a.plus(), a.nom() + a.minus()];
    let ys = [b.nom() + b.plus(), b.nom() + b.minus()];

    let mut plus = f64::NEG_INFINITY;
    let mut minus = f64::INFINITY;
    for x in xs {
        for y in ys {
            let delta = op(x, y) - nom;
            plus = plus.max(delta);
            minus = minus.min(delta);
        }
    }
    (plus, minus)
}

fn zip_with(a: Vec<f64>, b: Vec<f64>, op: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    a.into_iter().zip(b).map(|(x, y)| op(x, y)).collect()
}

/// Periodic function with interior extrema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trig {
    Sin,
    Cos,
}

impl Trig {
    fn apply(self, x: f64) -> f64 {
        match self {
            Trig::Sin => x.sin(),
            Trig::Cos => x.cos(),
        }
    }
}

impl Quantity {
    /// Sum of two quantities
    ///
    /// Extremes of a sum are simultaneously achievable, so tolerances add
    /// directly. Adding a constant to a closed-form quantity is a scalar shift
    /// that keeps the distribution.
    pub fn add(&self, other: &Quantity, sampler: &mut Sampler) -> Quantity {
        let key = format!("{}+{}", self.key(), other.key());
        let nom = self.nom() + other.nom();
        let plus = self.plus() + other.plus();
        let minus = self.minus() + other.minus();

        match (self.dist_type(), other.dist_type()) {
            (DistType::Constant, DistType::Constant) => Quantity::constant(key, nom, sampler),
            (DistType::Constant, dist) | (dist, DistType::Constant) if dist.is_closed_form() => {
                Quantity::closed_form(key, nom, plus, minus, dist, sampler)
                    .with_note("Scalar shift.")
            }
            _ => {
                let data = zip_with(self.dist(sampler), other.dist(sampler), |x, y| x + y);
                Quantity::derived(key, nom, plus, minus, data)
            }
        }
    }

    /// Negation: plus and minus swap and flip sign
    pub fn neg(&self, sampler: &mut Sampler) -> Quantity {
        let key = format!("-{}", self.key());
        let nom = -self.nom();
        let plus = -self.minus();
        let minus = -self.plus();

        match self.dist_type() {
            DistType::Derived => {
                let data = self.dist(sampler).into_iter().map(|x| -x).collect();
                Quantity::derived(key, nom, plus, minus, data)
            }
            DistType::Constant => Quantity::constant(key, nom, sampler).with_note("Inverted."),
            dist => Quantity::closed_form(key, nom, plus, minus, dist, sampler).with_note("Inverted."),
        }
    }

    /// Difference, defined as `self + (-other)`
    pub fn sub(&self, other: &Quantity, sampler: &mut Sampler) -> Quantity {
        self.add(&other.neg(sampler), sampler)
            .renamed(format!("{}-{}", self.key(), other.key()))
    }

    /// Product, with bounds from the four tolerance extremes
    pub fn mul(&self, other: &Quantity, sampler: &mut Sampler) -> Quantity {
        let key = format!("{}*{}", self.key(), other.key());
        let nom = self.nom() * other.nom();
        let (plus, minus) = combination(self, other, nom, |x, y| x * y);
        let data = zip_with(self.dist(sampler), other.dist(sampler), |x, y| x * y);
        Quantity::derived(key, nom, plus, minus, data)
    }

    /// Quotient, with bounds from the four tolerance extremes
    ///
    /// Fails when the divisor's worst-case band contains zero, where the
    /// extremes enumeration no longer bounds the result.
    pub fn div(&self, other: &Quantity, sampler: &mut Sampler) -> Result<Quantity, QuantityError> {
        let low = other.nom() + other.minus();
        let high = other.nom() + other.plus();
        if low <= 0.0 && high >= 0.0 {
            return Err(QuantityError::DivisionByZero {
                key: other.key().to_string(),
                lower: low,
                upper: high,
            });
        }

        let key = format!("{}/{}", self.key(), other.key());
        let nom = self.nom() / other.nom();
        let (plus, minus) = combination(self, other, nom, |x, y| x / y);
        let data = zip_with(self.dist(sampler), other.dist(sampler), |x, y| x / y);
        Ok(Quantity::derived(key, nom, plus, minus, data))
    }

    /// Exponentiation `self ^ other`, with bounds from the four tolerance extremes
    pub fn pow(&self, other: &Quantity, sampler: &mut Sampler) -> Quantity {
        let key = format!("{}^{}", self.key(), other.key());
        let nom = self.nom().powf(other.nom());
        let (plus, minus) = combination(self, other, nom, f64::powf);
        let data = zip_with(self.dist(sampler), other.dist(sampler), f64::powf);
        Quantity::derived(key, nom, plus, minus, data)
    }

    /// Sine of an angle in radians
    pub fn sin(&self, sampler: &mut Sampler) -> Quantity {
        self.periodic(Trig::Sin, "sin", 1.0, sampler)
    }

    /// Cosine of an angle in radians
    pub fn cos(&self, sampler: &mut Sampler) -> Quantity {
        self.periodic(Trig::Cos, "cos", 1.0, sampler)
    }

    /// Sine of an angle in degrees
    pub fn sind(&self, sampler: &mut Sampler) -> Quantity {
        self.periodic(Trig::Sin, "sind", DEG, sampler)
    }

    /// Cosine of an angle in degrees
    pub fn cosd(&self, sampler: &mut Sampler) -> Quantity {
        self.periodic(Trig::Cos, "cosd", DEG, sampler)
    }

    /// Tangent of an angle in radians
    pub fn tan(&self, sampler: &mut Sampler) -> Result<Quantity, QuantityError> {
        self.tangent("tan", 1.0, sampler)
    }

    /// Tangent of an angle in degrees
    pub fn tand(&self, sampler: &mut Sampler) -> Result<Quantity, QuantityError> {
        self.tangent("tand", DEG, sampler)
    }

    /// Sine or cosine, capturing interior extrema of the band
    fn periodic(&self, func: Trig, name: &str, scale: f64, sampler: &mut Sampler) -> Quantity {
        let (peak, trough) = match func {
            Trig::Sin => (FRAC_PI_2, -FRAC_PI_2),
            Trig::Cos => (0.0, PI),
        };

        let nom_angle = self.nom() * scale;
        let low = (self.nom() + self.minus()) * scale;
        let high = (self.nom() + self.plus()) * scale;
        let at_low = func.apply(low);
        let at_high = func.apply(high);

        let upper = if angle_in_range(peak, low, high) {
            1.0
        } else {
            at_low.max(at_high)
        };
        let lower = if angle_in_range(trough, low, high) {
            -1.0
        } else {
            at_low.min(at_high)
        };

        let nom = func.apply(nom_angle);
        let data = self
            .dist(sampler)
            .into_iter()
            .map(|x| func.apply(x * scale))
            .collect();
        Quantity::derived(
            format!("{}({})", name, self.key()),
            nom,
            upper - nom,
            lower - nom,
            data,
        )
    }

    /// Tangent is monotonic between discontinuities at odd multiples of π/2
    fn tangent(&self, name: &'static str, scale: f64, sampler: &mut Sampler) -> Result<Quantity, QuantityError> {
        let low = (self.nom() + self.minus()) * scale;
        let high = (self.nom() + self.plus()) * scale;
        if angle_in_range(FRAC_PI_2, low, high) || angle_in_range(-FRAC_PI_2, low, high) {
            return Err(QuantityError::TanDiscontinuity {
                func: name,
                key: self.key().to_string(),
                lower: low,
                upper: high,
            });
        }

        let nom = (self.nom() * scale).tan();
        let data = self
            .dist(sampler)
            .into_iter()
            .map(|x| (x * scale).tan())
            .collect();
        Ok(Quantity::derived(
            format!("{}({})", name, self.key()),
            nom,
            high.tan() - nom,
            low.tan() - nom,
            data,
        ))
    }
}
