//! Distribution and evaluation-method types shared across the stack

use serde::{Deserialize, Serialize};

/// Statistical distribution attached to a quantity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistType {
    /// Flat between `nom + minus` and `nom + plus`
    #[default]
    Uniform,
    /// Gaussian whose ±1σ matches the tolerance band
    Normal1S,
    /// Gaussian whose ±2σ matches the tolerance band
    Normal2S,
    /// Gaussian whose ±3σ matches the tolerance band
    Normal3S,
    /// Degenerate, every sample equals the nominal
    Constant,
    /// Samples produced by a prior operation, no closed form
    Derived,
}

impl DistType {
    /// Parse a distribution code (`U`, `1S`, `2S`, `3S`, `C`, `D`), ignoring case and padding
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "U" => Some(DistType::Uniform),
            "1S" => Some(DistType::Normal1S),
            "2S" => Some(DistType::Normal2S),
            "3S" => Some(DistType::Normal3S),
            "C" => Some(DistType::Constant),
            "D" => Some(DistType::Derived),
            _ => None,
        }
    }

    /// The short code written to stack files and reports
    pub fn code(&self) -> &'static str {
        match self {
            DistType::Uniform => "U",
            DistType::Normal1S => "1S",
            DistType::Normal2S => "2S",
            DistType::Normal3S => "3S",
            DistType::Constant => "C",
            DistType::Derived => "D",
        }
    }

    /// Sigma multiple for normal distributions
    pub fn sigma(&self) -> Option<f64> {
        match self {
            DistType::Normal1S => Some(1.0),
            DistType::Normal2S => Some(2.0),
            DistType::Normal3S => Some(3.0),
            _ => None,
        }
    }

    /// True when samples can be redrawn from a closed form
    pub fn is_closed_form(&self) -> bool {
        matches!(
            self,
            DistType::Uniform | DistType::Normal1S | DistType::Normal2S | DistType::Normal3S
        )
    }
}

impl std::fmt::Display for DistType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistType::Uniform => write!(f, "uniform"),
            DistType::Normal1S => write!(f, "normal ±1σ"),
            DistType::Normal2S => write!(f, "normal ±2σ"),
            DistType::Normal3S => write!(f, "normal ±3σ"),
            DistType::Constant => write!(f, "constant"),
            DistType::Derived => write!(f, "derived"),
        }
    }
}

/// How an expression's bounds are computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalMethod {
    /// Bounds at the tolerance extremes, center at nominal
    #[default]
    WorstCase,
    /// Sample quantiles at ±1σ, center at the sample median
    Statistical1S,
    /// Sample quantiles at ±2σ
    Statistical2S,
    /// Sample quantiles at ±3σ
    Statistical3S,
}

impl EvalMethod {
    /// Parse a method code (`W`, `1S`, `2S`, `3S`), ignoring case and padding
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "W" => Some(EvalMethod::WorstCase),
            "1S" => Some(EvalMethod::Statistical1S),
            "2S" => Some(EvalMethod::Statistical2S),
            "3S" => Some(EvalMethod::Statistical3S),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            EvalMethod::WorstCase => "W",
            EvalMethod::Statistical1S => "1S",
            EvalMethod::Statistical2S => "2S",
            EvalMethod::Statistical3S => "3S",
        }
    }

    /// Number of standard deviations for statistical methods
    pub fn sigma(&self) -> Option<f64> {
        match self {
            EvalMethod::WorstCase => None,
            EvalMethod::Statistical1S => Some(1.0),
            EvalMethod::Statistical2S => Some(2.0),
            EvalMethod::Statistical3S => Some(3.0),
        }
    }
}

impl std::fmt::Display for EvalMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalMethod::WorstCase => write!(f, "Worst Case"),
            EvalMethod::Statistical1S => write!(f, "Statistical ±1σ"),
            EvalMethod::Statistical2S => write!(f, "Statistical ±2σ"),
            EvalMethod::Statistical3S => write!(f, "Statistical ±3σ"),
        }
    }
}
