//! Core module - toleranced quantities, sampling and configuration

pub mod algebra;
pub mod config;
pub mod quantity;
pub mod sampler;
pub mod types;

pub use config::Config;
pub use quantity::{Quantity, QuantityError};
pub use sampler::Sampler;
pub use types::{DistType, EvalMethod};
