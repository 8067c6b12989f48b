//! tolstack: tolerance stack analysis
//!
//! Dimensions carry a nominal value, an asymmetric tolerance band and a
//! distribution. Expressions over them are parsed into a shared expression
//! tree and evaluated both by worst case and by Monte Carlo sampling, with
//! sensitivities, tolerance contributions and limit checks.

pub mod cli;
pub mod core;
pub mod expr;
pub mod report;
pub mod stack;
