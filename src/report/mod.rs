//! Report module - renders analysis outcomes for people and spreadsheets

pub mod csv;
pub mod text;

pub use text::{format_bar, format_center_bar, format_shortest, ReportHeader};
