//! CLI command implementations

pub mod compile;
pub mod expand;
pub mod info;

mod reporting;
