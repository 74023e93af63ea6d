//! Expand command implementation
//!
//! Expands a single named pattern and prints its notes as JSON.

use anyhow::{Context, Result};
use etherdaw_compiler::{expand_pattern, CompileOptions};
use std::path::Path;
use std::process::ExitCode;

use super::reporting;
use crate::input::load_score;

/// Run the expand command
///
/// # Arguments
/// * `score_path` - Path to the score file
/// * `pattern` - Name of the pattern to expand
/// * `seed` - Compile seed for generated patterns
/// * `pretty` - Pretty-print the JSON
pub fn run(score_path: &str, pattern: &str, seed: u32, pretty: bool) -> Result<ExitCode> {
    let loaded = load_score(Path::new(score_path))?;
    let options = CompileOptions::new().with_seed(seed);

    let expansion = match expand_pattern(&loaded.score, pattern, &options) {
        Ok(expansion) => expansion,
        Err(err) => {
            reporting::print_error(&err);
            return Ok(ExitCode::FAILURE);
        }
    };

    reporting::print_warnings(&expansion.warnings);
    let json = reporting::to_json(&expansion.pattern, pretty)
        .with_context(|| format!("Failed to serialize pattern '{}'", pattern))?;
    println!("{}", json);

    Ok(ExitCode::SUCCESS)
}
