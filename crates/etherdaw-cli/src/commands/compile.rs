//! Compile command implementation
//!
//! Compiles a score into a timeline and writes it as JSON.

use anyhow::{Context, Result};
use colored::Colorize;
use etherdaw_compiler::{compile, CompileOptions};
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use super::reporting;
use crate::input::load_score;

/// Arguments for the compile command.
#[derive(Debug, Clone, Default)]
pub struct CompileArgs<'a> {
    pub score_path: &'a str,
    pub seed: u32,
    pub start: Option<&'a str>,
    pub end: Option<&'a str>,
    pub output: Option<&'a str>,
    /// Emit timeline, warnings, and stats together instead of the bare timeline.
    pub json: bool,
    pub pretty: bool,
    pub sequential: bool,
}

/// Run the compile command
///
/// # Returns
/// Exit code: 0 on success, 1 on a fatal compile error
pub fn run(args: &CompileArgs<'_>) -> Result<ExitCode> {
    let loaded = load_score(Path::new(args.score_path))?;

    let mut options = CompileOptions::new()
        .with_seed(args.seed)
        .with_parallel(!args.sequential);
    if let Some(start) = args.start {
        options = options.with_start_section(start);
    }
    if let Some(end) = args.end {
        options = options.with_end_section(end);
    }

    let output = match compile(&loaded.score, &options) {
        Ok(output) => output,
        Err(err) => {
            reporting::print_error(&err);
            return Ok(ExitCode::FAILURE);
        }
    };

    reporting::print_warnings(&output.warnings);

    let json = if args.json {
        reporting::to_json(&output, args.pretty)
    } else {
        reporting::to_json(&output.timeline, args.pretty)
    }
    .context("Failed to serialize timeline")?;

    match args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write output: {}", path))?;
            reporting::print_stats(&output.stats);
            eprintln!("  {} {}", "Wrote:".dimmed(), path);
        }
        None => println!("{}", json),
    }

    Ok(ExitCode::SUCCESS)
}
