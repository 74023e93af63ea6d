//! Info command implementation
//!
//! Compiles a score and prints a summary without emitting the timeline.

use anyhow::Result;
use colored::Colorize;
use etherdaw_compiler::{compile, CompileOptions};
use std::path::Path;
use std::process::ExitCode;

use super::reporting;
use crate::input::load_score;

/// Run the info command
pub fn run(score_path: &str, seed: u32) -> Result<ExitCode> {
    let loaded = load_score(Path::new(score_path))?;
    let score = &loaded.score;

    println!("{} {}", "Score:".cyan().bold(), score_path);
    if let Some(ref title) = score.title {
        println!("  {} {}", "Title:".dimmed(), title);
    }
    println!("  {} {}", "Hash:".dimmed(), loaded.hash);
    println!(
        "  {} {} pattern(s), {} section(s), {} instrument(s)",
        "Defines:".dimmed(),
        score.patterns.len(),
        score.sections.len(),
        score.instruments.len()
    );
    println!(
        "  {} {}",
        "Arrangement:".dimmed(),
        score.arrangement.join(" > ")
    );

    let output = match compile(score, &CompileOptions::new().with_seed(seed)) {
        Ok(output) => output,
        Err(err) => {
            reporting::print_error(&err);
            return Ok(ExitCode::FAILURE);
        }
    };

    for span in &output.timeline.sections {
        println!(
            "  {:>3} {:<16} {:>3} bar(s)  beat {:>8.2}  {:>7.2}s  {} {}  {} bpm",
            span.arrangement_index,
            span.name,
            span.bars,
            span.start_beat,
            span.start_seconds,
            span.key,
            span.time_signature,
            span.tempo
        );
    }
    reporting::print_warnings(&output.warnings);
    reporting::print_stats(&output.stats);

    Ok(ExitCode::SUCCESS)
}
