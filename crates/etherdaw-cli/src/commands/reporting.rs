use colored::Colorize;
use etherdaw_compiler::{CodedError, CompileError, CompileStats, CompileWarning};

/// Prints each warning on stderr, one per line.
pub(crate) fn print_warnings(warnings: &[CompileWarning]) {
    for warning in warnings {
        let location = warning
            .path
            .as_ref()
            .map(|p| format!(" at {}", p))
            .unwrap_or_default();
        eprintln!(
            "  {} {}: {}{}",
            "!".yellow(),
            warning.code.to_string().yellow(),
            warning.message,
            location.dimmed()
        );
    }
}

/// Prints a fatal compile error with its code.
pub(crate) fn print_error(err: &CompileError) {
    eprintln!(
        "{} [{}] {}",
        "error".red().bold(),
        err.code().red(),
        err.message()
    );
}

pub(crate) fn print_stats(stats: &CompileStats) {
    eprintln!(
        "{} {} section(s), {} bar(s), {} note(s), {:.3} beats, {:.3}s",
        "Compiled:".green().bold(),
        stats.section_count,
        stats.bars,
        stats.notes,
        stats.duration_beats,
        stats.duration_seconds
    );
    if !stats.instruments.is_empty() {
        eprintln!("  {} {}", "Instruments:".dimmed(), stats.instruments.join(", "));
    }
}

/// Serializes `value` as compact or pretty JSON.
pub(crate) fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}
