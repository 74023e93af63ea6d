//! EtherDAW CLI - Command-line interface for score compilation
//!
//! This binary compiles EtherDAW scores into timelines, expands individual
//! patterns, and summarizes scores.

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use etherdaw_cli::commands;
use etherdaw_cli::commands::compile::CompileArgs;
use etherdaw_cli::logging;

/// EtherDAW - Declarative Score Compiler
#[derive(Parser)]
#[command(name = "etherdaw")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging on stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a score into a timeline
    Compile {
        /// Path to the score file (JSON)
        file: String,

        /// Seed for generated material
        #[arg(long, default_value_t = 0)]
        seed: u32,

        /// First arrangement section to compile
        #[arg(long)]
        start: Option<String>,

        /// Last arrangement section to compile (inclusive)
        #[arg(long)]
        end: Option<String>,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Emit timeline, warnings, and stats instead of the bare timeline
        #[arg(long)]
        json: bool,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,

        /// Schedule sections on a single thread
        #[arg(long)]
        sequential: bool,
    },

    /// Expand one pattern and print its notes
    Expand {
        /// Path to the score file (JSON)
        file: String,

        /// Pattern name
        pattern: String,

        /// Seed for generated material
        #[arg(long, default_value_t = 0)]
        seed: u32,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print a summary of a score and its compiled sections
    Info {
        /// Path to the score file (JSON)
        file: String,

        /// Seed for generated material
        #[arg(long, default_value_t = 0)]
        seed: u32,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Compile {
            file,
            seed,
            start,
            end,
            output,
            json,
            pretty,
            sequential,
        } => commands::compile::run(&CompileArgs {
            score_path: &file,
            seed,
            start: start.as_deref(),
            end: end.as_deref(),
            output: output.as_deref(),
            json,
            pretty,
            sequential,
        }),
        Commands::Expand {
            file,
            pattern,
            seed,
            pretty,
        } => commands::expand::run(&file, &pattern, seed, pretty),
        Commands::Info { file, seed } => commands::info::run(&file, seed),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
