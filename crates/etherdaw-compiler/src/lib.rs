//! EtherDAW Compiler - Deterministic Score to Timeline Compilation
//!
//! This crate compiles an EtherDAW [`Score`](etherdaw_spec::Score) into a
//! [`Timeline`]: a flat, absolutely-timed list of note events plus automation
//! lanes, ready for a renderer. Compilation is a pure, synchronous data
//! transformation with no I/O.
//!
//! # Pipeline
//!
//! 1. Global and per-section settings are validated (key, time signature, tempo).
//! 2. The arrangement is sliced by the optional start/end sections.
//! 3. Each section occurrence is scheduled independently (in parallel when
//!    enabled): patterns are resolved, expanded by their generator, repeated,
//!    shifted, swung, humanized, thinned by density, and clipped.
//! 4. Occurrences are offset by the running beat and second totals and merged
//!    with a stable sort.
//!
//! # Determinism
//!
//! Every random draw comes from a PCG32 stream seeded by BLAKE3 over the
//! compile seed and a salt (arrangement index, section, track). The same score
//! and seed always produce the same timeline, with or without parallelism.
//!
//! # Example
//!
//! ```
//! use etherdaw_compiler::{compile, CompileOptions};
//! use etherdaw_spec::Score;
//!
//! let score = Score::from_json(r#"{
//!     "settings": { "tempo": 120 },
//!     "patterns": {
//!         "motif": { "kind": "notes", "notes": ["C4:q", "E4:q", "G4:q", "C5:q"] }
//!     },
//!     "sections": {
//!         "intro": { "bars": 4, "tracks": { "lead": { "pattern": "motif", "repeat": 4 } } }
//!     },
//!     "arrangement": ["intro"]
//! }"#).unwrap();
//!
//! let output = compile(&score, &CompileOptions::default()).unwrap();
//! assert_eq!(output.stats.notes, 16);
//! assert!((output.stats.duration_seconds - 8.0).abs() < 1e-9);
//! ```
//!
//! # Module Structure
//!
//! - [`notation`]: Duration codes, note/chord/rest tokens, scale degrees
//! - [`theory`]: Scales, keys, time signatures, chord symbols
//! - [`generators`]: One generator per pattern kind
//! - [`resolver`]: Conditional, inheritance, and transform resolution
//! - [`scheduler`]: Per-section track scheduling
//! - [`automation`]: Curves, tempo maps, density
//! - [`timeline`]: Compile entry points and output types

pub mod automation;
pub mod diagnostics;
pub mod error;
pub mod generators;
pub mod notation;
pub mod options;
pub mod resolver;
pub mod rng;
pub mod scheduler;
pub mod theory;
pub mod timeline;

pub use diagnostics::Diagnostics;
pub use error::{CodedError, CompileError, CompileWarning, NotationError, TheoryError, WarningCode};
pub use options::CompileOptions;
pub use timeline::{
    compile, expand_pattern, CompileOutput, CompileStats, NoteEvent, PatternExpansion, SectionSpan,
    Timeline,
};
