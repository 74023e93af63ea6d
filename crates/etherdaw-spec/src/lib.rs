//! EtherDAW Score Document Library
//!
//! This crate provides the types, JSON loading, and hashing for EtherDAW score
//! documents. A score is a declarative description of a composition: named
//! instruments, reusable patterns, sections that assign patterns to tracks,
//! and an arrangement that orders the sections.
//!
//! # Example
//!
//! ```
//! use etherdaw_spec::Score;
//!
//! let score = Score::from_json(r#"{
//!     "settings": { "tempo": 120, "key": "C major" },
//!     "instruments": { "lead": {} },
//!     "patterns": {
//!         "motif": { "kind": "notes", "notes": ["C4:q", "E4:q", "G4:q", "C5:q"] }
//!     },
//!     "sections": {
//!         "intro": { "bars": 4, "tracks": { "lead": { "pattern": "motif", "repeat": 4 } } }
//!     },
//!     "arrangement": ["intro"]
//! }"#).unwrap();
//!
//! assert_eq!(score.settings.tempo, 120.0);
//! assert_eq!(score.canonical_hash().unwrap().len(), 64);
//! ```
//!
//! # Modules
//!
//! - [`score`]: Root document and global settings
//! - [`pattern`]: Pattern definitions (one variant per generator or meta-wrapper)
//! - [`section`]: Sections and per-track assignments
//! - [`curve`]: Curve specifications shared by automation, density, and envelopes
//! - [`hash`]: Canonical hashing and seed derivation
//! - [`error`]: Error type for document loading

pub mod curve;
pub mod error;
pub mod hash;
pub mod pattern;
pub mod score;
pub mod section;

pub use curve::CurveSpec;
pub use error::SpecError;
pub use hash::{canonical_value_hash, canonicalize_json, derive_seed};
pub use pattern::{
    ArpMode, ArpeggioPattern, ChordsPattern, Condition, ConditionalPattern, ContinuationPattern,
    DegreesPattern, DrumsPattern, EuclideanPattern, ExtendsPattern, MarkovPattern, NotesPattern,
    Pattern, PatternKind, PatternOverrides, TransformOp, TransformPattern, TupletPattern,
    VoiceLeadingPattern,
};
pub use score::{Score, Settings};
pub use section::{Section, TrackAssignment};
