//! Error and warning types for compilation.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Common interface for coded compiler errors.
pub trait CodedError: std::error::Error {
    /// Stable error code, e.g. `"ETHER_NOTATION_001"`.
    fn code(&self) -> &'static str;

    /// Error category for grouping related errors.
    fn category(&self) -> &'static str;

    /// Human-readable message.
    fn message(&self) -> String {
        self.to_string()
    }
}

/// Errors raised while parsing note, chord, rest, duration, or degree strings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NotationError {
    #[error("invalid duration '{input}'")]
    InvalidDuration { input: String },
    #[error("invalid note '{input}': {message}")]
    InvalidNote { input: String, message: String },
    #[error("invalid chord '{input}': {message}")]
    InvalidChord { input: String, message: String },
    #[error("invalid rest '{input}'")]
    InvalidRest { input: String },
    #[error("velocity {value} out of range [0, 1] in '{input}'")]
    VelocityOutOfRange { input: String, value: f64 },
    #[error("probability {value} out of range [0, 1] in '{input}'")]
    ProbabilityOutOfRange { input: String, value: f64 },
    #[error("invalid timing offset in '{input}'")]
    InvalidTiming { input: String },
    #[error("invalid scale degree '{input}'")]
    InvalidDegree { input: String },
}

impl NotationError {
    /// Attaches a location, producing a fatal compile error.
    pub fn at(self, location: impl Into<String>) -> CompileError {
        CompileError::Notation {
            location: location.into(),
            source: self,
        }
    }
}

impl CodedError for NotationError {
    fn code(&self) -> &'static str {
        match self {
            NotationError::InvalidDuration { .. } => "ETHER_NOTATION_001",
            NotationError::InvalidNote { .. } => "ETHER_NOTATION_002",
            NotationError::InvalidChord { .. } => "ETHER_NOTATION_003",
            NotationError::InvalidRest { .. } => "ETHER_NOTATION_004",
            NotationError::VelocityOutOfRange { .. } => "ETHER_NOTATION_005",
            NotationError::ProbabilityOutOfRange { .. } => "ETHER_NOTATION_006",
            NotationError::InvalidTiming { .. } => "ETHER_NOTATION_007",
            NotationError::InvalidDegree { .. } => "ETHER_NOTATION_008",
        }
    }

    fn category(&self) -> &'static str {
        "notation"
    }
}

/// Errors raised by key, time signature, pitch, and chord-symbol parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TheoryError {
    #[error("invalid key '{input}'")]
    InvalidKey { input: String },
    #[error("unknown scale '{name}'")]
    UnknownScale { name: String },
    #[error("invalid time signature '{input}': {message}")]
    InvalidTimeSignature { input: String, message: String },
    #[error("invalid chord symbol '{input}'")]
    InvalidChordSymbol { input: String },
    #[error("invalid note name '{input}'")]
    InvalidNoteName { input: String },
}

impl TheoryError {
    /// Attaches a location, producing a fatal compile error.
    pub fn at(self, location: impl Into<String>) -> CompileError {
        CompileError::Theory {
            location: location.into(),
            source: self,
        }
    }
}

impl CodedError for TheoryError {
    fn code(&self) -> &'static str {
        match self {
            TheoryError::InvalidKey { .. } => "ETHER_THEORY_001",
            TheoryError::UnknownScale { .. } => "ETHER_THEORY_002",
            TheoryError::InvalidTimeSignature { .. } => "ETHER_THEORY_003",
            TheoryError::InvalidChordSymbol { .. } => "ETHER_THEORY_004",
            TheoryError::InvalidNoteName { .. } => "ETHER_THEORY_005",
        }
    }

    fn category(&self) -> &'static str {
        "theory"
    }
}

/// Fatal compilation errors. No timeline is produced when one is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("{location}: {source}")]
    Notation {
        location: String,
        source: NotationError,
    },
    #[error("{location}: {source}")]
    Theory {
        location: String,
        source: TheoryError,
    },
    #[error("pattern reference cycle: {chain}")]
    ResolutionCycle { chain: String },
    #[error("resolution depth exceeded (max {max}) while resolving '{pattern}'")]
    ResolutionDepth { pattern: String, max: usize },
    #[error("invalid tuplet ratio {actual}:{normal} in pattern '{pattern}'")]
    InvalidTuplet {
        pattern: String,
        actual: u32,
        normal: u32,
    },
    #[error("invalid tempo {tempo} in {location}")]
    InvalidTempo { location: String, tempo: f64 },
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("invalid track at {location}: {message}")]
    InvalidTrack { location: String, message: String },
}

impl CodedError for CompileError {
    fn code(&self) -> &'static str {
        match self {
            CompileError::Notation { source, .. } => source.code(),
            CompileError::Theory { source, .. } => source.code(),
            CompileError::ResolutionCycle { .. } => "ETHER_COMPILE_001",
            CompileError::ResolutionDepth { .. } => "ETHER_COMPILE_002",
            CompileError::InvalidTuplet { .. } => "ETHER_COMPILE_003",
            CompileError::InvalidTempo { .. } => "ETHER_COMPILE_004",
            CompileError::InvalidPattern { .. } => "ETHER_COMPILE_005",
            CompileError::InvalidTrack { .. } => "ETHER_COMPILE_006",
        }
    }

    fn category(&self) -> &'static str {
        match self {
            CompileError::Notation { source, .. } => source.category(),
            CompileError::Theory { source, .. } => source.category(),
            _ => "compile",
        }
    }
}

/// Warning codes for recoverable compilation problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningCode {
    /// W001: Arrangement references an unknown section
    UnknownSection,
    /// W002: Track references an unknown pattern
    UnknownPattern,
    /// W003: Transform or continuation source is unknown or not literal notes
    InvalidSource,
    /// W004: Unknown curve shape
    UnknownCurve,
    /// W005: Unknown continuation technique
    UnknownTechnique,
    /// W006: Unknown Markov preset or empty transition table
    UnknownPreset,
    /// W007: Conditional pattern resolved to nothing
    ConditionalUnresolved,
    /// W008: Track names an instrument missing from the instrument table
    UnknownInstrument,
    /// W009: Automation path targets an instrument with no track in the section
    UnknownAutomationTarget,
    /// W010: Start or end section not found in the arrangement
    UnknownBoundary,
}

impl WarningCode {
    /// Returns the warning code string (e.g., "W001").
    pub fn code(&self) -> &'static str {
        match self {
            WarningCode::UnknownSection => "W001",
            WarningCode::UnknownPattern => "W002",
            WarningCode::InvalidSource => "W003",
            WarningCode::UnknownCurve => "W004",
            WarningCode::UnknownTechnique => "W005",
            WarningCode::UnknownPreset => "W006",
            WarningCode::ConditionalUnresolved => "W007",
            WarningCode::UnknownInstrument => "W008",
            WarningCode::UnknownAutomationTarget => "W009",
            WarningCode::UnknownBoundary => "W010",
        }
    }
}

impl std::fmt::Display for WarningCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for WarningCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// A recoverable problem found during compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileWarning {
    /// The warning code.
    pub code: WarningCode,
    /// Human-readable warning message.
    pub message: String,
    /// Location of the problem, e.g. `sections.verse.tracks.bass`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl CompileWarning {
    /// Creates a new warning.
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    /// Creates a new warning with a location path.
    pub fn with_path(
        code: WarningCode,
        message: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

impl std::fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref path) = self.path {
            write!(f, "{}: {} (at {})", self.code, self.message, path)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}
