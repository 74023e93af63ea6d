//! Pattern generators.
//!
//! Each generator turns a pattern definition plus a [`GenContext`] into an
//! [`ExpandedPattern`]: notes positioned relative to the pattern start and
//! the final cursor position as `total_beats`. Generators never touch the
//! pattern table; every call produces fresh values.

mod arpeggio;
mod continuation;
mod degrees;
mod drums;
mod euclidean;
mod literal;
mod markov;
mod tuplet;
mod voice_leading;

pub use continuation::ContinuationGenerator;
pub use euclidean::euclidean_rhythm;
pub use literal::LiteralPattern;
pub use markov::{MarkovChain, MarkovPreset};
pub use voice_leading::voice_lead;

use rand_pcg::Pcg32;
use serde::{Serialize, Serializer};

use crate::diagnostics::Diagnostics;
use crate::error::CompileError;
use crate::notation::{parse_duration_expr, Articulation, Expression};
use crate::theory::{midi_to_note_name, shift_midi, Key, TimeSignature};

/// Shared inputs for a generator call.
pub struct GenContext<'a> {
    /// Name of the pattern being expanded, for error locations.
    pub pattern: &'a str,
    pub key: Key,
    pub time_signature: TimeSignature,
    pub tempo: f64,
    /// Base velocity for notes without an explicit `@velocity`.
    pub velocity: f64,
    /// Beats from the pattern start past which notes are never heard.
    pub horizon: f64,
    pub rng: &'a mut Pcg32,
    pub diagnostics: &'a mut Diagnostics,
}

impl GenContext<'_> {
    /// Location string for a field of the current pattern.
    pub fn location(&self, field: impl std::fmt::Display) -> String {
        format!("pattern '{}' {}", self.pattern, field)
    }

    /// Parses a duration expression, reporting errors at `field`.
    pub(crate) fn beats(&self, expr: &str, field: &str) -> Result<f64, CompileError> {
        parse_duration_expr(expr).map_err(|e| e.at(self.location(field)))
    }

    pub(crate) fn invalid(&self, message: impl Into<String>) -> CompileError {
        CompileError::InvalidPattern {
            pattern: self.pattern.to_string(),
            message: message.into(),
        }
    }
}

/// Common contract for every generator.
pub trait Generate {
    fn generate(&self, ctx: &mut GenContext) -> Result<ExpandedPattern, CompileError>;
}

/// Pitch of an expanded note.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NotePitch {
    Midi(i32),
    Drum { name: String, kit: String },
}

impl NotePitch {
    pub fn drum(name: impl Into<String>, kit: impl Into<String>) -> NotePitch {
        NotePitch::Drum {
            name: name.into(),
            kit: kit.into(),
        }
    }

    pub fn midi(&self) -> Option<i32> {
        match self {
            NotePitch::Midi(m) => Some(*m),
            NotePitch::Drum { .. } => None,
        }
    }

    /// Shifts melodic pitches, clamped to the MIDI range; drums are unchanged.
    pub fn transposed(&self, semitones: i32) -> NotePitch {
        match self {
            NotePitch::Midi(m) => NotePitch::Midi(shift_midi(*m, semitones)),
            drum => drum.clone(),
        }
    }
}

impl std::fmt::Display for NotePitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotePitch::Midi(m) => f.write_str(&midi_to_note_name(*m)),
            NotePitch::Drum { name, kit } => write!(f, "drum:{}@{}", name, kit),
        }
    }
}

impl Serialize for NotePitch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A note positioned relative to its pattern's start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpandedNote {
    pub pitch: NotePitch,
    pub start_beat: f64,
    pub duration_beats: f64,
    pub velocity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing_offset_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub portamento: bool,
}

impl ExpandedNote {
    /// A plain note with no expression fields.
    pub fn new(pitch: NotePitch, start_beat: f64, duration_beats: f64, velocity: f64) -> Self {
        Self {
            pitch,
            start_beat,
            duration_beats,
            velocity,
            timing_offset_ms: None,
            probability: None,
            portamento: false,
        }
    }

    /// A note shaped by an articulation and expression suffix.
    ///
    /// `beats` is the written length; the sounding length is `beats × gate`.
    pub fn articulated(
        pitch: NotePitch,
        start_beat: f64,
        beats: f64,
        base_velocity: f64,
        articulation: Articulation,
        expression: &Expression,
    ) -> Self {
        let velocity = (expression.velocity.unwrap_or(base_velocity)
            + articulation.velocity_boost())
        .clamp(0.0, 1.0);
        Self {
            pitch,
            start_beat,
            duration_beats: beats * articulation.gate(),
            velocity,
            timing_offset_ms: expression.timing_offset_ms,
            probability: expression.probability,
            portamento: expression.portamento,
        }
    }
}

/// Output of a generator call.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExpandedPattern {
    pub notes: Vec<ExpandedNote>,
    pub total_beats: f64,
}

impl ExpandedPattern {
    pub fn new(notes: Vec<ExpandedNote>, total_beats: f64) -> Self {
        Self { notes, total_beats }
    }

    /// Appends `other` after this pattern's end.
    pub fn append(&mut self, other: ExpandedPattern) {
        let offset = self.total_beats;
        self.notes.extend(other.notes.into_iter().map(|mut n| {
            n.start_beat += offset;
            n
        }));
        self.total_beats += other.total_beats;
    }

    /// Repeats the pattern end-to-end `times` times, stopping before the
    /// first copy that would start at or after `until`.
    ///
    /// A pattern with no length is kept once.
    pub fn repeated(&self, times: u32, until: f64) -> ExpandedPattern {
        let mut out = ExpandedPattern::default();
        for copy in 0..times {
            if copy > 0 && (self.total_beats <= 0.0 || out.total_beats >= until) {
                break;
            }
            out.append(self.clone());
        }
        out
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use rand_pcg::Pcg32;

    use super::GenContext;
    use crate::diagnostics::Diagnostics;
    use crate::rng::pattern_rng;
    use crate::theory::{parse_key, Key, TimeSignature};

    /// Owns the mutable pieces a `GenContext` borrows.
    pub struct TestContext {
        pub key: Key,
        pub rng: Pcg32,
        pub diagnostics: Diagnostics,
    }

    impl TestContext {
        pub fn new() -> Self {
            Self::with_key("C major")
        }

        pub fn with_key(key: &str) -> Self {
            Self {
                key: parse_key(key).unwrap(),
                rng: pattern_rng(7, "test"),
                diagnostics: Diagnostics::new(),
            }
        }

        pub fn ctx(&mut self) -> GenContext<'_> {
            GenContext {
                pattern: "test",
                key: self.key,
                time_signature: TimeSignature::default(),
                tempo: 120.0,
                velocity: 0.8,
                horizon: f64::INFINITY,
                rng: &mut self.rng,
                diagnostics: &mut self.diagnostics,
            }
        }
    }
}
