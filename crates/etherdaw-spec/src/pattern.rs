//! Pattern definitions.
//!
//! A pattern is a closed sum over generator kinds and meta-wrappers, tagged by
//! `kind` in JSON. Post-processing flags sit beside the tag and apply to
//! whichever generator the pattern finally resolves to.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::curve::CurveSpec;

/// A named, reusable pattern definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Generator or meta-wrapper body.
    #[serde(flatten)]
    pub kind: PatternKind,
    /// Snap melodic pitches to the active key's scale after expansion.
    #[serde(default, skip_serializing_if = "is_false")]
    pub constrain_to_scale: bool,
    /// Velocity multiplier curve over the pattern's length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity_envelope: Option<CurveSpec>,
}

impl Pattern {
    /// Wraps a pattern kind with no post-processing.
    pub fn new(kind: PatternKind) -> Self {
        Self {
            kind,
            constrain_to_scale: false,
            velocity_envelope: None,
        }
    }

    /// Returns true for transform, extends, and conditional wrappers.
    pub fn is_meta(&self) -> bool {
        matches!(
            self.kind,
            PatternKind::Transform(_) | PatternKind::Extends(_) | PatternKind::Conditional(_)
        )
    }
}

impl From<PatternKind> for Pattern {
    fn from(kind: PatternKind) -> Self {
        Pattern::new(kind)
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Pattern body, one variant per generator or meta-wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternKind {
    Notes(NotesPattern),
    Chords(ChordsPattern),
    Degrees(DegreesPattern),
    Arpeggio(ArpeggioPattern),
    Euclidean(EuclideanPattern),
    Drums(DrumsPattern),
    Markov(MarkovPattern),
    Continuation(ContinuationPattern),
    VoiceLeading(VoiceLeadingPattern),
    Tuplet(TupletPattern),
    Transform(TransformPattern),
    Extends(ExtendsPattern),
    Conditional(ConditionalPattern),
}

impl PatternKind {
    /// Short name of the variant, matching the JSON `kind` tag.
    pub fn name(&self) -> &'static str {
        match self {
            PatternKind::Notes(_) => "notes",
            PatternKind::Chords(_) => "chords",
            PatternKind::Degrees(_) => "degrees",
            PatternKind::Arpeggio(_) => "arpeggio",
            PatternKind::Euclidean(_) => "euclidean",
            PatternKind::Drums(_) => "drums",
            PatternKind::Markov(_) => "markov",
            PatternKind::Continuation(_) => "continuation",
            PatternKind::VoiceLeading(_) => "voice_leading",
            PatternKind::Tuplet(_) => "tuplet",
            PatternKind::Transform(_) => "transform",
            PatternKind::Extends(_) => "extends",
            PatternKind::Conditional(_) => "conditional",
        }
    }
}

/// Literal note and rest tokens, e.g. `["C4:q", "r:8", "E4:8.*"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotesPattern {
    pub notes: Vec<String>,
}

/// Literal chord and rest tokens, e.g. `["Cmaj7:w", "Am7:h"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordsPattern {
    pub chords: Vec<String>,
}

/// Scale degrees resolved through the active key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegreesPattern {
    /// Degree strings such as `"1"`, `"b3"`, `"5+"`, `"9:h"`, `"r:q"`.
    pub degrees: Vec<String>,
    /// Default duration code for degrees without an inline duration.
    #[serde(default = "default_quarter")]
    pub duration: String,
    /// Octave of degree 1.
    #[serde(default = "default_octave")]
    pub octave: i32,
}

/// Arpeggio index ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArpMode {
    #[default]
    Up,
    Down,
    #[serde(alias = "updown")]
    UpDown,
    #[serde(alias = "downup")]
    DownUp,
    Random,
}

/// Arpeggiated chord.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArpeggioPattern {
    /// Chord symbol, e.g. `"Am7"`.
    pub chord: String,
    #[serde(default)]
    pub mode: ArpMode,
    /// Number of octaves the chord tones span.
    #[serde(default = "default_one")]
    pub octaves: u32,
    /// Octave of the chord root.
    #[serde(default = "default_octave")]
    pub octave: i32,
    /// Explicit step count; the index sequence is truncated or looped to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    /// Duration of each step.
    #[serde(default = "default_sixteenth")]
    pub duration: String,
    /// Fraction of each step that sounds.
    #[serde(default = "default_gate")]
    pub gate: f64,
}

/// Euclidean rhythm on a single pitch or drum voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EuclideanPattern {
    pub hits: u32,
    pub steps: u32,
    #[serde(default)]
    pub rotation: u32,
    /// Duration of each step.
    #[serde(default = "default_sixteenth")]
    pub duration: String,
    /// Melodic pitch, e.g. `"C2"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<String>,
    /// Drum voice name, e.g. `"kick"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drum: Option<String>,
    #[serde(default = "default_kit")]
    pub kit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
}

/// Drum step sequencer with one line per drum voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrumsPattern {
    /// Drum name to step string, e.g. `{"kick": "x...x...", "hat": "..>."}`.
    pub lines: BTreeMap<String, String>,
    #[serde(default = "default_kit")]
    pub kit: String,
    /// Duration of each step; compound forms such as `"8+16"` are allowed.
    #[serde(default = "default_sixteenth")]
    pub step: String,
    /// Explicit length in bars; lines loop to fill it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bars: Option<u32>,
}

/// Markov-chain melody over scale degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkovPattern {
    /// Number of notes to generate.
    pub steps: u32,
    #[serde(default = "default_eighth")]
    pub duration: String,
    /// Starting state (a degree string).
    #[serde(default = "default_start_degree")]
    pub start: String,
    #[serde(default = "default_octave")]
    pub octave: i32,
    /// Named transition table preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// Explicit transition table: state -> (next state -> weight).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transitions: Option<BTreeMap<String, BTreeMap<String, f64>>>,
    /// Chance that any generated step is a rest.
    #[serde(default)]
    pub rest_probability: f64,
}

/// Melodic continuation of a literal source pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuationPattern {
    pub source: String,
    /// One of `sequence`, `extend_contour`, `fragment`, `develop`.
    #[serde(default = "default_technique")]
    pub technique: String,
    /// Transposition step in semitones for sequences.
    #[serde(default = "default_interval")]
    pub interval: i32,
    /// Number of sequence repetitions or fragments.
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    /// Number of notes added by contour extension.
    #[serde(default = "default_length")]
    pub length: u32,
    /// Whether the output begins with the source material itself.
    #[serde(default = "default_true")]
    pub include_source: bool,
}

/// Chord progression voiced with minimal movement between steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceLeadingPattern {
    /// Chord tokens with durations, e.g. `["Cmaj7:w", "Fmaj7:w"]`.
    pub progression: Vec<String>,
    #[serde(default = "default_voices")]
    pub voices: u32,
    /// Lowest allowed voice.
    #[serde(default = "default_low")]
    pub low: String,
    /// Highest allowed voice.
    #[serde(default = "default_high")]
    pub high: String,
}

/// Notes played at a tuplet ratio (`actual` in the time of `normal`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TupletPattern {
    pub actual: u32,
    pub normal: u32,
    pub notes: Vec<String>,
}

/// Rewrite of a literal source pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformPattern {
    pub source: String,
    pub operations: Vec<TransformOp>,
}

/// Transform operations, applied in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TransformOp {
    /// Mirror pitches around a pivot (default: the first sounding note).
    Invert {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pivot: Option<String>,
    },
    /// Reverse the token order.
    Retrograde,
    /// Multiply durations.
    Augment {
        #[serde(default = "default_factor")]
        factor: f64,
    },
    /// Divide durations.
    Diminish {
        #[serde(default = "default_factor")]
        factor: f64,
    },
    /// Shift pitches by semitones.
    Transpose { semitones: i32 },
    /// Shift pitches by octaves.
    Octave { shift: i32 },
}

/// Inheritance: a parent pattern with overrides applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendsPattern {
    pub extends: String,
    #[serde(default)]
    pub overrides: PatternOverrides,
}

/// Fields a child pattern may override on its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PatternOverrides {
    /// Replacement literal notes (literal parents only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transpose: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub octave: Option<i32>,
    /// Velocity multiplier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
}

/// Conditional redirect to another named pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalPattern {
    pub condition: Condition,
    pub then: String,
    #[serde(default, alias = "else", skip_serializing_if = "Option::is_none")]
    pub otherwise: Option<String>,
}

/// Condition evaluated against the section context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Section density (at the section start) within `[min, max]`.
    Density {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Random draw below `chance`.
    Probability { chance: f64 },
    /// Arrangement index is one of `indices`.
    SectionIndex { indices: Vec<usize> },
    /// Arrangement index modulo `n` equals `offset`.
    Every {
        n: usize,
        #[serde(default)]
        offset: usize,
    },
}

fn default_quarter() -> String {
    "q".to_string()
}

fn default_eighth() -> String {
    "8".to_string()
}

fn default_sixteenth() -> String {
    "16".to_string()
}

fn default_octave() -> i32 {
    4
}

fn default_one() -> u32 {
    1
}

fn default_gate() -> f64 {
    1.0
}

fn default_kit() -> String {
    "808".to_string()
}

fn default_start_degree() -> String {
    "1".to_string()
}

fn default_technique() -> String {
    "sequence".to_string()
}

fn default_interval() -> i32 {
    2
}

fn default_repetitions() -> u32 {
    2
}

fn default_length() -> u32 {
    4
}

fn default_true() -> bool {
    true
}

fn default_voices() -> u32 {
    4
}

fn default_low() -> String {
    "C3".to_string()
}

fn default_high() -> String {
    "C5".to_string()
}

fn default_factor() -> f64 {
    2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_notes_pattern_tag() {
        let p: Pattern =
            serde_json::from_str(r#"{"kind":"notes","notes":["C4:q","r:q"]}"#).unwrap();
        assert_eq!(
            p,
            Pattern::new(PatternKind::Notes(NotesPattern {
                notes: vec!["C4:q".to_string(), "r:q".to_string()],
            }))
        );
        assert_eq!(p.kind.name(), "notes");
        assert!(!p.is_meta());
    }

    #[test]
    fn test_post_processing_fields_sit_beside_tag() {
        let p: Pattern = serde_json::from_str(
            r#"{"kind":"degrees","degrees":["1","2"],"constrain_to_scale":true,
                "velocity_envelope":{"start":0.5,"end":1.0,"curve":"linear"}}"#,
        )
        .unwrap();
        assert!(p.constrain_to_scale);
        assert!(p.velocity_envelope.is_some());
        let PatternKind::Degrees(d) = p.kind else {
            panic!("expected degrees");
        };
        assert_eq!(d.duration, "q");
        assert_eq!(d.octave, 4);
    }

    #[test]
    fn test_arpeggio_defaults_and_alias() {
        let p: Pattern =
            serde_json::from_str(r#"{"kind":"arpeggio","chord":"Am7","mode":"updown"}"#).unwrap();
        let PatternKind::Arpeggio(a) = p.kind else {
            panic!("expected arpeggio");
        };
        assert_eq!(a.mode, ArpMode::UpDown);
        assert_eq!(a.octaves, 1);
        assert_eq!(a.duration, "16");
        assert_eq!(a.gate, 1.0);
        assert_eq!(a.steps, None);
    }

    #[test]
    fn test_transform_ops() {
        let p: Pattern = serde_json::from_str(
            r#"{"kind":"transform","source":"motif","operations":[
                {"op":"retrograde"},{"op":"transpose","semitones":5},{"op":"augment"}]}"#,
        )
        .unwrap();
        let PatternKind::Transform(t) = &p.kind else {
            panic!("expected transform");
        };
        assert_eq!(
            t.operations,
            vec![
                TransformOp::Retrograde,
                TransformOp::Transpose { semitones: 5 },
                TransformOp::Augment { factor: 2.0 },
            ]
        );
        assert!(p.is_meta());
    }

    #[test]
    fn test_conditional_else_alias() {
        let p: Pattern = serde_json::from_str(
            r#"{"kind":"conditional","condition":{"type":"every","n":2},"then":"a","else":"b"}"#,
        )
        .unwrap();
        let PatternKind::Conditional(c) = p.kind else {
            panic!("expected conditional");
        };
        assert_eq!(c.condition, Condition::Every { n: 2, offset: 0 });
        assert_eq!(c.otherwise.as_deref(), Some("b"));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result: Result<Pattern, _> = serde_json::from_str(r#"{"kind":"granular"}"#);
        assert!(result.is_err());
    }
}
