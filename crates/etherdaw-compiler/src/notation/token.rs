//! Note, chord, and rest token parsing.
//!
//! Grammar for notes:
//!
//! ```text
//! <A-G>[#|b][octave]:<dur>[.][artic][~>][@vel][±Nms][?prob]
//! ```
//!
//! Chords replace the pitch with a chord symbol (`Cmaj7:w`, `G/B:h>`) and are
//! voiced upward from the root in octave 4. Rests are `r:<dur>[.]`.

use serde::Serialize;

use super::duration::parse_duration;
use crate::error::NotationError;
use crate::theory::{note_name_to_midi, parse_chord_symbol, DEFAULT_OCTAVE};

/// Articulation mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Articulation {
    #[default]
    None,
    /// `*`
    Staccato,
    /// `~`
    Legato,
    /// `>`
    Accent,
    /// `^`
    Marcato,
}

impl Articulation {
    pub fn from_mark(mark: char) -> Option<Articulation> {
        match mark {
            '*' => Some(Articulation::Staccato),
            '~' => Some(Articulation::Legato),
            '>' => Some(Articulation::Accent),
            '^' => Some(Articulation::Marcato),
            _ => None,
        }
    }

    pub fn mark(&self) -> Option<char> {
        match self {
            Articulation::None => None,
            Articulation::Staccato => Some('*'),
            Articulation::Legato => Some('~'),
            Articulation::Accent => Some('>'),
            Articulation::Marcato => Some('^'),
        }
    }

    /// Fraction of the written duration that sounds.
    pub fn gate(&self) -> f64 {
        match self {
            Articulation::None | Articulation::Accent => 1.0,
            Articulation::Staccato => 0.3,
            Articulation::Legato => 1.1,
            Articulation::Marcato => 0.8,
        }
    }

    /// Velocity added on top of the base velocity.
    pub fn velocity_boost(&self) -> f64 {
        match self {
            Articulation::Accent => 0.2,
            Articulation::Marcato => 0.3,
            _ => 0.0,
        }
    }
}

/// Optional per-note expression fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Expression {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing_offset_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    pub portamento: bool,
}

/// What a token sounds.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Note(i32),
    Chord(Vec<i32>),
    Rest,
}

/// A parsed note, chord, or rest.
///
/// Sounding tokens always have `beats > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub beats: f64,
    pub articulation: Articulation,
    pub expression: Expression,
}

impl Token {
    pub fn rest(beats: f64) -> Token {
        Token {
            kind: TokenKind::Rest,
            beats,
            articulation: Articulation::None,
            expression: Expression::default(),
        }
    }

    pub fn note(midi: i32, beats: f64) -> Token {
        Token {
            kind: TokenKind::Note(midi),
            beats,
            articulation: Articulation::None,
            expression: Expression::default(),
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self.kind, TokenKind::Rest)
    }

    /// Sounding pitches (empty for rests).
    pub fn pitches(&self) -> &[i32] {
        match &self.kind {
            TokenKind::Note(midi) => std::slice::from_ref(midi),
            TokenKind::Chord(tones) => tones,
            TokenKind::Rest => &[],
        }
    }

    /// Applies `f` to every pitch in place.
    pub fn map_pitches(&mut self, mut f: impl FnMut(i32) -> i32) {
        match &mut self.kind {
            TokenKind::Note(midi) => *midi = f(*midi),
            TokenKind::Chord(tones) => tones.iter_mut().for_each(|t| *t = f(*t)),
            TokenKind::Rest => {}
        }
    }
}

/// Whether a token string is read as a note or a chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenContext {
    Note,
    Chord,
}

/// Duration, articulation, and expressions parsed from the text after `:`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Suffix {
    pub beats: f64,
    pub articulation: Articulation,
    pub expression: Expression,
}

/// Parses `<dur>[.][artic][~>][@vel][±Nms][?prob]`.
///
/// `malformed` builds the error for structural problems so callers can report
/// them as note, chord, or degree errors.
pub(crate) fn parse_suffix(
    tail: &str,
    input: &str,
    malformed: impl Fn(&str) -> NotationError,
) -> Result<Suffix, NotationError> {
    let code_len = tail
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(tail.len());
    let (code, mut rest) = tail.split_at(code_len);
    let dotted = match rest.strip_prefix('.') {
        Some(stripped) => {
            rest = stripped;
            true
        }
        None => false,
    };
    let beats = parse_duration(code, dotted).map_err(|_| NotationError::InvalidDuration {
        input: input.to_string(),
    })?;

    let mut articulation = Articulation::None;
    let mut expression = Expression::default();

    if let Some(stripped) = rest.strip_prefix("~>") {
        expression.portamento = true;
        rest = stripped;
    } else if let Some(a) = rest.chars().next().and_then(Articulation::from_mark) {
        articulation = a;
        rest = &rest[1..];
        if let Some(stripped) = rest.strip_prefix("~>") {
            expression.portamento = true;
            rest = stripped;
        }
    }

    if let Some(stripped) = rest.strip_prefix('@') {
        let (value, remaining) = take_number(stripped);
        let velocity: f64 = value.parse().map_err(|_| malformed("invalid velocity"))?;
        if !(0.0..=1.0).contains(&velocity) {
            return Err(NotationError::VelocityOutOfRange {
                input: input.to_string(),
                value: velocity,
            });
        }
        expression.velocity = Some(velocity);
        rest = remaining;
    }

    if rest.starts_with(['+', '-']) {
        let sign = if rest.starts_with('-') { -1.0 } else { 1.0 };
        let (value, remaining) = take_number(&rest[1..]);
        let invalid_timing = || NotationError::InvalidTiming {
            input: input.to_string(),
        };
        let ms: f64 = value.parse().map_err(|_| invalid_timing())?;
        rest = remaining.strip_prefix("ms").ok_or_else(invalid_timing)?;
        expression.timing_offset_ms = Some(sign * ms);
    }

    if let Some(stripped) = rest.strip_prefix('?') {
        let (value, remaining) = take_number(stripped);
        let probability: f64 = value.parse().map_err(|_| malformed("invalid probability"))?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(NotationError::ProbabilityOutOfRange {
                input: input.to_string(),
                value: probability,
            });
        }
        expression.probability = Some(probability);
        rest = remaining;
    }

    if !rest.is_empty() {
        return Err(malformed(&format!("unexpected '{}'", rest)));
    }

    Ok(Suffix {
        beats,
        articulation,
        expression,
    })
}

fn take_number(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    s.split_at(end)
}

/// Parses a note token such as `"C#4:8.*@0.7"`.
pub fn parse_note(s: &str) -> Result<Token, NotationError> {
    let input = s.trim();
    let malformed = |message: &str| NotationError::InvalidNote {
        input: input.to_string(),
        message: message.to_string(),
    };
    let (head, tail) = input
        .split_once(':')
        .ok_or_else(|| malformed("missing ':<duration>'"))?;
    if !head.starts_with(|c: char| c.is_ascii_uppercase()) {
        return Err(malformed("pitch must start with A-G"));
    }
    let midi = note_name_to_midi(head).map_err(|_| malformed("invalid pitch"))?;
    let suffix = parse_suffix(tail, input, malformed)?;
    Ok(Token {
        kind: TokenKind::Note(midi),
        beats: suffix.beats,
        articulation: suffix.articulation,
        expression: suffix.expression,
    })
}

/// Parses a chord token such as `"Am7:h"` or `"G/B:q>"`.
pub fn parse_chord(s: &str) -> Result<Token, NotationError> {
    let input = s.trim();
    let malformed = |message: &str| NotationError::InvalidChord {
        input: input.to_string(),
        message: message.to_string(),
    };
    let (head, tail) = input
        .split_once(':')
        .ok_or_else(|| malformed("missing ':<duration>'"))?;
    let chord = parse_chord_symbol(head).map_err(|e| malformed(&e.to_string()))?;
    let suffix = parse_suffix(tail, input, malformed)?;
    Ok(Token {
        kind: TokenKind::Chord(chord.tones(DEFAULT_OCTAVE)),
        beats: suffix.beats,
        articulation: suffix.articulation,
        expression: suffix.expression,
    })
}

/// Parses a rest token `"r:<dur>[.]"` into its beat length.
pub fn parse_rest(s: &str) -> Result<f64, NotationError> {
    let input = s.trim();
    let invalid = || NotationError::InvalidRest {
        input: input.to_string(),
    };
    let code = input.strip_prefix("r:").ok_or_else(invalid)?;
    let (code, dotted) = match code.strip_suffix('.') {
        Some(stripped) => (stripped, true),
        None => (code, false),
    };
    parse_duration(code, dotted).map_err(|_| invalid())
}

/// Whether a token string denotes a rest.
pub fn is_rest_str(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed == "r" || trimmed.starts_with("r:")
}

/// Parses a note or chord token, dispatching rests.
pub fn parse_token(s: &str, context: TokenContext) -> Result<Token, NotationError> {
    if is_rest_str(s) {
        return parse_rest(s).map(Token::rest);
    }
    match context {
        TokenContext::Note => parse_note(s),
        TokenContext::Chord => parse_chord(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_note() {
        let t = parse_note("C4:q").unwrap();
        assert_eq!(t, Token::note(60, 1.0));
        assert_eq!(parse_note("A:8").unwrap().kind, TokenKind::Note(69));
        assert_eq!(parse_note("Bb-1:h").unwrap().kind, TokenKind::Note(10));
    }

    #[test]
    fn test_full_suffix_chain() {
        let t = parse_note("E4:8.>~>@0.7+10ms?0.5").unwrap();
        assert_eq!(t.kind, TokenKind::Note(64));
        assert_eq!(t.beats, 0.75);
        assert_eq!(t.articulation, Articulation::Accent);
        assert_eq!(
            t.expression,
            Expression {
                velocity: Some(0.7),
                timing_offset_ms: Some(10.0),
                probability: Some(0.5),
                portamento: true,
            }
        );
    }

    #[test]
    fn test_portamento_versus_legato() {
        let porta = parse_note("C4:q~>").unwrap();
        assert_eq!(porta.articulation, Articulation::None);
        assert!(porta.expression.portamento);

        let legato = parse_note("C4:q~").unwrap();
        assert_eq!(legato.articulation, Articulation::Legato);
        assert!(!legato.expression.portamento);

        let both = parse_note("C4:q~~>").unwrap();
        assert_eq!(both.articulation, Articulation::Legato);
        assert!(both.expression.portamento);
    }

    #[test]
    fn test_negative_timing() {
        let t = parse_note("G3:16*-5.5ms").unwrap();
        assert_eq!(t.articulation, Articulation::Staccato);
        assert_eq!(t.expression.timing_offset_ms, Some(-5.5));
    }

    #[test]
    fn test_out_of_range_expressions_are_fatal() {
        assert!(matches!(
            parse_note("C4:q@1.5"),
            Err(NotationError::VelocityOutOfRange { .. })
        ));
        assert!(matches!(
            parse_note("C4:q?2"),
            Err(NotationError::ProbabilityOutOfRange { .. })
        ));
        assert!(matches!(
            parse_note("C4:q+10"),
            Err(NotationError::InvalidTiming { .. })
        ));
    }

    #[test]
    fn test_malformed_notes() {
        for bad in ["C4", "X4:q", "C4:7", "C4:q!", "c4:q", ":q"] {
            assert!(parse_note(bad).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn test_chords() {
        let t = parse_chord("Cmaj7:w").unwrap();
        assert_eq!(t.kind, TokenKind::Chord(vec![60, 64, 67, 71]));
        assert_eq!(t.beats, 4.0);

        let slash = parse_chord("Am/E:h>").unwrap();
        assert_eq!(slash.kind, TokenKind::Chord(vec![64, 69, 72, 76]));
        assert_eq!(slash.articulation, Articulation::Accent);
        assert!(parse_chord("Cxx:q").is_err());
    }

    #[test]
    fn test_rests() {
        assert_eq!(parse_rest("r:q").unwrap(), 1.0);
        assert_eq!(parse_rest("r:h.").unwrap(), 3.0);
        assert!(parse_rest("r").is_err());
        assert!(parse_rest("x:q").is_err());
        assert_eq!(
            parse_token("r:8", TokenContext::Chord).unwrap(),
            Token::rest(0.5)
        );
    }

    #[test]
    fn test_articulation_table() {
        assert_eq!(Articulation::Staccato.gate(), 0.3);
        assert_eq!(Articulation::Legato.gate(), 1.1);
        assert_eq!(Articulation::Accent.velocity_boost(), 0.2);
        assert_eq!(Articulation::Marcato.gate(), 0.8);
        assert_eq!(Articulation::Marcato.velocity_boost(), 0.3);
        assert_eq!(Articulation::None.gate(), 1.0);
    }
}
