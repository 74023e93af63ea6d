//! Literal notes and chords.

use super::{ExpandedNote, ExpandedPattern, GenContext, Generate, NotePitch};
use crate::error::CompileError;
use crate::notation::{parse_token, Token, TokenContext};

/// Pre-parsed literal tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralPattern {
    pub tokens: Vec<Token>,
}

impl LiteralPattern {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Parses token strings, reporting the first failure as
    /// `pattern '<name>' <field>[<index>]`.
    pub fn parse(
        pattern: &str,
        field: &str,
        strings: &[String],
        context: TokenContext,
    ) -> Result<LiteralPattern, CompileError> {
        let tokens = strings
            .iter()
            .enumerate()
            .map(|(i, s)| {
                parse_token(s, context)
                    .map_err(|e| e.at(format!("pattern '{}' {}[{}]", pattern, field, i)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LiteralPattern { tokens })
    }

    /// Written length in beats.
    pub fn total_beats(&self) -> f64 {
        self.tokens.iter().map(|t| t.beats).sum()
    }
}

impl Generate for LiteralPattern {
    fn generate(&self, ctx: &mut GenContext) -> Result<ExpandedPattern, CompileError> {
        let mut notes = Vec::with_capacity(self.tokens.len());
        let mut cursor = 0.0;
        for token in &self.tokens {
            for &midi in token.pitches() {
                notes.push(ExpandedNote::articulated(
                    NotePitch::Midi(midi),
                    cursor,
                    token.beats,
                    ctx.velocity,
                    token.articulation,
                    &token.expression,
                ));
            }
            cursor += token.beats;
        }
        Ok(ExpandedPattern::new(notes, cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::tests_support::TestContext;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_notes_and_rests_advance_cursor() {
        let lit = LiteralPattern::parse(
            "p",
            "notes",
            &strings(&["C4:q", "r:q", "E4:h*"]),
            TokenContext::Note,
        )
        .unwrap();
        let mut t = TestContext::new();
        let out = lit.generate(&mut t.ctx()).unwrap();
        assert_eq!(out.total_beats, 4.0);
        assert_eq!(out.notes.len(), 2);
        assert_eq!(out.notes[1].start_beat, 2.0);
        assert!((out.notes[1].duration_beats - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_chord_emits_simultaneous_tones() {
        let lit = LiteralPattern::parse("p", "chords", &strings(&["C:h", "G7:h"]), TokenContext::Chord)
            .unwrap();
        let mut t = TestContext::new();
        let out = lit.generate(&mut t.ctx()).unwrap();
        assert_eq!(out.notes.len(), 7);
        assert!(out.notes[..3].iter().all(|n| n.start_beat == 0.0));
        assert!(out.notes[3..].iter().all(|n| n.start_beat == 2.0));
    }

    #[test]
    fn test_parse_error_location() {
        let err = LiteralPattern::parse("bass", "notes", &strings(&["C4:q", "C4:x"]), TokenContext::Note)
            .unwrap_err();
        assert!(err.to_string().starts_with("pattern 'bass' notes[1]"));
    }
}
