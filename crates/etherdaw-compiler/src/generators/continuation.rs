//! Melodic continuation of a literal source phrase.

use etherdaw_spec::ContinuationPattern;

use super::{ExpandedPattern, GenContext, Generate, LiteralPattern};
use crate::error::{CompileError, WarningCode};
use crate::notation::Token;
use crate::theory::shift_midi;

/// How the source phrase is extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Technique {
    /// Repeat the phrase, each time shifted by `interval` semitones.
    #[default]
    Sequence,
    /// Keep moving by the phrase's last interval.
    ExtendContour,
    /// Repeat ever shorter leading fragments.
    Fragment,
    /// Sequence, then fragments, then contour extension.
    Develop,
}

impl Technique {
    pub fn from_name(name: &str) -> Option<Technique> {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "sequence" => Some(Technique::Sequence),
            "extend_contour" | "contour" => Some(Technique::ExtendContour),
            "fragment" | "fragmentation" => Some(Technique::Fragment),
            "develop" => Some(Technique::Develop),
            _ => None,
        }
    }
}

/// A continuation bound to the already-resolved tokens of its source.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationGenerator {
    pub params: ContinuationPattern,
    pub source: Vec<Token>,
}

impl ContinuationGenerator {
    pub fn new(params: ContinuationPattern, source: Vec<Token>) -> Self {
        Self { params, source }
    }

    /// The continuation tokens, without the source phrase.
    pub fn continue_with(&self, technique: Technique) -> Vec<Token> {
        match technique {
            Technique::Sequence => self.sequence(),
            Technique::ExtendContour => self.extend_contour(&self.source),
            Technique::Fragment => self.fragments(),
            Technique::Develop => {
                let mut out = self.sequence();
                out.extend(self.fragments());
                let mut so_far = self.source.clone();
                so_far.extend(out.iter().cloned());
                out.extend(self.extend_contour(&so_far));
                out
            }
        }
    }

    fn sequence(&self) -> Vec<Token> {
        let mut out = Vec::with_capacity(self.source.len() * self.params.repetitions as usize);
        for r in 1..=self.params.repetitions as i32 {
            let shift = self.params.interval.saturating_mul(r);
            out.extend(self.source.iter().map(|t| {
                let mut t = t.clone();
                t.map_pitches(|m| shift_midi(m, shift));
                t
            }));
        }
        out
    }

    fn fragments(&self) -> Vec<Token> {
        let n = self.source.len();
        if n == 0 {
            return Vec::new();
        }
        let mut out = Vec::new();
        for k in 1..=self.params.repetitions.min(16) {
            let size = n.div_ceil(1 << k).max(1);
            out.extend(self.source[..size].iter().cloned());
        }
        out
    }

    fn extend_contour(&self, phrase: &[Token]) -> Vec<Token> {
        let sounding: Vec<&Token> = phrase.iter().filter(|t| !t.is_rest()).collect();
        let Some(last) = sounding.last() else {
            return Vec::new();
        };
        let last_pitch = last.pitches()[0];
        let step = match sounding.len() {
            n if n >= 2 => last_pitch.saturating_sub(sounding[n - 2].pitches()[0]),
            _ => self.params.interval,
        };
        (1..=self.params.length as i32)
            .map(|k| Token::note(shift_midi(last_pitch, step.saturating_mul(k)), last.beats))
            .collect()
    }
}

impl Generate for ContinuationGenerator {
    fn generate(&self, ctx: &mut GenContext) -> Result<ExpandedPattern, CompileError> {
        let technique = match Technique::from_name(&self.params.technique) {
            Some(t) => t,
            None => {
                ctx.diagnostics.warn(
                    WarningCode::UnknownTechnique,
                    format!(
                        "unknown continuation technique '{}', using sequence",
                        self.params.technique
                    ),
                    ctx.location("technique"),
                );
                Technique::Sequence
            }
        };

        let mut tokens = if self.params.include_source {
            self.source.clone()
        } else {
            Vec::new()
        };
        tokens.extend(self.continue_with(technique));
        LiteralPattern::new(tokens).generate(ctx)
    }
}
