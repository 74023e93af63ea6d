//! Tuplets: `actual` notes in the time of `normal`.

use etherdaw_spec::TupletPattern;

use super::{ExpandedPattern, GenContext, Generate, LiteralPattern};
use crate::error::CompileError;
use crate::notation::TokenContext;

/// Ratio applied to every written duration.
pub fn tuplet_ratio(actual: u32, normal: u32) -> Option<f64> {
    if actual == 0 || normal == 0 {
        return None;
    }
    Some(normal as f64 / actual as f64)
}

impl Generate for TupletPattern {
    fn generate(&self, ctx: &mut GenContext) -> Result<ExpandedPattern, CompileError> {
        let ratio = tuplet_ratio(self.actual, self.normal).ok_or_else(|| CompileError::InvalidTuplet {
            pattern: ctx.pattern.to_string(),
            actual: self.actual,
            normal: self.normal,
        })?;
        let mut literal = LiteralPattern::parse(ctx.pattern, "notes", &self.notes, TokenContext::Note)?;
        for token in &mut literal.tokens {
            token.beats *= ratio;
        }
        literal.generate(ctx)
    }
}
