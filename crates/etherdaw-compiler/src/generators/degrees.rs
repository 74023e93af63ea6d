//! Scale degrees mapped through the active key.

use etherdaw_spec::DegreesPattern;

use super::{ExpandedNote, ExpandedPattern, GenContext, Generate, NotePitch};
use crate::error::{CompileError, NotationError};
use crate::notation::{parse_degree, DegreeItem};

impl Generate for DegreesPattern {
    fn generate(&self, ctx: &mut GenContext) -> Result<ExpandedPattern, CompileError> {
        let default_beats = ctx.beats(&self.duration, "duration")?;
        let mut notes = Vec::with_capacity(self.degrees.len());
        let mut cursor = 0.0;

        for (i, raw) in self.degrees.iter().enumerate() {
            let item = parse_degree(raw).map_err(|e| e.at(ctx.location(format!("degrees[{}]", i))))?;
            match item {
                DegreeItem::Rest(beats) => cursor += beats.unwrap_or(default_beats),
                DegreeItem::Degree(d) => {
                    let beats = d.beats.unwrap_or(default_beats);
                    let midi = self
                        .octave
                        .checked_add(d.octave_shift)
                        .and_then(|octave| ctx.key.degree_to_midi(d.degree, d.accidental, octave))
                        .ok_or_else(|| {
                            NotationError::InvalidDegree { input: raw.clone() }
                                .at(ctx.location(format!("degrees[{}]", i)))
                        })?;
                    notes.push(ExpandedNote::articulated(
                        NotePitch::Midi(midi),
                        cursor,
                        beats,
                        ctx.velocity,
                        d.articulation,
                        &d.expression,
                    ));
                    cursor += beats;
                }
            }
        }

        Ok(ExpandedPattern::new(notes, cursor))
    }
}
