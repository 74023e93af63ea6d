//! Pattern resolution: conditional redirects, inheritance, and transforms.
//!
//! Resolution turns a named pattern into a [`ResolvedPattern`]: a concrete
//! generator plus accumulated post-processing. The pattern table is only
//! read; every result is a fresh value.

use std::collections::BTreeMap;

use rand_pcg::Pcg32;
use tracing::trace;

use etherdaw_spec::{
    ArpeggioPattern, Condition, CurveSpec, DegreesPattern, DrumsPattern, EuclideanPattern,
    MarkovPattern, Pattern, PatternKind, TransformOp, TupletPattern, VoiceLeadingPattern,
};

use crate::automation::Curve;
use crate::diagnostics::Diagnostics;
use crate::error::{CompileError, TheoryError, WarningCode};
use crate::generators::{
    ContinuationGenerator, ExpandedPattern, GenContext, Generate, LiteralPattern, NotePitch,
};
use crate::notation::{Token, TokenContext};
use crate::rng::unit;
use crate::theory::{note_name_to_midi, shift_midi, Key};

/// A concrete generator with no remaining references.
#[derive(Debug, Clone, PartialEq)]
pub enum BaseGenerator {
    Literal(LiteralPattern),
    Degrees(DegreesPattern),
    Arpeggio(ArpeggioPattern),
    Euclidean(EuclideanPattern),
    Drums(DrumsPattern),
    Markov(MarkovPattern),
    Continuation(ContinuationGenerator),
    VoiceLeading(VoiceLeadingPattern),
    Tuplet(TupletPattern),
}

impl Generate for BaseGenerator {
    fn generate(&self, ctx: &mut GenContext) -> Result<ExpandedPattern, CompileError> {
        match self {
            BaseGenerator::Literal(g) => g.generate(ctx),
            BaseGenerator::Degrees(g) => g.generate(ctx),
            BaseGenerator::Arpeggio(g) => g.generate(ctx),
            BaseGenerator::Euclidean(g) => g.generate(ctx),
            BaseGenerator::Drums(g) => g.generate(ctx),
            BaseGenerator::Markov(g) => g.generate(ctx),
            BaseGenerator::Continuation(g) => g.generate(ctx),
            BaseGenerator::VoiceLeading(g) => g.generate(ctx),
            BaseGenerator::Tuplet(g) => g.generate(ctx),
        }
    }
}

/// Post-processing accumulated along an inheritance chain.
#[derive(Debug, Clone, PartialEq)]
pub struct PostProcess {
    pub transpose: i32,
    pub octave: i32,
    pub velocity_scale: f64,
    pub constrain_to_scale: bool,
    pub envelope: Option<CurveSpec>,
}

impl Default for PostProcess {
    fn default() -> Self {
        Self {
            transpose: 0,
            octave: 0,
            velocity_scale: 1.0,
            constrain_to_scale: false,
            envelope: None,
        }
    }
}

impl PostProcess {
    /// Semitone shift from transpose and octave, saturating.
    pub fn shift(&self) -> i32 {
        self.transpose.saturating_add(self.octave.saturating_mul(12))
    }

    /// Applies shift, scale snapping, velocity scale, and envelope in that
    /// order. Velocities end clamped to `[0, 1]`.
    pub fn apply(&self, out: &mut ExpandedPattern, key: &Key, path: &str, diagnostics: &mut Diagnostics) {
        let shift = self.shift();
        let envelope = self
            .envelope
            .as_ref()
            .map(|spec| Curve::from_spec(spec, path, diagnostics));
        let total = out.total_beats;

        for note in &mut out.notes {
            if shift != 0 {
                note.pitch = note.pitch.transposed(shift);
            }
            if self.constrain_to_scale {
                if let Some(midi) = note.pitch.midi() {
                    note.pitch = NotePitch::Midi(key.snap(midi));
                }
            }
            note.velocity *= self.velocity_scale;
            if let Some(curve) = &envelope {
                let t = if total > 0.0 { note.start_beat / total } else { 0.0 };
                note.velocity *= curve.value_at(t);
            }
            note.velocity = note.velocity.clamp(0.0, 1.0);
        }
    }
}

/// A pattern reduced to a generator plus post-processing.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPattern {
    /// Pattern that defines the generator, used in error locations.
    pub name: String,
    pub base: BaseGenerator,
    pub post: PostProcess,
}

impl ResolvedPattern {
    pub fn new(name: impl Into<String>, base: BaseGenerator) -> Self {
        Self {
            name: name.into(),
            base,
            post: PostProcess::default(),
        }
    }

    /// Runs the generator and applies post-processing.
    pub fn expand(&self, ctx: &mut GenContext) -> Result<ExpandedPattern, CompileError> {
        let mut out = self.base.generate(ctx)?;
        let path = format!("patterns.{}.velocity_envelope", self.name);
        self.post.apply(&mut out, &ctx.key, &path, ctx.diagnostics);
        trace!(pattern = %self.name, notes = out.notes.len(), beats = out.total_beats, "expanded");
        Ok(out)
    }

    /// Literal tokens with transpose and octave baked in, if the base is
    /// literal.
    pub fn literal_tokens(&self) -> Option<Vec<Token>> {
        let BaseGenerator::Literal(literal) = &self.base else {
            return None;
        };
        let shift = self.post.shift();
        Some(
            literal
                .tokens
                .iter()
                .cloned()
                .map(|mut t| {
                    t.map_pitches(|m| shift_midi(m, shift));
                    t
                })
                .collect(),
        )
    }
}

/// Section-level inputs to conditional patterns.
pub struct ResolveContext<'a> {
    /// Index of the section occurrence in the full arrangement.
    pub section_index: usize,
    /// Section density at its start.
    pub density: f64,
    pub rng: &'a mut Pcg32,
    pub diagnostics: &'a mut Diagnostics,
}

/// Resolves names against a read-only pattern table.
pub struct Resolver<'a> {
    patterns: &'a BTreeMap<String, Pattern>,
    max_depth: usize,
    stack: Vec<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(patterns: &'a BTreeMap<String, Pattern>, max_depth: usize) -> Self {
        Self {
            patterns,
            max_depth,
            stack: Vec::new(),
        }
    }

    /// Resolves `name`, referenced from `path`.
    ///
    /// Returns `Ok(None)` after recording a warning when the reference cannot
    /// be satisfied; the caller skips the track.
    pub fn resolve(
        &mut self,
        name: &str,
        path: &str,
        ctx: &mut ResolveContext,
    ) -> Result<Option<ResolvedPattern>, CompileError> {
        if let Some(pos) = self.stack.iter().position(|n| n == name) {
            let mut chain = self.stack[pos..].join(" -> ");
            chain.push_str(" -> ");
            chain.push_str(name);
            return Err(CompileError::ResolutionCycle { chain });
        }
        if self.stack.len() >= self.max_depth {
            return Err(CompileError::ResolutionDepth {
                pattern: name.to_string(),
                max: self.max_depth,
            });
        }
        let patterns = self.patterns;
        let Some(pattern) = patterns.get(name) else {
            ctx.diagnostics.warn(
                WarningCode::UnknownPattern,
                format!("unknown pattern '{}'", name),
                path,
            );
            return Ok(None);
        };

        self.stack.push(name.to_string());
        let result = self.resolve_pattern(name, pattern, ctx);
        self.stack.pop();
        result
    }

    fn resolve_pattern(
        &mut self,
        name: &str,
        pattern: &Pattern,
        ctx: &mut ResolveContext,
    ) -> Result<Option<ResolvedPattern>, CompileError> {
        let here = format!("patterns.{}", name);
        let base = |b: BaseGenerator| ResolvedPattern::new(name, b);

        let mut resolved = match &pattern.kind {
            PatternKind::Notes(p) => base(BaseGenerator::Literal(LiteralPattern::parse(
                name,
                "notes",
                &p.notes,
                TokenContext::Note,
            )?)),
            PatternKind::Chords(p) => base(BaseGenerator::Literal(LiteralPattern::parse(
                name,
                "chords",
                &p.chords,
                TokenContext::Chord,
            )?)),
            PatternKind::Degrees(p) => base(BaseGenerator::Degrees(p.clone())),
            PatternKind::Arpeggio(p) => base(BaseGenerator::Arpeggio(p.clone())),
            PatternKind::Euclidean(p) => base(BaseGenerator::Euclidean(p.clone())),
            PatternKind::Drums(p) => base(BaseGenerator::Drums(p.clone())),
            PatternKind::Markov(p) => base(BaseGenerator::Markov(p.clone())),
            PatternKind::VoiceLeading(p) => base(BaseGenerator::VoiceLeading(p.clone())),
            PatternKind::Tuplet(p) => base(BaseGenerator::Tuplet(p.clone())),
            PatternKind::Continuation(p) => {
                let Some(source) = self.literal_source(name, &p.source, ctx)? else {
                    return Ok(None);
                };
                base(BaseGenerator::Continuation(ContinuationGenerator::new(
                    p.clone(),
                    source,
                )))
            }
            PatternKind::Transform(p) => {
                let Some(mut tokens) = self.literal_source(name, &p.source, ctx)? else {
                    return Ok(None);
                };
                for (i, op) in p.operations.iter().enumerate() {
                    apply_op(&mut tokens, op).map_err(|message| match message {
                        OpError::Pivot(e) => e.at(format!("pattern '{}' operations[{}].pivot", name, i)),
                        OpError::Invalid(message) => CompileError::InvalidPattern {
                            pattern: name.to_string(),
                            message,
                        },
                    })?;
                }
                base(BaseGenerator::Literal(LiteralPattern::new(tokens)))
            }
            PatternKind::Extends(p) => {
                let Some(mut parent) = self.resolve(&p.extends, &here, ctx)? else {
                    return Ok(None);
                };
                let overrides = &p.overrides;
                if let Some(notes) = &overrides.notes {
                    parent.base = BaseGenerator::Literal(LiteralPattern::parse(
                        name,
                        "overrides.notes",
                        notes,
                        TokenContext::Note,
                    )?);
                    parent.name = name.to_string();
                }
                let overflow = |field: &str| CompileError::InvalidPattern {
                    pattern: name.to_string(),
                    message: format!("{} override is out of range", field),
                };
                parent.post.transpose = parent
                    .post
                    .transpose
                    .checked_add(overrides.transpose.unwrap_or(0))
                    .ok_or_else(|| overflow("transpose"))?;
                parent.post.octave = parent
                    .post
                    .octave
                    .checked_add(overrides.octave.unwrap_or(0))
                    .ok_or_else(|| overflow("octave"))?;
                if let Some(v) = overrides.velocity {
                    if v < 0.0 || v.is_nan() {
                        return Err(CompileError::InvalidPattern {
                            pattern: name.to_string(),
                            message: format!("velocity override {} must not be negative", v),
                        });
                    }
                    parent.post.velocity_scale *= v;
                }
                parent
            }
            PatternKind::Conditional(p) => {
                let target = if self.evaluate(&p.condition, ctx) {
                    Some(&p.then)
                } else {
                    p.otherwise.as_ref()
                };
                let Some(target) = target else {
                    ctx.diagnostics.warn(
                        WarningCode::ConditionalUnresolved,
                        format!("conditional pattern '{}' has no branch for this section", name),
                        here,
                    );
                    return Ok(None);
                };
                match self.resolve(target, &here, ctx)? {
                    Some(r) => r,
                    None => {
                        ctx.diagnostics.warn(
                            WarningCode::ConditionalUnresolved,
                            format!("conditional target '{}' resolved to nothing", target),
                            here,
                        );
                        return Ok(None);
                    }
                }
            }
        };

        if pattern.constrain_to_scale {
            resolved.post.constrain_to_scale = true;
        }
        if let Some(envelope) = &pattern.velocity_envelope {
            resolved.post.envelope = Some(envelope.clone());
        }
        Ok(Some(resolved))
    }

    fn literal_source(
        &mut self,
        owner: &str,
        source: &str,
        ctx: &mut ResolveContext,
    ) -> Result<Option<Vec<Token>>, CompileError> {
        let path = format!("patterns.{}.source", owner);
        let Some(resolved) = self.resolve(source, &path, ctx)? else {
            return Ok(None);
        };
        match resolved.literal_tokens() {
            Some(tokens) => Ok(Some(tokens)),
            None => {
                ctx.diagnostics.warn(
                    WarningCode::InvalidSource,
                    format!("source '{}' of pattern '{}' is not a literal note pattern", source, owner),
                    path,
                );
                Ok(None)
            }
        }
    }

    fn evaluate(&self, condition: &Condition, ctx: &mut ResolveContext) -> bool {
        let index = ctx.section_index;
        match condition {
            Condition::Density { min, max } => {
                min.map_or(true, |m| ctx.density >= m) && max.map_or(true, |m| ctx.density <= m)
            }
            Condition::Probability { chance } => unit(ctx.rng) < *chance,
            Condition::SectionIndex { indices } => indices.contains(&index),
            Condition::Every { n, offset } => *n > 0 && index % n == offset % n,
        }
    }
}

enum OpError {
    Pivot(TheoryError),
    Invalid(String),
}

fn apply_op(tokens: &mut [Token], op: &TransformOp) -> Result<(), OpError> {
    match op {
        TransformOp::Invert { pivot } => {
            let pivot = match pivot {
                Some(name) => note_name_to_midi(name).map_err(OpError::Pivot)?,
                None => match tokens.iter().find(|t| !t.is_rest()) {
                    Some(first) => first.pitches()[0],
                    None => return Ok(()),
                },
            };
            tokens.iter_mut().for_each(|t| t.map_pitches(|m| shift_midi(pivot, pivot.saturating_sub(m))));
        }
        TransformOp::Retrograde => {
            let slots: Vec<usize> = (0..tokens.len()).filter(|&i| !tokens[i].is_rest()).collect();
            let reversed: Vec<Token> = slots.iter().rev().map(|&i| tokens[i].clone()).collect();
            for (slot, token) in slots.into_iter().zip(reversed) {
                tokens[slot] = token;
            }
        }
        TransformOp::Augment { factor } | TransformOp::Diminish { factor } => {
            if *factor <= 0.0 || factor.is_nan() {
                return Err(OpError::Invalid(format!("factor must be positive, got {}", factor)));
            }
            let scale = match op {
                TransformOp::Augment { .. } => *factor,
                _ => 1.0 / *factor,
            };
            tokens.iter_mut().for_each(|t| t.beats *= scale);
        }
        TransformOp::Transpose { semitones } => {
            tokens.iter_mut().for_each(|t| t.map_pitches(|m| shift_midi(m, *semitones)));
        }
        TransformOp::Octave { shift } => {
            tokens.iter_mut().for_each(|t| t.map_pitches(|m| shift_midi(m, shift.saturating_mul(12))));
        }
    }
    Ok(())
}
