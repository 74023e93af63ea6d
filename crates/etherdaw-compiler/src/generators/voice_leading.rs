//! Chord progressions voiced with minimal movement.

use etherdaw_spec::VoiceLeadingPattern;

use super::{ExpandedNote, ExpandedPattern, GenContext, Generate, LiteralPattern, NotePitch};
use crate::error::CompileError;
use crate::notation::TokenContext;
use crate::theory::note_name_to_midi;

/// Upper bound on voices per chord.
pub const MAX_VOICES: usize = 8;

/// Voices each chord (pitch classes, most important first) with `voices`
/// distinct pitches inside `[low, high]`.
///
/// The first chord is placed closest to the middle of the range; each
/// following chord minimizes total movement from the previous voicing. Chords
/// that cannot be voiced in the range fall back to a close voicing from `low`.
pub fn voice_lead(chords: &[Vec<i32>], voices: usize, low: i32, high: i32) -> Vec<Vec<i32>> {
    let voices = voices.clamp(1, MAX_VOICES);
    let center = (low + high) as f64 / 2.0;
    let mut previous: Option<Vec<i32>> = None;
    let mut out = Vec::with_capacity(chords.len());

    for pcs in chords {
        let required = required_classes(pcs, voices);
        let candidates: Vec<i32> = (low..=high)
            .filter(|m| pcs.iter().any(|pc| pc.rem_euclid(12) == m.rem_euclid(12)))
            .collect();

        let best = match &previous {
            Some(prev) => cheapest_voicing(&candidates, voices, &required, |slot, m| {
                prev.get(slot).map_or(0.0, |p| (p - m).abs() as f64)
            }),
            None => cheapest_voicing(&candidates, voices, &required, |_, m| (m as f64 - center).abs()),
        };
        let voicing = best.unwrap_or_else(|| close_voicing(pcs, voices, low));
        previous = Some(voicing.clone());
        out.push(voicing);
    }
    out
}

fn required_classes(pcs: &[i32], voices: usize) -> Vec<i32> {
    let mut distinct: Vec<i32> = Vec::new();
    for pc in pcs.iter().map(|p| p.rem_euclid(12)) {
        if !distinct.contains(&pc) {
            distinct.push(pc);
        }
    }
    distinct.truncate(voices);
    distinct
}

/// Cheapest ascending choice of `k` candidates that covers every required
/// pitch class, where `slot_cost(j, m)` prices pitch `m` in voice `j`.
///
/// Ties go to the lexicographically first voicing. Runs in
/// `O(candidates × k × 2^required)`.
fn cheapest_voicing(
    candidates: &[i32],
    k: usize,
    required: &[i32],
    slot_cost: impl Fn(usize, i32) -> f64,
) -> Option<Vec<i32>> {
    let n = candidates.len();
    let masks = 1usize << required.len();
    let full = masks - 1;
    let bit = |m: i32| {
        required
            .iter()
            .position(|pc| *pc == m.rem_euclid(12))
            .map_or(0, |p| 1usize << p)
    };
    let at = |i: usize, j: usize, mask: usize| (i * (k + 1) + j) * masks + mask;

    // best[at(i, j, mask)]: cheapest fill of voices j.. from candidates i..
    // when `mask` classes are already covered.
    let mut best = vec![f64::INFINITY; (n + 1) * (k + 1) * masks];
    for i in (0..=n).rev() {
        for j in (0..=k).rev() {
            for mask in 0..masks {
                best[at(i, j, mask)] = if j == k {
                    if mask == full {
                        0.0
                    } else {
                        f64::INFINITY
                    }
                } else if i == n {
                    f64::INFINITY
                } else {
                    let m = candidates[i];
                    let take = slot_cost(j, m) + best[at(i + 1, j + 1, mask | bit(m))];
                    take.min(best[at(i + 1, j, mask)])
                };
            }
        }
    }
    if !best[at(0, 0, 0)].is_finite() {
        return None;
    }

    let mut voicing = Vec::with_capacity(k);
    let (mut from, mut mask) = (0, 0);
    for j in 0..k {
        let target = best[at(from, j, mask)];
        let chosen = (from..n).find(|&c| {
            let m = candidates[c];
            slot_cost(j, m) + best[at(c + 1, j + 1, mask | bit(m))] == target
        })?;
        voicing.push(candidates[chosen]);
        mask |= bit(candidates[chosen]);
        from = chosen + 1;
    }
    Some(voicing)
}

fn close_voicing(pcs: &[i32], voices: usize, low: i32) -> Vec<i32> {
    let classes = required_classes(pcs, MAX_VOICES);
    if classes.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(voices);
    let mut floor = low;
    for i in 0..voices {
        let pc = classes[i % classes.len()];
        let mut pitch = floor + (pc - floor).rem_euclid(12);
        if out.last().is_some_and(|&last| pitch <= last) {
            pitch += 12;
        }
        out.push(pitch);
        floor = pitch + 1;
    }
    out
}

impl Generate for VoiceLeadingPattern {
    fn generate(&self, ctx: &mut GenContext) -> Result<ExpandedPattern, CompileError> {
        let low = note_name_to_midi(&self.low).map_err(|e| e.at(ctx.location("low")))?;
        let high = note_name_to_midi(&self.high).map_err(|e| e.at(ctx.location("high")))?;
        if low > high {
            return Err(ctx.invalid(format!(
                "voicing range {}..{} is empty",
                self.low, self.high
            )));
        }
        let tokens = LiteralPattern::parse(ctx.pattern, "progression", &self.progression, TokenContext::Chord)?.tokens;

        let chords: Vec<Vec<i32>> = tokens
            .iter()
            .filter(|t| !t.is_rest())
            .map(|t| t.pitches().iter().map(|m| m.rem_euclid(12)).collect())
            .collect();
        let mut voicings = voice_lead(&chords, self.voices as usize, low, high).into_iter();

        let mut notes = Vec::new();
        let mut cursor = 0.0;
        for token in &tokens {
            if !token.is_rest() {
                for midi in voicings.next().unwrap_or_default() {
                    notes.push(ExpandedNote::articulated(
                        NotePitch::Midi(midi),
                        cursor,
                        token.beats,
                        ctx.velocity,
                        token.articulation,
                        &token.expression,
                    ));
                }
            }
            cursor += token.beats;
        }

        Ok(ExpandedPattern::new(notes, cursor))
    }
}
