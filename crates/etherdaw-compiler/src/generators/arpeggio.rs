//! Arpeggiated chords.

use rand::Rng;

use etherdaw_spec::{ArpMode, ArpeggioPattern};

use super::{ExpandedNote, ExpandedPattern, GenContext, Generate, NotePitch};
use crate::error::CompileError;
use crate::theory::{octave_to_midi, parse_chord_symbol, MIDI_MAX};

/// Index order over `len` chord tones for a non-random mode.
fn index_sequence(mode: ArpMode, len: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    let up: Vec<usize> = (0..len).collect();
    let down: Vec<usize> = (0..len).rev().collect();
    match mode {
        ArpMode::Up | ArpMode::Random => up,
        ArpMode::Down => down,
        // Turnaround tones are not repeated.
        ArpMode::UpDown => up.iter().chain(down.iter().skip(1).take(len.saturating_sub(2))).copied().collect(),
        ArpMode::DownUp => down.iter().chain(up.iter().skip(1).take(len.saturating_sub(2))).copied().collect(),
    }
}

impl Generate for ArpeggioPattern {
    fn generate(&self, ctx: &mut GenContext) -> Result<ExpandedPattern, CompileError> {
        let chord = parse_chord_symbol(&self.chord).map_err(|e| e.at(ctx.location("chord")))?;
        let step = ctx.beats(&self.duration, "duration")?;
        if self.gate <= 0.0 || self.gate.is_nan() {
            return Err(ctx.invalid(format!("gate must be positive, got {}", self.gate)));
        }

        let span = self.octaves.max(1);
        let root = octave_to_midi(self.octave, chord.root_pc).unwrap_or(i32::MAX);
        let top = i64::from(root)
            + 12 * (i64::from(span) - 1)
            + i64::from(chord.intervals.last().copied().unwrap_or(0));
        if root < 0 || top > i64::from(MIDI_MAX) {
            return Err(ctx.invalid(format!(
                "{} over {} octave(s) from octave {} leaves the MIDI range",
                self.chord, span, self.octave
            )));
        }
        let tones: Vec<i32> = (0..span as i32)
            .flat_map(|o| chord.intervals.iter().map(move |i| root + 12 * o + i))
            .collect();

        let indices: Vec<usize> = match self.mode {
            ArpMode::Random => {
                let count = self.steps.map_or(tones.len(), |s| s as usize);
                (0..count).map(|_| ctx.rng.gen_range(0..tones.len())).collect()
            }
            mode => {
                let cycle = index_sequence(mode, tones.len());
                match self.steps {
                    Some(steps) => cycle.iter().copied().cycle().take(steps as usize).collect(),
                    None => cycle,
                }
            }
        };

        let notes = indices
            .iter()
            .enumerate()
            .map(|(i, &idx)| {
                ExpandedNote::new(
                    NotePitch::Midi(tones[idx]),
                    i as f64 * step,
                    step * self.gate,
                    ctx.velocity,
                )
            })
            .collect();

        Ok(ExpandedPattern::new(notes, indices.len() as f64 * step))
    }
}
