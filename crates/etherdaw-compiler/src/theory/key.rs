//! Key parsing, scale-degree resolution, and scale snapping.

use serde::Serialize;

use super::pitch::{octave_to_midi, parse_pitch_class, MIDI_MAX};
use super::scale::Scale;
use crate::error::TheoryError;

/// A tonic pitch class and a scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Key {
    /// Tonic pitch class (0 = C).
    pub root_pc: i32,
    pub scale: Scale,
}

impl Key {
    pub fn new(root_pc: i32, scale: Scale) -> Self {
        Self {
            root_pc: root_pc.rem_euclid(12),
            scale,
        }
    }

    /// Parses `"F# dorian"`, `"A minor"`, `"Am"`, or `"Bb"` (major).
    pub fn parse(input: &str) -> Result<Key, TheoryError> {
        let trimmed = input.trim();
        let invalid = || TheoryError::InvalidKey {
            input: trimmed.to_string(),
        };

        let mut words = trimmed.split_whitespace();
        let tonic = words.next().ok_or_else(invalid)?;
        let mode: Vec<&str> = words.collect();

        if mode.is_empty() {
            if let Ok(pc) = parse_pitch_class(tonic) {
                return Ok(Key::new(pc, Scale::Major));
            }
            let minor_tonic = tonic
                .strip_suffix("min")
                .or_else(|| tonic.strip_suffix('m'))
                .ok_or_else(invalid)?;
            let pc = parse_pitch_class(minor_tonic).map_err(|_| invalid())?;
            return Ok(Key::new(pc, Scale::Minor));
        }

        let pc = parse_pitch_class(tonic).map_err(|_| invalid())?;
        let name = mode.join("_");
        let scale = Scale::from_name(&name).ok_or(TheoryError::UnknownScale { name })?;
        Ok(Key::new(pc, scale))
    }

    /// Scale intervals of this key.
    pub fn intervals(&self) -> &'static [i32] {
        self.scale.intervals()
    }

    /// Whether a MIDI note belongs to the key's scale.
    pub fn contains(&self, midi: i32) -> bool {
        let rel = (midi - self.root_pc).rem_euclid(12);
        self.intervals().contains(&rel)
    }

    /// Resolves a 1-based scale degree to a MIDI note.
    ///
    /// Degrees past the scale length wrap into higher octaves (degree 8 of a
    /// heptatonic scale is the tonic an octave up); `accidental` adds semitones.
    /// Returns `None` when the note falls outside 0..=127.
    pub fn degree_to_midi(&self, degree: i32, accidental: i32, octave: i32) -> Option<i32> {
        let intervals = self.intervals();
        let len = intervals.len() as i32;
        let zero_based = degree.checked_sub(1)?;
        let carry = zero_based.div_euclid(len);
        let idx = zero_based.rem_euclid(len) as usize;
        let midi = octave_to_midi(octave.checked_add(carry)?, self.root_pc + intervals[idx])?
            .checked_add(accidental)?;
        (0..=MIDI_MAX).contains(&midi).then_some(midi)
    }

    /// Snaps a MIDI note to the nearest scale tone; ties resolve downward.
    pub fn snap(&self, midi: i32) -> i32 {
        if self.contains(midi) {
            return midi;
        }
        for distance in 1..=6 {
            if self.contains(midi - distance) {
                return midi - distance;
            }
            if self.contains(midi + distance) {
                return midi + distance;
            }
        }
        midi
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            super::pitch::pitch_class_name(self.root_pc),
            self.scale
        )
    }
}

/// Parses a key string.
pub fn parse_key(input: &str) -> Result<Key, TheoryError> {
    Key::parse(input)
}

/// Snaps a MIDI note to the nearest tone of `key`; ties resolve downward.
pub fn snap_to_scale(midi: i32, key: &Key) -> i32 {
    key.snap(midi)
}
