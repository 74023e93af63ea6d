//! Note names, pitch classes, and MIDI numbers.

use crate::error::TheoryError;

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Octave used when a note name carries none.
pub const DEFAULT_OCTAVE: i32 = 4;

/// Highest MIDI note number.
pub const MIDI_MAX: i32 = 127;

/// Splits a leading pitch letter and accidentals off `s`.
///
/// Returns the semitone offset from C (not wrapped, so `Cb` is -1) and the
/// unconsumed remainder.
pub(crate) fn split_pitch(s: &str) -> Option<(i32, &str)> {
    let letter = s.chars().next()?;
    let base = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let mut rest = &s[1..];
    let mut offset = base;
    loop {
        if let Some(stripped) = rest.strip_prefix('#') {
            offset += 1;
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('b') {
            offset -= 1;
            rest = stripped;
        } else {
            break;
        }
    }
    Some((offset, rest))
}

/// Parses a pitch class name (`"C"`, `"F#"`, `"Bb"`) into 0..12.
pub fn parse_pitch_class(name: &str) -> Result<i32, TheoryError> {
    let trimmed = name.trim();
    match split_pitch(trimmed) {
        Some((offset, "")) => Ok(offset.rem_euclid(12)),
        _ => Err(TheoryError::InvalidNoteName {
            input: trimmed.to_string(),
        }),
    }
}

/// Parses a note name such as `"C4"`, `"F#2"`, `"Bb-1"` into a MIDI number.
///
/// The octave defaults to 4 (`C4` = 60). Results outside 0..=127 are rejected.
pub fn note_name_to_midi(name: &str) -> Result<i32, TheoryError> {
    let trimmed = name.trim();
    let invalid = || TheoryError::InvalidNoteName {
        input: trimmed.to_string(),
    };
    let (offset, rest) = split_pitch(trimmed).ok_or_else(invalid)?;
    let octave = if rest.is_empty() {
        DEFAULT_OCTAVE
    } else {
        rest.parse::<i32>().map_err(|_| invalid())?
    };
    match octave_to_midi(octave, offset) {
        Some(midi) if (0..=MIDI_MAX).contains(&midi) => Ok(midi),
        _ => Err(invalid()),
    }
}

/// MIDI number `offset` semitones above C in `octave`, or `None` on overflow.
pub fn octave_to_midi(octave: i32, offset: i32) -> Option<i32> {
    octave.checked_add(1)?.checked_mul(12)?.checked_add(offset)
}

/// Shifts a MIDI number by `semitones`, clamped to 0..=127.
pub fn shift_midi(midi: i32, semitones: i32) -> i32 {
    midi.saturating_add(semitones).clamp(0, MIDI_MAX)
}

/// Converts a MIDI number to a sharp-spelled note name (60 -> "C4").
pub fn midi_to_note_name(midi: i32) -> String {
    let octave = midi.div_euclid(12) - 1;
    format!("{}{}", SHARP_NAMES[midi.rem_euclid(12) as usize], octave)
}

/// Name of a pitch class (0..12).
pub fn pitch_class_name(pc: i32) -> &'static str {
    SHARP_NAMES[pc.rem_euclid(12) as usize]
}
