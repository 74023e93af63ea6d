//! Music theory tables: scales, keys, time signatures, chords, and pitches.

mod chord;
mod key;
mod meter;
mod pitch;
mod scale;

pub use chord::{parse_chord_symbol, ChordSymbol};
pub use key::{parse_key, snap_to_scale, Key};
pub use meter::{parse_time_signature, TimeSignature};
pub use pitch::{
    midi_to_note_name, note_name_to_midi, octave_to_midi, parse_pitch_class, pitch_class_name,
    shift_midi, DEFAULT_OCTAVE, MIDI_MAX,
};
pub use scale::Scale;

pub(crate) use pitch::split_pitch;
