//! Chord symbol parsing and voicing.

use super::pitch::{parse_pitch_class, split_pitch};
use crate::error::TheoryError;

/// A parsed chord symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordSymbol {
    /// Root pitch class (0 = C).
    pub root_pc: i32,
    /// Semitone offsets from the root, ascending, starting at 0.
    pub intervals: Vec<i32>,
    /// Slash bass pitch class.
    pub bass_pc: Option<i32>,
}

impl ChordSymbol {
    /// Voices the chord upward from the root in `octave`, with the slash bass
    /// (if any) placed in the octave below the root.
    pub fn tones(&self, octave: i32) -> Vec<i32> {
        let root = (octave + 1) * 12 + self.root_pc;
        let mut tones = Vec::with_capacity(self.intervals.len() + 1);
        if let Some(bass_pc) = self.bass_pc {
            let mut bass = (octave + 1) * 12 + bass_pc;
            while bass >= root {
                bass -= 12;
            }
            tones.push(bass);
        }
        tones.extend(self.intervals.iter().map(|i| root + i));
        tones
    }
}

// Triad qualities, longest prefix first.
const QUALITIES: &[(&str, &[i32])] = &[
    ("m7b5", &[0, 3, 6, 10]),
    ("dim7", &[0, 3, 6, 9]),
    ("dim", &[0, 3, 6]),
    ("aug", &[0, 4, 8]),
    ("min", &[0, 3, 7]),
    ("+", &[0, 4, 8]),
    ("5", &[0, 7]),
];

/// Parses a chord symbol such as `"Cmaj7"`, `"F#m7b5"`, `"Bb9"`, `"G/B"`.
pub fn parse_chord_symbol(symbol: &str) -> Result<ChordSymbol, TheoryError> {
    let trimmed = symbol.trim();
    let invalid = || TheoryError::InvalidChordSymbol {
        input: trimmed.to_string(),
    };

    let (main, bass) = match trimmed.split_once('/') {
        Some((main, bass)) => (main, Some(parse_pitch_class(bass).map_err(|_| invalid())?)),
        None => (trimmed, None),
    };

    let (root_offset, mut rest) = split_pitch(main).ok_or_else(invalid)?;
    if !main.starts_with(|c: char| c.is_ascii_uppercase()) {
        return Err(invalid());
    }

    let mut intervals: Vec<i32> = vec![0, 4, 7];
    if let Some((prefix, quality)) = QUALITIES.iter().find(|(p, _)| rest.starts_with(p)) {
        intervals = quality.to_vec();
        rest = &rest[prefix.len()..];
    } else if rest.starts_with('m') && !rest.starts_with("maj") {
        intervals = vec![0, 3, 7];
        rest = &rest[1..];
    }

    let ensure = |intervals: &mut Vec<i32>, tone: i32| {
        if !intervals.contains(&tone) {
            intervals.push(tone);
        }
    };
    let replace = |intervals: &mut Vec<i32>, range: std::ops::RangeInclusive<i32>, tone: i32| {
        intervals.retain(|v| !range.contains(v));
        intervals.push(tone);
    };

    while !rest.is_empty() {
        let matched = [
            "add13", "add11", "add9", "maj13", "maj11", "maj9", "maj7", "maj", "sus2", "sus4",
            "sus", "no3", "no5", "#11", "b13", "b9", "#9", "b5", "#5", "13", "11", "9", "7", "6",
        ]
        .into_iter()
        .find(|t| rest.starts_with(t))
        .ok_or_else(invalid)?;

        match matched {
            "add13" => ensure(&mut intervals, 21),
            "add11" => ensure(&mut intervals, 17),
            "add9" => ensure(&mut intervals, 14),
            "maj13" => {
                for tone in [11, 14, 21] {
                    ensure(&mut intervals, tone);
                }
            }
            "maj11" => {
                for tone in [11, 14, 17] {
                    ensure(&mut intervals, tone);
                }
            }
            "maj9" => {
                for tone in [11, 14] {
                    ensure(&mut intervals, tone);
                }
            }
            "maj7" => ensure(&mut intervals, 11),
            "maj" => {}
            "sus2" => replace(&mut intervals, 2..=4, 2),
            "sus4" | "sus" => replace(&mut intervals, 2..=5, 5),
            "no3" => intervals.retain(|v| !(3..=4).contains(v)),
            "no5" => intervals.retain(|v| !(6..=8).contains(v)),
            "#11" => replace(&mut intervals, 17..=18, 18),
            "b13" => replace(&mut intervals, 20..=21, 20),
            "b9" => replace(&mut intervals, 13..=15, 13),
            "#9" => replace(&mut intervals, 13..=15, 15),
            "b5" => replace(&mut intervals, 6..=8, 6),
            "#5" => replace(&mut intervals, 6..=8, 8),
            "13" => {
                for tone in [10, 14, 21] {
                    ensure(&mut intervals, tone);
                }
            }
            "11" => {
                for tone in [10, 14, 17] {
                    ensure(&mut intervals, tone);
                }
            }
            "9" => {
                for tone in [10, 14] {
                    ensure(&mut intervals, tone);
                }
            }
            "7" => {
                if !intervals.iter().any(|v| (9..=11).contains(v)) {
                    intervals.push(10);
                }
            }
            "6" => ensure(&mut intervals, 9),
            _ => return Err(invalid()),
        }
        rest = &rest[matched.len()..];
    }

    intervals.sort_unstable();
    intervals.dedup();
    if intervals.first() != Some(&0) {
        intervals.insert(0, 0);
    }

    Ok(ChordSymbol {
        root_pc: root_offset.rem_euclid(12),
        intervals,
        bass_pc: bass,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intervals(symbol: &str) -> Vec<i32> {
        parse_chord_symbol(symbol).unwrap().intervals
    }

    #[test]
    fn test_triads() {
        assert_eq!(intervals("C"), vec![0, 4, 7]);
        assert_eq!(intervals("Am"), vec![0, 3, 7]);
        assert_eq!(intervals("Bdim"), vec![0, 3, 6]);
        assert_eq!(intervals("Caug"), vec![0, 4, 8]);
        assert_eq!(intervals("Dsus2"), vec![0, 2, 7]);
        assert_eq!(intervals("Dsus4"), vec![0, 5, 7]);
        assert_eq!(intervals("E5"), vec![0, 7]);
    }

    #[test]
    fn test_sevenths_and_extensions() {
        assert_eq!(intervals("Cmaj7"), vec![0, 4, 7, 11]);
        assert_eq!(intervals("Am7"), vec![0, 3, 7, 10]);
        assert_eq!(intervals("G7"), vec![0, 4, 7, 10]);
        assert_eq!(intervals("Bm7b5"), vec![0, 3, 6, 10]);
        assert_eq!(intervals("Bdim7"), vec![0, 3, 6, 9]);
        assert_eq!(intervals("C6"), vec![0, 4, 7, 9]);
        assert_eq!(intervals("D9"), vec![0, 4, 7, 10, 14]);
        assert_eq!(intervals("Cadd9"), vec![0, 4, 7, 14]);
        assert_eq!(intervals("G13"), vec![0, 4, 7, 10, 14, 21]);
        assert_eq!(intervals("G7b5"), vec![0, 4, 6, 10]);
        assert_eq!(intervals("G7#5"), vec![0, 4, 8, 10]);
        assert_eq!(intervals("G7sus4"), vec![0, 5, 7, 10]);
        assert_eq!(intervals("Cmmaj7"), vec![0, 3, 7, 11]);
    }

    #[test]
    fn test_root_and_slash() {
        let chord = parse_chord_symbol("F#m7").unwrap();
        assert_eq!(chord.root_pc, 6);
        let slash = parse_chord_symbol("C/G").unwrap();
        assert_eq!(slash.bass_pc, Some(7));
        assert_eq!(slash.tones(4), vec![55, 60, 64, 67]);
    }

    #[test]
    fn test_voicing_from_octave() {
        let chord = parse_chord_symbol("Cmaj7").unwrap();
        assert_eq!(chord.tones(4), vec![60, 64, 67, 71]);
        assert_eq!(chord.tones(3), vec![48, 52, 55, 59]);
    }

    #[test]
    fn test_invalid_symbols() {
        for bad in ["", "H7", "Cxyz", "C/Q", "cmaj7"] {
            assert!(parse_chord_symbol(bad).is_err(), "{bad} should fail");
        }
    }
}
