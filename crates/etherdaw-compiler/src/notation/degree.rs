//! Scale-degree strings: `[#|b]*<N>[+|-]*[:<dur>[.][artic]...]`.
//!
//! `"b3"` is a flattened third, `"5+"` a fifth one octave up, `"1--:h"` the
//! tonic two octaves down held for a half note. `"r"` or `"r:q"` is a rest.

use super::token::{is_rest_str, parse_suffix, Articulation, Expression};
use crate::error::NotationError;

/// A parsed scale degree.
#[derive(Debug, Clone, PartialEq)]
pub struct DegreeToken {
    /// 1-based degree; values past the scale length wrap upward.
    pub degree: i32,
    /// Semitone adjustment from `#`/`b` prefixes.
    pub accidental: i32,
    /// Octave adjustment from `+`/`-` suffixes.
    pub octave_shift: i32,
    /// Inline duration, if written.
    pub beats: Option<f64>,
    pub articulation: Articulation,
    pub expression: Expression,
}

/// A degree or a rest, with an optional inline duration.
#[derive(Debug, Clone, PartialEq)]
pub enum DegreeItem {
    Degree(DegreeToken),
    Rest(Option<f64>),
}

/// Parses a scale-degree string.
pub fn parse_degree(s: &str) -> Result<DegreeItem, NotationError> {
    let input = s.trim();
    let invalid = || NotationError::InvalidDegree {
        input: input.to_string(),
    };
    let malformed = |_: &str| NotationError::InvalidDegree {
        input: input.to_string(),
    };

    let (head, tail) = match input.split_once(':') {
        Some((head, tail)) => (head, Some(tail)),
        None => (input, None),
    };

    if is_rest_str(input) {
        let beats = match tail {
            Some(tail) => Some(parse_suffix(tail, input, malformed)?.beats),
            None => None,
        };
        return Ok(DegreeItem::Rest(beats));
    }

    let mut rest = head;
    let mut accidental = 0;
    loop {
        if let Some(stripped) = rest.strip_prefix('#') {
            accidental += 1;
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('b') {
            accidental -= 1;
            rest = stripped;
        } else {
            break;
        }
    }

    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let (digits, shifts) = rest.split_at(digits_end);
    let degree: i32 = digits.parse().map_err(|_| invalid())?;
    if degree < 1 {
        return Err(invalid());
    }

    let mut octave_shift = 0;
    for c in shifts.chars() {
        match c {
            '+' => octave_shift += 1,
            '-' => octave_shift -= 1,
            _ => return Err(invalid()),
        }
    }

    let mut token = DegreeToken {
        degree,
        accidental,
        octave_shift,
        beats: None,
        articulation: Articulation::None,
        expression: Expression::default(),
    };
    if let Some(tail) = tail {
        let suffix = parse_suffix(tail, input, malformed)?;
        token.beats = Some(suffix.beats);
        token.articulation = suffix.articulation;
        token.expression = suffix.expression;
    }
    Ok(DegreeItem::Degree(token))
}
