//! Duration codes.
//!
//! | Code | Beats |
//! |------|-------|
//! | `w`  | 4     |
//! | `h`  | 2     |
//! | `q`  | 1     |
//! | `8`  | 0.5   |
//! | `16` | 0.25  |
//! | `32` | 0.125 |
//!
//! A trailing `.` multiplies by 1.5. Compound expressions join codes with
//! `+` (`h+8` = 2.5 beats).

use crate::error::NotationError;

/// Multiplier applied by a trailing dot.
pub const DOT_MULTIPLIER: f64 = 1.5;

/// Beat value of a bare duration code, if known.
pub fn duration_code_beats(code: &str) -> Option<f64> {
    match code {
        "w" => Some(4.0),
        "h" => Some(2.0),
        "q" => Some(1.0),
        "8" => Some(0.5),
        "16" => Some(0.25),
        "32" => Some(0.125),
        _ => None,
    }
}

/// Beat value of a duration code, dotted or not.
pub fn parse_duration(code: &str, dotted: bool) -> Result<f64, NotationError> {
    let beats = duration_code_beats(code).ok_or_else(|| NotationError::InvalidDuration {
        input: code.to_string(),
    })?;
    Ok(if dotted { beats * DOT_MULTIPLIER } else { beats })
}

/// Parses a single code with an optional trailing dot, e.g. `"q."`.
pub fn parse_duration_str(s: &str) -> Result<f64, NotationError> {
    let trimmed = s.trim();
    match trimmed.strip_suffix('.') {
        Some(code) => parse_duration(code, true),
        None => parse_duration(trimmed, false),
    }
    .map_err(|_| NotationError::InvalidDuration {
        input: trimmed.to_string(),
    })
}

/// Parses a `+`-joined compound duration, e.g. `"h+8"` or `"q.+16"`.
pub fn parse_duration_expr(expr: &str) -> Result<f64, NotationError> {
    let trimmed = expr.trim();
    let invalid = || NotationError::InvalidDuration {
        input: trimmed.to_string(),
    };
    if trimmed.is_empty() {
        return Err(invalid());
    }
    trimmed.split('+').try_fold(0.0, |total, part| {
        parse_duration_str(part)
            .map(|beats| total + beats)
            .map_err(|_| invalid())
    })
}
