//! Time signatures.

use serde::Serialize;

use crate::error::TheoryError;

/// A time signature such as 4/4 or 6/8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignature {
    /// Parses `"N/D"` where N ≥ 1 and D is a power of two no greater than 32.
    pub fn parse(input: &str) -> Result<TimeSignature, TheoryError> {
        let trimmed = input.trim();
        let invalid = |message: &str| TheoryError::InvalidTimeSignature {
            input: trimmed.to_string(),
            message: message.to_string(),
        };

        let (num, den) = trimmed
            .split_once('/')
            .ok_or_else(|| invalid("expected N/D"))?;
        let numerator: u32 = num
            .trim()
            .parse()
            .map_err(|_| invalid("numerator is not a number"))?;
        let denominator: u32 = den
            .trim()
            .parse()
            .map_err(|_| invalid("denominator is not a number"))?;

        if numerator == 0 {
            return Err(invalid("numerator must be at least 1"));
        }
        if !denominator.is_power_of_two() || denominator > 32 {
            return Err(invalid("denominator must be a power of two up to 32"));
        }

        Ok(TimeSignature {
            numerator,
            denominator,
        })
    }

    /// Bar length in quarter-note beats.
    pub fn beats_per_bar(&self) -> f64 {
        self.numerator as f64 * 4.0 / self.denominator as f64
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature {
            numerator: 4,
            denominator: 4,
        }
    }
}

impl std::fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Parses a time signature string.
pub fn parse_time_signature(input: &str) -> Result<TimeSignature, TheoryError> {
    TimeSignature::parse(input)
}
