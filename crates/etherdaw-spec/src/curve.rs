//! Curve specifications shared by automation, density, and velocity envelopes.

use serde::{Deserialize, Serialize};

/// A value curve over normalized position `t ∈ [0, 1]`.
///
/// Accepted JSON forms:
/// - a bare number: constant value
/// - `{ "points": [[t, v], ...] }`: piecewise-linear breakpoints
/// - `{ "start": a, "end": b, "curve": "exponential" }`: named shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CurveSpec {
    Constant(f64),
    Points {
        points: Vec<[f64; 2]>,
    },
    Shape {
        start: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        curve: Option<String>,
    },
}

impl CurveSpec {
    /// A linear ramp between two values.
    pub fn ramp(start: f64, end: f64) -> Self {
        CurveSpec::Shape {
            start,
            end: Some(end),
            curve: None,
        }
    }
}
