//! Curve evaluation over normalized position `t ∈ [0, 1]`.

use etherdaw_spec::CurveSpec;

use crate::diagnostics::Diagnostics;
use crate::error::WarningCode;

/// Floor applied to endpoints of log-space shapes.
pub const LOG_FLOOR: f64 = 1e-4;

/// Named interpolation shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveShape {
    Linear,
    Exponential,
    EaseIn,
    EaseOut,
    Sine,
    Step,
}

impl CurveShape {
    pub fn from_name(name: &str) -> Option<CurveShape> {
        let shape = match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "linear" => CurveShape::Linear,
            "exponential" | "exp" => CurveShape::Exponential,
            "ease_in" | "easein" => CurveShape::EaseIn,
            "ease_out" | "easeout" => CurveShape::EaseOut,
            "sine" | "sin" | "s_curve" => CurveShape::Sine,
            "step" => CurveShape::Step,
            _ => return None,
        };
        Some(shape)
    }
}

/// An evaluable curve.
#[derive(Debug, Clone, PartialEq)]
pub enum Curve {
    Constant(f64),
    /// Breakpoints sorted by position.
    Points(Vec<(f64, f64)>),
    Shape {
        start: f64,
        end: f64,
        shape: CurveShape,
    },
}

impl Curve {
    /// Builds a curve from its document form. Unknown shape names fall back
    /// to linear with a warning recorded at `path`.
    pub fn from_spec(spec: &CurveSpec, path: &str, diagnostics: &mut Diagnostics) -> Curve {
        match spec {
            CurveSpec::Constant(v) => Curve::Constant(*v),
            CurveSpec::Points { points } => {
                let mut sorted: Vec<(f64, f64)> = points.iter().map(|p| (p[0], p[1])).collect();
                sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
                Curve::Points(sorted)
            }
            CurveSpec::Shape { start, end, curve } => {
                let shape = match curve.as_deref() {
                    None => CurveShape::Linear,
                    Some(name) => CurveShape::from_name(name).unwrap_or_else(|| {
                        diagnostics.warn(
                            WarningCode::UnknownCurve,
                            format!("unknown curve '{}', using linear", name),
                            path,
                        );
                        CurveShape::Linear
                    }),
                };
                Curve::Shape {
                    start: *start,
                    end: end.unwrap_or(*start),
                    shape,
                }
            }
        }
    }

    /// Value at position `t`, clamped to `[0, 1]`.
    pub fn value_at(&self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Curve::Constant(v) => *v,
            Curve::Points(points) => interpolate_points(points, t),
            Curve::Shape { start, end, shape } => shape_value(*start, *end, *shape, t),
        }
    }
}

fn interpolate_points(points: &[(f64, f64)], t: f64) -> f64 {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return 0.0;
    };
    if t <= first.0 {
        return first.1;
    }
    if t >= last.0 {
        return last.1;
    }
    for pair in points.windows(2) {
        let (t0, v0) = pair[0];
        let (t1, v1) = pair[1];
        if t >= t0 && t <= t1 {
            if t1 - t0 <= f64::EPSILON {
                return v1;
            }
            return v0 + (v1 - v0) * (t - t0) / (t1 - t0);
        }
    }
    last.1
}

fn log_lerp(a: f64, b: f64, t: f64) -> f64 {
    let la = a.max(LOG_FLOOR).ln();
    let lb = b.max(LOG_FLOOR).ln();
    (la + (lb - la) * t).exp()
}

fn shape_value(a: f64, b: f64, shape: CurveShape, t: f64) -> f64 {
    match shape {
        CurveShape::Linear => a + (b - a) * t,
        CurveShape::Exponential => log_lerp(a, b, t),
        CurveShape::EaseIn => a + (b - a) * t * t,
        CurveShape::EaseOut => log_lerp(a, b, 1.0 - (1.0 - t) * (1.0 - t)),
        CurveShape::Sine => a + (b - a) * (1.0 - (std::f64::consts::PI * t).cos()) / 2.0,
        CurveShape::Step => {
            if t < 0.5 {
                a
            } else {
                b
            }
        }
    }
}
