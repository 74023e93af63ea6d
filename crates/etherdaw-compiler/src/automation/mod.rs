//! Automation paths, tempo integration, and note density.

mod curve;

pub use curve::{Curve, CurveShape, LOG_FLOOR};

use serde::Serialize;

use etherdaw_spec::CurveSpec;

/// Lowest tempo an automation curve may reach, in BPM.
pub const MIN_AUTOMATED_TEMPO: f64 = 1.0;

/// What an automation path addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AutomationTarget {
    /// `tempo`
    Tempo,
    /// `<inst>.volume` or `<inst>.pan`
    Channel { instrument: String, param: String },
    /// `<inst>.fx.<effect>.<param>`
    Effect {
        instrument: String,
        effect: String,
        param: String,
    },
    /// `<inst>.<param>`
    Semantic { instrument: String, param: String },
}

impl AutomationTarget {
    /// Parses an automation path. Returns `None` for malformed paths.
    pub fn parse(path: &str) -> Option<AutomationTarget> {
        let path = path.trim();
        if path == "tempo" {
            return Some(AutomationTarget::Tempo);
        }
        let parts: Vec<&str> = path.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        match parts.as_slice() {
            [instrument, param] if *param == "volume" || *param == "pan" => {
                Some(AutomationTarget::Channel {
                    instrument: instrument.to_string(),
                    param: param.to_string(),
                })
            }
            [instrument, "fx", effect, param] => Some(AutomationTarget::Effect {
                instrument: instrument.to_string(),
                effect: effect.to_string(),
                param: param.to_string(),
            }),
            [_, "fx", ..] => None,
            [instrument, param] => Some(AutomationTarget::Semantic {
                instrument: instrument.to_string(),
                param: param.to_string(),
            }),
            _ => None,
        }
    }

    /// Instrument the target belongs to; `None` for tempo.
    pub fn instrument(&self) -> Option<&str> {
        match self {
            AutomationTarget::Tempo => None,
            AutomationTarget::Channel { instrument, .. }
            | AutomationTarget::Effect { instrument, .. }
            | AutomationTarget::Semantic { instrument, .. } => Some(instrument),
        }
    }

    /// Key under which sampled values are attached to notes, e.g. `volume`
    /// or `fx.reverb.mix`.
    pub fn param_key(&self) -> String {
        match self {
            AutomationTarget::Tempo => "tempo".to_string(),
            AutomationTarget::Channel { param, .. } | AutomationTarget::Semantic { param, .. } => {
                param.clone()
            }
            AutomationTarget::Effect { effect, param, .. } => format!("fx.{}.{}", effect, param),
        }
    }
}

/// An automation curve placed on the absolute timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutomationLane {
    pub path: String,
    pub target: AutomationTarget,
    pub section: String,
    pub start_beat: f64,
    pub end_beat: f64,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub curve: CurveSpec,
}

/// Beat-to-seconds mapping for one section.
///
/// Automated tempo is integrated once into a table of elapsed seconds at
/// fixed beat cells, so each lookup integrates at most one partial cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    tempo: f64,
    curve: Option<Curve>,
    total_beats: f64,
    cell: f64,
    elapsed: Vec<f64>,
}

// Finest table resolution, in beats.
const MIN_CELL_BEATS: f64 = 1.0 / 32.0;
// Upper bound on table cells for very long sections.
const MAX_CELLS: f64 = 65_536.0;

impl TempoMap {
    /// Fixed tempo.
    pub fn constant(tempo: f64) -> TempoMap {
        TempoMap {
            tempo,
            curve: None,
            total_beats: 0.0,
            cell: 0.0,
            elapsed: Vec::new(),
        }
    }

    /// Tempo driven by a curve over a section of `total_beats`.
    pub fn automated(curve: Curve, total_beats: f64) -> TempoMap {
        let tempo = curve.value_at(0.0).max(MIN_AUTOMATED_TEMPO);
        let mut map = TempoMap {
            tempo,
            curve: Some(curve),
            total_beats,
            cell: 0.0,
            elapsed: Vec::new(),
        };
        if total_beats > 0.0 {
            map.cell = (total_beats / MAX_CELLS).max(MIN_CELL_BEATS);
            let cells = (total_beats / map.cell).ceil().max(1.0) as usize;
            let mut elapsed = Vec::with_capacity(cells + 1);
            elapsed.push(0.0);
            let mut seconds = 0.0;
            for i in 0..cells {
                let a = i as f64 * map.cell;
                let b = (a + map.cell).min(total_beats);
                seconds += map.simpson(a, b);
                elapsed.push(seconds);
            }
            map.elapsed = elapsed;
        }
        map
    }

    /// Tempo in BPM at a beat position.
    pub fn tempo_at(&self, beat: f64) -> f64 {
        match &self.curve {
            Some(curve) if self.total_beats > 0.0 => curve
                .value_at(beat / self.total_beats)
                .max(MIN_AUTOMATED_TEMPO),
            _ => self.tempo,
        }
    }

    /// Seconds elapsed from the section start to `beat`.
    ///
    /// Automated tempo integrates `60 / tempo`; beats outside the section
    /// continue at the tempo of the nearest edge.
    pub fn seconds_at(&self, beat: f64) -> f64 {
        if self.curve.is_none() || self.elapsed.len() < 2 {
            return beat * 60.0 / self.tempo;
        }
        if beat <= 0.0 {
            return beat * 60.0 / self.tempo_at(0.0);
        }
        let last = self.elapsed.len() - 1;
        if beat >= self.total_beats {
            return self.elapsed[last] + (beat - self.total_beats) * 60.0 / self.tempo_at(self.total_beats);
        }
        let index = ((beat / self.cell) as usize).min(last - 1);
        let from = index as f64 * self.cell;
        self.elapsed[index] + self.simpson(from, beat)
    }

    // Simpson's rule for `60 / tempo` over one cell or part of one.
    fn simpson(&self, a: f64, b: f64) -> f64 {
        let f = |beat: f64| 60.0 / self.tempo_at(beat);
        (b - a) / 6.0 * (f(a) + 4.0 * f((a + b) / 2.0) + f(b))
    }
}

/// Probability that a note with `probability` survives at `density`.
///
/// Both inputs are clamped to `[0, 1]`.
pub fn effective_probability(probability: f64, density: f64) -> f64 {
    probability.clamp(0.0, 1.0) * density.clamp(0.0, 1.0)
}

/// Survival test: a uniform draw in `[0, 1)` must fall below the effective
/// probability.
pub fn survives(draw: f64, probability: f64, density: f64) -> bool {
    draw < effective_probability(probability, density)
}
