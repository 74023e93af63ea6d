//! Sections and per-track pattern assignments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::curve::CurveSpec;

/// A span of bars with track-to-pattern assignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub bars: u32,
    /// Track (instrument) name to assignment.
    #[serde(default)]
    pub tracks: BTreeMap<String, TrackAssignment>,
    /// Tempo override in BPM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo: Option<f64>,
    /// Key override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Time signature override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_signature: Option<String>,
    /// Automation path (e.g. `"lead.volume"`, `"tempo"`) to curve.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub automation: BTreeMap<String, CurveSpec>,
    /// Note density over the section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<CurveSpec>,
}

impl Section {
    /// A section with no tracks.
    pub fn new(bars: u32) -> Self {
        Self {
            bars,
            tracks: BTreeMap::new(),
            tempo: None,
            key: None,
            time_signature: None,
            automation: BTreeMap::new(),
            density: None,
        }
    }

    /// Builder-style track insertion.
    pub fn with_track(mut self, name: impl Into<String>, track: TrackAssignment) -> Self {
        self.tracks.insert(name.into(), track);
        self
    }
}

/// Assignment of one or more patterns to a track, with modifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackAssignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Patterns concatenated end-to-end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<String>>,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    /// Base velocity; falls back to the global setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
    #[serde(default)]
    pub octave: i32,
    #[serde(default)]
    pub transpose: i32,
    /// Humanize amount; falls back to the global setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humanize: Option<f64>,
    /// Swing amount; falls back to the global setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swing: Option<f64>,
    #[serde(default)]
    pub mute: bool,
}

impl TrackAssignment {
    /// Assignment of a single pattern with default modifiers.
    pub fn pattern(name: impl Into<String>) -> Self {
        Self {
            pattern: Some(name.into()),
            patterns: None,
            repeat: 1,
            velocity: None,
            octave: 0,
            transpose: 0,
            humanize: None,
            swing: None,
            mute: false,
        }
    }

    /// Builder-style repeat count.
    pub fn repeat(mut self, times: u32) -> Self {
        self.repeat = times;
        self
    }

    /// All assigned pattern names in playback order.
    pub fn pattern_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.pattern.iter().map(String::as_str).collect();
        if let Some(ref list) = self.patterns {
            names.extend(list.iter().map(String::as_str));
        }
        names
    }
}

pub(crate) fn default_repeat() -> u32 {
    1
}
