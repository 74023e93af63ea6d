//! Root score document and global settings.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SpecError;
use crate::hash::canonical_value_hash;
use crate::pattern::Pattern;
use crate::section::Section;

/// Global settings applied to every section unless overridden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Tempo in beats per minute.
    #[serde(default = "default_tempo")]
    pub tempo: f64,
    /// Key string, e.g. "C major", "F# dorian", "Am".
    #[serde(default = "default_key")]
    pub key: String,
    /// Time signature string, e.g. "4/4", "6/8".
    #[serde(default = "default_time_signature")]
    pub time_signature: String,
    /// Swing amount in `[0, 1]` applied to off-beat eighths.
    #[serde(default)]
    pub swing: f64,
    /// Default track velocity in `[0, 1]`.
    #[serde(default = "default_velocity")]
    pub velocity: f64,
    /// Default humanize amount in `[0, 1]`.
    #[serde(default)]
    pub humanize: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tempo: default_tempo(),
            key: default_key(),
            time_signature: default_time_signature(),
            swing: 0.0,
            velocity: default_velocity(),
            humanize: 0.0,
        }
    }
}

fn default_tempo() -> f64 {
    120.0
}

fn default_key() -> String {
    "C major".to_string()
}

fn default_time_signature() -> String {
    "4/4".to_string()
}

fn default_velocity() -> f64 {
    0.8
}

/// The root composition document.
///
/// A score is immutable once compilation starts; the compiler only ever
/// borrows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Score {
    /// Optional title for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Global settings.
    #[serde(default)]
    pub settings: Settings,
    /// Instrument table. Instrument bodies are opaque to the compiler.
    #[serde(default)]
    pub instruments: BTreeMap<String, serde_json::Value>,
    /// Named, reusable pattern definitions.
    #[serde(default)]
    pub patterns: BTreeMap<String, Pattern>,
    /// Named sections.
    #[serde(default)]
    pub sections: BTreeMap<String, Section>,
    /// Ordered list of section names forming the piece.
    #[serde(default)]
    pub arrangement: Vec<String>,
}

impl Score {
    /// Parses a score from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a score from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SpecError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Serializes the score to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, SpecError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Converts the score to a JSON value.
    pub fn to_value(&self) -> Result<serde_json::Value, SpecError> {
        Ok(serde_json::to_value(self)?)
    }

    /// BLAKE3 hash of the canonical (JCS) JSON form of this score.
    pub fn canonical_hash(&self) -> Result<String, SpecError> {
        let value = self.to_value()?;
        Ok(canonical_value_hash(&value))
    }
}
