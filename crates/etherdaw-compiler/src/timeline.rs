//! Timeline assembly: the top-level compile entry points.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use etherdaw_spec::{Score, Settings};

use crate::automation::AutomationLane;
use crate::diagnostics::Diagnostics;
use crate::error::{CompileError, CompileWarning, WarningCode};
use crate::generators::{ExpandedPattern, GenContext};
use crate::options::CompileOptions;
use crate::resolver::{ResolveContext, Resolver};
use crate::rng::pattern_rng;
use crate::scheduler::{schedule_section, SectionOutput, SectionSettings};

/// A note on the absolute timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteEvent {
    pub time_beats: f64,
    /// Start in seconds, including any per-note timing offset.
    ///
    /// An early offset never moves a note before the timeline start; such a
    /// note starts at 0 while `time_beats` stays on the grid.
    pub time_seconds: f64,
    pub duration_beats: f64,
    pub duration_seconds: f64,
    pub velocity: f64,
    /// Note name (`"C#4"`) or drum token (`"drum:kick@808"`).
    pub pitch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub midi: Option<u8>,
    pub instrument: String,
    pub section: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub portamento: bool,
    /// Automation values sampled at the note onset.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, f64>,
}

/// Where one section occurrence sits on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionSpan {
    pub name: String,
    pub arrangement_index: usize,
    pub bars: u32,
    pub start_beat: f64,
    pub end_beat: f64,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub tempo: f64,
    pub key: String,
    pub time_signature: String,
}

/// The compiled piece.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub events: Vec<NoteEvent>,
    pub total_beats: f64,
    pub total_seconds: f64,
    /// Instrument definitions, passed through for renderers.
    pub instruments: BTreeMap<String, serde_json::Value>,
    pub settings: Settings,
    pub sections: Vec<SectionSpan>,
    pub automation: Vec<AutomationLane>,
}

/// Aggregate numbers for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileStats {
    pub section_count: usize,
    /// Compiled section occurrences in order.
    pub sections: Vec<String>,
    pub bars: u32,
    pub notes: usize,
    pub duration_beats: f64,
    pub duration_seconds: f64,
    /// Distinct instruments that produced notes, sorted.
    pub instruments: Vec<String>,
}

impl CompileStats {
    fn from_timeline(timeline: &Timeline) -> CompileStats {
        let instruments: BTreeSet<&str> = timeline.events.iter().map(|e| e.instrument.as_str()).collect();
        CompileStats {
            section_count: timeline.sections.len(),
            sections: timeline.sections.iter().map(|s| s.name.clone()).collect(),
            bars: timeline.sections.iter().map(|s| s.bars).sum(),
            notes: timeline.events.len(),
            duration_beats: timeline.total_beats,
            duration_seconds: timeline.total_seconds,
            instruments: instruments.into_iter().map(str::to_string).collect(),
        }
    }
}

/// Result of a successful compile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileOutput {
    pub timeline: Timeline,
    pub warnings: Vec<CompileWarning>,
    pub stats: CompileStats,
}

enum Occurrence {
    Expanded(SectionOutput),
    Missing { index: usize, name: String },
}

/// Compiles a score into a timeline.
///
/// Fatal problems abort with the first error in arrangement order; everything
/// else is reported in `warnings` and the affected track or section is
/// skipped.
pub fn compile(score: &Score, options: &CompileOptions) -> Result<CompileOutput, CompileError> {
    let global = SectionSettings::global(score)?;
    let mut diagnostics = Diagnostics::new();
    let (start, end) = arrangement_bounds(score, options, &mut diagnostics);
    info!(seed = options.seed, start, end, parallel = options.parallel, "compiling");

    let slice: Vec<(usize, &str)> = score.arrangement[start..end]
        .iter()
        .enumerate()
        .map(|(i, name)| (start + i, name.as_str()))
        .collect();

    let expand = |&(index, name): &(usize, &str)| -> Result<Occurrence, CompileError> {
        match score.sections.get(name) {
            Some(section) => {
                debug!(index, section = name, "expanding section");
                schedule_section(score, options, &global, index, name, section).map(Occurrence::Expanded)
            }
            None => Ok(Occurrence::Missing {
                index,
                name: name.to_string(),
            }),
        }
    };
    let results: Vec<Result<Occurrence, CompileError>> = if options.parallel {
        slice.par_iter().map(expand).collect()
    } else {
        slice.iter().map(expand).collect()
    };

    let mut events = Vec::new();
    let mut sections = Vec::new();
    let mut automation = Vec::new();
    let mut beat_offset = 0.0;
    let mut second_offset = 0.0;
    for result in results {
        let output = match result? {
            Occurrence::Expanded(output) => output,
            Occurrence::Missing { index, name } => {
                diagnostics.warn(
                    WarningCode::UnknownSection,
                    format!("unknown section '{}'", name),
                    format!("arrangement[{}]", index),
                );
                continue;
            }
        };
        diagnostics.extend(output.diagnostics);

        // Timing offsets may reach into the previous section but not before 0.
        events.extend(output.events.into_iter().map(|mut e| {
            e.time_beats += beat_offset;
            e.time_seconds = (e.time_seconds + second_offset).max(0.0);
            e
        }));
        automation.extend(output.lanes.into_iter().map(|mut lane| {
            lane.start_beat += beat_offset;
            lane.end_beat += beat_offset;
            lane.start_seconds += second_offset;
            lane.end_seconds += second_offset;
            lane
        }));
        sections.push(SectionSpan {
            name: output.name,
            arrangement_index: output.arrangement_index,
            bars: output.bars,
            start_beat: beat_offset,
            end_beat: beat_offset + output.beats,
            start_seconds: second_offset,
            end_seconds: second_offset + output.seconds,
            tempo: output.settings.tempo,
            key: output.settings.key.to_string(),
            time_signature: output.settings.time_signature.to_string(),
        });
        beat_offset += output.beats;
        second_offset += output.seconds;
    }

    // Stable: equal beats keep arrangement then track order.
    events.sort_by(|a, b| a.time_beats.total_cmp(&b.time_beats));

    let timeline = Timeline {
        events,
        total_beats: beat_offset,
        total_seconds: second_offset,
        instruments: score.instruments.clone(),
        settings: score.settings.clone(),
        sections,
        automation,
    };
    let stats = CompileStats::from_timeline(&timeline);
    info!(
        sections = stats.section_count,
        notes = stats.notes,
        seconds = stats.duration_seconds,
        warnings = diagnostics.warnings().len(),
        "compiled"
    );

    Ok(CompileOutput {
        timeline,
        warnings: diagnostics.into_warnings(),
        stats,
    })
}

// Half-open range of arrangement indices to compile.
fn arrangement_bounds(score: &Score, options: &CompileOptions, diagnostics: &mut Diagnostics) -> (usize, usize) {
    let arrangement = &score.arrangement;
    let mut start = 0;
    if let Some(name) = &options.start_section {
        match arrangement.iter().position(|s| s == name) {
            Some(pos) => start = pos,
            None => diagnostics.warn(
                WarningCode::UnknownBoundary,
                format!("start section '{}' is not in the arrangement", name),
                "options.start_section",
            ),
        }
    }
    let mut end = arrangement.len();
    if let Some(name) = &options.end_section {
        match arrangement[start..].iter().position(|s| s == name) {
            Some(pos) => end = start + pos + 1,
            None => diagnostics.warn(
                WarningCode::UnknownBoundary,
                format!("end section '{}' is not in the arrangement after the start", name),
                "options.end_section",
            ),
        }
    }
    (start, end)
}

/// A single pattern expanded in isolation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternExpansion {
    pub pattern: ExpandedPattern,
    pub warnings: Vec<CompileWarning>,
}

/// Expands one named pattern under the global settings, as if it were the
/// first section of the arrangement at full density.
pub fn expand_pattern(score: &Score, name: &str, options: &CompileOptions) -> Result<PatternExpansion, CompileError> {
    let global = SectionSettings::global(score)?;
    let mut diagnostics = Diagnostics::new();
    let mut rng = pattern_rng(options.seed, name);
    let mut resolver = Resolver::new(&score.patterns, options.max_resolution_depth);

    let mut resolve_ctx = ResolveContext {
        section_index: 0,
        density: 1.0,
        rng: &mut rng,
        diagnostics: &mut diagnostics,
    };
    let resolved = resolver.resolve(name, "expand", &mut resolve_ctx)?;
    let pattern = match resolved {
        Some(resolved) => {
            let mut ctx = GenContext {
                pattern: &resolved.name,
                key: global.key,
                time_signature: global.time_signature,
                tempo: global.tempo,
                velocity: score.settings.velocity.clamp(0.0, 1.0),
                horizon: f64::INFINITY,
                rng: &mut rng,
                diagnostics: &mut diagnostics,
            };
            resolved.expand(&mut ctx)?
        }
        None => ExpandedPattern::default(),
    };

    Ok(PatternExpansion {
        pattern,
        warnings: diagnostics.into_warnings(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use etherdaw_spec::{NotesPattern, Pattern, PatternKind, Section, TrackAssignment};

    fn score(arrangement: &[&str]) -> Score {
        let mut score = Score::default();
        score.patterns.insert(
            "p".to_string(),
            Pattern::new(PatternKind::Notes(NotesPattern {
                notes: vec!["C4:h".to_string(), "E4:h".to_string()],
            })),
        );
        for name in ["a", "b", "c"] {
            score.sections.insert(
                name.to_string(),
                Section::new(1).with_track(name, TrackAssignment::pattern("p")),
            );
        }
        score.arrangement = arrangement.iter().map(|s| s.to_string()).collect();
        score
    }

    #[test]
    fn test_sections_are_offset() {
        let out = compile(&score(&["a", "b"]), &CompileOptions::default()).unwrap();
        let t = &out.timeline;
        assert_eq!(t.total_beats, 8.0);
        assert_eq!(t.total_seconds, 4.0);
        let starts: Vec<f64> = t.events.iter().map(|e| e.time_beats).collect();
        assert_eq!(starts, vec![0.0, 2.0, 4.0, 6.0]);
        assert_eq!(t.events[2].section, "b");
        assert_eq!(t.sections[1].start_seconds, 2.0);
    }

    #[test]
    fn test_bounds() {
        let s = score(&["a", "b", "c", "a"]);
        let out = compile(&s, &CompileOptions::new().with_start_section("b").with_end_section("c")).unwrap();
        assert_eq!(out.stats.sections, vec!["b", "c"]);
        assert!(out.warnings.is_empty());

        let out = compile(&s, &CompileOptions::new().with_end_section("zzz")).unwrap();
        assert_eq!(out.stats.section_count, 4);
        assert_eq!(out.warnings[0].code, WarningCode::UnknownBoundary);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let s = score(&["a", "b", "c", "b", "a"]);
        let par = compile(&s, &CompileOptions::new().with_seed(9)).unwrap();
        let seq = compile(&s, &CompileOptions::new().with_seed(9).with_parallel(false)).unwrap();
        assert_eq!(par, seq);
    }

    #[test]
    fn test_expand_pattern() {
        let s = score(&["a"]);
        let out = expand_pattern(&s, "p", &CompileOptions::default()).unwrap();
        assert_eq!(out.pattern.total_beats, 4.0);
        assert_eq!(out.pattern.notes.len(), 2);

        let missing = expand_pattern(&s, "nope", &CompileOptions::default()).unwrap();
        assert!(missing.pattern.notes.is_empty());
        assert_eq!(missing.warnings[0].code, WarningCode::UnknownPattern);
    }
}
