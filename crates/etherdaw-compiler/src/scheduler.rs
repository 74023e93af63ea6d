//! Track and section scheduling.
//!
//! [`schedule_section`] expands one arrangement occurrence of a section into
//! note events positioned relative to the section start. Every occurrence
//! draws from its own random streams, so repeats of a section produce fresh
//! material while the whole compile stays reproducible.

use std::collections::BTreeMap;

use tracing::debug;

use etherdaw_spec::{CurveSpec, Score, Section, TrackAssignment};

use crate::automation::{survives, AutomationLane, AutomationTarget, Curve, TempoMap};
use crate::diagnostics::Diagnostics;
use crate::error::{CompileError, WarningCode};
use crate::generators::{ExpandedPattern, GenContext, NotePitch};
use crate::options::CompileOptions;
use crate::resolver::{ResolveContext, Resolver};
use crate::rng::{jitter, track_rng, unit};
use crate::theory::{Key, TimeSignature, MIDI_MAX};
use crate::timeline::NoteEvent;

/// Swing delay of an off-beat eighth at full swing, in beats.
pub const SWING_DELAY: f64 = 1.0 / 6.0;
/// Timing jitter per unit of humanize, in beats.
pub const HUMANIZE_TIMING: f64 = 0.05;
/// Velocity jitter per unit of humanize.
pub const HUMANIZE_VELOCITY: f64 = 0.1;

const OFFBEAT_EPSILON: f64 = 1e-6;

/// Settings in effect for one section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionSettings {
    pub key: Key,
    pub time_signature: TimeSignature,
    pub tempo: f64,
}

impl SectionSettings {
    /// Validates the score's global settings.
    pub fn global(score: &Score) -> Result<SectionSettings, CompileError> {
        let settings = &score.settings;
        Ok(SectionSettings {
            key: Key::parse(&settings.key).map_err(|e| e.at("settings.key"))?,
            time_signature: TimeSignature::parse(&settings.time_signature)
                .map_err(|e| e.at("settings.time_signature"))?,
            tempo: validate_tempo(settings.tempo, "settings.tempo")?,
        })
    }

    /// Applies a section's overrides on top of `self`.
    pub fn with_overrides(&self, name: &str, section: &Section) -> Result<SectionSettings, CompileError> {
        let mut out = *self;
        if let Some(key) = &section.key {
            out.key = Key::parse(key).map_err(|e| e.at(format!("sections.{}.key", name)))?;
        }
        if let Some(ts) = &section.time_signature {
            out.time_signature = TimeSignature::parse(ts)
                .map_err(|e| e.at(format!("sections.{}.time_signature", name)))?;
        }
        if let Some(tempo) = section.tempo {
            out.tempo = validate_tempo(tempo, &format!("sections.{}.tempo", name))?;
        }
        Ok(out)
    }
}

fn validate_tempo(tempo: f64, location: &str) -> Result<f64, CompileError> {
    if tempo.is_finite() && tempo > 0.0 {
        Ok(tempo)
    } else {
        Err(CompileError::InvalidTempo {
            location: location.to_string(),
            tempo,
        })
    }
}

/// One expanded section occurrence, relative to its own start.
#[derive(Debug, Clone)]
pub struct SectionOutput {
    pub name: String,
    pub arrangement_index: usize,
    pub bars: u32,
    pub settings: SectionSettings,
    pub beats: f64,
    pub seconds: f64,
    pub events: Vec<NoteEvent>,
    pub lanes: Vec<AutomationLane>,
    pub diagnostics: Diagnostics,
}

struct Lane {
    path: String,
    target: AutomationTarget,
    spec: CurveSpec,
    curve: Curve,
}

/// Expands the occurrence of `name` at `arrangement_index`.
pub fn schedule_section(
    score: &Score,
    options: &CompileOptions,
    global: &SectionSettings,
    arrangement_index: usize,
    name: &str,
    section: &Section,
) -> Result<SectionOutput, CompileError> {
    let settings = global.with_overrides(name, section)?;
    let beats = section.bars as f64 * settings.time_signature.beats_per_bar();
    let mut diagnostics = Diagnostics::new();

    let density = section
        .density
        .as_ref()
        .map(|spec| Curve::from_spec(spec, &format!("sections.{}.density", name), &mut diagnostics));

    let mut tempo_curve = None;
    let mut lanes = Vec::new();
    for (path, spec) in &section.automation {
        let lane_path = format!("sections.{}.automation.{}", name, path);
        let Some(target) = AutomationTarget::parse(path) else {
            diagnostics.warn(
                WarningCode::UnknownAutomationTarget,
                format!("malformed automation path '{}'", path),
                lane_path,
            );
            continue;
        };
        if let Some(instrument) = target.instrument() {
            if !section.tracks.contains_key(instrument) {
                diagnostics.warn(
                    WarningCode::UnknownAutomationTarget,
                    format!("automation '{}' targets '{}', which has no track here", path, instrument),
                    lane_path,
                );
                continue;
            }
        }
        let curve = Curve::from_spec(spec, &lane_path, &mut diagnostics);
        if target == AutomationTarget::Tempo {
            tempo_curve = Some(curve.clone());
        }
        lanes.push(Lane {
            path: path.clone(),
            target,
            spec: spec.clone(),
            curve,
        });
    }
    let tempo_map = match tempo_curve {
        Some(curve) => TempoMap::automated(curve, beats),
        None => TempoMap::constant(settings.tempo),
    };
    let seconds = tempo_map.seconds_at(beats);

    let mut events = Vec::new();
    for (track_name, track) in &section.tracks {
        if track.mute {
            debug!(section = name, track = %track_name, "muted");
            continue;
        }
        if !score.instruments.is_empty() && !score.instruments.contains_key(track_name) {
            diagnostics.warn(
                WarningCode::UnknownInstrument,
                format!("track '{}' has no instrument definition", track_name),
                format!("sections.{}.tracks.{}", name, track_name),
            );
        }

        let scheduled = schedule_track(
            TrackInput {
                score,
                options,
                settings: &settings,
                arrangement_index,
                section: name,
                track_name,
                track,
                beats,
                density: density.as_ref(),
                lanes: &lanes,
                tempo_map: &tempo_map,
            },
            &mut diagnostics,
        )?;
        debug!(section = name, track = %track_name, notes = scheduled.len(), "scheduled track");
        events.extend(scheduled);
    }

    let lanes = lanes
        .into_iter()
        .map(|lane| AutomationLane {
            path: lane.path,
            target: lane.target,
            section: name.to_string(),
            start_beat: 0.0,
            end_beat: beats,
            start_seconds: 0.0,
            end_seconds: seconds,
            curve: lane.spec,
        })
        .collect();

    Ok(SectionOutput {
        name: name.to_string(),
        arrangement_index,
        bars: section.bars,
        settings,
        beats,
        seconds,
        events,
        lanes,
        diagnostics,
    })
}

struct TrackInput<'a> {
    score: &'a Score,
    options: &'a CompileOptions,
    settings: &'a SectionSettings,
    arrangement_index: usize,
    section: &'a str,
    track_name: &'a str,
    track: &'a TrackAssignment,
    beats: f64,
    density: Option<&'a Curve>,
    lanes: &'a [Lane],
    tempo_map: &'a TempoMap,
}

fn schedule_track(input: TrackInput, diagnostics: &mut Diagnostics) -> Result<Vec<NoteEvent>, CompileError> {
    let TrackInput {
        score,
        options,
        settings,
        arrangement_index,
        section,
        track_name,
        track,
        beats,
        density,
        lanes,
        tempo_map,
    } = input;
    let path = format!("sections.{}.tracks.{}", section, track_name);
    let names = track.pattern_names();
    if names.is_empty() {
        diagnostics.warn(WarningCode::UnknownPattern, "track assigns no pattern", path);
        return Ok(Vec::new());
    }

    let mut rng = track_rng(options.seed, arrangement_index, section, track_name);
    let velocity = track.velocity.unwrap_or(score.settings.velocity).clamp(0.0, 1.0);
    let density_at_start = density.map_or(1.0, |c| c.value_at(0.0));
    let humanize = track.humanize.unwrap_or(score.settings.humanize).max(0.0);
    // Latest written start that humanize can still pull into the section.
    let audible_until = beats + humanize * HUMANIZE_TIMING;

    let mut resolver = Resolver::new(&score.patterns, options.max_resolution_depth);
    let mut combined = ExpandedPattern::default();
    for pattern_name in names {
        let mut resolve_ctx = ResolveContext {
            section_index: arrangement_index,
            density: density_at_start,
            rng: &mut rng,
            diagnostics: &mut *diagnostics,
        };
        let Some(resolved) = resolver.resolve(pattern_name, &path, &mut resolve_ctx)? else {
            debug!(section, track = track_name, pattern = pattern_name, "skipping track");
            return Ok(Vec::new());
        };
        let mut ctx = GenContext {
            pattern: &resolved.name,
            key: settings.key,
            time_signature: settings.time_signature,
            tempo: settings.tempo,
            velocity,
            horizon: audible_until - combined.total_beats,
            rng: &mut rng,
            diagnostics: &mut *diagnostics,
        };
        combined.append(resolved.expand(&mut ctx)?);
    }

    let shift = track
        .octave
        .checked_mul(12)
        .and_then(|octave| octave.checked_add(track.transpose))
        .ok_or_else(|| CompileError::InvalidTrack {
            location: path.clone(),
            message: format!("transpose {} with octave {} is out of range", track.transpose, track.octave),
        })?;
    let swing = track.swing.unwrap_or(score.settings.swing).clamp(0.0, 1.0);

    let repeated = combined.repeated(track.repeat, audible_until);
    let mut events = Vec::with_capacity(repeated.notes.len());
    for note in repeated.notes {
        let mut start = note.start_beat;
        if swing > 0.0 && is_offbeat_eighth(start) {
            start += swing * SWING_DELAY;
        }
        start = (start + jitter(&mut rng, humanize * HUMANIZE_TIMING)).max(0.0);
        let velocity =
            (note.velocity + jitter(&mut rng, humanize * HUMANIZE_VELOCITY)).clamp(0.0, 1.0);

        let progress = if beats > 0.0 { (start / beats).clamp(0.0, 1.0) } else { 0.0 };
        let draw = unit(&mut rng);
        let level = density.map_or(1.0, |c| c.value_at(progress));
        if !survives(draw, note.probability.unwrap_or(1.0), level) {
            continue;
        }
        if start >= beats {
            continue;
        }
        let duration = note.duration_beats.min(beats - start);

        let pitch = match note.pitch.transposed(shift) {
            NotePitch::Midi(m) => NotePitch::Midi(m.clamp(0, MIDI_MAX)),
            drum => drum,
        };
        let params: BTreeMap<String, f64> = lanes
            .iter()
            .filter(|lane| lane.target.instrument() == Some(track_name))
            .map(|lane| (lane.target.param_key(), lane.curve.value_at(progress)))
            .collect();

        let start_seconds = tempo_map.seconds_at(start);
        let offset_seconds = note.timing_offset_ms.unwrap_or(0.0) / 1000.0;
        events.push(NoteEvent {
            time_beats: start,
            time_seconds: start_seconds + offset_seconds,
            duration_beats: duration,
            duration_seconds: tempo_map.seconds_at(start + duration) - start_seconds,
            velocity,
            midi: pitch.midi().map(|m| m as u8),
            pitch: pitch.to_string(),
            instrument: track_name.to_string(),
            section: section.to_string(),
            portamento: note.portamento,
            params,
        });
    }
    Ok(events)
}

fn is_offbeat_eighth(beat: f64) -> bool {
    (beat.rem_euclid(1.0) - 0.5).abs() < OFFBEAT_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodedError;
    use etherdaw_spec::{NotesPattern, Pattern, PatternKind, Settings};
    use pretty_assertions::assert_eq;

    fn score_with(notes: &[&str], section: Section) -> Score {
        let mut score = Score::default();
        score.patterns.insert(
            "p".to_string(),
            Pattern::new(PatternKind::Notes(NotesPattern {
                notes: notes.iter().map(|s| s.to_string()).collect(),
            })),
        );
        score.sections.insert("s".to_string(), section);
        score.arrangement.push("s".to_string());
        score
    }

    fn run(score: &Score) -> SectionOutput {
        let global = SectionSettings::global(score).unwrap();
        schedule_section(score, &CompileOptions::default(), &global, 0, "s", &score.sections["s"]).unwrap()
    }

    #[test]
    fn test_repeat_and_clip() {
        let section = Section::new(1).with_track("lead", TrackAssignment::pattern("p").repeat(3));
        let score = score_with(&["C4:q", "D4:h"], section);
        let out = run(&score);
        // 3 × 3 beats, clipped to 4 beats
        let starts: Vec<f64> = out.events.iter().map(|e| e.time_beats).collect();
        assert_eq!(starts, vec![0.0, 1.0, 3.0]);
        assert_eq!(out.events[2].duration_beats, 1.0);
        assert_eq!(out.beats, 4.0);
        assert_eq!(out.seconds, 2.0);
    }

    #[test]
    fn test_octave_transpose_and_velocity() {
        let mut track = TrackAssignment::pattern("p");
        track.octave = -1;
        track.transpose = 2;
        track.velocity = Some(0.5);
        let score = score_with(&["C4:q"], Section::new(1).with_track("bass", track));
        let out = run(&score);
        assert_eq!(out.events[0].pitch, "D3");
        assert_eq!(out.events[0].midi, Some(50));
        assert_eq!(out.events[0].velocity, 0.5);
    }

    #[test]
    fn test_track_octave_overflow_is_fatal() {
        let mut track = TrackAssignment::pattern("p");
        track.octave = 300_000_000;
        let score = score_with(&["C4:q"], Section::new(1).with_track("lead", track));
        let global = SectionSettings::global(&score).unwrap();
        let err = schedule_section(&score, &CompileOptions::default(), &global, 0, "s", &score.sections["s"])
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidTrack { .. }));
        assert_eq!(err.code(), "ETHER_COMPILE_006");

        let mut track = TrackAssignment::pattern("p");
        track.transpose = i32::MAX;
        let score = score_with(&["C4:q"], Section::new(1).with_track("lead", track));
        assert_eq!(run(&score).events[0].midi, Some(127));
    }

    #[test]
    fn test_huge_repeat_stops_at_section_end() {
        let section = Section::new(1).with_track("lead", TrackAssignment::pattern("p").repeat(20_000_000));
        let score = score_with(&["C4:q"], section);
        let out = run(&score);
        let starts: Vec<f64> = out.events.iter().map(|e| e.time_beats).collect();
        assert_eq!(starts, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_swing_delays_offbeats() {
        let mut track = TrackAssignment::pattern("p");
        track.swing = Some(0.6);
        let score = score_with(&["C4:8", "D4:8", "E4:q"], Section::new(1).with_track("lead", track));
        let out = run(&score);
        assert_eq!(out.events[0].time_beats, 0.0);
        assert!((out.events[1].time_beats - 0.6).abs() < 1e-12);
        assert_eq!(out.events[2].time_beats, 1.0);
    }

    #[test]
    fn test_muted_and_unknown_pattern_tracks_skipped() {
        let mut muted = TrackAssignment::pattern("p");
        muted.mute = true;
        let section = Section::new(1)
            .with_track("a", muted)
            .with_track("b", TrackAssignment::pattern("missing"))
            .with_track("c", TrackAssignment::pattern("p"));
        let score = score_with(&["C4:q"], section);
        let out = run(&score);
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].instrument, "c");
        assert_eq!(out.diagnostics.warnings().len(), 1);
        assert!(out.diagnostics.warnings()[0].message.contains("missing"));
    }

    #[test]
    fn test_zero_density_silences() {
        let mut section = Section::new(1).with_track("lead", TrackAssignment::pattern("p"));
        section.density = Some(CurveSpec::Constant(0.0));
        let score = score_with(&["C4:q", "C4:q", "C4:q", "C4:q"], section);
        assert!(run(&score).events.is_empty());
    }

    #[test]
    fn test_automation_sampled_and_unknown_target_warns() {
        let mut section = Section::new(1).with_track("lead", TrackAssignment::pattern("p"));
        section.automation.insert("lead.volume".to_string(), CurveSpec::ramp(0.0, 1.0));
        section.automation.insert("pad.fx.reverb.mix".to_string(), CurveSpec::Constant(0.5));
        let score = score_with(&["C4:h", "C4:h"], section);
        let out = run(&score);
        assert_eq!(out.events[1].params.get("volume"), Some(&0.5));
        assert_eq!(out.lanes.len(), 1);
        assert_eq!(out.diagnostics.warnings()[0].code, WarningCode::UnknownAutomationTarget);
    }

    #[test]
    fn test_tempo_automation_changes_seconds() {
        let mut section = Section::new(1).with_track("lead", TrackAssignment::pattern("p"));
        section.automation.insert("tempo".to_string(), CurveSpec::Constant(60.0));
        let score = score_with(&["C4:q"], section);
        let out = run(&score);
        assert!((out.seconds - 4.0).abs() < 1e-9);
        assert!((out.events[0].duration_seconds - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_section_settings_are_fatal() {
        let mut section = Section::new(1);
        section.tempo = Some(0.0);
        let score = score_with(&["C4:q"], section);
        let global = SectionSettings::global(&score).unwrap();
        let err = schedule_section(&score, &CompileOptions::default(), &global, 0, "s", &score.sections["s"])
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidTempo { .. }));

        let mut bad = Score::default();
        bad.settings = Settings {
            key: "H major".to_string(),
            ..Settings::default()
        };
        assert!(SectionSettings::global(&bad).is_err());
    }
}
