//! End-to-end compilation tests.
//!
//! These tests drive `compile` with JSON scores and check timeline structure,
//! determinism, arrangement slicing, warnings, and fatal errors.

use etherdaw_compiler::automation::{effective_probability, survives};
use etherdaw_compiler::{compile, CodedError, CompileError, CompileOptions, WarningCode};
use etherdaw_spec::Score;
use pretty_assertions::assert_eq;

// =============================================================================
// Helper Functions
// =============================================================================

fn score(json: &str) -> Score {
    Score::from_json(json).expect("test score should parse")
}

/// A score that touches every random stream: Markov, random arpeggios,
/// humanize, per-note probability, and a density ramp.
fn busy_score() -> Score {
    score(
        r#"{
        "settings": { "tempo": 100, "key": "D dorian", "humanize": 0.5, "swing": 0.3 },
        "instruments": { "lead": {}, "keys": {}, "drums": {} },
        "patterns": {
            "walk":  { "kind": "markov", "steps": 16, "preset": "stepwise" },
            "spark": { "kind": "arpeggio", "chord": "Dm7", "mode": "random", "steps": 16 },
            "hats":  { "kind": "notes", "notes": ["F#2:8?0.5", "F#2:8?0.5", "F#2:8?0.5", "F#2:8?0.5"] },
            "kick":  { "kind": "euclidean", "hits": 5, "steps": 16, "drum": "kick" }
        },
        "sections": {
            "verse": {
                "bars": 2,
                "density": { "start": 0.4, "end": 1.0 },
                "tracks": {
                    "lead":  { "pattern": "walk", "repeat": 2 },
                    "keys":  { "pattern": "spark", "repeat": 2 },
                    "drums": { "patterns": ["kick", "hats"], "repeat": 2 }
                }
            }
        },
        "arrangement": ["verse", "verse"]
    }"#,
    )
}

fn abc_score() -> Score {
    score(
        r#"{
        "patterns": { "p": { "kind": "notes", "notes": ["C4:w"] } },
        "sections": {
            "a": { "bars": 1, "tracks": { "lead": { "pattern": "p" } } },
            "b": { "bars": 2, "tracks": { "lead": { "pattern": "p", "repeat": 2 } } },
            "c": { "bars": 1, "tracks": { "lead": { "pattern": "p" } } }
        },
        "arrangement": ["a", "b", "c"]
    }"#,
    )
}

// =============================================================================
// 1. Arrangement and Tempo
// =============================================================================

#[test]
fn test_sixteen_notes_in_eight_seconds() {
    let s = score(
        r#"{
        "settings": { "tempo": 120 },
        "patterns": { "motif": { "kind": "notes", "notes": ["C4:q", "E4:q", "G4:q", "C5:q"] } },
        "sections": { "intro": { "bars": 4, "tracks": { "lead": { "pattern": "motif", "repeat": 4 } } } },
        "arrangement": ["intro"]
    }"#,
    );
    let out = compile(&s, &CompileOptions::default()).unwrap();

    assert_eq!(out.stats.notes, 16);
    assert_eq!(out.stats.bars, 4);
    assert!((out.stats.duration_seconds - 8.0).abs() < 1e-9);
    assert!(out.warnings.is_empty());

    let last = out.timeline.events.last().unwrap();
    assert_eq!(last.pitch, "C5");
    assert_eq!(last.midi, Some(72));
    assert!((last.time_seconds - 7.5).abs() < 1e-9);
    assert!((last.duration_seconds - 0.5).abs() < 1e-9);
}

#[test]
fn test_section_tempo_override() {
    let s = score(
        r#"{
        "settings": { "tempo": 120 },
        "patterns": { "p": { "kind": "notes", "notes": ["C4:w"] } },
        "sections": {
            "fast": { "bars": 1, "tracks": { "lead": { "pattern": "p" } } },
            "slow": { "bars": 1, "tempo": 60, "tracks": { "lead": { "pattern": "p" } } }
        },
        "arrangement": ["fast", "slow"]
    }"#,
    );
    let out = compile(&s, &CompileOptions::default()).unwrap();
    let spans: Vec<(f64, f64)> = out
        .timeline
        .sections
        .iter()
        .map(|s| (s.start_seconds, s.end_seconds))
        .collect();
    assert_eq!(spans, vec![(0.0, 2.0), (2.0, 6.0)]);
    assert_eq!(out.timeline.events[1].duration_seconds, 4.0);
}

#[test]
fn test_partial_arrangement() {
    let s = abc_score();
    let out = compile(&s, &CompileOptions::new().with_start_section("b")).unwrap();
    assert_eq!(out.stats.sections, vec!["b".to_string(), "c".to_string()]);
    assert_eq!(out.stats.section_count, 2);
    assert_eq!(out.stats.bars, 3);
    assert_eq!(out.timeline.events[0].section, "b");
    assert_eq!(out.timeline.events[0].time_beats, 0.0);
}

#[test]
fn test_end_section_is_inclusive() {
    let s = abc_score();
    let out = compile(&s, &CompileOptions::new().with_end_section("b")).unwrap();
    assert_eq!(out.stats.sections, vec!["a".to_string(), "b".to_string()]);
}

// =============================================================================
// 2. Determinism
// =============================================================================

#[test]
fn test_same_seed_same_timeline() {
    let s = busy_score();
    let options = CompileOptions::new().with_seed(1234);
    let first = serde_json::to_string(&compile(&s, &options).unwrap().timeline).unwrap();
    let second = serde_json::to_string(&compile(&s, &options).unwrap().timeline).unwrap();
    assert_eq!(first, second);

    let sequential = compile(&s, &options.clone().with_parallel(false)).unwrap();
    assert_eq!(first, serde_json::to_string(&sequential.timeline).unwrap());
}

#[test]
fn test_different_seed_different_timeline() {
    let s = busy_score();
    let a = compile(&s, &CompileOptions::new().with_seed(1)).unwrap();
    let b = compile(&s, &CompileOptions::new().with_seed(2)).unwrap();
    assert_ne!(a.timeline, b.timeline);
}

#[test]
fn test_repeated_section_gets_fresh_material() {
    let s = busy_score();
    let out = compile(&s, &CompileOptions::new().with_seed(7)).unwrap();
    let lead = |index: usize| -> Vec<String> {
        let span = &out.timeline.sections[index];
        out.timeline
            .events
            .iter()
            .filter(|e| e.instrument == "lead")
            .filter(|e| e.time_beats >= span.start_beat && e.time_beats < span.end_beat)
            .map(|e| e.pitch.clone())
            .collect()
    };
    assert_ne!(lead(0), lead(1));
}

#[test]
fn test_early_offset_clamps_only_at_timeline_start() {
    let s = score(
        r#"{
        "settings": { "tempo": 120 },
        "patterns": { "push": { "kind": "notes", "notes": ["C4:q-10ms", "C4:q-10ms", "C4:q", "C4:q+20ms"] } },
        "sections": { "s": { "bars": 1, "tracks": { "lead": { "pattern": "push" } } } },
        "arrangement": ["s", "s"]
    }"#,
    );
    let out = compile(&s, &CompileOptions::default()).unwrap();
    let events = &out.timeline.events;
    assert_eq!(events[0].time_beats, 0.0);
    assert_eq!(events[0].time_seconds, 0.0);
    assert!((events[1].time_seconds - 0.49).abs() < 1e-9);
    assert!((events[3].time_seconds - 1.52).abs() < 1e-9);
    // The second occurrence's first note lands early, inside the first section.
    assert_eq!(events[4].time_beats, 4.0);
    assert!((events[4].time_seconds - 1.99).abs() < 1e-9);
}

#[test]
fn test_events_sorted_and_clipped() {
    let out = compile(&busy_score(), &CompileOptions::default()).unwrap();
    let t = &out.timeline;
    assert!(t.events.windows(2).all(|w| w[0].time_beats <= w[1].time_beats));
    for span in &t.sections {
        for e in t.events.iter().filter(|e| e.time_beats >= span.start_beat && e.time_beats < span.end_beat) {
            assert!(e.time_beats + e.duration_beats <= span.end_beat + 1e-9);
            assert!((0.0..=1.0).contains(&e.velocity));
        }
    }
}

// =============================================================================
// 3. Warnings
// =============================================================================

#[test]
fn test_unknown_section_warns() {
    let mut s = abc_score();
    s.arrangement = vec!["a".into(), "bridge".into(), "c".into()];
    let out = compile(&s, &CompileOptions::default()).unwrap();

    assert_eq!(out.stats.sections, vec!["a".to_string(), "c".to_string()]);
    let warning = &out.warnings[0];
    assert_eq!(warning.code, WarningCode::UnknownSection);
    assert!(warning.message.contains("bridge"));
    assert_eq!(warning.path.as_deref(), Some("arrangement[1]"));
}

#[test]
fn test_unknown_pattern_skips_only_that_track() {
    let s = score(
        r#"{
        "patterns": { "p": { "kind": "notes", "notes": ["C4:q"] } },
        "sections": {
            "a": { "bars": 1, "tracks": {
                "bass": { "pattern": "nope" },
                "lead": { "pattern": "p" }
            } }
        },
        "arrangement": ["a"]
    }"#,
    );
    let out = compile(&s, &CompileOptions::default()).unwrap();
    assert_eq!(out.stats.instruments, vec!["lead".to_string()]);
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.warnings[0].to_string(), "W002: unknown pattern 'nope' (at sections.a.tracks.bass)");
}

#[test]
fn test_unknown_curve_and_technique_fall_back() {
    let s = score(
        r#"{
        "patterns": {
            "motif": { "kind": "notes", "notes": ["C4:q", "D4:q"] },
            "more": { "kind": "continuation", "source": "motif", "technique": "spiral", "repetitions": 1 }
        },
        "sections": {
            "a": {
                "bars": 1,
                "density": { "start": 1.0, "end": 1.0, "curve": "wobble" },
                "tracks": { "lead": { "pattern": "more" } }
            }
        },
        "arrangement": ["a"]
    }"#,
    );
    let out = compile(&s, &CompileOptions::default()).unwrap();
    let codes: Vec<WarningCode> = out.warnings.iter().map(|w| w.code).collect();
    assert_eq!(codes, vec![WarningCode::UnknownCurve, WarningCode::UnknownTechnique]);
    assert_eq!(out.stats.notes, 4);
}

// =============================================================================
// 4. Fatal Errors
// =============================================================================

#[test]
fn test_reference_cycle_is_fatal() {
    let s = score(
        r#"{
        "patterns": {
            "a": { "kind": "extends", "extends": "b" },
            "b": { "kind": "conditional", "condition": { "type": "every", "n": 1 }, "then": "a" }
        },
        "sections": { "s": { "bars": 1, "tracks": { "lead": { "pattern": "a" } } } },
        "arrangement": ["s"]
    }"#,
    );
    let err = compile(&s, &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, CompileError::ResolutionCycle { .. }));
    assert_eq!(err.code(), "ETHER_COMPILE_001");
}

#[test]
fn test_malformed_note_is_fatal_with_location() {
    let s = score(
        r#"{
        "patterns": { "riff": { "kind": "notes", "notes": ["C4:q", "E4:q@1.4"] } },
        "sections": { "s": { "bars": 1, "tracks": { "lead": { "pattern": "riff" } } } },
        "arrangement": ["s"]
    }"#,
    );
    let err = compile(&s, &CompileOptions::default()).unwrap_err();
    assert!(err.to_string().starts_with("pattern 'riff' notes[1]"));
    assert_eq!(err.category(), "notation");
}

#[test]
fn test_invalid_settings_are_fatal() {
    let mut s = abc_score();
    s.settings.time_signature = "4/3".to_string();
    assert!(compile(&s, &CompileOptions::default()).is_err());

    let mut s = abc_score();
    s.settings.tempo = -10.0;
    assert!(matches!(
        compile(&s, &CompileOptions::default()),
        Err(CompileError::InvalidTempo { .. })
    ));
}

#[test]
fn test_invalid_tuplet_is_fatal() {
    let s = score(
        r#"{
        "patterns": { "t": { "kind": "tuplet", "actual": 3, "normal": 0, "notes": ["C4:8"] } },
        "sections": { "s": { "bars": 1, "tracks": { "lead": { "pattern": "t" } } } },
        "arrangement": ["s"]
    }"#,
    );
    assert!(matches!(
        compile(&s, &CompileOptions::default()),
        Err(CompileError::InvalidTuplet { .. })
    ));
}

#[test]
fn test_out_of_range_pitches_are_fatal_not_panics() {
    let s = score(
        r#"{
        "patterns": {
            "high": { "kind": "notes", "notes": ["C300000000:q"] },
            "far":  { "kind": "degrees", "degrees": ["1", "2147483647"] },
            "wide": { "kind": "arpeggio", "chord": "C", "octaves": 4000000000 },
            "ok":   { "kind": "notes", "notes": ["C4:q"] }
        },
        "sections": {
            "a": { "bars": 1, "tracks": { "lead": { "pattern": "high" } } },
            "b": { "bars": 1, "tracks": { "lead": { "pattern": "far" } } },
            "c": { "bars": 1, "tracks": { "lead": { "pattern": "wide" } } },
            "d": { "bars": 1, "tracks": { "lead": { "pattern": "ok", "octave": 300000000 } } }
        },
        "arrangement": ["a"]
    }"#,
    );
    for (section, location) in [("a", "notes[0]"), ("b", "degrees[1]")] {
        let mut s = s.clone();
        s.arrangement = vec![section.to_string()];
        let err = compile(&s, &CompileOptions::default()).unwrap_err();
        assert!(err.to_string().contains(location), "{}", err);
    }

    let mut wide = s.clone();
    wide.arrangement = vec!["c".to_string()];
    assert!(matches!(
        compile(&wide, &CompileOptions::default()),
        Err(CompileError::InvalidPattern { .. })
    ));

    let mut track = s.clone();
    track.arrangement = vec!["d".to_string()];
    let err = compile(&track, &CompileOptions::default()).unwrap_err();
    assert_eq!(err.code(), "ETHER_COMPILE_006");
}

#[test]
fn test_huge_repeat_compiles_one_section() {
    let s = score(
        r#"{
        "patterns": { "hit": { "kind": "notes", "notes": ["C4:q"] } },
        "sections": { "s": { "bars": 1, "tracks": { "lead": { "pattern": "hit", "repeat": 4000000000 } } } },
        "arrangement": ["s"]
    }"#,
    );
    let out = compile(&s, &CompileOptions::default()).unwrap();
    assert_eq!(out.timeline.events.len(), 4);
}

// =============================================================================
// 5. Density
// =============================================================================

#[test]
fn test_density_boundaries() {
    for p in [0.0, 0.25, 0.5, 1.0] {
        assert_eq!(effective_probability(p, 0.0), 0.0);
    }
    for draw in [0.0, 0.3, 0.999_999] {
        assert!(survives(draw, 1.0, 1.0));
        assert!(!survives(draw, 1.0, 0.0));
    }
}

#[test]
fn test_density_zero_section_is_silent() {
    let mut s = abc_score();
    let json = r#"{ "bars": 1, "density": 0.0, "tracks": { "lead": { "pattern": "p" } } }"#;
    s.sections.insert("a".to_string(), serde_json::from_str(json).unwrap());
    let out = compile(&s, &CompileOptions::default()).unwrap();
    assert!(out.timeline.events.iter().all(|e| e.section != "a"));
    assert_eq!(out.stats.section_count, 3);
}
