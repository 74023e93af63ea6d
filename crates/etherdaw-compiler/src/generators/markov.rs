//! Markov-chain melodies over scale degrees.

use std::collections::BTreeMap;

use rand::Rng;
use rand_pcg::Pcg32;

use etherdaw_spec::MarkovPattern;

use super::{ExpandedNote, ExpandedPattern, GenContext, Generate, NotePitch};
use crate::error::{CompileError, NotationError, WarningCode};
use crate::notation::{parse_degree, DegreeItem};

/// Transition probabilities from one state to the next (unnormalized).
pub type TransitionTable = BTreeMap<String, f64>;

/// Built-in transition tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkovPreset {
    /// Mostly steps between neighbouring degrees.
    #[default]
    Stepwise,
    /// Leaps between chord tones 1, 3, 5, 8.
    Arpeggiated,
    /// Motion within degrees 1, 2, 3, 5, 6, 8.
    Pentatonic,
}

impl MarkovPreset {
    pub fn from_name(name: &str) -> Option<MarkovPreset> {
        match name.trim().to_ascii_lowercase().as_str() {
            "stepwise" => Some(MarkovPreset::Stepwise),
            "arpeggiated" | "arpeggio" => Some(MarkovPreset::Arpeggiated),
            "pentatonic" => Some(MarkovPreset::Pentatonic),
            _ => None,
        }
    }

    /// The preset as an explicit chain.
    pub fn chain(&self) -> MarkovChain {
        match self {
            MarkovPreset::Stepwise => {
                MarkovChain::from_ladder(&[1, 2, 3, 4, 5, 6, 7, 8], &[1.0, 4.0, 1.0])
            }
            MarkovPreset::Arpeggiated => MarkovChain::from_ladder(&[1, 3, 5, 8], &[0.5, 4.0, 2.0, 1.0]),
            MarkovPreset::Pentatonic => {
                MarkovChain::from_ladder(&[1, 2, 3, 5, 6, 8], &[1.0, 4.0, 2.0])
            }
        }
    }
}

/// A first-order Markov chain over degree strings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkovChain {
    pub transitions: BTreeMap<String, TransitionTable>,
}

impl MarkovChain {
    pub fn new(transitions: BTreeMap<String, TransitionTable>) -> Self {
        Self { transitions }
    }

    /// Builds a chain over an ordered ladder of degrees. `weights[k]` is the
    /// weight of moving `k` rungs up or down (`weights[0]` is repetition).
    fn from_ladder(ladder: &[i32], weights: &[f64]) -> MarkovChain {
        let mut transitions = BTreeMap::new();
        for (i, from) in ladder.iter().enumerate() {
            let mut table = TransitionTable::new();
            for (j, to) in ladder.iter().enumerate() {
                let distance = i.abs_diff(j);
                if let Some(&w) = weights.get(distance) {
                    table.insert(to.to_string(), w);
                }
            }
            transitions.insert(from.to_string(), table);
        }
        MarkovChain { transitions }
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.values().all(|t| t.values().all(|w| *w <= 0.0))
    }

    /// Samples the successor of `state`. Returns `None` for dead ends.
    pub fn next(&self, state: &str, rng: &mut Pcg32) -> Option<String> {
        let table = self.transitions.get(state)?;
        let total: f64 = table.values().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return None;
        }
        let mut target = rng.gen::<f64>() * total;
        let mut last = None;
        for (next, &weight) in table {
            if weight <= 0.0 {
                continue;
            }
            if target < weight {
                return Some(next.clone());
            }
            target -= weight;
            last = Some(next);
        }
        last.cloned()
    }
}

impl Generate for MarkovPattern {
    fn generate(&self, ctx: &mut GenContext) -> Result<ExpandedPattern, CompileError> {
        let step = ctx.beats(&self.duration, "duration")?;
        if !(0.0..=1.0).contains(&self.rest_probability) {
            return Err(ctx.invalid(format!(
                "rest_probability {} out of range [0, 1]",
                self.rest_probability
            )));
        }

        let chain = match (&self.transitions, &self.preset) {
            (Some(table), _) if !table.is_empty() => MarkovChain::new(table.clone()),
            (Some(_), _) => {
                ctx.diagnostics.warn(
                    WarningCode::UnknownPreset,
                    "empty transition table, using stepwise",
                    ctx.location("transitions"),
                );
                MarkovPreset::Stepwise.chain()
            }
            (None, Some(name)) => match MarkovPreset::from_name(name) {
                Some(preset) => preset.chain(),
                None => {
                    ctx.diagnostics.warn(
                        WarningCode::UnknownPreset,
                        format!("unknown markov preset '{}', using stepwise", name),
                        ctx.location("preset"),
                    );
                    MarkovPreset::Stepwise.chain()
                }
            },
            (None, None) => MarkovPreset::default().chain(),
        };

        let mut notes = Vec::with_capacity(self.steps as usize);
        let mut state = self.start.clone();
        let mut cursor = 0.0;
        for _ in 0..self.steps {
            if self.rest_probability > 0.0 && ctx.rng.gen::<f64>() < self.rest_probability {
                cursor += step;
                continue;
            }
            let item = parse_degree(&state).map_err(|e| e.at(ctx.location("state")))?;
            let beats = match item {
                DegreeItem::Rest(beats) => beats.unwrap_or(step),
                DegreeItem::Degree(d) => {
                    let beats = d.beats.unwrap_or(step);
                    let midi = self
                        .octave
                        .checked_add(d.octave_shift)
                        .and_then(|octave| ctx.key.degree_to_midi(d.degree, d.accidental, octave))
                        .ok_or_else(|| {
                            NotationError::InvalidDegree {
                                input: state.clone(),
                            }
                            .at(ctx.location("state"))
                        })?;
                    notes.push(ExpandedNote::articulated(
                        NotePitch::Midi(midi),
                        cursor,
                        beats,
                        ctx.velocity,
                        d.articulation,
                        &d.expression,
                    ));
                    beats
                }
            };
            cursor += beats;
            state = chain
                .next(&state, ctx.rng)
                .unwrap_or_else(|| self.start.clone());
        }

        Ok(ExpandedPattern::new(notes, cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::tests_support::TestContext;

    fn markov(steps: u32, preset: Option<&str>) -> MarkovPattern {
        MarkovPattern {
            steps,
            duration: "8".to_string(),
            start: "1".to_string(),
            octave: 4,
            preset: preset.map(str::to_string),
            transitions: None,
            rest_probability: 0.0,
        }
    }

    #[test]
    fn test_stepwise_stays_in_scale_and_range() {
        let mut t = TestContext::new();
        let out = markov(32, None).generate(&mut t.ctx()).unwrap();
        assert_eq!(out.notes.len(), 32);
        assert_eq!(out.total_beats, 16.0);
        assert_eq!(out.notes[0].pitch, NotePitch::Midi(60));
        for pair in out.notes.windows(2) {
            let a = pair[0].pitch.midi().unwrap();
            let b = pair[1].pitch.midi().unwrap();
            assert!((a - b).abs() <= 4, "leap {a} -> {b} too large for stepwise");
            assert!((60..=72).contains(&b));
        }
    }

    #[test]
    fn test_same_seed_same_melody() {
        let p = markov(16, Some("pentatonic"));
        let mut a = TestContext::new();
        let mut b = TestContext::new();
        assert_eq!(
            p.generate(&mut a.ctx()).unwrap(),
            p.generate(&mut b.ctx()).unwrap()
        );
    }

    #[test]
    fn test_explicit_transitions() {
        let mut p = markov(4, None);
        let mut table = BTreeMap::new();
        table.insert("1".to_string(), TransitionTable::from([("5".to_string(), 1.0)]));
        table.insert("5".to_string(), TransitionTable::from([("1".to_string(), 1.0)]));
        p.transitions = Some(table);
        let mut t = TestContext::new();
        let out = p.generate(&mut t.ctx()).unwrap();
        let pitches: Vec<i32> = out.notes.iter().filter_map(|n| n.pitch.midi()).collect();
        assert_eq!(pitches, vec![60, 67, 60, 67]);
    }

    #[test]
    fn test_unknown_preset_warns() {
        let mut t = TestContext::new();
        let out = markov(4, Some("jazz")).generate(&mut t.ctx()).unwrap();
        assert_eq!(out.notes.len(), 4);
        assert_eq!(t.diagnostics.warnings().len(), 1);
        assert_eq!(t.diagnostics.warnings()[0].code, WarningCode::UnknownPreset);
    }

    #[test]
    fn test_rest_probability_one_is_silent() {
        let mut p = markov(8, None);
        p.rest_probability = 1.0;
        let mut t = TestContext::new();
        let out = p.generate(&mut t.ctx()).unwrap();
        assert!(out.notes.is_empty());
        assert_eq!(out.total_beats, 4.0);
    }

    #[test]
    fn test_octave_overflow_is_fatal() {
        let mut p = markov(4, None);
        p.octave = i32::MAX;
        let mut t = TestContext::new();
        let err = p.generate(&mut t.ctx()).unwrap_err();
        assert!(matches!(err, CompileError::Notation { .. }));
    }
}
