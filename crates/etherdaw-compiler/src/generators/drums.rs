//! Drum step sequencer.

use etherdaw_spec::DrumsPattern;

use super::{ExpandedNote, ExpandedPattern, GenContext, Generate, NotePitch};
use crate::error::CompileError;

/// Velocity of an accented (`>`) step.
pub const ACCENT_VELOCITY: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Hit,
    Accent,
    Rest,
}

fn parse_line(line: &str) -> Result<Vec<Step>, char> {
    line.chars()
        .filter(|c| !c.is_whitespace() && *c != '|')
        .map(|c| match c {
            'x' | 'X' => Ok(Step::Hit),
            '>' => Ok(Step::Accent),
            '.' | '-' => Ok(Step::Rest),
            other => Err(other),
        })
        .collect()
}

impl Generate for DrumsPattern {
    fn generate(&self, ctx: &mut GenContext) -> Result<ExpandedPattern, CompileError> {
        let step = ctx.beats(&self.step, "step")?;

        let mut lines = Vec::with_capacity(self.lines.len());
        for (name, line) in &self.lines {
            let steps = parse_line(line).map_err(|c| {
                ctx.invalid(format!("invalid step '{}' in drum line '{}'", c, name))
            })?;
            lines.push((name, steps));
        }

        let longest = lines.iter().map(|(_, s)| s.len()).max().unwrap_or(0);
        let (total_steps, looped) = match self.bars {
            Some(bars) => {
                let beats = bars as f64 * ctx.time_signature.beats_per_bar();
                ((beats / step).round() as usize, true)
            }
            None => (longest, false),
        };

        // Looped lines stop at the horizon; the length still covers every bar.
        let audible_steps = (ctx.horizon / step).ceil().max(0.0) as usize;
        let mut notes = Vec::new();
        for (name, steps) in &lines {
            if steps.is_empty() {
                continue;
            }
            let count = if looped { total_steps.min(audible_steps) } else { steps.len() };
            for i in 0..count {
                let velocity = match steps[i % steps.len()] {
                    Step::Hit => ctx.velocity,
                    Step::Accent => ACCENT_VELOCITY,
                    Step::Rest => continue,
                };
                notes.push(ExpandedNote::new(
                    NotePitch::drum(name.as_str(), self.kit.as_str()),
                    i as f64 * step,
                    step,
                    velocity,
                ));
            }
        }
        notes.sort_by(|a, b| a.start_beat.total_cmp(&b.start_beat));

        Ok(ExpandedPattern::new(notes, total_steps as f64 * step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::tests_support::TestContext;
    use std::collections::BTreeMap;

    fn drums(lines: &[(&str, &str)], bars: Option<u32>) -> DrumsPattern {
        DrumsPattern {
            lines: lines
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            kit: "808".to_string(),
            step: "16".to_string(),
            bars,
        }
    }

    #[test]
    fn test_lines_and_accents() {
        let p = drums(&[("kick", "x...|x..."), ("snare", "..>.")], None);
        let mut t = TestContext::new();
        let out = p.generate(&mut t.ctx()).unwrap();
        assert_eq!(out.total_beats, 2.0);
        assert_eq!(out.notes.len(), 3);
        assert_eq!(out.notes[1].pitch.to_string(), "drum:snare@808");
        assert_eq!(out.notes[1].start_beat, 0.5);
        assert_eq!(out.notes[1].velocity, ACCENT_VELOCITY);
        assert_eq!(out.notes[2].start_beat, 1.0);
        assert_eq!(out.notes[0].velocity, 0.8);
    }

    #[test]
    fn test_bars_loop_lines() {
        let p = drums(&[("hat", "x.")], Some(1));
        let mut t = TestContext::new();
        let out = p.generate(&mut t.ctx()).unwrap();
        assert_eq!(out.total_beats, 4.0);
        assert_eq!(out.notes.len(), 8);
        assert_eq!(out.notes[7].start_beat, 3.5);
    }

    #[test]
    fn test_huge_bar_count_stops_at_horizon() {
        let p = drums(&[("hat", "x.")], Some(u32::MAX));
        let mut t = TestContext::new();
        let mut ctx = t.ctx();
        ctx.horizon = 4.0;
        let out = p.generate(&mut ctx).unwrap();
        assert_eq!(out.notes.len(), 8);
        assert_eq!(out.notes[7].start_beat, 3.5);
        assert_eq!(out.total_beats, u32::MAX as f64 * 4.0);
    }

    #[test]
    fn test_invalid_step_is_fatal() {
        let p = drums(&[("kick", "x?x.")], None);
        let mut t = TestContext::new();
        assert!(p.generate(&mut t.ctx()).is_err());
    }
}
