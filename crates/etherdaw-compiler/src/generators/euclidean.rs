//! Euclidean rhythms.

use etherdaw_spec::EuclideanPattern;

use super::{ExpandedNote, ExpandedPattern, GenContext, Generate, NotePitch};
use crate::error::CompileError;
use crate::theory::note_name_to_midi;

/// Drum voice used when neither `pitch` nor `drum` is given.
pub const DEFAULT_DRUM: &str = "kick";

/// Distributes `hits` onsets as evenly as possible over `steps` positions
/// (Bjorklund), then rotates the result `rotation` steps to the right.
///
/// `hits` above `steps` is clamped, so the result always has exactly
/// `min(hits, steps)` onsets.
pub fn euclidean_rhythm(hits: usize, steps: usize, rotation: usize) -> Vec<bool> {
    if steps == 0 {
        return Vec::new();
    }
    let hits = hits.min(steps);
    let base = if hits == 0 {
        vec![false; steps]
    } else if hits == steps {
        vec![true; steps]
    } else {
        bjorklund(hits, steps)
    };

    let mut rotated = vec![false; steps];
    for (i, hit) in base.into_iter().enumerate() {
        rotated[(i + rotation) % steps] = hit;
    }
    rotated
}

// Pairs up the pulse and rest groups until at most one remainder group is
// left, then flattens. Starts on an onset.
fn bjorklund(hits: usize, steps: usize) -> Vec<bool> {
    let mut groups: Vec<Vec<bool>> = (0..hits).map(|_| vec![true]).collect();
    let mut remainders: Vec<Vec<bool>> = (0..steps - hits).map(|_| vec![false]).collect();

    while remainders.len() > 1 {
        let pairs = groups.len().min(remainders.len());
        let mut merged = Vec::with_capacity(pairs);
        for _ in 0..pairs {
            let (Some(mut head), Some(tail)) = (groups.pop(), remainders.pop()) else {
                break;
            };
            head.extend(tail);
            merged.push(head);
        }
        // Whatever was not paired becomes the new remainder.
        let leftover = if groups.is_empty() {
            std::mem::take(&mut remainders)
        } else {
            std::mem::take(&mut groups)
        };
        merged.reverse();
        groups = merged;
        remainders = leftover;
    }

    groups.into_iter().chain(remainders).flatten().collect()
}

impl Generate for EuclideanPattern {
    fn generate(&self, ctx: &mut GenContext) -> Result<ExpandedPattern, CompileError> {
        let step = ctx.beats(&self.duration, "duration")?;
        let velocity = match self.velocity {
            Some(v) if !(0.0..=1.0).contains(&v) => {
                return Err(ctx.invalid(format!("velocity {} out of range [0, 1]", v)));
            }
            Some(v) => v,
            None => ctx.velocity,
        };
        let pitch = match (&self.pitch, &self.drum) {
            (Some(name), _) => {
                NotePitch::Midi(note_name_to_midi(name).map_err(|e| e.at(ctx.location("pitch")))?)
            }
            (None, Some(drum)) => NotePitch::drum(drum.as_str(), self.kit.as_str()),
            (None, None) => NotePitch::drum(DEFAULT_DRUM, self.kit.as_str()),
        };

        let rhythm = euclidean_rhythm(
            self.hits as usize,
            self.steps as usize,
            self.rotation as usize,
        );
        let notes = rhythm
            .iter()
            .enumerate()
            .filter(|(_, hit)| **hit)
            .map(|(i, _)| ExpandedNote::new(pitch.clone(), i as f64 * step, step, velocity))
            .collect();

        Ok(ExpandedPattern::new(notes, rhythm.len() as f64 * step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::tests_support::TestContext;
    use proptest::prelude::*;

    fn render(pattern: &[bool]) -> String {
        pattern.iter().map(|&h| if h { 'x' } else { '.' }).collect()
    }

    #[test]
    fn test_known_rhythms() {
        assert_eq!(render(&euclidean_rhythm(3, 8, 0)), "x..x..x.");
        assert_eq!(render(&euclidean_rhythm(4, 16, 0)), "x...x...x...x...");
        assert_eq!(render(&euclidean_rhythm(5, 8, 0)), "x.xx.xx.");
        assert_eq!(render(&euclidean_rhythm(2, 5, 0)), "x.x..");
        assert_eq!(render(&euclidean_rhythm(0, 4, 0)), "....");
        assert_eq!(render(&euclidean_rhythm(4, 4, 0)), "xxxx");
        assert!(euclidean_rhythm(3, 0, 0).is_empty());
    }

    #[test]
    fn test_rotation_moves_right() {
        assert_eq!(render(&euclidean_rhythm(3, 8, 1)), ".x..x..x");
        assert_eq!(render(&euclidean_rhythm(3, 8, 8)), "x..x..x.");
    }

    #[test]
    fn test_generate_drum_default() {
        let p = EuclideanPattern {
            hits: 3,
            steps: 8,
            rotation: 0,
            duration: "16".to_string(),
            pitch: None,
            drum: None,
            kit: "909".to_string(),
            velocity: Some(0.6),
        };
        let mut t = TestContext::new();
        let out = p.generate(&mut t.ctx()).unwrap();
        assert_eq!(out.total_beats, 2.0);
        let starts: Vec<f64> = out.notes.iter().map(|n| n.start_beat).collect();
        assert_eq!(starts, vec![0.0, 0.75, 1.5]);
        assert_eq!(out.notes[0].pitch.to_string(), "drum:kick@909");
        assert_eq!(out.notes[0].velocity, 0.6);
    }

    #[test]
    fn test_generate_melodic() {
        let p = EuclideanPattern {
            hits: 2,
            steps: 4,
            rotation: 0,
            duration: "8".to_string(),
            pitch: Some("C2".to_string()),
            drum: None,
            kit: "808".to_string(),
            velocity: None,
        };
        let mut t = TestContext::new();
        let out = p.generate(&mut t.ctx()).unwrap();
        assert_eq!(out.notes[0].pitch, NotePitch::Midi(36));
        assert_eq!(out.notes[0].velocity, 0.8);
    }

    proptest! {
        #[test]
        fn hit_count_is_exact(steps in 0usize..64, hits_frac in 0.0f64..=1.0, rotation in 0usize..100) {
            let hits = (steps as f64 * hits_frac).round() as usize;
            let pattern = euclidean_rhythm(hits, steps, rotation);
            prop_assert_eq!(pattern.len(), steps);
            prop_assert_eq!(pattern.iter().filter(|h| **h).count(), hits);
        }
    }
}
