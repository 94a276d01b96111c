// Second species: two half notes against each cantus note.
//
// Downbeats must be consonant and are checked for parallel fifths and
// octaves against the previous downbeat, not the upbeat in between. Upbeats
// may carry a dissonant passing tone when the next downbeat can continue the
// step into a consonance. The final measure sounds the cadence pitch twice.

use super::{Line, Species, SpeciesStrategy, cadence, cadence_targets, opening};
use crate::context::{Filter, RuleSet};
use crate::pipeline::ConstraintPipeline;
use crate::voice::{Duration, Note, Pitch};
use rand::Rng;

pub struct SecondSpecies;

impl SpeciesStrategy for SecondSpecies {
    fn species(&self) -> Species {
        Species::Second
    }

    fn write_line<R: Rng>(
        &self,
        pipeline: &ConstraintPipeline<'_>,
        cantus: &[Pitch],
        rng: &mut R,
    ) -> Vec<Note> {
        let n = cantus.len();
        let window = pipeline.config().interval_window;
        let mut line = Line::new();

        for (m, &below) in cantus.iter().enumerate() {
            let last = m + 1 == n;
            let penultimate = m + 2 == n;

            let downbeat = if m == 0 {
                opening(pipeline, below, rng)
            } else if last {
                cadence(pipeline, &line, below, rng)
            } else {
                // Two notes back is the previous downbeat.
                let ctx = line
                    .context(below, window)
                    .with_parallel_reference(line.interval_back(1));
                let rules = RuleSet::strong_beat().with_if(penultimate, Filter::AvoidOctaves);
                pipeline.choose(&ctx, rules, rng)
            };
            line.push(downbeat, below, Duration::Half);

            let upbeat = if last {
                downbeat
            } else {
                let mut ctx = line.context(below, window).with_next_below(Some(cantus[m + 1]));
                let mut rules = RuleSet::weak_beat();
                if penultimate {
                    ctx = ctx.with_cadence(cadence_targets(cantus[m + 1]));
                    rules = rules
                        .without(Filter::PassingTones)
                        .with(Filter::AvoidOctaves)
                        .with(Filter::ApproachCadence);
                }
                pipeline.choose(&ctx, rules, rng)
            };
            line.push(upbeat, below, Duration::Half);
        }
        line.into_notes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::interval;
    use crate::scale::{Key, Mode, ScaleContext};
    use crate::species::tests::{A_MINOR_CANTUS, C_MAJOR_CANTUS};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn check_line(scale: &ScaleContext, cantus: &[Pitch], seed: u64) -> Vec<Note> {
        let config = GenerationConfig::default();
        let pipeline = ConstraintPipeline::new(scale, &config);
        let mut rng = StdRng::seed_from_u64(seed);
        let notes = SecondSpecies.write_line(&pipeline, cantus, &mut rng);
        assert_eq!(notes.len(), cantus.len() * 2);

        for (i, note) in notes.iter().enumerate() {
            let iv = interval::semitones(cantus[i / 2], note.pitch);
            assert!((0..=16).contains(&iv), "seed {seed}: interval {iv} at {i}");
            assert!(scale.contains(note.pitch));
            if i % 2 == 0 {
                assert!(interval::is_consonant(iv), "seed {seed}: dissonant downbeat {i}");
            } else if interval::is_dissonant(iv) {
                // A passing tone: stepped into and out of in one direction.
                let into = interval::semitones(notes[i - 1].pitch, note.pitch);
                let out = interval::semitones(note.pitch, notes[i + 1].pitch);
                assert!(interval::is_step(into) && interval::is_step(out), "seed {seed}: at {i}");
                assert_eq!(into.signum(), out.signum(), "seed {seed}: passing tone turns at {i}");
            }
        }
        // Downbeat-to-downbeat parallels.
        for m in 1..cantus.len() {
            let a = interval::semitones(cantus[m - 1], notes[2 * (m - 1)].pitch);
            let b = interval::semitones(cantus[m], notes[2 * m].pitch);
            if interval::is_perfect_consonance(a) {
                assert_ne!(interval::class(a), interval::class(b), "seed {seed}: measure {m}");
            }
        }
        notes
    }

    #[test]
    fn test_second_species_rules_hold() {
        let c_major = ScaleContext::new(Key::C, Mode::Major);
        let a_minor = ScaleContext::new(Key::A, Mode::Minor);
        for seed in 0..200 {
            check_line(&c_major, &C_MAJOR_CANTUS, seed);
            check_line(&a_minor, &A_MINOR_CANTUS, seed);
        }
    }

    #[test]
    fn test_second_species_uses_passing_tones() {
        let scale = ScaleContext::new(Key::C, Mode::Major);
        let dissonances: usize = (0..200)
            .map(|seed| {
                let notes = check_line(&scale, &C_MAJOR_CANTUS, seed);
                notes
                    .iter()
                    .enumerate()
                    .filter(|(i, note)| interval::is_dissonant(interval::semitones(C_MAJOR_CANTUS[i / 2], note.pitch)))
                    .count()
            })
            .sum();
        assert!(dissonances > 0);
    }
}
