// Fourth species: syncopated half notes.
//
// The line starts on the upbeat of the first measure (after an implied half
// rest), so it has 2N - 1 notes: note 0 sits over cf[0], and each later
// measure m contributes a downbeat and an upbeat over cf[m].
//
// Every measure runs the same cycle. The upbeat is a consonance chosen, when
// possible, to become a resolvable dissonance against the next cantus note
// (the preparation). Its pitch is then tied over the barline (the
// suspension), and when the tied note is dissonant the following upbeat
// steps down onto a consonance (the resolution). A held pitch that cannot be
// tied legally is replaced by a fresh consonant downbeat instead.

use super::{Line, Species, SpeciesStrategy, cadence, cadence_targets};
use crate::context::{Filter, RuleSet};
use crate::interval;
use crate::pipeline::{ConstraintPipeline, narrow, pick_uniform};
use crate::voice::{Duration, MAX_PITCH, Note, Pitch};
use rand::Rng;

pub struct FourthSpecies;

impl FourthSpecies {
    /// The opening upbeat: a fifth or octave above cf[0], preferring one that
    /// prepares a suspension over cf[1].
    fn opening_upbeat<R: Rng>(
        pipeline: &ConstraintPipeline<'_>,
        below: Pitch,
        next_below: Option<Pitch>,
        rng: &mut R,
    ) -> Pitch {
        let mut pool: Vec<Pitch> = [7u8, 12]
            .into_iter()
            .map(|iv| below.saturating_add(iv))
            .filter(|&p| p <= MAX_PITCH && pipeline.scale().contains(p))
            .collect();
        if let Some(next) = next_below {
            narrow(&mut pool, "clean preparation", |p| pipeline.is_clean_preparation(p, next));
        }
        pick_uniform(&pool, rng).unwrap_or_else(|| super::opening(pipeline, below, rng))
    }

    /// A consonant upbeat over `below`, preferring a suspension preparation
    /// against `next_below` (or a step into the cadence when `next_below` is
    /// the final note).
    fn preparation<R: Rng>(
        pipeline: &ConstraintPipeline<'_>,
        line: &Line,
        below: Pitch,
        next_below: Pitch,
        next_is_final: bool,
        rng: &mut R,
    ) -> Pitch {
        let window = pipeline.config().interval_window;
        let mut ctx = line.context(below, window).with_next_below(Some(next_below));
        let mut rules = RuleSet::strong_beat().with(Filter::LeapsByStep);
        if next_is_final {
            ctx = ctx.with_cadence(cadence_targets(next_below));
            rules = rules.with(Filter::AvoidOctaves).with(Filter::ApproachCadence);
        }
        let Some(mut pool) = pipeline.candidates(&ctx, rules, rng) else {
            return pipeline.fallback(&ctx);
        };
        if !next_is_final {
            narrow(&mut pool, "clean preparation", |p| pipeline.is_clean_preparation(p, next_below));
        }
        pick_uniform(&pool, rng).unwrap_or_else(|| pipeline.fallback(&ctx))
    }
}

impl SpeciesStrategy for FourthSpecies {
    fn species(&self) -> Species {
        Species::Fourth
    }

    fn write_line<R: Rng>(
        &self,
        pipeline: &ConstraintPipeline<'_>,
        cantus: &[Pitch],
        rng: &mut R,
    ) -> Vec<Note> {
        let Some(&first) = cantus.first() else {
            return Vec::new();
        };
        let n = cantus.len();
        let window = pipeline.config().interval_window;
        let mut line = Line::new();
        let upbeat = Self::opening_upbeat(pipeline, first, cantus.get(1).copied(), rng);
        line.push(upbeat, first, Duration::Half);

        for (m, &below) in cantus.iter().enumerate().skip(1) {
            if m + 1 == n {
                let close = cadence(pipeline, &line, below, rng);
                line.push(close, below, Duration::Half);
                line.tie_last();
                line.push(close, below, Duration::Half);
                break;
            }

            let held = line.last().unwrap_or(below);
            let suspended = if pipeline.can_tie(held, below) {
                line.tie_last();
                line.push(held, below, Duration::Half);
                interval::is_dissonant(interval::semitones(below, held))
            } else {
                let ctx = line.context(below, window);
                let pitch = pipeline.choose(&ctx, RuleSet::strong_beat(), rng);
                line.push(pitch, below, Duration::Half);
                false
            };

            let next_below = cantus[m + 1];
            let upbeat = if suspended {
                let ctx = line.context(below, window);
                let rules = RuleSet::placement()
                    .with(Filter::ConsonantOnly)
                    .with(Filter::ResolveSuspensionDown);
                pipeline.choose(&ctx, rules, rng)
            } else {
                Self::preparation(pipeline, &line, below, next_below, m + 2 == n, rng)
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
    use crate::scale::{Key, Mode, ScaleContext};
    use crate::species::tests::{A_MINOR_CANTUS, C_MAJOR_CANTUS};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Cantus index under counterpoint note `k`.
    fn aligned(k: usize) -> usize {
        if k == 0 { 0 } else { (k + 1) / 2 }
    }

    #[test]
    fn test_fourth_species_rules_hold() {
        let config = GenerationConfig::default();
        let cases = [
            (ScaleContext::new(Key::C, Mode::Major), &C_MAJOR_CANTUS[..]),
            (ScaleContext::new(Key::A, Mode::Minor), &A_MINOR_CANTUS[..]),
        ];
        for (scale, cantus) in &cases {
            let pipeline = ConstraintPipeline::new(scale, &config);
            for seed in 0..200 {
                let mut rng = StdRng::seed_from_u64(seed);
                let notes = FourthSpecies.write_line(&pipeline, cantus, &mut rng);
                assert_eq!(notes.len(), cantus.len() * 2 - 1);
                for (k, note) in notes.iter().enumerate() {
                    assert_eq!(note.duration, Duration::Half);
                    let iv = interval::semitones(cantus[aligned(k)], note.pitch);
                    assert!((0..=16).contains(&iv), "seed {seed}: interval {iv} at {k}");
                    if interval::is_dissonant(iv) {
                        // Only a tied downbeat may be dissonant, and it resolves down by step.
                        assert!(k % 2 == 1 && notes[k - 1].tied, "seed {seed}: unprepared dissonance at {k}");
                        let fall = note.pitch as i16 - notes[k + 1].pitch as i16;
                        assert!((1..=2).contains(&fall), "seed {seed}: bad resolution at {k}");
                    }
                    if note.tied {
                        assert_eq!(note.pitch, notes[k + 1].pitch);
                    }
                }
                let last = notes.len() - 1;
                assert!(notes[last - 1].tied);
                assert_eq!(interval::class(interval::semitones(cantus[cantus.len() - 1], notes[last].pitch)), 0);
            }
        }
    }

    #[test]
    fn test_fourth_species_forms_suspensions() {
        let scale = ScaleContext::new(Key::C, Mode::Major);
        let config = GenerationConfig::default();
        let pipeline = ConstraintPipeline::new(&scale, &config);
        let suspensions: usize = (0..50)
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let notes = FourthSpecies.write_line(&pipeline, &C_MAJOR_CANTUS, &mut rng);
                notes
                    .iter()
                    .enumerate()
                    .filter(|(k, note)| {
                        interval::is_dissonant(interval::semitones(C_MAJOR_CANTUS[aligned(*k)], note.pitch))
                    })
                    .count()
            })
            .sum();
        assert!(suspensions > 0);
    }

    #[test]
    fn test_two_note_cantus() {
        let scale = ScaleContext::new(Key::C, Mode::Major);
        let config = GenerationConfig::default();
        let pipeline = ConstraintPipeline::new(&scale, &config);
        let mut rng = StdRng::seed_from_u64(1);
        let notes = FourthSpecies.write_line(&pipeline, &[41, 39], &mut rng);
        assert_eq!(notes.len(), 3);
        assert!(notes[1].tied);
    }
}
