// Third species: four quarter notes against each cantus note.
//
// Beat 0 is consonant and compared against the previous beat 0 for parallel
// perfects. Beats 1-3 may carry passing or neighbour dissonances. The final
// cantus note gets a fixed stepwise climb from the fifth to the octave, with
// the leading (or sub-) tonic as a passing dissonance on beat 2.

use super::{Line, Species, SpeciesStrategy};
use crate::context::{Filter, RuleSet};
use crate::pipeline::ConstraintPipeline;
use crate::scale::ScaleContext;
use crate::voice::{Duration, MAX_PITCH, Note, Pitch};
use rand::Rng;

pub struct ThirdSpecies;

/// Fifth, sixth, seventh and octave above the final cantus note.
fn cadence_measure(scale: &ScaleContext, below: Pitch) -> [Pitch; 4] {
    let fifth = scale.nearest(below.saturating_add(7).min(MAX_PITCH));
    let sixth = scale.step_above(fifth).unwrap_or(fifth);
    let seventh = scale.step_above(sixth).unwrap_or(sixth);
    let octave = scale.step_above(seventh).unwrap_or(seventh);
    [fifth, sixth, seventh, octave]
}

impl SpeciesStrategy for ThirdSpecies {
    fn species(&self) -> Species {
        Species::Third
    }

    fn write_line<R: Rng>(
        &self,
        pipeline: &ConstraintPipeline<'_>,
        cantus: &[Pitch],
        rng: &mut R,
    ) -> Vec<Note> {
        let Some(&final_below) = cantus.last() else {
            return Vec::new();
        };
        let n = cantus.len();
        let window = pipeline.config().interval_window;
        let closing = cadence_measure(pipeline.scale(), final_below);
        let mut line = Line::new();

        for (m, &below) in cantus.iter().enumerate().take(n - 1) {
            let penultimate = m + 2 == n;
            for beat in 0..4 {
                let pitch = if beat == 0 && m == 0 {
                    super::opening(pipeline, below, rng)
                } else if beat == 0 {
                    let ctx = line
                        .context(below, window)
                        .with_parallel_reference(line.interval_back(3));
                    let rules = RuleSet::strong_beat()
                        .with_if(penultimate, Filter::AvoidOctaves)
                        .with_if(penultimate, Filter::AvoidFifths);
                    pipeline.choose(&ctx, rules, rng)
                } else {
                    let next_below = if beat == 3 { cantus[m + 1] } else { below };
                    let mut ctx = line.context(below, window).with_next_below(Some(next_below));
                    let mut rules = RuleSet::weak_beat().with(Filter::NeighborTones);
                    if penultimate && beat == 3 {
                        ctx = ctx.with_cadence(vec![closing[0]]);
                        rules = rules.with(Filter::ApproachCadence);
                    }
                    pipeline.choose(&ctx, rules, rng)
                };
                line.push(pitch, below, Duration::Quarter);
            }
        }

        for pitch in closing {
            line.push(pitch, final_below, Duration::Quarter);
        }
        line.into_notes()
    }
}
