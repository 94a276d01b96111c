// First species: one whole note against each cantus note.
//
// The opening is a perfect consonance and the close is the octave or unison.
// Everything in between runs the full note-against-note pipeline; the
// penultimate note additionally avoids the octave (which would make
// parallel octaves into the close) and is steered a step away from a cadence
// pitch. On a two-note cantus the opening is itself the penultimate note and
// takes the fifth.

use super::{Line, Species, SpeciesStrategy, cadence, cadence_targets, opening};
use crate::context::{Filter, RuleSet};
use crate::pipeline::ConstraintPipeline;
use crate::voice::{Duration, MAX_PITCH, Note, Pitch};
use rand::Rng;

pub struct FirstSpecies;

impl SpeciesStrategy for FirstSpecies {
    fn species(&self) -> Species {
        Species::First
    }

    fn write_line<R: Rng>(
        &self,
        pipeline: &ConstraintPipeline<'_>,
        cantus: &[Pitch],
        rng: &mut R,
    ) -> Vec<Note> {
        let Some((&first, rest)) = cantus.split_first() else {
            return Vec::new();
        };
        let n = cantus.len();
        let window = pipeline.config().interval_window;
        let mut line = Line::new();
        let fifth = first.saturating_add(7);
        let start = if n == 2 && fifth <= MAX_PITCH && pipeline.scale().contains(fifth) {
            fifth
        } else {
            opening(pipeline, first, rng)
        };
        line.push(start, first, Duration::Whole);

        for (offset, &below) in rest.iter().enumerate() {
            let i = offset + 1;
            let pitch = if i == n - 1 {
                cadence(pipeline, &line, below, rng)
            } else {
                let penultimate = i == n - 2;
                let mut ctx = line.context(below, window);
                if penultimate {
                    ctx = ctx.with_cadence(cadence_targets(cantus[n - 1]));
                }
                let rules = RuleSet::note_against_note()
                    .with_if(penultimate, Filter::AvoidOctaves)
                    .with_if(penultimate, Filter::ApproachCadence);
                pipeline.choose(&ctx, rules, rng)
            };
            line.push(pitch, below, Duration::Whole);
        }
        line.into_notes()
    }
}
