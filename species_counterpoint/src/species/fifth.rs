// Fifth species: florid counterpoint mixing the other four.
//
// Each cantus note gets a rhythm pattern from a small library. The first
// measure is always two halves and the last a whole note; in between,
// patterns never repeat back to back and busier patterns are favoured near
// the cantus climax (weighted by `climax_density_bias`).
//
// Notes then borrow the rules of the species their duration belongs to:
// whole notes use the note-against-note rules, the first note of a measure
// the strong-beat rules, later halves the passing-tone rules, later quarters
// passing and neighbour tones, and eighths the most permissive set. Where
// two half-note measures meet, the upbeat may instead prepare a fourth-species
// suspension that is tied over the barline and resolved down by step.

use super::{Line, Species, SpeciesStrategy, cadence, cadence_targets, opening};
use crate::config::GenerationConfig;
use crate::context::{Filter, RuleSet};
use crate::interval;
use crate::pipeline::{ConstraintPipeline, narrow, pick_uniform, pick_weighted};
use crate::voice::{Duration, Note, Pitch};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// The rhythms a fifth-species measure may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RhythmPattern {
    Whole,
    Halves,
    HalfQuarters,
    Quarters,
    QuarterEighths,
}

impl RhythmPattern {
    pub const ALL: [RhythmPattern; 5] = [
        RhythmPattern::Whole,
        RhythmPattern::Halves,
        RhythmPattern::HalfQuarters,
        RhythmPattern::Quarters,
        RhythmPattern::QuarterEighths,
    ];

    pub fn durations(self) -> &'static [Duration] {
        use Duration::*;
        match self {
            RhythmPattern::Whole => &[Whole],
            RhythmPattern::Halves => &[Half, Half],
            RhythmPattern::HalfQuarters => &[Half, Quarter, Quarter],
            RhythmPattern::Quarters => &[Quarter, Quarter, Quarter, Quarter],
            RhythmPattern::QuarterEighths => &[Quarter, Quarter, Eighth, Eighth, Quarter],
        }
    }

    /// Notes per measure.
    pub fn density(self) -> usize {
        self.durations().len()
    }
}

/// Rules for an ordinary (non-suspension) note.
fn note_rules(duration: Duration, on_beat: bool) -> RuleSet {
    let rules = match duration {
        Duration::Whole => RuleSet::note_against_note().with(Filter::LeaveDissonanceByStep),
        Duration::Half | Duration::Quarter if on_beat => RuleSet::strong_beat(),
        Duration::Half => RuleSet::weak_beat(),
        Duration::Quarter => RuleSet::weak_beat().with(Filter::NeighborTones),
        Duration::Eighth => RuleSet::weak_beat()
            .with(Filter::NeighborTones)
            .without(Filter::LeapsByStep),
    };
    rules.with(Filter::RepeatedPitches)
}

fn resolution_rules() -> RuleSet {
    RuleSet::placement()
        .with(Filter::ConsonantOnly)
        .with(Filter::ResolveSuspensionDown)
}

pub struct FifthSpecies;

impl FifthSpecies {
    /// One rhythm pattern per cantus note.
    pub fn plan_rhythm<R: Rng>(
        cantus: &[Pitch],
        config: &GenerationConfig,
        rng: &mut R,
    ) -> Vec<RhythmPattern> {
        let n = cantus.len();
        if n <= 1 {
            return vec![RhythmPattern::Whole; n];
        }
        let climax = cantus
            .iter()
            .enumerate()
            .max_by_key(|&(i, &p)| (p, Reverse(i)))
            .map_or(0, |(i, _)| i);
        let span = (n - 1) as f64;

        let mut plan = vec![RhythmPattern::Halves];
        for m in 1..n - 1 {
            let previous = plan[m - 1];
            let closeness = 1.0 - (m as f64 - climax as f64).abs() / span;
            let options: Vec<(RhythmPattern, f64)> = RhythmPattern::ALL
                .into_iter()
                .filter(|&p| p != previous && !(p == RhythmPattern::Whole && m + 2 == n))
                .map(|p| {
                    let busier = (p.density() - 1) as f64 / 4.0;
                    (p, 1.0 + config.climax_density_bias * closeness * busier)
                })
                .collect();
            plan.push(pick_weighted(&options, rng).unwrap_or(RhythmPattern::Halves));
        }
        plan.push(RhythmPattern::Whole);
        plan
    }

    /// A consonant upbeat that turns into a resolvable dissonance against
    /// `next_below`, if one is available.
    fn suspension_preparation<R: Rng>(
        pipeline: &ConstraintPipeline<'_>,
        line: &Line,
        below: Pitch,
        next_below: Pitch,
        rng: &mut R,
    ) -> Option<Pitch> {
        let ctx = line
            .context(below, pipeline.config().interval_window)
            .with_next_below(Some(next_below));
        let rules = RuleSet::strong_beat().with(Filter::RepeatedPitches);
        let mut pool = pipeline.candidates(&ctx, rules, rng)?;
        // The tie sounds the pitch twice, so it must not extend a repeated run.
        let prepares = |p: Pitch| {
            pipeline.is_clean_preparation(p, next_below) && !(ctx.repeated >= 2 && ctx.before == Some(p))
        };
        if narrow(&mut pool, "clean preparation", prepares) {
            pick_uniform(&pool, rng)
        } else {
            None
        }
    }
}

impl SpeciesStrategy for FifthSpecies {
    fn species(&self) -> Species {
        Species::Fifth
    }

    fn write_line<R: Rng>(
        &self,
        pipeline: &ConstraintPipeline<'_>,
        cantus: &[Pitch],
        rng: &mut R,
    ) -> Vec<Note> {
        let n = cantus.len();
        let config = pipeline.config();
        let window = config.interval_window;
        let plan = Self::plan_rhythm(cantus, config, rng);
        let mut line = Line::new();
        let mut downbeat_interval = None;
        let mut held: Option<Pitch> = None;

        for (m, (&below, &pattern)) in cantus.iter().zip(&plan).enumerate() {
            let durations = pattern.durations();
            let mut resolving = false;

            for (j, &duration) in durations.iter().enumerate() {
                let measure_end = j + 1 == durations.len();
                let next_below = if measure_end { cantus.get(m + 1).copied() } else { Some(below) };
                let before_close = m + 2 == n && measure_end;
                let may_suspend = pattern == RhythmPattern::Halves
                    && j == 1
                    && !resolving
                    && m + 2 < n
                    && plan[m + 1] == RhythmPattern::Halves;
                let preparation = if may_suspend && rng.random::<f64>() < config.suspension_probability {
                    Self::suspension_preparation(pipeline, &line, below, cantus[m + 1], rng)
                } else {
                    None
                };

                let mut tie = false;
                let pitch = if m == 0 && j == 0 {
                    opening(pipeline, below, rng)
                } else if m + 1 == n {
                    cadence(pipeline, &line, below, rng)
                } else if let Some(pitch) = held.take() {
                    resolving = interval::is_dissonant(interval::semitones(below, pitch));
                    pitch
                } else if resolving {
                    resolving = false;
                    pipeline.choose(&line.context(below, window), resolution_rules(), rng)
                } else if let Some(pitch) = preparation {
                    tie = true;
                    pitch
                } else {
                    let mut ctx = line.context(below, window).with_next_below(next_below);
                    if j == 0 {
                        ctx = ctx.with_parallel_reference(downbeat_interval);
                    }
                    if before_close {
                        ctx = ctx.with_cadence(cadence_targets(cantus[n - 1]));
                    }
                    let rules = note_rules(duration, j == 0)
                        .with_if(before_close, Filter::AvoidOctaves)
                        .with_if(before_close, Filter::ApproachCadence);
                    pipeline.choose(&ctx, rules, rng)
                };

                line.push(pitch, below, duration);
                if tie {
                    line.tie_last();
                    held = Some(pitch);
                }
                if j == 0 {
                    downbeat_interval = line.last_interval();
                }
            }
        }
        line.into_notes()
    }
}
