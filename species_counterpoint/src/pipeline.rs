// Candidate selection for a single counterpoint note.
//
// The pipeline starts from every diatonic pitch between an octave below the
// cantus note and an octave above the tenth, then runs the enabled filters of
// a `RuleSet` in `Filter::ORDER`. Most filters narrow the candidate list; the
// passing-tone and neighbour-tone filters instead add dissonances back in,
// but only when a look-ahead shows the dissonance can be left by step into a
// consonance against the next cantus note.
//
// A filter that would remove every remaining candidate is skipped (and
// logged at trace level) rather than applied, so the pipeline only comes
// back empty-handed when the starting pool was already empty. In that case
// `choose` falls back to a safe consonance above the cantus note.

use crate::config::GenerationConfig;
use crate::context::{Filter, GenerationContext, RuleSet};
use crate::interval::{self, MAX_LEAP, MAX_SEPARATION};
use crate::scale::ScaleContext;
use crate::voice::{MAX_PITCH, Pitch};
use log::trace;
use rand::Rng;
use std::fmt;

/// Intervals tried, in order, when the filters leave nothing to choose from:
/// fifth, thirds, sixths, octave, unison.
const SAFE_INTERVALS: [i16; 7] = [7, 4, 3, 9, 8, 12, 0];

pub struct ConstraintPipeline<'a> {
    scale: &'a ScaleContext,
    config: &'a GenerationConfig,
}

impl<'a> ConstraintPipeline<'a> {
    pub fn new(scale: &'a ScaleContext, config: &'a GenerationConfig) -> Self {
        ConstraintPipeline { scale, config }
    }

    pub fn scale(&self) -> &'a ScaleContext {
        self.scale
    }

    pub fn config(&self) -> &'a GenerationConfig {
        self.config
    }

    /// Run the enabled filters and return the surviving candidates, sorted
    /// ascending. `None` only when no diatonic pitch lies near the cantus.
    pub fn candidates<R: Rng>(
        &self,
        ctx: &GenerationContext,
        rules: RuleSet,
        rng: &mut R,
    ) -> Option<Vec<Pitch>> {
        let below = ctx.below as i16;
        let mut pool = self
            .scale
            .pitches_in_range(below - MAX_LEAP, below + MAX_SEPARATION + MAX_LEAP);
        if pool.is_empty() {
            return None;
        }

        for filter in Filter::ORDER {
            if !rules.contains(filter) {
                continue;
            }
            match filter {
                Filter::PassingTones => self.add_passing_tones(ctx, &mut pool),
                Filter::NeighborTones => self.add_neighbor_tones(ctx, &mut pool),
                Filter::LeaveDissonanceByStep if ctx.previous_was_dissonant() => {
                    // Carry on in the direction of the dissonance, or else
                    // step back (a neighbour tone's return).
                    let into = ctx.previous_motion().unwrap_or(0);
                    let onward = narrow(&mut pool, "dissonance left onward", |p| {
                        keeps(filter, ctx, p)
                            && ctx
                                .before
                                .is_some_and(|b| interval::semitones(b, p).signum() == into.signum())
                    });
                    if !onward {
                        narrow(&mut pool, filter, |p| keeps(filter, ctx, p));
                    }
                }
                Filter::ContraryMotion => {
                    if rng.random::<f64>() < self.config.contrary_motion_probability {
                        narrow(&mut pool, filter, |p| keeps(filter, ctx, p));
                    }
                }
                _ => {
                    narrow(&mut pool, filter, |p| keeps(filter, ctx, p));
                }
            }
        }
        Some(pool)
    }

    /// Pick one pitch uniformly from the candidates, or fall back.
    pub fn choose<R: Rng>(&self, ctx: &GenerationContext, rules: RuleSet, rng: &mut R) -> Pitch {
        self.candidates(ctx, rules, rng)
            .and_then(|pool| pick_uniform(&pool, rng))
            .unwrap_or_else(|| self.fallback(ctx))
    }

    /// The first safe consonance above the cantus that is diatonic, on the
    /// keyboard and within an octave of the previous note. With none left,
    /// the diatonic pitch nearest the fifth.
    pub fn fallback(&self, ctx: &GenerationContext) -> Pitch {
        let below = ctx.below as i16;
        let pitch = SAFE_INTERVALS
            .iter()
            .filter_map(|&iv| Pitch::try_from(below + iv).ok())
            .find(|&p| {
                p <= MAX_PITCH
                    && self.scale.contains(p)
                    && ctx
                        .before
                        .is_none_or(|b| interval::semitones(b, p).abs() <= MAX_LEAP)
            })
            .unwrap_or_else(|| self.scale.nearest((ctx.below + 7).min(MAX_PITCH)));
        trace!("fallback to {pitch} over {}", ctx.below);
        pitch
    }

    /// Where a dissonant `held` note may resolve over `below`: one or two
    /// semitones down onto a diatonic consonance at or above the cantus.
    pub fn resolutions(&self, held: Pitch, below: Pitch) -> Vec<Pitch> {
        [1, 2]
            .into_iter()
            .filter_map(|d| held.checked_sub(d))
            .filter(|&r| {
                let v = interval::semitones(below, r);
                self.scale.contains(r) && (0..=MAX_SEPARATION).contains(&v) && interval::is_consonant(v)
            })
            .collect()
    }

    /// Whether `pitch` may be held over into a measure whose cantus note is
    /// `next_below`: it must stay above the cantus, within a tenth, and be
    /// either consonant or resolvable.
    pub fn can_tie(&self, pitch: Pitch, next_below: Pitch) -> bool {
        let v = interval::semitones(next_below, pitch);
        (0..=MAX_SEPARATION).contains(&v)
            && (interval::is_consonant(v) || !self.resolutions(pitch, next_below).is_empty())
    }

    /// A tie-able pitch that becomes a resolvable dissonance against
    /// `next_below`, i.e. the preparation of a real suspension.
    pub fn is_clean_preparation(&self, pitch: Pitch, next_below: Pitch) -> bool {
        let v = interval::semitones(next_below, pitch);
        (0..=MAX_SEPARATION).contains(&v)
            && interval::is_dissonant(v)
            && !self.resolutions(pitch, next_below).is_empty()
    }

    /// True when a note at `pitch` could follow a dissonance against `below`.
    /// Only imperfect consonances qualify, so no parallel or cadence rule on
    /// the following note can veto the resolution.
    fn resolves_over(&self, pitch: Pitch, below: Pitch) -> bool {
        let v = interval::semitones(below, pitch);
        (1..=MAX_SEPARATION).contains(&v) && interval::is_imperfect_consonance(v)
    }

    fn dissonant_here(&self, ctx: &GenerationContext, pitch: Pitch) -> bool {
        let v = interval::semitones(ctx.below, pitch);
        (1..=MAX_SEPARATION).contains(&v) && interval::is_dissonant(v)
    }

    /// Dissonances may only follow a consonance, and never lead into a fixed
    /// cadence note.
    fn dissonance_allowed(&self, ctx: &GenerationContext) -> bool {
        !ctx.before_cadence() && ctx.previous_interval().is_some_and(interval::is_consonant)
    }

    fn add_passing_tones(&self, ctx: &GenerationContext, pool: &mut Vec<Pitch>) {
        let (Some(before), Some(motion), Some(next_below)) =
            (ctx.before, ctx.previous_motion(), ctx.next_below)
        else {
            return;
        };
        if motion == 0 || !self.dissonance_allowed(ctx) {
            return;
        }
        let onward = |p: Pitch| {
            if motion > 0 {
                self.scale.step_above(p)
            } else {
                self.scale.step_below(p)
            }
        };
        let Some(passing) = onward(before) else {
            return;
        };
        if self.dissonant_here(ctx, passing)
            && onward(passing).is_some_and(|q| self.resolves_over(q, next_below))
        {
            trace!("passing tone {passing} over {}", ctx.below);
            insert_sorted(pool, passing);
        }
    }

    fn add_neighbor_tones(&self, ctx: &GenerationContext, pool: &mut Vec<Pitch>) {
        let (Some(before), Some(next_below)) = (ctx.before, ctx.next_below) else {
            return;
        };
        if !self.dissonance_allowed(ctx) || !self.resolves_over(before, next_below) {
            return;
        }
        for neighbor in [self.scale.step_above(before), self.scale.step_below(before)]
            .into_iter()
            .flatten()
        {
            if self.dissonant_here(ctx, neighbor) {
                trace!("neighbour tone {neighbor} over {}", ctx.below);
                insert_sorted(pool, neighbor);
            }
        }
    }
}

/// Whether a narrowing filter keeps candidate `p`.
fn keeps(filter: Filter, ctx: &GenerationContext, p: Pitch) -> bool {
    let vertical = interval::semitones(ctx.below, p);
    let melodic = ctx.before.map(|b| interval::semitones(b, p));
    match filter {
        Filter::VoiceCrossing => vertical >= 0,
        Filter::TenthLimit => vertical <= MAX_SEPARATION,
        Filter::NoUnison => vertical != 0,
        Filter::ConsonantOnly => interval::is_consonant(vertical),
        Filter::LeaveDissonanceByStep => {
            !ctx.previous_was_dissonant()
                || (melodic.is_some_and(interval::is_step) && interval::is_consonant(vertical))
        }
        Filter::ResolveSuspensionDown => {
            !ctx.previous_was_dissonant() || melodic.is_some_and(|m| (-2..=-1).contains(&m))
        }
        Filter::AvoidOctaves => interval::class(vertical) != 0,
        Filter::AvoidFifths => interval::class(vertical) != 7,
        Filter::ParallelPerfects => match ctx.parallel_reference {
            Some(r) if interval::is_perfect_consonance(r) => interval::class(vertical) != interval::class(r),
            _ => true,
        },
        Filter::HiddenParallels => !is_hidden_perfect(ctx, p),
        Filter::LargeLeaps => melodic.is_none_or(|m| m.abs() <= MAX_LEAP),
        Filter::LeapsByStep => {
            !(ctx.previous_motion().is_some_and(interval::is_leap) && melodic.is_some_and(interval::is_leap))
        }
        Filter::RepeatedIntervals => match ctx.recent_intervals.as_slice() {
            [.., a, b] if interval::class(*a) == interval::class(*b) => {
                interval::class(vertical) != interval::class(*b)
            }
            _ => true,
        },
        Filter::RepeatedPitches => ctx.repeated < 3 || ctx.before != Some(p),
        Filter::ApproachCadence => {
            !ctx.before_cadence()
                || ctx
                    .cadence_targets
                    .iter()
                    .any(|&t| interval::is_step(interval::semitones(p, t)))
        }
        Filter::ContraryMotion => match (ctx.cantus_motion(), melodic) {
            (Some(cf), Some(m)) if cf != 0 => m.signum() == -cf.signum(),
            _ => true,
        },
        Filter::PassingTones | Filter::NeighborTones => true,
    }
}

/// Similar motion into a perfect interval where both voices leap.
fn is_hidden_perfect(ctx: &GenerationContext, p: Pitch) -> bool {
    if !interval::is_perfect_consonance(interval::semitones(ctx.below, p)) {
        return false;
    }
    let (Some(before), Some(before_below)) = (ctx.before, ctx.before_and_below) else {
        return false;
    };
    let upper = interval::semitones(before, p);
    let lower = interval::semitones(before_below, ctx.below);
    upper != 0
        && lower != 0
        && upper.signum() == lower.signum()
        && !interval::is_step(upper)
        && !interval::is_step(lower)
}

/// Keep only the candidates `keep` accepts, unless that would leave none.
/// Returns whether the narrowing was applied.
pub fn narrow<T: fmt::Debug>(pool: &mut Vec<Pitch>, reason: T, keep: impl Fn(Pitch) -> bool) -> bool {
    let kept: Vec<Pitch> = pool.iter().copied().filter(|&p| keep(p)).collect();
    if kept.is_empty() {
        trace!("{reason:?} would empty {pool:?}; skipped");
        false
    } else {
        *pool = kept;
        true
    }
}

fn insert_sorted(pool: &mut Vec<Pitch>, pitch: Pitch) {
    if let Err(idx) = pool.binary_search(&pitch) {
        pool.insert(idx, pitch);
    }
}

pub(crate) fn pick_uniform<R: Rng, T: Copy>(items: &[T], rng: &mut R) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[rng.random_range(0..items.len())])
    }
}

/// Cumulative-weight pick. Non-positive weights are never chosen unless
/// every weight is non-positive, in which case the first item wins.
pub(crate) fn pick_weighted<R: Rng, T: Copy>(items: &[(T, f64)], rng: &mut R) -> Option<T> {
    let total: f64 = items.iter().map(|&(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return items.first().map(|&(item, _)| item);
    }
    let r: f64 = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for &(item, w) in items {
        let w = w.max(0.0);
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        if r < cumulative {
            return Some(item);
        }
    }
    items.iter().rev().find(|&&(_, w)| w > 0.0).map(|&(item, _)| item)
}
