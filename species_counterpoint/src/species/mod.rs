// The five species of counterpoint.
//
// Each species is a small strategy that walks the cantus firmus and asks the
// shared `ConstraintPipeline` for one pitch at a time, switching `RuleSet`s
// by metric position. Strategies own no state between calls: the line being
// written lives in a `Line` local to `write_line`, and a fresh
// `GenerationContext` is derived from it before every note.
//
// Helpers shared by all strategies live here: the opening note (a weighted
// unison/fifth/octave) and the closing cadence note (octave or unison).

mod fifth;
mod first;
mod fourth;
mod second;
mod third;

pub use fifth::{FifthSpecies, RhythmPattern};
pub use first::FirstSpecies;
pub use fourth::FourthSpecies;
pub use second::SecondSpecies;
pub use third::ThirdSpecies;

use crate::context::GenerationContext;
use crate::error::{CounterpointError, Result};
use crate::interval;
use crate::pipeline::{ConstraintPipeline, pick_weighted};
use crate::voice::{Duration, MAX_PITCH, Note, Pitch, Voice};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    First,
    Second,
    Third,
    Fourth,
    Fifth,
}

impl Species {
    pub const ALL: [Species; 5] = [
        Species::First,
        Species::Second,
        Species::Third,
        Species::Fourth,
        Species::Fifth,
    ];

    pub fn number(self) -> u8 {
        match self {
            Species::First => 1,
            Species::Second => 2,
            Species::Third => 3,
            Species::Fourth => 4,
            Species::Fifth => 5,
        }
    }

    pub fn from_number(n: u8) -> Result<Species> {
        Species::ALL
            .into_iter()
            .find(|s| s.number() == n)
            .ok_or(CounterpointError::UnknownSpecies(n))
    }

    pub fn name(self) -> &'static str {
        match self {
            Species::First => "First Species (1:1)",
            Species::Second => "Second Species (2:1)",
            Species::Third => "Third Species (4:1)",
            Species::Fourth => "Fourth Species (Syncopated)",
            Species::Fifth => "Fifth Species (Florid)",
        }
    }

    /// Counterpoint notes per cantus note, for the fixed-ratio species.
    pub fn notes_per_cantus(self) -> Option<usize> {
        match self {
            Species::First => Some(1),
            Species::Second => Some(2),
            Species::Third => Some(4),
            Species::Fourth | Species::Fifth => None,
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Writes a counterpoint line above a cantus firmus, one note at a time.
pub trait SpeciesStrategy {
    fn species(&self) -> Species;

    /// The counterpoint notes for `cantus`. Never fails: every pitch comes
    /// from the pipeline or its fallback. Empty for an empty cantus.
    fn write_line<R: Rng>(
        &self,
        pipeline: &ConstraintPipeline<'_>,
        cantus: &[Pitch],
        rng: &mut R,
    ) -> Vec<Note>;
}

/// Generate the counterpoint voice for `species` above `cantus`.
pub fn generate_counterpoint<R: Rng>(
    species: Species,
    pipeline: &ConstraintPipeline<'_>,
    cantus: &Voice,
    rng: &mut R,
) -> Voice {
    let cf = cantus.pitches();
    let notes = match species {
        Species::First => FirstSpecies.write_line(pipeline, &cf, rng),
        Species::Second => SecondSpecies.write_line(pipeline, &cf, rng),
        Species::Third => ThirdSpecies.write_line(pipeline, &cf, rng),
        Species::Fourth => FourthSpecies.write_line(pipeline, &cf, rng),
        Species::Fifth => FifthSpecies.write_line(pipeline, &cf, rng),
    };
    Voice::new(notes)
}

/// A counterpoint line under construction: the notes written so far and the
/// cantus pitch sounding under each.
#[derive(Debug, Default)]
pub(crate) struct Line {
    pitches: Vec<Pitch>,
    under: Vec<Pitch>,
    notes: Vec<Note>,
}

impl Line {
    pub(crate) fn new() -> Self {
        Line::default()
    }

    pub(crate) fn push(&mut self, pitch: Pitch, below: Pitch, duration: Duration) {
        self.pitches.push(pitch);
        self.under.push(below);
        self.notes.push(Note::new(pitch, duration));
    }

    /// Mark the last note as tied into the next one.
    pub(crate) fn tie_last(&mut self) {
        if let Some(note) = self.notes.last_mut() {
            note.tied = true;
        }
    }

    pub(crate) fn last(&self) -> Option<Pitch> {
        self.pitches.last().copied()
    }

    /// Vertical interval of the last note written.
    pub(crate) fn last_interval(&self) -> Option<i16> {
        Some(interval::semitones(*self.under.last()?, *self.pitches.last()?))
    }

    /// Vertical interval of the note `back` positions before the end
    /// (0 = last).
    pub(crate) fn interval_back(&self, back: usize) -> Option<i16> {
        let i = self.pitches.len().checked_sub(back + 1)?;
        Some(interval::semitones(self.under[i], self.pitches[i]))
    }

    pub(crate) fn context(&self, below: Pitch, window: usize) -> GenerationContext {
        GenerationContext::new(&self.pitches, &self.under, below, window)
    }

    pub(crate) fn into_notes(self) -> Vec<Note> {
        self.notes
    }
}

/// The first counterpoint note: a weighted unison, fifth or octave above
/// `below`, restricted to diatonic pitches on the keyboard.
pub(crate) fn opening<R: Rng>(pipeline: &ConstraintPipeline<'_>, below: Pitch, rng: &mut R) -> Pitch {
    let weights = pipeline.config().opening_weights;
    let options: Vec<(Pitch, f64)> = [(0, weights.unison), (7, weights.fifth), (12, weights.octave)]
        .into_iter()
        .map(|(iv, weight)| (below.saturating_add(iv), weight))
        .filter(|&(p, _)| p <= MAX_PITCH && pipeline.scale().contains(p))
        .collect();
    pick_weighted(&options, rng)
        .unwrap_or_else(|| pipeline.fallback(&GenerationContext::new(&[], &[], below, 0)))
}

/// The closing note over the final cantus pitch: the octave with
/// `final_octave_probability`, otherwise the unison. A choice that would form
/// parallel octaves or leap more than an octave is rejected in favour of the
/// other; when both are rejected the smaller leap wins.
pub(crate) fn cadence<R: Rng>(
    pipeline: &ConstraintPipeline<'_>,
    line: &Line,
    below: Pitch,
    rng: &mut R,
) -> Pitch {
    let octave = below.saturating_add(12);
    let (preferred, other) = if rng.random::<f64>() < pipeline.config().final_octave_probability {
        (octave, below)
    } else {
        (below, octave)
    };
    let before = line.last();
    let previous_perfect_octave = line
        .last_interval()
        .is_some_and(|iv| interval::class(iv) == 0);
    let leap = |p: Pitch| before.map_or(0, |b| interval::semitones(b, p).abs());
    let acceptable = |p: Pitch| {
        p <= MAX_PITCH
            && !(previous_perfect_octave && before != Some(p))
            && leap(p) <= interval::MAX_LEAP
    };

    if acceptable(preferred) {
        preferred
    } else if acceptable(other) {
        other
    } else if octave > MAX_PITCH || leap(below) <= leap(octave) {
        below
    } else {
        octave
    }
}

/// The cadence pitches over `final_below`: the octave above (when it is on
/// the keyboard) and the unison.
pub(crate) fn cadence_targets(final_below: Pitch) -> Vec<Pitch> {
    let mut targets = vec![final_below];
    if final_below + 12 <= MAX_PITCH {
        targets.insert(0, final_below + 12);
    }
    targets
}
