// Per-note generation state and rule selection.
//
// `GenerationContext` is the immutable view a species strategy hands the
// constraint pipeline for a single note: the cantus pitch under the note,
// the previous two counterpoint pitches, the cantus pitch under the previous
// note, and a short window of recent vertical intervals. Strategies rebuild
// it from the line written so far before every note, so nothing leaks from
// one note (or one request) into the next.
//
// `RuleSet` is the per-note rule configuration: a set of `Filter`s the
// pipeline applies in `Filter::ORDER`. Strategies start from one of the
// presets below and add or remove individual filters.

use crate::interval;
use crate::voice::Pitch;

/// One independently switchable rule of the constraint pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Stay at or above the cantus pitch.
    VoiceCrossing,
    /// Stay within a tenth of the cantus pitch.
    TenthLimit,
    /// No unison with the cantus (openings and cadences are chosen elsewhere).
    NoUnison,
    /// Keep consonant vertical intervals only.
    ConsonantOnly,
    /// Add dissonant passing tones continuing a stepwise line.
    PassingTones,
    /// Add dissonant neighbour tones that step away and return.
    NeighborTones,
    /// After a dissonance, move by step.
    LeaveDissonanceByStep,
    /// After a dissonance, step down by one or two semitones.
    ResolveSuspensionDown,
    /// No octave or unison.
    AvoidOctaves,
    /// No fifth.
    AvoidFifths,
    /// Do not repeat a perfect interval class from the reference sonority.
    ParallelPerfects,
    /// No similar motion into a perfect interval unless a voice steps.
    HiddenParallels,
    /// No melodic leap wider than an octave.
    LargeLeaps,
    /// No leap directly after a leap.
    LeapsByStep,
    /// No third consecutive vertical interval of the same class.
    RepeatedIntervals,
    /// No fourth consecutive repetition of one pitch.
    RepeatedPitches,
    /// Prefer a step into the coming cadence pitch.
    ApproachCadence,
    /// Prefer moving against the cantus (probabilistic).
    ContraryMotion,
}

impl Filter {
    /// Application order. Hard constraints come first so that later, softer
    /// preferences can only narrow what the hard ones allowed.
    pub const ORDER: [Filter; 18] = [
        Filter::VoiceCrossing,
        Filter::TenthLimit,
        Filter::NoUnison,
        Filter::ConsonantOnly,
        Filter::PassingTones,
        Filter::NeighborTones,
        Filter::LeaveDissonanceByStep,
        Filter::ResolveSuspensionDown,
        Filter::AvoidOctaves,
        Filter::AvoidFifths,
        Filter::ParallelPerfects,
        Filter::HiddenParallels,
        Filter::LargeLeaps,
        Filter::LeapsByStep,
        Filter::RepeatedIntervals,
        Filter::RepeatedPitches,
        Filter::ApproachCadence,
        Filter::ContraryMotion,
    ];

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// A set of enabled filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuleSet(u32);

impl RuleSet {
    pub fn empty() -> Self {
        RuleSet(0)
    }

    pub fn of(filters: &[Filter]) -> Self {
        filters.iter().fold(RuleSet::empty(), |set, &f| set.with(f))
    }

    pub fn with(self, filter: Filter) -> Self {
        RuleSet(self.0 | filter.bit())
    }

    pub fn without(self, filter: Filter) -> Self {
        RuleSet(self.0 & !filter.bit())
    }

    /// Add `filter` only when `condition` holds.
    pub fn with_if(self, condition: bool, filter: Filter) -> Self {
        if condition { self.with(filter) } else { self }
    }

    pub fn contains(self, filter: Filter) -> bool {
        self.0 & filter.bit() != 0
    }

    /// Where every counterpoint note may sit relative to the cantus.
    pub fn placement() -> Self {
        RuleSet::of(&[Filter::VoiceCrossing, Filter::TenthLimit, Filter::LargeLeaps])
    }

    /// Note-against-note rules: the full consonant pipeline.
    pub fn note_against_note() -> Self {
        RuleSet::placement()
            .with(Filter::NoUnison)
            .with(Filter::ConsonantOnly)
            .with(Filter::ParallelPerfects)
            .with(Filter::HiddenParallels)
            .with(Filter::RepeatedIntervals)
            .with(Filter::ContraryMotion)
    }

    /// Accented positions in the diminished species: the note-against-note
    /// rules, and any dissonance just sounded is left by step.
    pub fn strong_beat() -> Self {
        RuleSet::note_against_note().with(Filter::LeaveDissonanceByStep)
    }

    /// Unaccented positions: consonant unless a passing tone fits.
    pub fn weak_beat() -> Self {
        RuleSet::placement()
            .with(Filter::NoUnison)
            .with(Filter::ConsonantOnly)
            .with(Filter::PassingTones)
            .with(Filter::LeaveDissonanceByStep)
            .with(Filter::LeapsByStep)
    }
}

/// Everything the pipeline needs to know about the note being chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationContext {
    /// Cantus pitch sounding under this note.
    pub below: Pitch,
    /// Previous counterpoint pitch.
    pub before: Option<Pitch>,
    /// Cantus pitch under the previous counterpoint note.
    pub before_and_below: Option<Pitch>,
    /// Counterpoint pitch two notes back.
    pub two_before: Option<Pitch>,
    /// Most recent vertical intervals (oldest first).
    pub recent_intervals: Vec<i16>,
    /// Vertical interval the parallel-perfect rule compares against.
    pub parallel_reference: Option<i16>,
    /// How many times `before` has sounded in a row.
    pub repeated: usize,
    /// Cantus pitch under the following note, when known. A dissonance is
    /// only offered if it can be left by step against this pitch.
    pub next_below: Option<Pitch>,
    /// Pitches the following note may take when it is a fixed cadence note.
    /// Empty everywhere else.
    pub cadence_targets: Vec<Pitch>,
}

impl GenerationContext {
    /// Build the context for the next note from the line so far. `line` and
    /// `under` are parallel: `under[i]` is the cantus pitch beneath `line[i]`.
    pub fn new(line: &[Pitch], under: &[Pitch], below: Pitch, window: usize) -> Self {
        debug_assert_eq!(line.len(), under.len());
        let n = line.len();
        let before = line.last().copied();
        let repeated = before.map_or(0, |b| line.iter().rev().take_while(|&&p| p == b).count());
        let start = n.saturating_sub(window);
        let recent_intervals: Vec<i16> = line[start..]
            .iter()
            .zip(&under[start..])
            .map(|(&cp, &cf)| interval::semitones(cf, cp))
            .collect();

        GenerationContext {
            below,
            before,
            before_and_below: under.last().copied(),
            two_before: n.checked_sub(2).map(|i| line[i]),
            parallel_reference: recent_intervals.last().copied(),
            recent_intervals,
            repeated,
            next_below: None,
            cadence_targets: Vec::new(),
        }
    }

    /// Compare parallels against a sonority other than the previous note
    /// (e.g. the previous downbeat).
    pub fn with_parallel_reference(mut self, reference: Option<i16>) -> Self {
        self.parallel_reference = reference;
        self
    }

    pub fn with_next_below(mut self, next_below: Option<Pitch>) -> Self {
        self.next_below = next_below;
        self
    }

    pub fn with_cadence(mut self, targets: Vec<Pitch>) -> Self {
        self.cadence_targets = targets;
        self
    }

    /// True when the following note is a fixed cadence note.
    pub fn before_cadence(&self) -> bool {
        !self.cadence_targets.is_empty()
    }

    /// Vertical interval of the previous note.
    pub fn previous_interval(&self) -> Option<i16> {
        Some(interval::semitones(self.before_and_below?, self.before?))
    }

    /// Melodic motion into the previous note.
    pub fn previous_motion(&self) -> Option<i16> {
        Some(interval::semitones(self.two_before?, self.before?))
    }

    /// Motion of the cantus into this note.
    pub fn cantus_motion(&self) -> Option<i16> {
        Some(interval::semitones(self.before_and_below?, self.below))
    }

    pub fn previous_was_dissonant(&self) -> bool {
        self.previous_interval().is_some_and(interval::is_dissonant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_set_membership() {
        let rules = RuleSet::note_against_note();
        assert!(rules.contains(Filter::ConsonantOnly));
        assert!(rules.contains(Filter::LargeLeaps));
        assert!(!rules.contains(Filter::PassingTones));

        let rules = rules.without(Filter::ContraryMotion).with(Filter::AvoidOctaves);
        assert!(!rules.contains(Filter::ContraryMotion));
        assert!(rules.contains(Filter::AvoidOctaves));
        assert!(!RuleSet::empty().with_if(false, Filter::NoUnison).contains(Filter::NoUnison));

        let strong = RuleSet::strong_beat();
        assert!(strong.contains(Filter::RepeatedIntervals));
        assert!(strong.contains(Filter::ContraryMotion));
        assert!(strong.contains(Filter::LeaveDissonanceByStep));
    }

    #[test]
    fn test_context_from_line() {
        // Counterpoint G4 A4 B4 over C4 D4 G3, now over C4.
        let ctx = GenerationContext::new(&[46, 48, 50], &[39, 41, 34], 39, 2);
        assert_eq!(ctx.before, Some(50));
        assert_eq!(ctx.two_before, Some(48));
        assert_eq!(ctx.before_and_below, Some(34));
        assert_eq!(ctx.recent_intervals, vec![7, 16]);
        assert_eq!(ctx.parallel_reference, Some(16));
        assert_eq!(ctx.previous_motion(), Some(2));
        assert_eq!(ctx.cantus_motion(), Some(5));
        assert_eq!(ctx.repeated, 1);
        assert!(!ctx.previous_was_dissonant());
    }

    #[test]
    fn test_context_at_start() {
        let ctx = GenerationContext::new(&[], &[], 39, 4);
        assert_eq!(ctx.before, None);
        assert_eq!(ctx.previous_interval(), None);
        assert_eq!(ctx.repeated, 0);
        assert!(ctx.recent_intervals.is_empty());
    }

    #[test]
    fn test_repeated_pitch_count() {
        let ctx = GenerationContext::new(&[46, 48, 48, 48], &[39, 39, 39, 39], 39, 4);
        assert_eq!(ctx.repeated, 3);
        // B over C is a major seventh.
        let ctx = GenerationContext::new(&[50], &[39], 41, 4);
        assert!(ctx.previous_was_dissonant());
    }
}
