// Independent rule checks for generated counterpoint.
//
// Re-checks a finished cantus firmus / counterpoint pair against the
// declarative rules of each species and reports every named check as
// passed or failed. Nothing here reuses the generator's own interval or
// filter code: intervals, alignment and dissonance handling are computed
// from scratch so that a bug in the generator's helpers cannot hide itself.
//
// Two kinds of report:
// - `validate_cantus` / `validate_species`: the rules every generated phrase
//   must satisfy. Integration tests assert `is_valid()` on these.
// - `voice_leading_report`: stylistic checks (hidden parallels, leaps wider
//   than an octave, runs of identical intervals) that the generator prefers
//   but may give up when nothing else fits.
//
// See also: `tests/` for the properties exercised over many seeds.

use species_counterpoint::species::Species;
use species_counterpoint::voice::{Duration, Pitch, Voice};
use std::fmt;

const EIGHTHS_PER_MEASURE: u32 = 8;

/// Ordered list of named checks and whether each passed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleReport {
    checks: Vec<(&'static str, bool)>,
}

impl RuleReport {
    pub fn new() -> Self {
        RuleReport::default()
    }

    /// Record a check. Recording the same name twice keeps it failed if
    /// either result failed.
    pub fn record(&mut self, name: &'static str, passed: bool) {
        match self.checks.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 &= passed,
            None => self.checks.push((name, passed)),
        }
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.checks.iter().find(|(n, _)| *n == name).map(|&(_, ok)| ok)
    }

    pub fn is_valid(&self) -> bool {
        self.checks.iter().all(|&(_, ok)| ok)
    }

    pub fn failures(&self) -> Vec<&'static str> {
        self.checks.iter().filter(|(_, ok)| !ok).map(|&(n, _)| n).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        self.checks.iter().copied()
    }
}

impl fmt::Display for RuleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, ok) in &self.checks {
            writeln!(f, "{:<28} {}", name, if *ok { "ok" } else { "FAIL" })?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Interval helpers
// ---------------------------------------------------------------------------

/// Signed semitones from `lower` up to `upper`.
pub fn vertical(lower: Pitch, upper: Pitch) -> i16 {
    i16::from(upper) - i16::from(lower)
}

fn class(iv: i16) -> i16 {
    iv.rem_euclid(12)
}

pub fn is_consonant(iv: i16) -> bool {
    matches!(class(iv), 0 | 3 | 4 | 7 | 8 | 9)
}

pub fn is_perfect(iv: i16) -> bool {
    matches!(class(iv), 0 | 7)
}

fn is_step(from: Pitch, to: Pitch) -> bool {
    matches!(vertical(from, to).abs(), 1 | 2)
}

/// How two voices move between consecutive sonorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionType {
    /// Neither voice moves.
    Static,
    /// Exactly one voice moves.
    Oblique,
    Contrary,
    /// Same direction, different interval.
    Similar,
    /// Same direction, same interval.
    Parallel,
}

/// Motion from (`lower.0`, `upper.0`) to (`lower.1`, `upper.1`).
pub fn motion_type(lower: (Pitch, Pitch), upper: (Pitch, Pitch)) -> MotionType {
    let dl = vertical(lower.0, lower.1).signum();
    let du = vertical(upper.0, upper.1).signum();
    match (dl, du) {
        (0, 0) => MotionType::Static,
        (0, _) | (_, 0) => MotionType::Oblique,
        _ if dl != du => MotionType::Contrary,
        _ if vertical(lower.0, upper.0) == vertical(lower.1, upper.1) => MotionType::Parallel,
        _ => MotionType::Similar,
    }
}

// ---------------------------------------------------------------------------
// Generic checks. Each returns the offending indices (empty = pass).
// ---------------------------------------------------------------------------

/// Indices `i` where intervals `i - 1` and `i` are both fifths or both
/// octaves/unisons.
pub fn parallel_perfects(intervals: &[i16]) -> Vec<usize> {
    (1..intervals.len())
        .filter(|&i| {
            let (a, b) = (class(intervals[i - 1]), class(intervals[i]));
            is_perfect(intervals[i]) && a == b
        })
        .collect()
}

/// Indices where the upper voice dips below the lower.
pub fn voice_crossings(lower: &[Pitch], upper: &[Pitch]) -> Vec<usize> {
    lower
        .iter()
        .zip(upper)
        .enumerate()
        .filter(|(_, (l, u))| u < l)
        .map(|(i, _)| i)
        .collect()
}

/// Indices where the voices are more than a major tenth apart.
pub fn beyond_tenth(lower: &[Pitch], upper: &[Pitch]) -> Vec<usize> {
    lower
        .iter()
        .zip(upper)
        .enumerate()
        .filter(|&(_, (&l, &u))| vertical(l, u).abs() > 16)
        .map(|(i, _)| i)
        .collect()
}

/// Indices `i` where the melody leaps more than an octave into note `i`.
pub fn large_leaps(melody: &[Pitch]) -> Vec<usize> {
    (1..melody.len())
        .filter(|&i| vertical(melody[i - 1], melody[i]).abs() > 12)
        .collect()
}

pub fn begins_and_ends_perfect(intervals: &[i16]) -> bool {
    match (intervals.first(), intervals.last()) {
        (Some(&first), Some(&last)) => is_perfect(first) && is_perfect(last),
        _ => false,
    }
}

/// Indices `i` where a perfect interval is reached by similar motion with
/// both voices leaping.
pub fn hidden_parallels(lower: &[Pitch], upper: &[Pitch]) -> Vec<usize> {
    let n = lower.len().min(upper.len());
    (1..n)
        .filter(|&i| {
            is_perfect(vertical(lower[i], upper[i]))
                && motion_type((lower[i - 1], lower[i]), (upper[i - 1], upper[i])) == MotionType::Similar
                && vertical(lower[i - 1], lower[i]).abs() > 2
                && vertical(upper[i - 1], upper[i]).abs() > 2
        })
        .collect()
}

/// Start indices of four consecutive identical vertical intervals.
pub fn repeated_interval_runs(intervals: &[i16]) -> Vec<usize> {
    intervals
        .windows(4)
        .enumerate()
        .filter(|(_, w)| w.iter().all(|&iv| iv == w[0]))
        .map(|(i, _)| i)
        .collect()
}

// ---------------------------------------------------------------------------
// Cantus firmus
// ---------------------------------------------------------------------------

/// The melodic rules of a cantus firmus on `tonic`.
pub fn validate_cantus(cf: &[Pitch], tonic: Pitch) -> RuleReport {
    let mut report = RuleReport::new();
    let n = cf.len();
    report.record("length", (5..=12).contains(&n));
    report.record(
        "tonic at both ends",
        cf.first() == Some(&tonic) && cf.last() == Some(&tonic),
    );
    if n < 2 {
        return report;
    }

    let high = cf.iter().copied().max().unwrap_or(tonic);
    let low = cf.iter().copied().min().unwrap_or(tonic);
    report.record("range within a tenth", vertical(low, high) <= 16);

    let peaks: Vec<usize> = (0..n).filter(|&i| cf[i] == high).collect();
    report.record("single climax", peaks.len() == 1);
    report.record(
        "climax in middle half",
        peaks.iter().all(|i| (n / 4..=3 * n / 4).contains(i)),
    );

    let moves: Vec<i16> = cf.windows(2).map(|w| vertical(w[0], w[1])).collect();
    let mut longest_run = 0;
    let mut run = 0;
    let mut direction = 0;
    for &mv in &moves {
        if mv == 0 {
            run = 0;
        } else if mv.signum() == direction {
            run += 1;
        } else {
            run = 1;
        }
        direction = mv.signum();
        longest_run = longest_run.max(run);
    }
    report.record("monotonic runs", longest_run <= 3);

    let longest_leaps = moves
        .split(|mv| mv.abs() <= 2)
        .map(|chunk| chunk.len())
        .max()
        .unwrap_or(0);
    report.record("consecutive leaps", longest_leaps <= 2);
    report.record(
        "no dissonant leaps",
        moves.iter().all(|&mv| !matches!(class(mv.abs()), 6 | 10 | 11)),
    );
    report.record("leaps within an octave", moves.iter().all(|mv| mv.abs() <= 12));

    let turning: Vec<usize> = (0..n)
        .filter(|&i| {
            i == 0
                || i == n - 1
                || ((cf[i] > cf[i - 1]) == (cf[i] > cf[i + 1]) && cf[i] != cf[i - 1] && cf[i] != cf[i + 1])
        })
        .collect();
    let outlined = turning.iter().enumerate().any(|(a, &i)| {
        turning[a + 1..]
            .iter()
            .any(|&j| j >= i + 2 && class(vertical(cf[i], cf[j]).abs()) == 6)
    });
    report.record("no outlined tritone", !outlined);
    report.record("stepwise cadence", is_step(cf[n - 2], cf[n - 1]));
    report
}

// ---------------------------------------------------------------------------
// Species
// ---------------------------------------------------------------------------

fn eighths(duration: Duration) -> u32 {
    EIGHTHS_PER_MEASURE / u32::from(duration.value())
}

/// The cantus pitch sounding under each counterpoint note. Fourth species
/// enters after a half rest.
pub fn aligned_cantus(species: Species, cf: &[Pitch], cp: &Voice) -> Vec<Pitch> {
    let Some(&last) = cf.last() else {
        return Vec::new();
    };
    let mut onset = if species == Species::Fourth { EIGHTHS_PER_MEASURE / 2 } else { 0 };
    cp.iter()
        .map(|note| {
            let measure = (onset / EIGHTHS_PER_MEASURE) as usize;
            onset += eighths(note.duration);
            cf.get(measure).copied().unwrap_or(last)
        })
        .collect()
}

/// Dispatch to the per-species validator.
pub fn validate_species(species: Species, cf: &[Pitch], cp: &Voice) -> RuleReport {
    match species {
        Species::First => validate_first(cf, cp),
        Species::Second => validate_second(cf, cp),
        Species::Third => validate_third(cf, cp),
        Species::Fourth => validate_fourth(cf, cp),
        Species::Fifth => validate_fifth(cf, cp),
    }
}

struct Aligned {
    lower: Vec<Pitch>,
    upper: Vec<Pitch>,
    intervals: Vec<i16>,
}

fn align(species: Species, cf: &[Pitch], cp: &Voice) -> Aligned {
    let lower = aligned_cantus(species, cf, cp);
    let upper = cp.pitches();
    let intervals = lower.iter().zip(&upper).map(|(&l, &u)| vertical(l, u)).collect();
    Aligned { lower, upper, intervals }
}

/// Checks shared by every species.
fn record_common(report: &mut RuleReport, a: &Aligned) {
    report.record("voice crossing", voice_crossings(&a.lower, &a.upper).is_empty());
    report.record("tenth limit", beyond_tenth(&a.lower, &a.upper).is_empty());
    report.record("perfect begin and end", begins_and_ends_perfect(&a.intervals));
}

/// Every dissonance off the accented positions is a step in and a step out.
fn weak_dissonances_stepped(a: &Aligned, accented: impl Fn(usize) -> bool) -> bool {
    (0..a.upper.len())
        .filter(|&i| !is_consonant(a.intervals[i]) && !accented(i))
        .all(|i| {
            i > 0 && i + 1 < a.upper.len() && is_step(a.upper[i - 1], a.upper[i]) && is_step(a.upper[i], a.upper[i + 1])
        })
}

fn ties_hold_pitch(cp: &Voice) -> bool {
    let notes = cp.notes();
    notes
        .iter()
        .enumerate()
        .filter(|(_, note)| note.tied)
        .all(|(i, note)| notes.get(i + 1).is_some_and(|next| next.pitch == note.pitch))
}

pub fn validate_first(cf: &[Pitch], cp: &Voice) -> RuleReport {
    let a = align(Species::First, cf, cp);
    let mut report = RuleReport::new();
    report.record("length 1:1", cp.len() == cf.len());
    record_common(&mut report, &a);
    report.record("all consonant", a.intervals.iter().all(|&iv| is_consonant(iv)));
    report.record("parallel perfects", parallel_perfects(&a.intervals).is_empty());
    report
}

pub fn validate_second(cf: &[Pitch], cp: &Voice) -> RuleReport {
    validate_diminished(Species::Second, 2, cf, cp)
}

pub fn validate_third(cf: &[Pitch], cp: &Voice) -> RuleReport {
    validate_diminished(Species::Third, 4, cf, cp)
}

/// Second and third species: `ratio` equal notes per cantus note.
fn validate_diminished(species: Species, ratio: usize, cf: &[Pitch], cp: &Voice) -> RuleReport {
    let a = align(species, cf, cp);
    let mut report = RuleReport::new();
    report.record(
        if ratio == 2 { "length 2:1" } else { "length 4:1" },
        cp.len() == cf.len() * ratio,
    );
    record_common(&mut report, &a);
    report.record(
        "strong beats consonant",
        a.intervals.iter().step_by(ratio).all(|&iv| is_consonant(iv)),
    );
    report.record("weak dissonances stepped", weak_dissonances_stepped(&a, |i| i % ratio == 0));
    report
}

pub fn validate_fourth(cf: &[Pitch], cp: &Voice) -> RuleReport {
    let a = align(Species::Fourth, cf, cp);
    let mut report = RuleReport::new();
    report.record("length 2N-1", cp.len() + 1 == cf.len() * 2);
    record_common(&mut report, &a);
    report.record("half notes only", cp.iter().all(|n| n.duration == Duration::Half));
    report.record("ties hold pitch", ties_hold_pitch(cp));
    let resolved = (0..a.upper.len())
        .filter(|&i| !is_consonant(a.intervals[i]))
        .all(|i| {
            a.upper
                .get(i + 1)
                .is_some_and(|&next| (1..=2).contains(&vertical(next, a.upper[i])))
        });
    report.record("suspensions resolve down", resolved);
    report
}

pub fn validate_fifth(cf: &[Pitch], cp: &Voice) -> RuleReport {
    let a = align(Species::Fifth, cf, cp);
    let mut report = RuleReport::new();
    let total: u32 = cp.iter().map(|n| eighths(n.duration)).sum();
    report.record("fills the cantus", total == cf.len() as u32 * EIGHTHS_PER_MEASURE);
    record_common(&mut report, &a);

    let mut kinds: Vec<u8> = cp.iter().map(|n| n.duration.value()).collect();
    kinds.sort_unstable();
    kinds.dedup();
    report.record("mixed durations", kinds.len() >= 2);
    report.record("standard durations", kinds.iter().all(|d| matches!(d, 1 | 2 | 4 | 8)));
    report.record("ties hold pitch", ties_hold_pitch(cp));

    let notes = cp.notes();
    let mut onset = 0;
    let mut on_downbeat = Vec::with_capacity(notes.len());
    for note in notes {
        on_downbeat.push(onset % EIGHTHS_PER_MEASURE == 0);
        onset += eighths(note.duration);
    }
    // Accented dissonances must be suspensions: tied in, stepping down out.
    let suspensions_ok = (0..notes.len())
        .filter(|&i| on_downbeat[i] && !is_consonant(a.intervals[i]))
        .all(|i| {
            i > 0
                && notes[i - 1].tied
                && a.upper
                    .get(i + 1)
                    .is_some_and(|&next| (1..=2).contains(&vertical(next, a.upper[i])))
        });
    report.record("suspensions resolve down", suspensions_ok);
    report.record("weak dissonances stepped", weak_dissonances_stepped(&a, |i| on_downbeat[i]));
    report
}

/// Stylistic checks the generator aims for but may relax.
pub fn voice_leading_report(species: Species, cf: &[Pitch], cp: &Voice) -> RuleReport {
    let a = align(species, cf, cp);
    let mut report = RuleReport::new();
    report.record("hidden parallels", hidden_parallels(&a.lower, &a.upper).is_empty());
    report.record("large leaps", large_leaps(&a.upper).is_empty());
    report.record("repeated intervals", repeated_interval_runs(&a.intervals).is_empty());
    report
}
