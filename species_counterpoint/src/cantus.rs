// Cantus firmus generation.
//
// The cantus firmus is the fixed whole-note melody the counterpoint is
// written against. It is produced by generate-and-test. Each attempt walks
// from the tonic toward a climax near the middle of the line and back down
// to the tonic. Each step draws from a small window of diatonic pitches,
// usually restricted to conjunct motion. The finished attempt is then
// checked against the melodic rules in `check_melody`.
//
// If the only problem is a leap into the final tonic, the penultimate note
// is corrected to the step above the tonic and the melody is checked again.
// After `cantus_max_attempts` failures (or immediately, for lengths the rules
// can never accept) the generator returns a deterministic skeleton melody
// instead, so generation always terminates with a usable line.

use crate::config::GenerationConfig;
use crate::interval;
use crate::scale::ScaleContext;
use crate::voice::{Pitch, Voice};
use log::{debug, trace, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Accepted cantus firmus lengths.
pub const LENGTH_RANGE: RangeInclusive<usize> = 5..=12;

/// Widest allowed ambitus in semitones (a major tenth).
pub const MAX_RANGE: i16 = 16;

/// Longest run of melodic motions in one direction (four notes).
pub const MAX_MONOTONIC_MOTIONS: usize = 3;

/// Longest run of consecutive leaps.
pub const MAX_CONSECUTIVE_LEAPS: usize = 2;

/// Scale degrees (0 = tonic) of the fallback melody: 1-3-5-6-5-3-2-1.
const SKELETON: [i32; 8] = [0, 2, 4, 5, 4, 2, 1, 0];

/// How the returned melody was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CantusSource {
    /// Accepted by the melodic rules after this many attempts.
    Generated { attempts: u32 },
    /// The attempt budget ran out and the skeleton melody was used.
    Skeleton,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CantusFirmus {
    pub notes: Voice,
    pub source: CantusSource,
}

/// The first melodic rule a candidate cantus firmus breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    Length(usize),
    NotTonicBound,
    RangeTooWide(i16),
    ClimaxNotUnique,
    ClimaxOutOfPlace(usize),
    MonotonicRun(usize),
    ConsecutiveLeaps(usize),
    DissonantLeap(usize),
    LeapTooWide(usize),
    OutlinedTritone(usize, usize),
    /// Every other rule holds but the final tonic is approached by leap.
    PenultimateLeap,
}

pub fn generate_cantus_firmus(
    scale: &ScaleContext,
    length: usize,
    config: &GenerationConfig,
    rng: &mut impl Rng,
) -> CantusFirmus {
    if LENGTH_RANGE.contains(&length) {
        for attempt in 1..=config.cantus_max_attempts {
            let mut melody = draft_melody(scale, length, config, rng);
            match check_melody(&melody, scale.tonic) {
                Ok(()) => return accepted(melody, attempt),
                Err(Violation::PenultimateLeap) => {
                    correct_penultimate(scale, &mut melody);
                    match check_melody(&melody, scale.tonic) {
                        Ok(()) => return accepted(melody, attempt),
                        Err(v) => trace!("attempt {attempt}: corrected cadence broke {v:?}"),
                    }
                }
                Err(v) => trace!("attempt {attempt}: rejected ({v:?})"),
            }
        }
        warn!(
            "no cantus firmus of length {length} accepted after {} attempts; using skeleton",
            config.cantus_max_attempts
        );
    } else {
        warn!("cantus firmus length {length} is outside {LENGTH_RANGE:?}; using skeleton");
    }

    CantusFirmus {
        notes: Voice::whole_notes(&skeleton(scale, length)),
        source: CantusSource::Skeleton,
    }
}

fn accepted(melody: Vec<Pitch>, attempts: u32) -> CantusFirmus {
    debug!("cantus firmus accepted after {attempts} attempt(s)");
    CantusFirmus {
        notes: Voice::whole_notes(&melody),
        source: CantusSource::Generated { attempts },
    }
}

/// One random walk tonic → climax → tonic.
fn draft_melody(
    scale: &ScaleContext,
    length: usize,
    config: &GenerationConfig,
    rng: &mut impl Rng,
) -> Vec<Pitch> {
    // The forced ascent stops short of a monotonic run.
    let ascent = ((length - 1) / 2).min(MAX_MONOTONIC_MOTIONS + 1);
    let mut melody = vec![scale.tonic];

    for i in 1..length - 1 {
        let last = melody[melody.len() - 1];
        let window = if i < ascent { 1..=5 } else { -5..=2 };
        let mut pool: Vec<Pitch> = scale
            .pitches_in_range(last as i16 + window.start(), last as i16 + window.end())
            .into_iter()
            .filter(|&p| !interval::is_tritone(interval::semitones(last, p)))
            .collect();

        if rng.random::<f64>() < config.conjunct_probability {
            let steps: Vec<Pitch> = pool
                .iter()
                .copied()
                .filter(|&p| scale.is_step(last, p))
                .collect();
            if !steps.is_empty() {
                pool = steps;
            }
        }
        if pool.is_empty() {
            pool = scale.pitches_in_range(scale.tonic as i16, scale.tonic as i16 + 11);
        }

        let next = if pool.is_empty() {
            scale.tonic
        } else {
            pool[rng.random_range(0..pool.len())]
        };
        melody.push(next);
    }

    melody.push(scale.tonic);
    melody
}

/// Check a melody against the cantus firmus rules. The penultimate-step rule
/// is tested last, so `PenultimateLeap` means everything else passed.
pub fn check_melody(melody: &[Pitch], tonic: Pitch) -> Result<(), Violation> {
    let n = melody.len();
    if !LENGTH_RANGE.contains(&n) {
        return Err(Violation::Length(n));
    }
    if melody[0] != tonic || melody[n - 1] != tonic {
        return Err(Violation::NotTonicBound);
    }

    let (mut low, mut high) = (melody[0], melody[0]);
    for &p in melody {
        low = low.min(p);
        high = high.max(p);
    }
    let range = interval::semitones(low, high);
    if range > MAX_RANGE {
        return Err(Violation::RangeTooWide(range));
    }

    let peaks: Vec<usize> = (0..n).filter(|&i| melody[i] == high).collect();
    if peaks.len() != 1 {
        return Err(Violation::ClimaxNotUnique);
    }
    if !(n / 4..=3 * n / 4).contains(&peaks[0]) {
        return Err(Violation::ClimaxOutOfPlace(peaks[0]));
    }

    let moves: Vec<i16> = melody
        .windows(2)
        .map(|w| interval::semitones(w[0], w[1]))
        .collect();

    let mut run = 0;
    let mut leaps = 0;
    for (i, &mv) in moves.iter().enumerate() {
        run = match i.checked_sub(1).map(|j| moves[j].signum()) {
            Some(prev) if prev == mv.signum() && mv != 0 => run + 1,
            _ if mv != 0 => 1,
            _ => 0,
        };
        if run > MAX_MONOTONIC_MOTIONS {
            return Err(Violation::MonotonicRun(i));
        }

        leaps = if interval::is_leap(mv) { leaps + 1 } else { 0 };
        if leaps > MAX_CONSECUTIVE_LEAPS {
            return Err(Violation::ConsecutiveLeaps(i));
        }

        if interval::is_tritone(mv) || interval::is_seventh(mv) {
            return Err(Violation::DissonantLeap(i));
        }
        if mv.abs() > interval::MAX_LEAP {
            return Err(Violation::LeapTooWide(i));
        }
    }

    let turns: Vec<usize> = (0..n)
        .filter(|&i| {
            i == 0
                || i == n - 1
                || (melody[i] > melody[i - 1] && melody[i] > melody[i + 1])
                || (melody[i] < melody[i - 1] && melody[i] < melody[i + 1])
        })
        .collect();
    for (a, &i) in turns.iter().enumerate() {
        for &j in &turns[a + 1..] {
            if j >= i + 2 && interval::is_tritone(interval::semitones(melody[i], melody[j])) {
                return Err(Violation::OutlinedTritone(i, j));
            }
        }
    }

    if !interval::is_step(moves[n - 2]) {
        return Err(Violation::PenultimateLeap);
    }
    Ok(())
}

/// Replace the penultimate note with the nearest step around the tonic,
/// preferring the whole step above.
/// Lines of two notes or fewer are left alone: their penultimate note is
/// the opening tonic.
fn correct_penultimate(scale: &ScaleContext, melody: &mut [Pitch]) {
    let n = melody.len();
    if n < 3 {
        return;
    }
    let tonic = scale.tonic as i16;
    let replacement = [tonic + 2, tonic - 2, tonic + 1, tonic - 1]
        .into_iter()
        .filter_map(|p| Pitch::try_from(p).ok())
        .find(|&p| scale.contains(p));
    if let Some(p) = replacement {
        melody[n - 2] = p;
    }
}

/// The fallback melody: the skeleton degrees cycled to `length`, closed on
/// the tonic and with a stepwise approach to it.
fn skeleton(scale: &ScaleContext, length: usize) -> Vec<Pitch> {
    let mut melody: Vec<Pitch> = (0..length)
        .map(|i| scale.pitch_at_degree(SKELETON[i % SKELETON.len()]).unwrap_or(scale.tonic))
        .collect();
    if let Some(last) = melody.last_mut() {
        *last = scale.tonic;
    }
    if melody.len() > 2 && !scale.is_step(melody[length - 2], scale.tonic) {
        correct_penultimate(scale, &mut melody);
    }
    melody
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::{Key, Mode};
    use more_asserts::{assert_ge, assert_le};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn c_major() -> ScaleContext {
        ScaleContext::new(Key::C, Mode::Major)
    }

    #[test]
    fn test_generated_lengths_and_tonic() {
        let scale = c_major();
        let config = GenerationConfig::default();
        for length in LENGTH_RANGE {
            let mut rng = StdRng::seed_from_u64(length as u64);
            let cf = generate_cantus_firmus(&scale, length, &config, &mut rng);
            let pitches = cf.notes.pitches();
            assert_eq!(pitches.len(), length);
            assert_eq!(pitches[0], scale.tonic);
            assert_eq!(pitches[length - 1], scale.tonic);
        }
    }

    #[test]
    fn test_generated_melodies_pass_rules() {
        let config = GenerationConfig::default();
        for key in Key::ALL {
            for mode in [Mode::Major, Mode::Minor] {
                let scale = ScaleContext::new(key, mode);
                for seed in 0..8 {
                    let mut rng = StdRng::seed_from_u64(seed);
                    let length = 5 + (seed as usize % 8);
                    let cf = generate_cantus_firmus(&scale, length, &config, &mut rng);
                    assert!(matches!(cf.source, CantusSource::Generated { .. }));
                    let pitches = cf.notes.pitches();
                    assert_eq!(check_melody(&pitches, scale.tonic), Ok(()), "{key} {mode} {pitches:?}");
                    assert!(pitches.iter().all(|&p| scale.contains(p)));
                }
            }
        }
    }

    #[test]
    fn test_skeleton_keeps_cadence_and_climax() {
        for mode in [Mode::Major, Mode::Minor] {
            let scale = ScaleContext::new(Key::D, mode);
            for length in LENGTH_RANGE {
                let melody = skeleton(&scale, length);
                assert_eq!(melody.len(), length);
                assert_eq!(melody[0], scale.tonic);
                assert_eq!(melody[length - 1], scale.tonic);
                assert!(interval::is_step(interval::semitones(melody[length - 2], scale.tonic)));

                let high = *melody.iter().max().unwrap();
                assert_eq!(melody.iter().filter(|&&p| p == high).count(), 1);
                let peak = melody.iter().position(|&p| p == high).unwrap();
                assert_ge!(peak, length / 4);
                assert_le!(peak, 3 * length / 4);
            }
        }
        // The fixed shape descends 6-5-3-2-1, one motion past the limit for
        // generated melodies; everything checked before the motion loop holds.
        let scale = c_major();
        assert_eq!(
            check_melody(&skeleton(&scale, 8), scale.tonic),
            Err(Violation::MonotonicRun(6))
        );
    }

    #[test]
    fn test_short_skeleton_keeps_tonic_opening() {
        let scale = c_major();
        assert_eq!(skeleton(&scale, 2), vec![39, 39]);
        assert_eq!(skeleton(&scale, 3), vec![39, 41, 39]);

        let mut pair = vec![39, 39];
        correct_penultimate(&scale, &mut pair);
        assert_eq!(pair, vec![39, 39]);
    }

    #[test]
    fn test_skeleton_shape() {
        let scale = c_major();
        // C E G A G E D C
        assert_eq!(skeleton(&scale, 8), vec![39, 43, 46, 48, 46, 43, 41, 39]);
        // Cycled and closed: ... C E G -> C, with D before the final tonic.
        let long = skeleton(&scale, 11);
        assert_eq!(long[10], 39);
        assert_eq!(long[9], 41);
    }

    #[test]
    fn test_zero_attempts_falls_back() {
        let scale = c_major();
        let config = GenerationConfig {
            cantus_max_attempts: 0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let cf = generate_cantus_firmus(&scale, 8, &config, &mut rng);
        assert_eq!(cf.source, CantusSource::Skeleton);
        assert_eq!(cf.notes.pitches(), skeleton(&scale, 8));
    }

    #[test]
    fn test_out_of_range_lengths_use_skeleton() {
        let scale = c_major();
        let config = GenerationConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        for length in [0, 1, 3, 16] {
            let cf = generate_cantus_firmus(&scale, length, &config, &mut rng);
            assert_eq!(cf.source, CantusSource::Skeleton);
            assert_eq!(cf.notes.len(), length);
        }
        let single = generate_cantus_firmus(&scale, 1, &config, &mut rng);
        assert_eq!(single.notes.pitches(), vec![scale.tonic]);
    }

    #[test]
    fn test_penultimate_correction_is_rechecked() {
        let scale = c_major();
        // C E G A G E C: leap G..E..C into the final; correction gives D.
        let mut melody = vec![39, 43, 46, 48, 46, 43, 39];
        assert_eq!(check_melody(&melody, 39), Err(Violation::PenultimateLeap));
        correct_penultimate(&scale, &mut melody);
        assert_eq!(melody[melody.len() - 2], 41);
        assert_eq!(check_melody(&melody, 39), Ok(()));

        // Climax on D: the correction would duplicate the climax, and the
        // recheck catches it.
        let mut flat = vec![39, 41, 39, 38, 39, 36, 39];
        assert_eq!(check_melody(&flat, 39), Err(Violation::PenultimateLeap));
        correct_penultimate(&scale, &mut flat);
        assert_eq!(check_melody(&flat, 39), Err(Violation::ClimaxNotUnique));

        // Climax E5 a sixth above G4: replacing G4 with D4 turns that
        // approach into a leap of a major ninth.
        let mut high = vec![39, 44, 43, 48, 53, 55, 46, 39];
        assert_eq!(check_melody(&high, 39), Err(Violation::PenultimateLeap));
        correct_penultimate(&scale, &mut high);
        assert_eq!(high[6], 41);
        assert_eq!(check_melody(&high, 39), Err(Violation::LeapTooWide(5)));
    }

    #[test]
    fn test_no_generated_melody_has_five_monotonic_notes() {
        let config = GenerationConfig::default();
        for key in Key::ALL {
            for mode in [Mode::Major, Mode::Minor] {
                let scale = ScaleContext::new(key, mode);
                for length in LENGTH_RANGE {
                    for seed in 0..10 {
                        let mut rng = StdRng::seed_from_u64(seed * 31 + length as u64);
                        let cf = generate_cantus_firmus(&scale, length, &config, &mut rng);
                        assert!(matches!(cf.source, CantusSource::Generated { .. }));
                        let pitches = cf.notes.pitches();
                        let monotonic = pitches.windows(5).any(|w| {
                            w.windows(2).all(|p| p[0] < p[1]) || w.windows(2).all(|p| p[0] > p[1])
                        });
                        assert!(!monotonic, "{key} {mode} {pitches:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_rule_violations() {
        assert_eq!(check_melody(&[39, 41, 39], 39), Err(Violation::Length(3)));
        assert_eq!(
            check_melody(&[39, 41, 43, 41, 41], 39),
            Err(Violation::NotTonicBound)
        );
        // Range of a twelfth.
        assert_eq!(
            check_melody(&[39, 46, 53, 58, 51, 46, 41, 39], 39),
            Err(Violation::RangeTooWide(19))
        );
        // Two peaks.
        assert_eq!(
            check_melody(&[39, 43, 46, 43, 46, 41, 39], 39),
            Err(Violation::ClimaxNotUnique)
        );
        // Four rising motions in a row: five notes.
        assert_eq!(
            check_melody(&[39, 41, 43, 44, 46, 48, 46, 44, 43, 41, 39], 39),
            Err(Violation::MonotonicRun(3))
        );
        // Climax on the second note of eight.
        assert_eq!(
            check_melody(&[39, 46, 44, 43, 41, 43, 41, 39], 39),
            Err(Violation::ClimaxOutOfPlace(1))
        );
        // Three leaps in a row: up a third, down a third, up a fourth.
        assert_eq!(
            check_melody(&[39, 43, 39, 44, 41, 43, 41, 39], 39),
            Err(Violation::ConsecutiveLeaps(2))
        );
        // A minor tenth up from Bb3.
        assert_eq!(
            check_melody(&[39, 37, 52, 50, 48, 46, 41, 39], 39),
            Err(Violation::LeapTooWide(1))
        );
        // B3 and F4 are both turning points.
        assert_eq!(
            check_melody(&[39, 38, 41, 43, 44, 43, 41, 39], 39),
            Err(Violation::OutlinedTritone(1, 4))
        );
        // F up to B is a melodic tritone.
        assert_eq!(
            check_melody(&[39, 41, 44, 50, 48, 43, 41, 39], 39),
            Err(Violation::DissonantLeap(2))
        );
    }

    #[test]
    fn test_climax_placement_property() {
        let scale = ScaleContext::new(Key::G, Mode::Minor);
        let config = GenerationConfig::default();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let length = 5 + (seed as usize % 8);
            let pitches = generate_cantus_firmus(&scale, length, &config, &mut rng)
                .notes
                .pitches();
            let high = *pitches.iter().max().unwrap();
            let low = *pitches.iter().min().unwrap();
            assert_le!(high - low, 16);
            let peak = pitches.iter().position(|&p| p == high).unwrap();
            assert_ge!(peak, length / 4);
            assert_le!(peak, 3 * length / 4);
        }
    }
}
