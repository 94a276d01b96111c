// Interval arithmetic and classification.
//
// Vertical intervals are measured from the cantus firmus up to the
// counterpoint, melodic intervals from one note to the next. Both are signed
// semitone counts; the classification helpers look only at the interval
// class (absolute value mod 12), so a tenth classifies like a third.
//
// The consonance set is the strict two-voice one: unison, thirds, perfect
// fifth, sixths and octave. The perfect fourth counts as a dissonance
// against the lowest voice.

use crate::voice::Pitch;

/// Widest allowed separation between the voices (a major tenth).
pub const MAX_SEPARATION: i16 = 16;

/// Widest allowed melodic leap (an octave).
pub const MAX_LEAP: i16 = 12;

/// Signed distance in semitones. Positive means `to` is higher.
pub fn semitones(from: Pitch, to: Pitch) -> i16 {
    to as i16 - from as i16
}

/// Interval class: absolute value mod 12.
pub fn class(semitones: i16) -> u8 {
    (semitones.unsigned_abs() % 12) as u8
}

/// Unison, fifth or octave.
pub fn is_perfect_consonance(semitones: i16) -> bool {
    matches!(class(semitones), 0 | 7)
}

/// Thirds and sixths.
pub fn is_imperfect_consonance(semitones: i16) -> bool {
    matches!(class(semitones), 3 | 4 | 8 | 9)
}

pub fn is_consonant(semitones: i16) -> bool {
    is_perfect_consonance(semitones) || is_imperfect_consonance(semitones)
}

pub fn is_dissonant(semitones: i16) -> bool {
    !is_consonant(semitones)
}

pub fn is_tritone(semitones: i16) -> bool {
    class(semitones) == 6
}

/// Minor or major seventh (and their compounds).
pub fn is_seventh(semitones: i16) -> bool {
    matches!(class(semitones), 10 | 11)
}

/// Melodic step: one or two semitones in either direction.
pub fn is_step(semitones: i16) -> bool {
    matches!(semitones.unsigned_abs(), 1 | 2)
}

/// Melodic leap: anything wider than a whole step.
pub fn is_leap(semitones: i16) -> bool {
    semitones.unsigned_abs() > 2
}

/// Relative motion of two voices moving from one sonority to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// Both voices move the same way and keep the same interval class.
    Parallel,
    /// Both voices move the same way into a different interval class.
    Similar,
    /// The voices move in opposite directions.
    Contrary,
    /// One voice holds while the other moves (or neither moves).
    Oblique,
}

/// Classify the motion from (`upper_from`, `lower_from`) to
/// (`upper_to`, `lower_to`).
pub fn motion(upper_from: Pitch, upper_to: Pitch, lower_from: Pitch, lower_to: Pitch) -> Motion {
    let upper = semitones(upper_from, upper_to).signum();
    let lower = semitones(lower_from, lower_to).signum();
    if upper == 0 || lower == 0 {
        Motion::Oblique
    } else if upper != lower {
        Motion::Contrary
    } else if class(semitones(lower_from, upper_from)) == class(semitones(lower_to, upper_to)) {
        Motion::Parallel
    } else {
        Motion::Similar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consonance_classes() {
        assert!(is_perfect_consonance(0));
        assert!(is_perfect_consonance(7));
        assert!(is_perfect_consonance(12));
        assert!(is_perfect_consonance(19));
        assert!(!is_perfect_consonance(4));

        for iv in [3, 4, 8, 9, 15, 16] {
            assert!(is_imperfect_consonance(iv), "{iv} should be imperfect");
        }
        // The fourth is dissonant against the bass.
        assert!(is_dissonant(5));
        assert!(is_dissonant(1));
        assert!(is_dissonant(6));
        assert!(is_dissonant(10));
        assert!(is_dissonant(14));
    }

    #[test]
    fn test_melodic_helpers() {
        assert!(is_step(1) && is_step(-2));
        assert!(!is_step(0) && !is_step(3));
        assert!(is_leap(-3) && !is_leap(2));
        assert!(is_tritone(-6) && is_tritone(18));
        assert!(is_seventh(10) && is_seventh(-11) && !is_seventh(12));
    }

    #[test]
    fn test_motion_types() {
        // C4/G4 -> D4/A4: both up, fifths both times.
        assert_eq!(motion(46, 48, 39, 41), Motion::Parallel);
        // Upper up, lower down.
        assert_eq!(motion(43, 46, 39, 37), Motion::Contrary);
        // Lower holds.
        assert_eq!(motion(43, 46, 39, 39), Motion::Oblique);
        // Both up, third into fifth.
        assert_eq!(motion(43, 48, 39, 41), Motion::Similar);
    }
}
