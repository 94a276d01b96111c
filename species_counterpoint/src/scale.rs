// Key and scale support.
//
// A request names one of twelve key symbols and a mode (major or natural
// minor). This module resolves that pair to a tonic pitch and the full list
// of diatonic pitches across the keyboard, which every generator draws its
// candidates from. Resolution is the only place a request can fail.
//
// Tonics sit around middle C (G3 up to F#4) so that a cantus firmus plus a
// counterpoint up to a tenth above it always stays on the keyboard. Minor
// keys share the tonic of the same-named major key, so A minor starts on A3.

use crate::error::{CounterpointError, Result};
use crate::voice::{MAX_PITCH, Pitch};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Major or natural minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// C D E F G A B C
    Major,
    /// A B C D E F G A
    Minor,
}

impl Mode {
    /// Semitone intervals from the tonic to each scale degree.
    pub fn intervals(self) -> [u8; 7] {
        match self {
            Mode::Major => [0, 2, 4, 5, 7, 9, 11],
            Mode::Minor => [0, 2, 3, 5, 7, 8, 10],
        }
    }

    /// In-scale pitch classes relative to the tonic (index 0 = tonic).
    pub fn pitch_classes(self) -> [bool; 12] {
        let mut pcs = [false; 12];
        for &interval in &self.intervals() {
            pcs[interval as usize] = true;
        }
        pcs
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Major => "major",
            Mode::Minor => "minor",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = CounterpointError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "major" => Ok(Mode::Major),
            "minor" => Ok(Mode::Minor),
            _ => Err(CounterpointError::UnknownMode(s.to_string())),
        }
    }
}

/// The supported key symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    C,
    G,
    D,
    A,
    E,
    B,
    #[serde(rename = "F#")]
    FSharp,
    F,
    #[serde(rename = "Bb")]
    BFlat,
    #[serde(rename = "Eb")]
    EFlat,
    #[serde(rename = "Ab")]
    AFlat,
    #[serde(rename = "Db")]
    DFlat,
}

impl Key {
    pub const ALL: [Key; 12] = [
        Key::C,
        Key::G,
        Key::D,
        Key::A,
        Key::E,
        Key::B,
        Key::FSharp,
        Key::F,
        Key::BFlat,
        Key::EFlat,
        Key::AFlat,
        Key::DFlat,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Key::C => "C",
            Key::G => "G",
            Key::D => "D",
            Key::A => "A",
            Key::E => "E",
            Key::B => "B",
            Key::FSharp => "F#",
            Key::F => "F",
            Key::BFlat => "Bb",
            Key::EFlat => "Eb",
            Key::AFlat => "Ab",
            Key::DFlat => "Db",
        }
    }

    /// Tonic on the 88-key index.
    pub fn tonic(self) -> Pitch {
        match self {
            Key::G => 34,      // G3
            Key::AFlat => 35,  // Ab3
            Key::A => 36,      // A3
            Key::BFlat => 37,  // Bb3
            Key::B => 38,      // B3
            Key::C => 39,      // C4
            Key::DFlat => 40,  // Db4
            Key::D => 41,      // D4
            Key::EFlat => 42,  // Eb4
            Key::E => 43,      // E4
            Key::F => 44,      // F4
            Key::FSharp => 45, // F#4
        }
    }

    /// Look up a key symbol. The mode is only carried into the error.
    pub fn parse(symbol: &str, mode: Mode) -> Result<Key> {
        let symbol = symbol.trim();
        Key::ALL
            .into_iter()
            .find(|k| k.symbol() == symbol)
            .ok_or_else(|| CounterpointError::UnsupportedKey {
                key: symbol.to_string(),
                mode,
            })
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Tonic plus every diatonic pitch on the keyboard for one key and mode.
/// Built once per request and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleContext {
    pub key: Key,
    pub mode: Mode,
    pub tonic: Pitch,
    degrees: Vec<Pitch>,
}

impl ScaleContext {
    pub fn new(key: Key, mode: Mode) -> Self {
        let tonic = key.tonic();
        let pcs = mode.pitch_classes();
        let degrees = (0..=MAX_PITCH)
            .filter(|&p| pcs[(p as i16 - tonic as i16).rem_euclid(12) as usize])
            .collect();
        ScaleContext {
            key,
            mode,
            tonic,
            degrees,
        }
    }

    /// Resolve a key symbol and mode, failing on unsupported keys.
    pub fn resolve(key: &str, mode: Mode) -> Result<Self> {
        Ok(ScaleContext::new(Key::parse(key, mode)?, mode))
    }

    /// All diatonic pitches in ascending order.
    pub fn degrees(&self) -> &[Pitch] {
        &self.degrees
    }

    pub fn contains(&self, pitch: Pitch) -> bool {
        self.degrees.binary_search(&pitch).is_ok()
    }

    /// Diatonic pitches in `low..=high`. Bounds may fall off the keyboard.
    pub fn pitches_in_range(&self, low: i16, high: i16) -> Vec<Pitch> {
        self.degrees
            .iter()
            .copied()
            .filter(|&p| (low..=high).contains(&(p as i16)))
            .collect()
    }

    /// The next diatonic pitch strictly above `pitch`.
    pub fn step_above(&self, pitch: Pitch) -> Option<Pitch> {
        let idx = self.degrees.partition_point(|&p| p <= pitch);
        self.degrees.get(idx).copied()
    }

    /// The next diatonic pitch strictly below `pitch`.
    pub fn step_below(&self, pitch: Pitch) -> Option<Pitch> {
        let idx = self.degrees.partition_point(|&p| p < pitch);
        idx.checked_sub(1).and_then(|i| self.degrees.get(i)).copied()
    }

    /// True when `a` and `b` are adjacent scale degrees.
    pub fn is_step(&self, a: Pitch, b: Pitch) -> bool {
        self.contains(a) && (self.step_above(a) == Some(b) || self.step_below(a) == Some(b))
    }

    /// Scale degree (0 = tonic .. 6) of a diatonic pitch.
    pub fn degree_of(&self, pitch: Pitch) -> Option<u8> {
        let pc = (pitch as i16 - self.tonic as i16).rem_euclid(12) as u8;
        self.mode.intervals().iter().position(|&iv| iv == pc).map(|d| d as u8)
    }

    /// The pitch `offset` scale degrees away from the tonic (negative goes
    /// below it).
    pub fn pitch_at_degree(&self, offset: i32) -> Option<Pitch> {
        let tonic_idx = self.degrees.binary_search(&self.tonic).ok()? as i32;
        let idx = usize::try_from(tonic_idx + offset).ok()?;
        self.degrees.get(idx).copied()
    }

    /// The diatonic pitch closest to `pitch`, preferring the lower one on a tie.
    pub fn nearest(&self, pitch: Pitch) -> Pitch {
        if self.contains(pitch) {
            return pitch;
        }
        match (self.step_below(pitch), self.step_above(pitch)) {
            (Some(lo), Some(hi)) if hi - pitch < pitch - lo => hi,
            (Some(lo), _) => lo,
            (None, Some(hi)) => hi,
            (None, None) => pitch,
        }
    }
}
