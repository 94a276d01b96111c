// Note and voice values exchanged between the generators and exporters.
//
// Pitches are indices on an 88-key keyboard (A0 = 0, C4 = 39, C8 = 87), so the
// difference between two pitches is an interval in semitones. Durations use
// the usual reciprocal notation: 1 = whole, 2 = half, 4 = quarter,
// 8 = eighth. A cantus firmus note is always a whole note; the counterpoint
// mixes durations only in the florid species.
//
// A `Voice` is an ordered note sequence. Its order is musical time; the
// onset helpers below place each note on the eighth-note grid the MIDI
// exporter writes.

use serde::{Deserialize, Serialize};

/// A key on the 88-key keyboard.
pub type Pitch = u8;

/// Highest representable pitch (C8).
pub const MAX_PITCH: Pitch = 87;

/// Offset from the 88-key index to the MIDI note number (A0 = MIDI 21).
pub const MIDI_OFFSET: u8 = 21;

/// Eighth-note units in one whole-note measure.
pub const EIGHTHS_PER_MEASURE: u32 = 8;

/// Rhythmic value of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Duration {
    Whole,
    Half,
    Quarter,
    Eighth,
}

impl Duration {
    pub const ALL: [Duration; 4] = [
        Duration::Whole,
        Duration::Half,
        Duration::Quarter,
        Duration::Eighth,
    ];

    /// Reciprocal value as written in notation (1, 2, 4 or 8).
    pub fn value(self) -> u8 {
        match self {
            Duration::Whole => 1,
            Duration::Half => 2,
            Duration::Quarter => 4,
            Duration::Eighth => 8,
        }
    }

    pub fn from_value(value: u8) -> Option<Self> {
        Duration::ALL.into_iter().find(|d| d.value() == value)
    }

    /// Length in eighth notes.
    pub fn eighths(self) -> u32 {
        EIGHTHS_PER_MEASURE / self.value() as u32
    }
}

/// A single note. `tied` marks a note held into the next one (suspension
/// preparations in the syncopated and florid species).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub pitch: Pitch,
    pub duration: Duration,
    #[serde(default)]
    pub tied: bool,
}

impl Note {
    pub fn new(pitch: Pitch, duration: Duration) -> Self {
        Note {
            pitch,
            duration,
            tied: false,
        }
    }

    pub fn tied(pitch: Pitch, duration: Duration) -> Self {
        Note {
            pitch,
            duration,
            tied: true,
        }
    }
}

/// An ordered, finished sequence of notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    notes: Vec<Note>,
}

impl Voice {
    pub fn new(notes: Vec<Note>) -> Self {
        Voice { notes }
    }

    /// A voice of whole notes, the shape of every cantus firmus.
    pub fn whole_notes(pitches: &[Pitch]) -> Self {
        pitches
            .iter()
            .map(|&p| Note::new(p, Duration::Whole))
            .collect()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter()
    }

    pub fn pitches(&self) -> Vec<Pitch> {
        self.notes.iter().map(|n| n.pitch).collect()
    }

    pub fn first(&self) -> Option<&Note> {
        self.notes.first()
    }

    pub fn last(&self) -> Option<&Note> {
        self.notes.last()
    }

    /// Onset of every note in eighth-note units from the start of the voice.
    pub fn onsets(&self) -> Vec<u32> {
        let mut at = 0;
        self.notes
            .iter()
            .map(|n| {
                let onset = at;
                at += n.duration.eighths();
                onset
            })
            .collect()
    }

    /// Total length in eighth-note units.
    pub fn total_eighths(&self) -> u32 {
        self.notes.iter().map(|n| n.duration.eighths()).sum()
    }
}

impl FromIterator<Note> for Voice {
    fn from_iter<I: IntoIterator<Item = Note>>(iter: I) -> Self {
        Voice {
            notes: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Voice {
    type Item = &'a Note;
    type IntoIter = std::slice::Iter<'a, Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}

/// Note name with octave for an 88-key index (e.g. "C4", "F#3").
pub fn pitch_name(pitch: Pitch) -> &'static str {
    const NAMES: &[&str] = &[
        "A0", "Bb0", "B0", "C1", "C#1", "D1", "Eb1", "E1", "F1", "F#1", "G1", "Ab1", "A1", "Bb1",
        "B1", "C2", "C#2", "D2", "Eb2", "E2", "F2", "F#2", "G2", "Ab2", "A2", "Bb2", "B2", "C3",
        "C#3", "D3", "Eb3", "E3", "F3", "F#3", "G3", "Ab3", "A3", "Bb3", "B3", "C4", "C#4", "D4",
        "Eb4", "E4", "F4", "F#4", "G4", "Ab4", "A4", "Bb4", "B4", "C5", "C#5", "D5", "Eb5", "E5",
        "F5", "F#5", "G5", "Ab5", "A5", "Bb5", "B5", "C6", "C#6", "D6", "Eb6", "E6", "F6", "F#6",
        "G6", "Ab6", "A6", "Bb6", "B6", "C7", "C#7", "D7", "Eb7", "E7", "F7", "F#7", "G7", "Ab7",
        "A7", "Bb7", "B7", "C8",
    ];
    NAMES.get(pitch as usize).copied().unwrap_or("??")
}
