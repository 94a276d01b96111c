// MIDI output from finished phrases.
//
// Converts a Phrase into a Standard MIDI File (SMF Format 1): a tempo track
// followed by one track per voice, counterpoint on channel 0 and cantus
// firmus on channel 1. Eighth notes are the time grid; tied notes of the
// same pitch sound as one sustained note.
//
// Uses the `midly` crate for MIDI writing. This is file export only.

use crate::error::Result;
use crate::phrase::Phrase;
use crate::voice::{MIDI_OFFSET, Pitch, Voice};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Ticks per eighth note (half a quarter note).
const TICKS_PER_EIGHTH: u32 = TICKS_PER_QUARTER as u32 / 2;

const TEMPO_BPM: u32 = 72;

/// General MIDI program: church organ.
const PROGRAM: u8 = 19;

const VELOCITY: u8 = 80;

/// Convert a Phrase to MIDI and write it to a file.
pub fn write_midi(phrase: &Phrase, path: &Path) -> Result<()> {
    let smf = phrase_to_smf(phrase);
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    std::fs::write(path, &buf)?;
    Ok(())
}

/// Convert a Phrase to an in-memory SMF.
pub fn phrase_to_smf(phrase: &Phrase) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    let tempo_microseconds = 60_000_000 / TEMPO_BPM;
    smf.tracks.push(vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ]);

    let voices = [
        ("Counterpoint", &phrase.counterpoint, phrase.counterpoint_offset()),
        ("Cantus firmus", &phrase.cantus_firmus, 0),
    ];
    for (channel, (name, voice, offset)) in voices.into_iter().enumerate() {
        let spans = sounding_notes(voice, offset);
        smf.tracks.push(voice_track(name, &spans, u4::new(channel as u8)));
    }
    smf
}

/// (pitch, start, end) in eighth notes, with ties merged.
fn sounding_notes(voice: &Voice, offset: u32) -> Vec<(Pitch, u32, u32)> {
    let mut spans: Vec<(Pitch, u32, u32)> = Vec::new();
    let mut tie_open = false;
    for (note, onset) in voice.iter().zip(voice.onsets()) {
        let start = offset + onset;
        let end = start + note.duration.eighths();
        match spans.last_mut() {
            Some(last) if tie_open && last.0 == note.pitch => last.2 = end,
            _ => spans.push((note.pitch, start, end)),
        }
        tie_open = note.tied;
    }
    spans
}

fn voice_track(name: &'static str, spans: &[(Pitch, u32, u32)], channel: u4) -> Track<'static> {
    let mut track: Track<'static> = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::new(PROGRAM),
                },
            },
        },
    ];

    let mut last_event_tick = 0;
    for &(pitch, start, end) in spans {
        let key = u7::new(pitch + MIDI_OFFSET);
        let start_tick = start * TICKS_PER_EIGHTH;
        let end_tick = end * TICKS_PER_EIGHTH;
        track.push(TrackEvent {
            delta: u28::new(start_tick - last_event_tick),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn {
                    key,
                    vel: u7::new(VELOCITY),
                },
            },
        });
        track.push(TrackEvent {
            delta: u28::new(end_tick - start_tick),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOff { key, vel: u7::new(0) },
            },
        });
        last_event_tick = end_tick;
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    track
}
