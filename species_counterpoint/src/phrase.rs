// Request → two-voice phrase assembly.
//
// `compose` is the library's front door: it resolves the key (the only step
// that can fail), generates the cantus firmus, then the counterpoint for the
// requested species, and bundles both voices with the metadata exporters
// need. The cantus firmus is the lower voice and the counterpoint the upper.

use crate::cantus::{CantusSource, generate_cantus_firmus};
use crate::config::GenerationConfig;
use crate::error::{CounterpointError, Result};
use crate::pipeline::ConstraintPipeline;
use crate::scale::{Key, Mode, ScaleContext};
use crate::species::{Species, generate_counterpoint};
use crate::voice::{EIGHTHS_PER_MEASURE, Pitch, Voice, pitch_name};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseRequest {
    pub key: String,
    pub mode: Mode,
    pub length: usize,
    pub species: Species,
}

impl Default for PhraseRequest {
    fn default() -> Self {
        PhraseRequest {
            key: "C".to_string(),
            mode: Mode::Major,
            length: 8,
            species: Species::First,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phrase {
    pub key: Key,
    pub mode: Mode,
    pub species: Species,
    pub tonic: Pitch,
    pub cantus_firmus: Voice,
    pub counterpoint: Voice,
    pub cantus_source: CantusSource,
}

impl Phrase {
    /// Eighth notes of rest before the counterpoint enters. Fourth species
    /// starts after a half rest.
    pub fn counterpoint_offset(&self) -> u32 {
        match self.species {
            Species::Fourth => EIGHTHS_PER_MEASURE / 2,
            _ => 0,
        }
    }

    /// Compact two-row text dump, one cell per eighth note: pitch names at
    /// attacks, '-' for holds, '~' after a tied note, '|' at barlines.
    pub fn summary(&self) -> String {
        let source = match self.cantus_source {
            CantusSource::Generated { attempts } => format!("cantus after {attempts} attempt(s)"),
            CantusSource::Skeleton => "skeleton cantus".to_string(),
        };
        let mut out = format!("{} in {} {}, {source}\n", self.species, self.key, self.mode);
        let rows = [
            ("Counterpoint", &self.counterpoint, self.counterpoint_offset()),
            ("Cantus", &self.cantus_firmus, 0),
        ];
        for (label, voice, offset) in rows {
            out.push_str(&format!("{label:>12}: "));
            for beat in 0..offset {
                if beat > 0 && beat % EIGHTHS_PER_MEASURE == 0 {
                    out.push('|');
                }
                out.push('.');
            }
            let mut beat = offset;
            for note in voice {
                for hold in 0..note.duration.eighths() {
                    if beat > 0 && beat % EIGHTHS_PER_MEASURE == 0 {
                        out.push('|');
                    }
                    if hold == 0 {
                        out.push_str(pitch_name(note.pitch));
                    } else {
                        out.push('-');
                    }
                    beat += 1;
                }
                if note.tied {
                    out.push('~');
                }
            }
            out.push('\n');
        }
        out
    }

    /// Pretty-printed JSON, as written by `--json`.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(CounterpointError::Serialize)
    }
}

/// Generate a cantus firmus and a counterpoint for `request`.
pub fn compose<R: Rng>(request: &PhraseRequest, config: &GenerationConfig, rng: &mut R) -> Result<Phrase> {
    let scale = ScaleContext::resolve(&request.key, request.mode)?;
    debug!(
        "composing {} in {} {} over {} notes (tonic {})",
        request.species,
        scale.key,
        scale.mode,
        request.length,
        pitch_name(scale.tonic)
    );

    let cantus = generate_cantus_firmus(&scale, request.length, config, rng);
    debug!("cantus firmus: {:?} ({:?})", cantus.notes.pitches(), cantus.source);

    let pipeline = ConstraintPipeline::new(&scale, config);
    let counterpoint = generate_counterpoint(request.species, &pipeline, &cantus.notes, rng);
    debug!("counterpoint: {} notes", counterpoint.len());

    Ok(Phrase {
        key: scale.key,
        mode: scale.mode,
        species: request.species,
        tonic: scale.tonic,
        cantus_firmus: cantus.notes,
        counterpoint,
        cantus_source: cantus.source,
    })
}
