// Tunable generation parameters.
//
// Every probability and bound the generators consult lives in
// `GenerationConfig`, so behaviour can be adjusted from a JSON file without
// recompiling. The defaults reproduce the classic rule weights: 1000 cantus
// firmus attempts, 70% conjunct motion, a strong preference for ending on
// the octave. Fields missing from a JSON file keep their defaults.
//
// Probabilities outside [0, 1] are not rejected; they simply behave like 0
// or 1 wherever they are drawn against.

use crate::error::{CounterpointError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Relative weights for the opening interval above the first cantus note.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpeningWeights {
    pub unison: f64,
    pub fifth: f64,
    pub octave: f64,
}

impl Default for OpeningWeights {
    fn default() -> Self {
        OpeningWeights {
            unison: 0.0,
            fifth: 0.3,
            octave: 0.7,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Full cantus firmus attempts before falling back to the skeleton melody.
    pub cantus_max_attempts: u32,
    /// Chance that a cantus firmus step is restricted to conjunct motion.
    pub conjunct_probability: f64,
    /// Chance that the contrary-motion preference is applied to a note.
    pub contrary_motion_probability: f64,
    /// Chance of closing on the octave rather than the unison.
    pub final_octave_probability: f64,
    /// Weights for the first counterpoint note.
    pub opening_weights: OpeningWeights,
    /// Number of recent vertical intervals the pipeline remembers.
    pub interval_window: usize,
    /// Chance that a florid counterpoint tries a suspension where the
    /// rhythm allows one.
    pub suspension_probability: f64,
    /// How strongly florid rhythm choice favours busy patterns near the
    /// cantus climax. 0 disables the preference.
    pub climax_density_bias: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            cantus_max_attempts: 1000,
            conjunct_probability: 0.7,
            contrary_motion_probability: 0.6,
            final_octave_probability: 0.8,
            opening_weights: OpeningWeights::default(),
            interval_window: 4,
            suspension_probability: 0.5,
            climax_density_bias: 1.5,
        }
    }
}

impl GenerationConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(CounterpointError::InvalidConfig)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
