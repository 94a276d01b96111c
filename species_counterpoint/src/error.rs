// Error type for the counterpoint generator.
//
// Only configuration problems are fatal: an unknown key, mode or species, or
// a tuning file that does not parse. Generation itself never fails. An
// exhausted cantus firmus search falls back to a skeleton melody (cantus.rs)
// and an emptied candidate set falls back to a safe interval (pipeline.rs).
//
// I/O errors come only from the MIDI exporter and config file loading, and
// serialization errors only from JSON output.

use crate::scale::Mode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CounterpointError {
    #[error("unsupported key '{key}' in {mode} mode")]
    UnsupportedKey { key: String, mode: Mode },

    #[error("unknown mode '{0}' (expected major or minor)")]
    UnknownMode(String),

    #[error("species must be between 1 and 5, got {0}")]
    UnknownSpecies(u8),

    #[error("invalid generation config: {0}")]
    InvalidConfig(#[source] serde_json::Error),

    #[error("could not serialize phrase: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl CounterpointError {
    /// True for errors caused by the request or its configuration rather
    /// than by the environment.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, CounterpointError::Io(_) | CounterpointError::Serialize(_))
    }
}

pub type Result<T> = std::result::Result<T, CounterpointError>;
