// Species Counterpoint Generator
//
// Generates a cantus firmus in a requested key and mode, then a counterpoint
// line above it in one of Fux's five species. Generation is randomized
// generate-and-test: the cantus firmus is drafted and checked against the
// melodic rules with bounded retries, and each counterpoint note is drawn
// from a candidate set narrowed by switchable rule filters.
//
// Architecture:
// - voice.rs: Pitch/Duration/Note/Voice value types on the 88-key index
// - interval.rs: Interval arithmetic, consonance classes, motion types
// - scale.rs: Key and mode resolution to a tonic plus diatonic pitch set
// - cantus.rs: Cantus firmus generation, melodic rule checks, skeleton fallback
// - context.rs: Per-note GenerationContext plus the Filter/RuleSet switches
// - pipeline.rs: ConstraintPipeline applying filters with dissonance look-ahead
//   and a safe-interval fallback
// - species/: The SpeciesStrategy trait and the five strategies
// - phrase.rs: Request → Phrase assembly and a text summary
// - midi.rs: Standard MIDI File export of a Phrase
// - config.rs: Tunable probabilities and weights (JSON-loadable)
// - error.rs: CounterpointError
//
// Every random choice goes through a caller-supplied `Rng`, so a seeded
// generator gives reproducible output.

pub mod cantus;
pub mod config;
pub mod context;
pub mod error;
pub mod interval;
pub mod midi;
pub mod phrase;
pub mod pipeline;
pub mod scale;
pub mod species;
pub mod voice;
