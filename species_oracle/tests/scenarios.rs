// Fixed request scenarios through the public `compose` entry point.

use rand::SeedableRng;
use rand::rngs::StdRng;
use species_counterpoint::config::GenerationConfig;
use species_counterpoint::error::CounterpointError;
use species_counterpoint::phrase::{PhraseRequest, compose};
use species_counterpoint::scale::Mode;
use species_counterpoint::species::Species;
use species_oracle::{aligned_cantus, validate_species};

#[test]
fn test_c_major_first_species_seed_42() {
    let request = PhraseRequest {
        key: "C".to_string(),
        mode: Mode::Major,
        length: 8,
        species: Species::First,
    };
    let mut rng = StdRng::seed_from_u64(42);
    let phrase = compose(&request, &GenerationConfig::default(), &mut rng).unwrap();

    let cf = phrase.cantus_firmus.pitches();
    let cp = phrase.counterpoint.pitches();
    assert_eq!(cf.len(), 8);
    assert_eq!(cf[0], 39);
    assert_eq!(cf[7], 39);
    assert_eq!(cp.len(), 8);
    let opening = i16::from(cp[0]) - i16::from(cf[0]);
    assert!(opening == 7 || opening == 12, "opening interval {opening}");
    assert!(validate_species(Species::First, &cf, &phrase.counterpoint).is_valid());
}

#[test]
fn test_unsupported_key_is_configuration_error() {
    let request = PhraseRequest {
        key: "H".to_string(),
        ..PhraseRequest::default()
    };
    let mut rng = StdRng::seed_from_u64(42);
    let err = compose(&request, &GenerationConfig::default(), &mut rng).unwrap_err();
    assert!(err.is_configuration());
    assert!(matches!(err, CounterpointError::UnsupportedKey { .. }));
}

#[test]
fn test_minor_mode_starts_on_minor_tonic() {
    let request = PhraseRequest {
        key: "A".to_string(),
        mode: Mode::Minor,
        length: 10,
        species: Species::Third,
    };
    let mut rng = StdRng::seed_from_u64(3);
    let phrase = compose(&request, &GenerationConfig::default(), &mut rng).unwrap();
    assert_eq!(phrase.tonic, 36);
    assert_eq!(phrase.cantus_firmus.pitches()[0], 36);
    assert_eq!(phrase.counterpoint.len(), 40);
}

#[test]
fn test_fourth_species_enters_after_half_rest() {
    let request = PhraseRequest {
        species: Species::Fourth,
        ..PhraseRequest::default()
    };
    let mut rng = StdRng::seed_from_u64(8);
    let phrase = compose(&request, &GenerationConfig::default(), &mut rng).unwrap();
    assert_eq!(phrase.counterpoint_offset(), 4);
    assert_eq!(phrase.counterpoint.len(), 15);
    let cf = phrase.cantus_firmus.pitches();
    let aligned = aligned_cantus(Species::Fourth, &cf, &phrase.counterpoint);
    assert_eq!(aligned[0], cf[0]);
    assert_eq!(aligned[1], cf[1]);
    assert_eq!(aligned[14], cf[7]);
}

#[test]
fn test_every_species_number_composes() {
    for n in 1..=5 {
        let species = Species::from_number(n).unwrap();
        let request = PhraseRequest {
            species,
            ..PhraseRequest::default()
        };
        let mut rng = StdRng::seed_from_u64(u64::from(n));
        let phrase = compose(&request, &GenerationConfig::default(), &mut rng).unwrap();
        assert_eq!(phrase.species.number(), n);
        if let Some(ratio) = species.notes_per_cantus() {
            assert_eq!(phrase.counterpoint.len(), phrase.cantus_firmus.len() * ratio);
        }
    }
    assert!(Species::from_number(6).unwrap_err().is_configuration());
}
