// Property sweeps over the generator.
//
// Every supported key, both modes, every accepted cantus length and all five
// species, over a handful of seeds each. Each generated phrase is handed to
// the oracle, which re-derives the rules independently of the generator.

use more_asserts::{assert_ge, assert_le};
use rand::SeedableRng;
use rand::rngs::StdRng;
use species_counterpoint::cantus::CantusSource;
use species_counterpoint::config::GenerationConfig;
use species_counterpoint::phrase::{Phrase, PhraseRequest, compose};
use species_counterpoint::scale::{Key, Mode, ScaleContext};
use species_counterpoint::species::Species;
use species_oracle::{validate_cantus, validate_species, voice_leading_report};

const SEEDS_PER_CASE: u64 = 3;

fn compose_seeded(key: Key, mode: Mode, length: usize, species: Species, seed: u64) -> Phrase {
    let request = PhraseRequest {
        key: key.symbol().to_string(),
        mode,
        length,
        species,
    };
    let mut rng = StdRng::seed_from_u64(seed);
    compose(&request, &GenerationConfig::default(), &mut rng).unwrap()
}

/// Calls `check` for every (key, mode, length, species, seed) combination.
fn sweep(mut check: impl FnMut(&Phrase, &str)) {
    for key in Key::ALL {
        for mode in [Mode::Major, Mode::Minor] {
            for length in 5..=12 {
                for species in Species::ALL {
                    for seed in 0..SEEDS_PER_CASE {
                        let phrase = compose_seeded(key, mode, length, species, seed);
                        let label = format!("{key} {mode} len {length} {species} seed {seed}");
                        check(&phrase, &label);
                    }
                }
            }
        }
    }
}

#[test]
fn test_same_seed_same_phrase() {
    for species in Species::ALL {
        let a = compose_seeded(Key::D, Mode::Minor, 9, species, 1234);
        let b = compose_seeded(Key::D, Mode::Minor, 9, species, 1234);
        assert_eq!(a, b);
    }
}

#[test]
fn test_cantus_firmus_properties() {
    sweep(|phrase, label| {
        let cf = phrase.cantus_firmus.pitches();
        let n = cf.len();
        // These hold for the skeleton fallback as well.
        assert_ge!(n, 5, "{label}");
        assert_le!(n, 12, "{label}");
        assert_eq!(cf[0], phrase.tonic, "{label}");
        assert_eq!(cf[n - 1], phrase.tonic, "{label}");
        assert_le!((i16::from(cf[n - 1]) - i16::from(cf[n - 2])).abs(), 2, "{label}");

        if let CantusSource::Generated { attempts } = phrase.cantus_source {
            assert_ge!(attempts, 1);
            let report = validate_cantus(&cf, phrase.tonic);
            assert!(report.is_valid(), "{label}: {cf:?}\n{report}");
            for w in cf.windows(5) {
                let rising = w.windows(2).all(|p| p[0] < p[1]);
                let falling = w.windows(2).all(|p| p[0] > p[1]);
                assert!(!rising && !falling, "{label}: five monotonic notes in {cf:?}");
            }
        }
    });
}

#[test]
fn test_counterpoint_satisfies_species_rules() {
    sweep(|phrase, label| {
        let cf = phrase.cantus_firmus.pitches();
        let report = validate_species(phrase.species, &cf, &phrase.counterpoint);
        assert!(
            report.is_valid(),
            "{label}: cf {cf:?} cp {:?}\n{report}",
            phrase.counterpoint.pitches()
        );
    });
}

#[test]
fn test_counterpoint_stays_in_key() {
    sweep(|phrase, label| {
        let scale = ScaleContext::new(phrase.key, phrase.mode);
        for note in &phrase.counterpoint {
            assert!(scale.contains(note.pitch), "{label}: {} not diatonic", note.pitch);
        }
    });
}

#[test]
fn test_voice_leading_report_covers_style_checks() {
    let phrase = compose_seeded(Key::C, Mode::Major, 8, Species::First, 7);
    let report = voice_leading_report(phrase.species, &phrase.cantus_firmus.pitches(), &phrase.counterpoint);
    let names: Vec<&str> = report.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["hidden parallels", "large leaps", "repeated intervals"]);
}

#[test]
fn test_skeleton_cantus_still_gets_counterpoint() {
    // No attempts allowed: straight to the skeleton melody.
    let config = GenerationConfig {
        cantus_max_attempts: 0,
        ..GenerationConfig::default()
    };
    for species in Species::ALL {
        let request = PhraseRequest {
            species,
            ..PhraseRequest::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let phrase = compose(&request, &config, &mut rng).unwrap();
        assert_eq!(phrase.cantus_source, CantusSource::Skeleton);
        // Degrees 1-3-5-6-5-3-2-1 from C4.
        assert_eq!(phrase.cantus_firmus.pitches(), vec![39, 43, 46, 48, 46, 43, 41, 39]);
        let report = validate_species(species, &phrase.cantus_firmus.pitches(), &phrase.counterpoint);
        assert!(report.is_valid(), "{species}\n{report}");
    }
}
