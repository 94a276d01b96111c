// Species Counterpoint Generator: CLI entry point.
//
// Generates a cantus firmus plus a counterpoint line in one of Fux's five
// species, prints a compact text rendering (or JSON), and optionally writes
// a Standard MIDI File.
//
// Usage:
//   cargo run -p species_counterpoint -- [--key C] [--mode major|minor]
//     [--length N] [--species 1-5] [--seed N] [--config tuning.json]
//     [--json] [--midi phrase.mid]
//
// Set RUST_LOG=debug (or trace) to see generation decisions.

use clap::Parser;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use species_counterpoint::config::GenerationConfig;
use species_counterpoint::error::Result;
use species_counterpoint::midi::write_midi;
use species_counterpoint::phrase::{PhraseRequest, compose};
use species_counterpoint::scale::Mode;
use species_counterpoint::species::Species;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "generate", about = "Generate two-voice species counterpoint")]
struct Args {
    /// Key symbol, e.g. C, F#, Bb.
    #[arg(long, default_value = "C")]
    key: String,

    /// major or minor.
    #[arg(long, default_value = "major")]
    mode: String,

    /// Cantus firmus length in notes. Lengths outside 5..=12 use the
    /// skeleton melody.
    #[arg(long, default_value_t = 8)]
    length: usize,

    /// Species number, 1 through 5.
    #[arg(long, default_value_t = 1)]
    species: u8,

    /// RNG seed; omit for a random phrase.
    #[arg(long)]
    seed: Option<u64>,

    /// JSON file overriding generation probabilities and weights.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the phrase as JSON instead of the text summary.
    #[arg(long)]
    json: bool,

    /// Write the phrase as a MIDI file.
    #[arg(long)]
    midi: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let request = PhraseRequest {
        key: args.key.clone(),
        mode: args.mode.parse::<Mode>()?,
        length: args.length,
        species: Species::from_number(args.species)?,
    };

    println!("=== Species Counterpoint Generator ===");
    println!("Key: {} {}", request.key, request.mode);
    println!("Species: {}", request.species);
    println!("Cantus length: {}", request.length);
    if let Some(s) = args.seed {
        println!("Seed: {}", s);
    }
    println!();

    let mut rng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };

    println!("[1/3] Loading configuration...");
    let config = match &args.config {
        Some(path) => {
            let config = GenerationConfig::load(path)?;
            println!("  Loaded {}", path.display());
            config
        }
        None => {
            println!("  Using defaults.");
            GenerationConfig::default()
        }
    };

    println!("[2/3] Composing...");
    let phrase = compose(&request, &config, &mut rng)?;
    println!(
        "  {} cantus notes, {} counterpoint notes",
        phrase.cantus_firmus.len(),
        phrase.counterpoint.len()
    );

    println!("[3/3] Writing output...");
    if let Some(path) = &args.midi {
        write_midi(&phrase, path)?;
        println!("  Wrote {}", path.display());
    } else {
        println!("  No MIDI path given.");
    }
    info!("done");

    println!();
    if args.json {
        println!("{}", phrase.to_json()?);
    } else {
        print!("{}", phrase.summary());
    }
    Ok(())
}
