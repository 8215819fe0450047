//! Symbolic tree automata - command line interface
//!
//! Reads automata in Timbuk format and applies one library operation:
//! union, intersection, simulation or language inclusion.

use clap::{ArgGroup, Parser};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use symta::{Context, NamedAutomaton, SymbolDictionary};

/// Symbols are encoded over this many Boolean variables.
const SYMBOL_BITS: u16 = 64;

#[derive(Parser, Debug)]
#[command(name = "symta")]
#[command(about = "Operations on tree automata in Timbuk format", long_about = None)]
#[command(group(
    ArgGroup::new("operation")
        .required(true)
        .args(["union", "intersection", "simulation", "inclusion"]),
))]
struct Args {
    /// Write the union of two automata
    #[arg(short = 'u', long)]
    union: bool,

    /// Write the product intersection of two automata
    #[arg(short = 'i', long)]
    intersection: bool,

    /// Print the maximal downward simulation of one automaton
    #[arg(short = 's', long)]
    simulation: bool,

    /// Decide language inclusion of the first automaton in the second
    /// (exit status 2 when it does not hold)
    #[arg(short = 'n', long)]
    inclusion: bool,

    /// Input files in Timbuk format
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Output file (stdout if not specified)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    let expected = if args.simulation { 1 } else { 2 };
    if args.files.len() != expected {
        eprintln!(
            "Error: the operation needs {} input file{}.",
            expected,
            if expected == 1 { "" } else { "s" }
        );
        process::exit(1);
    }

    let ctx = Context::new(SYMBOL_BITS);
    let dict = SymbolDictionary::new(SYMBOL_BITS);

    let mut automata = Vec::new();
    for path in &args.files {
        match NamedAutomaton::from_timbuk_file(&ctx, &dict, path) {
            Ok(automaton) => automata.push(automaton),
            Err(err) => {
                eprintln!("Error reading '{}': {}", path.display(), err);
                process::exit(1);
            }
        }
    }

    let (output, status) = match run(&args, &automata) {
        Ok(result) => result,
        Err(message) => {
            eprintln!("Error: {}", message);
            process::exit(1);
        }
    };

    if let Err(err) = write_output(&args.output, &output) {
        eprintln!("Error writing output: {}", err);
        process::exit(1);
    }
    process::exit(status);
}

fn run(args: &Args, automata: &[NamedAutomaton]) -> Result<(String, i32), String> {
    if args.union {
        let result = automata[0]
            .union(&automata[1])
            .map_err(|err| err.to_string())?;
        Ok((result.to_timbuk_string(), 0))
    } else if args.intersection {
        let result = automata[0]
            .intersection(&automata[1])
            .map_err(|err| err.to_string())?;
        Ok((result.to_timbuk_string(), 0))
    } else if args.simulation {
        let automaton = &automata[0];
        let sim = automaton
            .downward_simulation()
            .map_err(|err| err.to_string())?;
        let mut lines = String::new();
        for (p, q) in sim.pairs() {
            lines.push_str(&format!(
                "{} <= {}\n",
                automaton.label_of(p),
                automaton.label_of(q)
            ));
        }
        Ok((lines, 0))
    } else {
        let holds = automata[0]
            .inclusion_in(&automata[1])
            .map_err(|err| err.to_string())?;
        // The answer is also reported through the exit status, so scripts
        // can branch without parsing the output.
        if holds {
            Ok(("inclusion holds\n".to_string(), 0))
        } else {
            Ok(("inclusion does not hold\n".to_string(), 2))
        }
    }
}

fn write_output(target: &Option<PathBuf>, output: &str) -> std::io::Result<()> {
    match target {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(output.as_bytes())?;
            writer.flush()
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(output.as_bytes())
        }
    }
}
