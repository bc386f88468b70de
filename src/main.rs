//! Command-line driver: compiles a definition file, then simulates it in
//! one shot or through an interactive command loop.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use logsim::device::Signal;
use logsim::simulator::{SimulationError, Simulator};

const EXIT_COMPILE_ERRORS: u8 = 1;
const EXIT_OSCILLATION: u8 = 2;

/// Compile a logic circuit definition file and simulate it.
#[derive(Parser)]
#[command(name = "logsim", version, about)]
struct Cli {
    /// Path to the circuit definition file.
    definition: PathBuf,

    /// Simulate this many cycles, print the recorded traces and exit;
    /// without this an interactive command loop starts.
    #[arg(short, long)]
    cycles: Option<usize>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {:#}", error);
            ExitCode::from(EXIT_COMPILE_ERRORS)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let source = fs::read_to_string(&cli.definition)
        .with_context(|| format!("cannot read {}", cli.definition.display()))?;
    let mut sim = Simulator::new();
    if !sim.load(&source) {
        if sim.errors().error_count() > 0 {
            eprint!("{}", sim.error_report());
        }
        let dangling = sim.unconnected_signals();
        if !dangling.is_empty() {
            eprintln!(
                "Network is not fully connected; inputs without a source: {}",
                dangling.join(", ")
            );
        }
        return Ok(ExitCode::from(EXIT_COMPILE_ERRORS));
    }
    match cli.cycles {
        Some(cycles) => batch(&mut sim, cycles),
        None => interactive(&mut sim),
    }
}

fn batch(sim: &mut Simulator, cycles: usize) -> Result<ExitCode> {
    match sim.run(cycles) {
        Ok(()) => {
            println!(
                "{}",
                sim.monitors().display_signals(sim.devices(), sim.names())
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(error @ SimulationError::Oscillation { .. }) => {
            eprintln!("Error: {}", error);
            Ok(ExitCode::from(EXIT_OSCILLATION))
        }
    }
}

const HELP: &str = "\
Commands:
  r N        run the simulation from cold start for N cycles
  c N        continue the simulation for N further cycles
  s NAME B   set switch NAME to binary level B
  m SIG      start monitoring SIG (NAME or NAME.PORT)
  z SIG      stop monitoring SIG
  t          print the recorded traces
  l          list monitored and unmonitored signals
  h          print this help
  q          quit";

fn interactive(sim: &mut Simulator) -> Result<ExitCode> {
    println!("Definition file compiled.\n{}", HELP);
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(ExitCode::SUCCESS);
        }
        let mut words = line.split_whitespace();
        match words.next() {
            None => {}
            Some("h") => println!("{}", HELP),
            Some("q") => return Ok(ExitCode::SUCCESS),
            Some("r") => match parse_count(words.next()) {
                Some(cycles) => {
                    if let Err(error) = sim.run(cycles) {
                        eprintln!("Error: {}", error);
                        return Ok(ExitCode::from(EXIT_OSCILLATION));
                    }
                    println!("Ran {} cycles.", cycles);
                }
                None => println!("Usage: r N"),
            },
            Some("c") => match parse_count(words.next()) {
                Some(cycles) => {
                    if let Err(error) = sim.continue_run(cycles) {
                        eprintln!("Error: {}", error);
                        return Ok(ExitCode::from(EXIT_OSCILLATION));
                    }
                    println!(
                        "Continued for {} cycles ({} in total).",
                        cycles,
                        sim.cycles_completed()
                    );
                }
                None => println!("Usage: c N"),
            },
            Some("s") => match (words.next(), words.next()) {
                (Some(name), Some(bit @ ("0" | "1"))) => {
                    let level = if bit == "1" { Signal::High } else { Signal::Low };
                    if sim.set_switch(name, level) {
                        println!("Switch {} set to {}.", name, bit);
                    } else {
                        println!("No switch named {}.", name);
                    }
                }
                _ => println!("Usage: s NAME 0|1"),
            },
            Some("m") => match words.next() {
                Some(signal) => match sim.add_monitor(signal) {
                    Ok(()) => println!("Monitoring {}.", signal),
                    Err(code) => println!(
                        "{}",
                        sim.errors().message(code).unwrap_or("Unknown error")
                    ),
                },
                None => println!("Usage: m SIG"),
            },
            Some("z") => match words.next() {
                Some(signal) => {
                    if sim.remove_monitor(signal) {
                        println!("Stopped monitoring {}.", signal);
                    } else {
                        println!("{} is not monitored.", signal);
                    }
                }
                None => println!("Usage: z SIG"),
            },
            Some("t") => println!(
                "{}",
                sim.monitors().display_signals(sim.devices(), sim.names())
            ),
            Some("l") => {
                let (monitored, unmonitored) =
                    sim.monitors().get_signal_names(sim.devices(), sim.names());
                println!("Monitored:   {}", monitored.join(", "));
                println!("Unmonitored: {}", unmonitored.join(", "));
            }
            Some(other) => println!("Unknown command {:?}; h for help.", other),
        }
    }
}

fn parse_count(word: Option<&str>) -> Option<usize> {
    word.and_then(|word| word.parse().ok())
}
