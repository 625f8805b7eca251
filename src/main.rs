//! Z3 Emulator - CLI Entry Point
//!
//! Commands:
//! - `z3-emu run <tape>` - Run a program tape
//! - `z3-emu check <tape>` - Validate a tape without running it
//! - `z3-emu stats` - Relay counts of every netlist
//! - `z3-emu calc <op> <x> [y]` - One operation on the relay units
//! - `z3-emu wiring <description>` - Settle a JSON wiring description

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use z3::arith::Operation;
use z3::machine::{Config, FaultPolicy, Machine, ScriptedIo};
use z3::relay::WiringDescription;
use z3::tape::load_tape;

#[derive(Parser)]
#[command(name = "z3-emu")]
#[command(version = "0.1.0")]
#[command(about = "A relay-level emulator of Konrad Zuse's Z3 (1941)")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Relaxation passes allowed per settle
    #[arg(long, global = true)]
    iteration_cap: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a tape until it halts
    Run {
        /// Path to the tape file
        tape: String,
        /// Preload a memory cell, as ADDRESS=VALUE
        #[arg(short, long)]
        preload: Vec<String>,
        /// Value for the next `read` record
        #[arg(short, long, allow_hyphen_values = true)]
        input: Vec<f64>,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a tape and print it in canonical form
    Check {
        /// Path to the tape file
        tape: String,
        /// Report every error instead of the first
        #[arg(long)]
        all: bool,
    },
    /// Relay counts of every netlist
    Stats,
    /// Run one operation on its relay unit
    Calc {
        /// add, sub, mul, div or sqrt
        op: String,
        #[arg(allow_hyphen_values = true)]
        x: f64,
        #[arg(allow_hyphen_values = true, default_value = "0")]
        y: f64,
    },
    /// Build a netlist from a JSON wiring description and settle it
    Wiring {
        /// Path to the description
        description: String,
        /// Inputs to drive high
        #[arg(short, long)]
        drive: Vec<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref());
    if let Some(cap) = cli.iteration_cap {
        config.iteration_cap = cap;
    }

    match cli.command {
        Commands::Run {
            tape,
            preload,
            input,
            json,
        } => run_tape(config, &tape, &preload, input, json),
        Commands::Check { tape, all } => {
            if all {
                config.fault_policy = FaultPolicy::CollectAll;
            }
            check_tape(&config, &tape);
        }
        Commands::Stats => print_stats(config),
        Commands::Calc { op, x, y } => calc(config, &op, x, y),
        Commands::Wiring { description, drive } => settle_wiring(&config, &description, &drive),
    }
}

fn load_config(path: Option<&str>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };
    match Config::from_json_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config: {}", e);
            std::process::exit(1);
        }
    }
}

fn build_machine(config: Config) -> Machine {
    match Machine::new(config) {
        Ok(machine) => machine,
        Err(e) => {
            eprintln!("❌ Failed to build machine: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_tape(config: Config, path: &str, preload: &[String], input: Vec<f64>, json: bool) {
    let tape = match load_tape(path, config.fault_policy) {
        Ok(tape) => tape,
        Err(e) => {
            eprintln!("❌ Tape rejected: {}", e);
            std::process::exit(1);
        }
    };

    let mut machine = build_machine(config);
    for entry in preload {
        let parsed = entry
            .split_once('=')
            .and_then(|(a, v)| Some((a.trim().parse::<usize>().ok()?, v.trim().parse::<f64>().ok()?)));
        let Some((address, value)) = parsed else {
            eprintln!("❌ Bad preload `{}`, expected ADDRESS=VALUE", entry);
            std::process::exit(1);
        };
        if let Err(e) = machine.preload(address, value) {
            eprintln!("❌ Preload failed: {}", e);
            std::process::exit(1);
        }
    }

    let mut io = ScriptedIo::new(input);
    let report = machine.run(&tape, &mut io);

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Failed to write report: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        for value in &report.outputs {
            println!("{}", value);
        }
        println!();
        println!("━━━ Result ━━━");
        println!("Status: {}", report.status);
        println!("Cycles: {}", report.cycles);
        if let Some(fault) = &report.fault {
            println!("Fault:  {}", fault);
        }
    }

    if !report.status.is_normal() {
        std::process::exit(2);
    }
}

fn check_tape(config: &Config, path: &str) {
    match load_tape(path, config.fault_policy) {
        Ok(tape) => {
            println!("✓ {} records", tape.len());
            print!("{}", tape.to_text());
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
}

fn print_stats(config: Config) {
    let machine = build_machine(config);
    let stats = machine.stats();
    println!("━━━ Relay Census ━━━");
    println!("Relays:   {} ({} clocked)", stats.relays, stats.clocked);
    println!("Contacts: {}", stats.contacts);
    println!("Wires:    {}", stats.wires);
    println!("Nodes:    {}", stats.nodes);
}

fn calc(config: Config, op: &str, x: f64, y: f64) {
    let Some(op) = Operation::from_name(op) else {
        eprintln!("❌ Unknown operation `{}`", op);
        std::process::exit(1);
    };
    let mut machine = build_machine(config);
    match machine.evaluate(op, x, y) {
        Ok(value) => println!("{}", value),
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(2);
        }
    }
}

fn settle_wiring(config: &Config, path: &str, drive: &[String]) {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };
    let mut netlist = match WiringDescription::from_json(&text)
        .map_err(|e| e.to_string())
        .and_then(|d| d.build(config.iteration_cap).map_err(|e| e.to_string()))
    {
        Ok(netlist) => netlist,
        Err(e) => {
            eprintln!("❌ Bad wiring description: {}", e);
            std::process::exit(1);
        }
    };

    let settled = netlist
        .drive_named(drive.iter().map(|name| (name.as_str(), true)))
        .and_then(|()| netlist.settle());
    match settled {
        Ok(settled) => {
            println!("Settled after {} passes", settled.passes);
            for (name, level) in netlist.output_levels() {
                println!("  {} = {}", name, u8::from(level));
            }
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(2);
        }
    }
}
