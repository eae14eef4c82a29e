//! Intcode interpreter and amplifier network runner.
//!
//! # Usage
//! ```text
//! intcode run <program> [OPTIONS]
//! intcode amplify <program> --phases <a,b,...> [OPTIONS]
//! intcode search <program> [--feedback] [OPTIONS]
//! ```
//!
//! # Options
//! - `--phases <list>`: Comma-separated phase settings for `amplify`
//! - `--feedback`: Search phases 5..=9 instead of 0..=4
//! - `--capacity <n>`: Buffer size of every link between amplifiers
//! - `--lenient`: Let writes through immediate-mode parameters land in memory
//! - `--patch <addr>=<value>`: Overwrite one program cell before running (repeatable)
//!
//! Limits are read from `INTCODE_MAX_STEPS` and `INTCODE_MAX_MEMORY`.

use intcode::network::amplifier::{AmplifierNetwork, NetworkConfig};
use intcode::network::link::DEFAULT_LINK_CAPACITY;
use intcode::network::search::{FEEDBACK_PHASES, SEQUENTIAL_PHASES, max_signal};
use intcode::utils::log;
use intcode::virtual_machine::io::{LineReader, LineWriter};
use intcode::virtual_machine::program::Program;
use intcode::virtual_machine::vm::{Limits, VM};
use intcode::{error, info};
use std::env;
use std::io;
use std::process;
use std::str::FromStr;

const MAX_STEPS_ENV: &str = "INTCODE_MAX_STEPS";
const MAX_MEMORY_ENV: &str = "INTCODE_MAX_MEMORY";

enum Command {
    Run,
    Amplify(Vec<i64>),
    Search { feedback: bool },
}

#[tokio::main]
async fn main() {
    log::init_from_env();

    let args: Vec<String> = env::args().collect();

    let help = args.len() > 1 && (args[1] == "--help" || args[1] == "-h");
    if args.len() < 3 || help {
        print_usage(&args[0]);
        process::exit(if help { 0 } else { 1 });
    }

    let subcommand = args[1].as_str();
    let program_path = &args[2];

    let mut phases: Option<Vec<i64>> = None;
    let mut feedback = false;
    let mut capacity = DEFAULT_LINK_CAPACITY;
    let mut limits = limits_from_env();
    let mut patches: Vec<(usize, i64)> = Vec::new();

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--phases" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("--phases requires an argument");
                    process::exit(1);
                }
                phases = Some(parse_phases(&args[i]).unwrap_or_else(|| {
                    eprintln!("Invalid phase list: {}", args[i]);
                    process::exit(1);
                }));
                i += 1;
            }
            "--capacity" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("--capacity requires an argument");
                    process::exit(1);
                }
                capacity = args[i].parse().unwrap_or_else(|_| {
                    eprintln!("Invalid capacity: {}", args[i]);
                    process::exit(1);
                });
                i += 1;
            }
            "--feedback" => {
                feedback = true;
                i += 1;
            }
            "--patch" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("--patch requires an argument");
                    process::exit(1);
                }
                patches.push(parse_patch(&args[i]).unwrap_or_else(|| {
                    eprintln!("Invalid patch (expected <addr>=<value>): {}", args[i]);
                    process::exit(1);
                }));
                i += 1;
            }
            "--lenient" => {
                limits.strict_writes = false;
                i += 1;
            }
            other => {
                eprintln!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    let command = match subcommand {
        "run" => Command::Run,
        "amplify" => match phases {
            Some(phases) => Command::Amplify(phases),
            None => {
                eprintln!("amplify requires --phases");
                process::exit(1);
            }
        },
        "search" => Command::Search { feedback },
        other => {
            eprintln!("Unknown command: {}\n", other);
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    let mut program = match Program::from_file(program_path) {
        Ok(program) => program,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };
    info!("loaded {} cells from {}", program.len(), program_path);
    for (position, value) in patches {
        program.patch(position, value);
    }

    let config = NetworkConfig { capacity, limits };
    match command {
        Command::Run => run(program, limits).await,
        Command::Amplify(phases) => {
            let network = AmplifierNetwork::with_config(program, config);
            match network.run(&phases).await {
                Ok(signal) => println!("{signal}"),
                Err(e) => {
                    error!("{e}");
                    process::exit(1);
                }
            }
        }
        Command::Search { feedback } => {
            let network = AmplifierNetwork::with_config(program, config);
            let values = if feedback {
                FEEDBACK_PHASES
            } else {
                SEQUENTIAL_PHASES
            };
            match max_signal(&network, &values).await {
                Ok(best) => println!("{} {}", best.signal, join_phases(&best.phases)),
                Err(e) => {
                    error!("{e}");
                    process::exit(1);
                }
            }
        }
    }
}

/// Runs a single interpreter on stdin and stdout.
async fn run(program: Program, limits: Limits) {
    let handle = tokio::task::spawn_blocking(move || {
        let mut vm = VM::with_limits(&program, limits);
        let mut input = LineReader::new(io::stdin().lock());
        let mut output = LineWriter::new(io::stdout().lock());
        vm.run(&mut input, &mut output)
    });

    match handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("{e}");
            process::exit(1);
        }
        Err(e) => {
            error!("interpreter task failed: {e}");
            process::exit(1);
        }
    }
}

/// Builds limits from the environment, ignoring unparsable values.
fn limits_from_env() -> Limits {
    Limits {
        max_steps: env_number(MAX_STEPS_ENV),
        max_memory: env_number(MAX_MEMORY_ENV),
        ..Limits::default()
    }
}

fn env_number<T: FromStr>(key: &str) -> Option<T> {
    let value = env::var(key).ok()?;
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            error!("ignoring {key}={value}: not a number");
            None
        }
    }
}

/// Parses `a,b,c` into phase settings.
fn parse_phases(list: &str) -> Option<Vec<i64>> {
    list.split(',')
        .map(|p| p.trim().parse().ok())
        .collect()
}

/// Parses `addr=value` into a cell patch.
fn parse_patch(spec: &str) -> Option<(usize, i64)> {
    let (address, value) = spec.split_once('=')?;
    Some((address.trim().parse().ok()?, value.trim().parse().ok()?))
}

fn join_phases(phases: &[i64]) -> String {
    phases
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

const USAGE: &str = "\
Intcode interpreter

USAGE:
    {program} run <program> [OPTIONS]
    {program} amplify <program> --phases <a,b,...> [OPTIONS]
    {program} search <program> [--feedback] [OPTIONS]

COMMANDS:
    run        Run one interpreter, reading integers from stdin and writing to stdout
    amplify    Run a ring of amplifiers, one per phase, and print the final signal
    search     Try every phase ordering and print the best signal and its phases

OPTIONS:
    --phases <list>    Comma-separated phase settings for amplify
    --feedback         Search phases 5..=9 instead of 0..=4
    --capacity <n>     Buffer size of every link (default 1024, minimum 2)
    --lenient          Let writes through immediate-mode parameters land in memory
    --patch <a>=<v>    Overwrite cell a with v before running (repeatable)
    -h, --help         Print this help message

ENVIRONMENT:
    INTCODE_LOG              Minimum log level: debug, info, warn or error
    INTCODE_LOG_TIMESTAMP    Set to 0 to drop the time of day from log lines
    INTCODE_MAX_STEPS        Fault an interpreter after this many instructions
    INTCODE_MAX_MEMORY       Fault an interpreter that grows past this many cells

EXAMPLES:
    echo 5 | {program} run diagnostics.txt
    {program} run gravity.txt --patch 1=12 --patch 2=2
    {program} amplify amp.txt --phases 9,8,7,6,5
    {program} search amp.txt --feedback
";

/// Prints usage information to stderr.
fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_from_list() {
        assert_eq!(parse_phases("9,8,7,6,5"), Some(vec![9, 8, 7, 6, 5]));
        assert_eq!(parse_phases(" 0, 1 ,2"), Some(vec![0, 1, 2]));
        assert_eq!(parse_phases("1,,2"), None);
        assert_eq!(parse_phases("a"), None);
    }

    #[test]
    fn patch_from_argument() {
        assert_eq!(parse_patch("1=12"), Some((1, 12)));
        assert_eq!(parse_patch("2 = -3"), Some((2, -3)));
        assert_eq!(parse_patch("-1=0"), None);
        assert_eq!(parse_patch("12"), None);
    }

    #[test]
    fn phases_round_trip_through_output_format() {
        assert_eq!(join_phases(&[1, 0, 4, 3, 2]), "1,0,4,3,2");
        assert_eq!(join_phases(&[]), "");
    }
}
