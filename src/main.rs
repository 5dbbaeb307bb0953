use clap::{Arg, Command};
use monkey::runner::{self, Mode};
use std::fs;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    monkey::init_tracing();

    let matches = Command::new("monkey")
        .about("A tree-walking interpreter for the Monkey programming language")
        .arg(
            Arg::new("file")
                .help("The script file to execute")
                .value_name("FILE")
                .index(1),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .help("Start in interactive REPL mode")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("tokens")
                .long("tokens")
                .help("Print the token stream instead of evaluating")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let mode = if matches.get_flag("tokens") {
        Mode::Tokens
    } else {
        Mode::Evaluate
    };

    match matches.get_one::<String>("file") {
        Some(file_path) if !matches.get_flag("interactive") => run_file(file_path, mode),
        _ => {
            monkey::start_repl(mode);
            ExitCode::SUCCESS
        }
    }
}

fn run_file(path: &str, mode: Mode) -> ExitCode {
    let path = Path::new(path);

    if !path.exists() {
        eprintln!("Error: File '{}' not found", path.display());
        return ExitCode::FAILURE;
    }

    match fs::read_to_string(path) {
        Ok(source) => {
            let filename = path.display().to_string();
            if runner::run(&source, Some(&filename), mode) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            ExitCode::FAILURE
        }
    }
}
