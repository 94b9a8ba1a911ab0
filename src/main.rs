use clap::{Arg, ArgAction, Command};
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tforth::runner;
use tforth::Vocabulary;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> ExitCode {
    let matches = Command::new("tforth")
        .about("A tree-walking interpreter for a small Forth dialect")
        .arg(
            Arg::new("file")
                .help("The program to execute")
                .value_name("FILE")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("vocabulary")
                .long("vocabulary")
                .value_name("TOML")
                .help("Override the keyword, operator and block-ender lists"),
        )
        .arg(
            Arg::new("tokens")
                .long("tokens")
                .help("Print the lexeme stream before running")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("ast")
                .long("ast")
                .help("Print the parsed program before running")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    // RUST_LOG controls the level; default to warnings only
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let vocabulary = match matches.get_one::<String>("vocabulary") {
        Some(path) => match Vocabulary::load(Path::new(path)) {
            Ok(vocabulary) => vocabulary,
            Err(error) => {
                eprintln!("Error: {} ({})", error, path);
                return ExitCode::FAILURE;
            }
        },
        None => Vocabulary::default(),
    };

    let Some(file_path) = matches.get_one::<String>("file") else {
        return ExitCode::FAILURE;
    };
    let path = Path::new(file_path);
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let filename = path.display().to_string();

    if matches.get_flag("tokens") {
        for lexeme in runner::tokenize(&source, &vocabulary) {
            println!(
                "{}:{}\t{:?}\t{}",
                lexeme.row(),
                lexeme.column(),
                lexeme.kind,
                lexeme.text
            );
        }
    }

    if matches.get_flag("ast") {
        match runner::parse_program(&source, &vocabulary) {
            Ok(program) => println!("{:#?}", program),
            Err(error) => {
                error.report(&source, Some(&filename));
                return ExitCode::FAILURE;
            }
        }
    }

    if runner::run(&source, Some(&filename), &vocabulary) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
