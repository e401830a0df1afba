// src/main.rs

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::error::ErrorKind;
use poh::cli::{self, Invocation, TtyState};
use poh::errors::{EXIT_USAGE, PohError};
use poh::{logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    match run_main().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_broken_pipe() => ExitCode::SUCCESS,
        Err(err @ PohError::Usage(_)) => {
            eprintln!("{err}");
            eprint!("{}", cli::usage());
            exit_code(err.exit_code())
        }
        Err(err) => {
            eprintln!("poh error: {}", err.report());
            exit_code(err.exit_code())
        }
    }
}

async fn run_main() -> Result<(), PohError> {
    let argv: Vec<String> = std::env::args().collect();
    if argv.len() < 2 {
        eprint!("{}", cli::usage());
        std::process::exit(EXIT_USAGE);
    }

    let parsed = match cli::parse_from(&argv) {
        Ok(parsed) => parsed,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(EXIT_USAGE);
        }
    };

    logging::init_logging(parsed.args.verbose, parsed.args.debug)?;

    let tty = TtyState {
        stdin: io::stdin().is_terminal(),
        stdout: io::stdout().is_terminal(),
    };
    let invocation = Invocation::from_parsed(parsed, tty, &mut io::stdin().lock())?;
    run(invocation).await
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
