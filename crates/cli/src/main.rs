//! `arbor` binary
//!
//! Parses the command line, runs it through the library and turns a failure
//! into a rendered report and an exit status (see [`arbor::exit_code`]).

use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(false)
                .context_lines(1)
                .build(),
        )
    }))
    .ok();

    let cli = arbor::Cli::parse();
    match arbor::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let report = miette::Report::msg(format!("{e:#}"));
            eprintln!("{report:?}");
            ExitCode::from(arbor::exit_code(&e))
        }
    }
}
