//! Triquetra - Windows 11 servicing updater

use clap::Parser;
use miette::Diagnostic;

use triquetra::cli::{Cli, Commands};
use triquetra::error::TriquetraError;
use triquetra::exit_codes::ExitCode;
use triquetra::{commands, logging};

fn report(err: &TriquetraError) {
    eprintln!("Error: {err}");
    if let Some(help) = err.help() {
        eprintln!("  help: {help}");
    }
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        None => commands::update::run(cli.workdir, cli.config, cli.verbose, cli.update),
        Some(command) => {
            logging::init(logging::level_for(cli.verbose), None);
            match command {
                Commands::Cache(args) => commands::cache::run(cli.workdir, args),
                Commands::Completions(args) => commands::completions::run(args),
                Commands::Version => commands::version::run(),
            }
        }
    };

    if let Err(e) = result {
        report(&e);
        std::process::exit(ExitCode::from(&e).into());
    }
}
