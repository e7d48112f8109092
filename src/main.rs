//! Stackup - host provisioning orchestrator
//!
//! Installs a configured stack of components on a Debian or Ubuntu host,
//! one recorded step at a time, and prints what succeeded and what failed.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod cli;
mod commands;
mod config;
mod error;
mod executor;
mod guard;
mod ledger;
mod orchestrator;
mod progress;
mod remediation;
mod resolver;
mod system;
mod temp;

#[cfg(test)]
mod test_fixtures;

use cli::{Cli, Commands};

/// Log filter from `STACKUP_LOG`, else from the `-v` count
fn log_filter(verbosity: u8) -> EnvFilter {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    EnvFilter::try_from_env("STACKUP_LOG").unwrap_or_else(|_| EnvFilter::new(default))
}

fn init_logging(verbosity: u8) {
    tracing_subscriber::registry()
        .with(log_filter(verbosity))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(cli.config, args),
        Commands::Plan => commands::plan::run(cli.config),
        Commands::Resolve(args) => commands::resolve::run(cli.config, args),
        Commands::Version => commands::version::run(cli.config),
        Commands::Completions(args) => commands::completions::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
