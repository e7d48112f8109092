//! Run command implementation

use std::path::PathBuf;

use console::Style;

use crate::cli::RunArgs;
use crate::config::StackConfig;
use crate::error::Result;
use crate::orchestrator::context::Host;
use crate::orchestrator::{Orchestrator, RunOptions};
use crate::system::prompt::AnswerMode;

/// Run a provisioning run and print its summary
///
/// The summary is printed even when a mandatory step aborts the run.
pub fn run(config_path: Option<PathBuf>, args: RunArgs) -> Result<()> {
    let (config, origin) = StackConfig::load(config_path.as_deref())?;
    tracing::info!(config = %origin, "loaded configuration");

    let answers = answer_mode(&args);
    let host = Host::system(&config, args.dry_run, answers)?;

    if args.dry_run {
        println!(
            "{}",
            Style::new()
                .yellow()
                .bold()
                .apply_to("[DRY RUN] Mutating commands are printed, not run")
        );
    }

    let mut orchestrator = Orchestrator::new(
        &config,
        host,
        RunOptions {
            dry_run: args.dry_run,
            only: args.only,
        },
    );
    let result = orchestrator.run();
    orchestrator.ledger().print_summary();

    let versions: Vec<String> = orchestrator
        .resolved()
        .values()
        .filter_map(|c| c.version.as_ref().map(|v| format!("{} {v}", c.identifier)))
        .collect();
    if !versions.is_empty() {
        println!(
            "\n{} {}",
            Style::new().bold().apply_to("Resolved:"),
            versions.join(", ")
        );
    }
    result
}

fn answer_mode(args: &RunArgs) -> AnswerMode {
    if args.yes {
        AnswerMode::AssumeYes
    } else if args.defaults {
        AnswerMode::Defaults
    } else {
        AnswerMode::Interactive
    }
}
