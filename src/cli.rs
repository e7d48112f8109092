//! CLI definitions using clap derive API

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Stackup - host provisioning for Debian and Ubuntu
#[derive(Parser, Debug)]
#[command(
    name = "stackup",
    author,
    version,
    color = clap::ColorChoice::Always,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Provision a Debian or Ubuntu host with a development and server stack",
    long_about = "Provision a Debian or Ubuntu host with a development and server stack.\n\n\
                  Stackup installs a configured stack of components (web server, PHP, \
                  PostgreSQL, Docker, .NET, editors, ...) on a Debian or Ubuntu host. \
                  Each step is recorded and the run ends with a summary of what \
                  succeeded and what failed.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  stackup plan                          \x1b[90m# Show what a run would do\x1b[0m\n   \
                  stackup run                           \x1b[90m# Ask for each component\x1b[0m\n   \
                  stackup run --yes --only nginx        \x1b[90m# Install only nginx\x1b[0m\n   \
                  stackup run --defaults --dry-run      \x1b[90m# Print mutating commands only\x1b[0m\n   \
                  stackup resolve php                   \x1b[90m# Show the newest PHP candidate\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    /// Configuration file (defaults to ./stackup.yaml, then the user config dir)
    #[arg(long, short = 'c', global = true, env = "STACKUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision this host
    Run(RunArgs),

    /// Print the ordered step plan
    Plan,

    /// Resolve the install candidate of one component
    Resolve(ResolveArgs),

    /// Show version and configuration lookup information
    #[command(hide = true)]
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for run command
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Answer yes to every component prompt
    #[arg(long, short = 'y', conflicts_with = "defaults")]
    pub yes: bool,

    /// Take each component's default answer without prompting
    #[arg(long)]
    pub defaults: bool,

    /// Print mutating commands instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Only consider these component ids
    #[arg(long, value_name = "ID", num_args = 1..)]
    pub only: Vec<String>,
}

/// Arguments for resolve command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Component id (see `stackup plan`)
    pub id: String,
}

/// Arguments for completions command
#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    stackup completions --shell bash > ~/.bash_completion.d/stackup\n\n\
                  Generate zsh completions:\n    stackup completions --shell zsh > ~/.zfunc/_stackup\n\n\
                  Generate fish completions:\n    stackup completions --shell fish > ~/.config/fish/completions/stackup.fish")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    #[arg(long, short = 's')]
    pub shell: String,
}
