use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sysconf")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declare your machine's configuration and apply only what changed")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply a configuration, running only the commands needed since the last apply
    Apply(ApplyArgs),

    /// Show the commands an apply would run, without running them
    Preview(PreviewArgs),

    /// Print the last applied configuration
    Show {
        /// Configuration file to print instead of the last applied one
        path: Option<PathBuf>,
    },

    /// List previously applied configurations
    History,

    /// List the domains available to a configuration
    Domains {
        /// Configuration whose own domains should be listed too
        config: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Apply / Preview
// ============================================================================

/// Arguments shared by apply and preview
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Configuration to apply (default: config.yaml in the config directory)
    pub config: Option<PathBuf>,

    /// Diff against this configuration instead of the recorded history
    #[arg(long, value_name = "PATH")]
    pub last_config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Don't ask for confirmation before running
    #[arg(short, long)]
    pub yes: bool,

    /// What to do when a command fails
    #[arg(long, value_enum, default_value_t = FailureMode::Prompt)]
    pub on_failure: FailureMode,

    /// Retry a failed command this many times before aborting (with --on-failure abort)
    #[arg(long, default_value = "0")]
    pub retries: usize,

    /// Dry run - show what would be done
    #[arg(short, long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

/// Failure handling for apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailureMode {
    /// Ask whether to retry, skip, abort or mark as successful
    Prompt,
    /// Stop at the first failure
    Abort,
    /// Keep going and report failures at the end
    Continue,
}
