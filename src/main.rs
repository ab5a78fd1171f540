mod builtins;
mod cli;
mod commands;
mod config;
mod engine;
mod history;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match cli.command {
        Command::Apply(args) => commands::apply::run(&ctx, args),
        Command::Preview(args) => commands::preview::run(&ctx, args),
        Command::Show { path } => commands::show::run(&ctx, path.as_deref()),
        Command::History => commands::history::run(&ctx),
        Command::Domains { config } => commands::domains::run(&ctx, config.as_deref()),
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "sysconf", &mut io::stdout());
            Ok(())
        }
    }
}
