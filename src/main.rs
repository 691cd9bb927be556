mod cli;
mod workflow;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use std::process;
use tracing::Level;

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Check {
            current,
            force,
            quiet,
        } => workflow::execute_check(
            &cli.settings,
            config,
            current.as_deref(),
            force,
            quiet,
            cli.verbose,
        ),
        Commands::Status => workflow::execute_status(&cli.settings, config),
        Commands::Reset => workflow::execute_reset(&cli.settings, config),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}
