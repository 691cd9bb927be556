use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "upcheck",
    about = "Check once a day whether a newer release has been published",
    version,
    author
)]
pub struct Cli {
    /// Settings file holding the cached check result
    #[arg(short, long, global = true, default_value = "upcheck-settings.toml")]
    pub settings: PathBuf,

    /// Optional TOML file overriding the feed URL, user agent, cache window or timeout
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report whether an update is available
    Check {
        /// Version of the running application (defaults to this binary's version)
        #[arg(long, value_name = "VERSION")]
        current: Option<String>,

        /// Query the feed even if the last check is still fresh
        #[arg(short, long)]
        force: bool,

        /// Print only `true` or `false`
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show the cached check result
    Status,

    /// Forget the cached result so the next check hits the network
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_and_force_combine() {
        let cli = Cli::try_parse_from(["upcheck", "check", "--quiet", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Check {
                quiet: true,
                force: true,
                ..
            }
        ));
    }

    #[test]
    fn settings_path_has_a_default() {
        let cli = Cli::try_parse_from(["upcheck", "status"]).unwrap();
        assert_eq!(cli.settings, PathBuf::from("upcheck-settings.toml"));
        assert!(!cli.verbose);
    }
}
