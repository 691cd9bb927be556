use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use jiff::Timestamp;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use upcheck::{
    CheckOutcome, CheckerConfig, FileSettings, GitHubReleaseFeed, Result, SettingsStore,
    UpdateChecker, UpdateError, Version,
};

/// Run an update check against the configured feed and print the answer.
pub fn execute_check(
    settings_path: &Path,
    config_path: Option<&Path>,
    current: Option<&str>,
    force: bool,
    quiet: bool,
    verbose: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let current = resolve_current_version(current)?;
    let checker = build_checker(&config, current, settings_path)?;

    if quiet {
        println!("{}", quiet_answer(&checker, force));
        return Ok(());
    }

    println!(
        "{} {}",
        "Checking for updates, current version is".cyan().bold(),
        checker.current_version().to_string().bright_cyan()
    );

    let spinner = ProgressBar::new_spinner();
    if verbose {
        spinner.set_draw_target(ProgressDrawTarget::hidden());
    }
    if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Querying {}", config.feed_url.dimmed()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = if force {
        checker.force_check()
    } else {
        checker.check()
    };
    spinner.finish_and_clear();

    match result {
        Ok(outcome) => print_outcome(&outcome, checker.current_version()),
        Err(err) => {
            tracing::debug!(stage = %err.stage(), error = %err, "Update check failed");
            println!(
                "{}",
                format!("⚠ Update check failed during {} stage: {}", err.stage(), err).yellow()
            );
            println!("{}", "No update available".dimmed());
        }
    }

    Ok(())
}

/// Print the cached entry without touching the network.
pub fn execute_status(settings_path: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let checker = build_checker(&config, own_version()?, settings_path)?;
    let entry = checker.cache_entry()?;

    println!("{}", "Cached update check".cyan().bold());
    println!("   Settings file:   {}", settings_path.display().to_string().dimmed());
    if entry.last_checked_for_update == Timestamp::UNIX_EPOCH {
        println!("   Last checked:    {}", "never".yellow());
    } else {
        println!("   Last checked:    {}", entry.last_checked_for_update);
    }
    println!("   Update available: {}", entry.is_update_available);

    let fresh = entry.is_fresh(Timestamp::now(), config.cache_window());
    if fresh {
        println!("{}", "✓ Next check will use the cached value".green());
    } else {
        println!("{}", "Next check will query the release feed".yellow());
    }

    Ok(())
}

/// Reset the cached entry to its defaults.
pub fn execute_reset(settings_path: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let checker = build_checker(&config, own_version()?, settings_path)?;
    checker.reset()?;
    println!("{}", "✓ Cached update check cleared".green());
    Ok(())
}

/// The bare boolean answer; a forced check collapses failures to `false` the same way.
fn quiet_answer<S: SettingsStore>(checker: &UpdateChecker<S>, force: bool) -> bool {
    if !force {
        return checker.is_update_available();
    }
    match checker.force_check() {
        Ok(outcome) => outcome.update_available(),
        Err(err) => {
            tracing::error!(stage = %err.stage(), error = %err, "Update check failed");
            false
        }
    }
}

fn print_outcome(outcome: &CheckOutcome, current: &Version) {
    match outcome {
        CheckOutcome::Cached { update_available } => {
            println!("   {}", "Checked within the cache window, using stored result".dimmed());
            print_answer(*update_available);
        }
        CheckOutcome::NoReleases => {
            println!("   {}", "The release feed lists no releases".dimmed());
            print_answer(false);
        }
        CheckOutcome::Checked {
            latest,
            update_available,
        } => {
            println!("   Latest release: {}", latest.to_string().bright_cyan());
            if *update_available {
                println!(
                    "{}",
                    format!("✨ Update available: {current} → {latest}").green().bold()
                );
            } else {
                print_answer(false);
            }
        }
    }
}

fn print_answer(update_available: bool) {
    if update_available {
        println!("{}", "✨ Update available".green().bold());
    } else {
        println!("{}", "✓ You are running the latest version".green());
    }
}

fn load_config(path: Option<&Path>) -> Result<CheckerConfig> {
    match path {
        Some(path) => CheckerConfig::load(path),
        None => Ok(CheckerConfig::default()),
    }
}

fn build_checker(
    config: &CheckerConfig,
    current: Version,
    settings_path: &Path,
) -> Result<UpdateChecker<FileSettings>> {
    let feed = GitHubReleaseFeed::new(config)?;
    Ok(
        UpdateChecker::new(current, Arc::new(feed), FileSettings::new(settings_path))
            .with_config(config),
    )
}

fn resolve_current_version(current: Option<&str>) -> Result<Version> {
    match current {
        Some(current) => Version::parse(current).map_err(|e| {
            UpdateError::Config(format!("--current '{current}' is not a valid version: {e}"))
        }),
        None => own_version(),
    }
}

fn own_version() -> Result<Version> {
    Version::parse(env!("CARGO_PKG_VERSION"))
}
