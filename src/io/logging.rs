//! Tracing subscriber set-up for the command line tool

use crate::io::configuration::LOG_ENV;
use crate::io::error::{Result, invalid_parameter};
use tracing_subscriber::EnvFilter;

/// Default filter for the verbosity flags
pub const fn default_level(quiet: bool, verbose: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Filter from `CILIA_CURATE_LOG`, falling back to the flag level
pub fn filter(quiet: bool, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level(quiet, verbose)))
}

/// Install the global subscriber, logging to standard error
///
/// # Errors
///
/// Returns an invalid parameter error if a subscriber is already installed
pub fn init_tracing(quiet: bool, verbose: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(quiet, verbose))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| invalid_parameter("tracing", &LOG_ENV, &error))
}
