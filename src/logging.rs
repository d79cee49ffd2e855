//! Tracing subscriber setup for the `boardsync` binary.

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub const DEFAULT_FILTER: &str = "boardsync=info";
pub const VERBOSE_FILTER: &str = "boardsync=debug";

/// Filter for the given verbosity. `-v` wins over `RUST_LOG`.
pub fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new(VERBOSE_FILTER);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Logs go to stderr so board output on
/// stdout stays clean.
pub fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(verbose));
    let result = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    result.context("Failed to initialize logging")
}
