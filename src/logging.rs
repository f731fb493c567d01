//! Logging setup for the nessus-export binary.
//!
//! Log levels are determined by (in priority order):
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (error only) or `-v` (info, debug, trace)
//! 3. Default: warn, so the progress display stays readable
//!
//! Logs go to stderr; progress bars and the final summary own the terminal.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Install the global tracing subscriber
///
/// Calling this more than once is harmless: later calls leave the first
/// subscriber in place.
pub fn init_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(determine_level(verbose, quiet).into())
        .from_env_lossy();

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .try_init();

    if result.is_ok() {
        tracing::debug!(
            level = %determine_level(verbose, quiet),
            "Logging initialized"
        );
    }
}

/// Level selected by the CLI flags when `RUST_LOG` is unset
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_warn() {
        assert_eq!(determine_level(0, false), LevelFilter::WARN);
    }

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(determine_level(1, false), LevelFilter::INFO);
        assert_eq!(determine_level(2, false), LevelFilter::DEBUG);
        assert_eq!(determine_level(3, false), LevelFilter::TRACE);
        assert_eq!(determine_level(9, false), LevelFilter::TRACE);
    }

    #[test]
    fn quiet_overrides_verbose() {
        assert_eq!(determine_level(0, true), LevelFilter::ERROR);
        assert_eq!(determine_level(2, true), LevelFilter::ERROR);
    }

    #[test]
    fn repeated_init_does_not_panic() {
        init_logging(0, false);
        init_logging(1, false);
    }
}
