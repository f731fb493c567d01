//! Command-line interface definitions for nessus-export.
//!
//! ```bash
//! # Export everything into ./export
//! nessus-export admin secret https://nessus.local:8834
//!
//! # Custom output directory, two exports in flight
//! nessus-export admin secret https://nessus.local:8834 --output /srv/nessus -j 2
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Config, PollConfig};

/// Export every scan on a Nessus scanner as a .nessus file, grouped by folder.
#[derive(Debug, Parser)]
#[command(name = "nessus-export")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Nessus username
    #[arg(value_name = "USERNAME")]
    pub username: String,

    /// Nessus password
    #[arg(value_name = "PASSWORD")]
    pub password: String,

    /// Nessus URL (e.g. https://nessus.local:8834)
    #[arg(value_name = "URL")]
    pub base_url: String,

    /// Output folder for the exported scans
    #[arg(short, long, value_name = "DIR", default_value = "export")]
    pub output: PathBuf,

    /// Validate the scanner's TLS certificate
    ///
    /// Off by default because scanners usually serve a self-signed certificate.
    #[arg(long)]
    pub verify_tls: bool,

    /// Number of scans exported at once
    #[arg(short = 'j', long, value_name = "N", default_value = "1", value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,

    /// Delay before the first export status poll, in seconds (grows with backoff)
    #[arg(long, value_name = "SECS", value_parser = parse_seconds)]
    pub poll_interval: Option<Duration>,

    /// Give up on an export after this many status polls
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_poll_attempts: Option<u32>,

    /// Give up on an export after this many seconds of polling
    #[arg(long, value_name = "SECS", value_parser = parse_seconds)]
    pub max_wait: Option<Duration>,

    /// Per-request timeout in seconds, including downloads
    #[arg(long, value_name = "SECS", value_parser = parse_seconds)]
    pub timeout: Option<Duration>,

    /// Increase verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress output and all logs except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Build the exporter configuration from the parsed arguments
    pub fn into_config(self) -> Config {
        let mut config = Config::new(self.base_url, self.username, self.password);
        config.output_dir = self.output;
        config.allow_insecure_tls = !self.verify_tls;
        config.max_concurrent_exports = usize::from(self.concurrency);
        if let Some(timeout) = self.timeout {
            config.request_timeout = timeout;
        }

        let defaults = PollConfig::default();
        if let Some(interval) = self.poll_interval {
            config.poll.initial_interval = interval;
            config.poll.max_interval = defaults.max_interval.max(interval);
        }
        if let Some(attempts) = self.max_poll_attempts {
            config.poll.max_attempts = attempts;
        }
        if let Some(max_wait) = self.max_wait {
            config.poll.max_wait = max_wait;
        }
        config
    }
}

/// Parse a non-negative number of seconds, fractions allowed
///
/// ```
/// use nessus_export::cli::parse_seconds;
/// use std::time::Duration;
///
/// assert_eq!(parse_seconds("2").unwrap(), Duration::from_secs(2));
/// assert_eq!(parse_seconds("0.25").unwrap(), Duration::from_millis(250));
/// assert!(parse_seconds("-1").is_err());
/// ```
pub fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", s))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("'{}' is not a valid duration", s))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("nessus-export").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn positional_arguments_in_order() {
        let cli = parse(&["admin", "secret", "https://nessus:8834"]);
        assert_eq!(cli.username, "admin");
        assert_eq!(cli.password, "secret");
        assert_eq!(cli.base_url, "https://nessus:8834");
        assert_eq!(cli.output, PathBuf::from("export"));
        assert_eq!(cli.concurrency, 1);
        assert!(!cli.verify_tls);
    }

    #[test]
    fn defaults_map_to_default_config() {
        let config = parse(&["admin", "secret", "https://nessus:8834"]).into_config();
        let defaults = Config::default();
        assert_eq!(config.base_url, "https://nessus:8834");
        assert_eq!(config.output_dir, defaults.output_dir);
        assert!(config.allow_insecure_tls);
        assert_eq!(config.max_concurrent_exports, 1);
        assert_eq!(config.request_timeout, defaults.request_timeout);
        assert_eq!(config.poll.max_attempts, defaults.poll.max_attempts);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn options_override_config() {
        let config = parse(&[
            "admin",
            "secret",
            "https://nessus:8834",
            "--output",
            "/tmp/out",
            "--verify-tls",
            "-j",
            "4",
            "--poll-interval",
            "0.5",
            "--max-poll-attempts",
            "20",
            "--max-wait",
            "90",
            "--timeout",
            "45",
        ])
        .into_config();

        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert!(!config.allow_insecure_tls);
        assert_eq!(config.max_concurrent_exports, 4);
        assert_eq!(config.poll.initial_interval, Duration::from_millis(500));
        assert_eq!(config.poll.max_attempts, 20);
        assert_eq!(config.poll.max_wait, Duration::from_secs(90));
        assert_eq!(config.request_timeout, Duration::from_secs(45));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn long_poll_interval_raises_ceiling() {
        let config = parse(&["a", "b", "https://n", "--poll-interval", "30"]).into_config();
        assert_eq!(config.poll.initial_interval, Duration::from_secs(30));
        assert_eq!(config.poll.max_interval, Duration::from_secs(30));
        assert!(config.poll.validate().is_ok());
    }

    #[test]
    fn missing_positional_is_rejected() {
        let result = Cli::try_parse_from(["nessus-export", "admin"]);
        assert!(result.is_err());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let result = Cli::try_parse_from(["nessus-export", "a", "b", "https://n", "-j", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["nessus-export", "a", "b", "https://n", "-q", "-v"]);
        assert!(result.is_err());
    }

    #[test]
    fn verbosity_counts() {
        let cli = parse(&["a", "b", "https://n", "-vv"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn zero_poll_interval_fails_validation() {
        let config = parse(&["a", "b", "https://n", "--poll-interval", "0"]).into_config();
        match config.validate() {
            Err(crate::Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("poll.initial_interval"))
            }
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn enormous_poll_interval_does_not_panic() {
        let config = parse(&["a", "b", "https://n", "--poll-interval", "1.3e19"]).into_config();
        assert!(config.validate().is_ok());
        let mut backoff = crate::backoff::Backoff::new(&config.poll);
        let first = backoff.next_delay();
        assert_eq!(backoff.next_delay(), first);
    }

    #[test]
    fn parse_seconds_rejects_garbage() {
        assert!(parse_seconds("soon").is_err());
        assert!(parse_seconds("").is_err());
        assert_eq!(parse_seconds(" 3 ").unwrap(), Duration::from_secs(3));
    }
}
