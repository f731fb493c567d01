//! Configuration types for nessus-export

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Folder name used when a scan's folder is missing from the folder listing
pub const DEFAULT_FOLDER_NAME: &str = "Default Folder";

/// Main configuration for [`crate::Exporter`]
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the scanner's management API (e.g. "https://nessus:8834")
    pub base_url: String,

    /// Account username
    pub username: String,

    /// Account password
    pub password: String,

    /// Root directory for exported files (default: "export")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Skip TLS certificate validation (default: true)
    ///
    /// Scanner deployments usually run with a self-signed certificate. Only
    /// the exporter's own HTTP client is affected.
    #[serde(default = "default_true")]
    pub allow_insecure_tls: bool,

    /// Per-request timeout, applied to every API call including downloads (default: 300 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// TCP connect timeout (default: 30 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Export format requested from the server (default: "nessus")
    #[serde(default = "default_format")]
    pub export_format: String,

    /// Extension of written files, without the dot (default: "nessus")
    #[serde(default = "default_format")]
    pub file_extension: String,

    /// Folder name for scans whose folder is unknown (default: "Default Folder")
    #[serde(default = "default_folder_name")]
    pub default_folder_name: String,

    /// Read size for the download stream in bytes (default: 8192)
    #[serde(default = "default_chunk_size")]
    pub download_chunk_size: usize,

    /// Maximum number of scans exported at once (default: 1)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_exports: usize,

    /// Export status polling policy
    #[serde(default)]
    pub poll: PollConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password: String::new(),
            output_dir: default_output_dir(),
            allow_insecure_tls: true,
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            export_format: default_format(),
            file_extension: default_format(),
            default_folder_name: default_folder_name(),
            download_chunk_size: default_chunk_size(),
            max_concurrent_exports: default_max_concurrent(),
            poll: PollConfig::default(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("output_dir", &self.output_dir)
            .field("allow_insecure_tls", &self.allow_insecure_tls)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("export_format", &self.export_format)
            .field("file_extension", &self.file_extension)
            .field("default_folder_name", &self.default_folder_name)
            .field("download_chunk_size", &self.download_chunk_size)
            .field("max_concurrent_exports", &self.max_concurrent_exports)
            .field("poll", &self.poll)
            .finish()
    }
}

impl Config {
    /// Create a configuration with default settings for the given server and account
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Check the configuration for values the exporter cannot work with
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(self.base_url.trim()).map_err(|e| {
            Error::config(
                format!("invalid base URL '{}': {}", self.base_url, e),
                "base_url",
            )
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::config(
                format!("base URL must use http or https, got '{}'", base.scheme()),
                "base_url",
            ));
        }
        if self.download_chunk_size == 0 {
            return Err(Error::config(
                "download chunk size must be greater than zero",
                "download_chunk_size",
            ));
        }
        if self.max_concurrent_exports == 0 {
            return Err(Error::config(
                "at least one concurrent export is required",
                "max_concurrent_exports",
            ));
        }
        if self.export_format.trim().is_empty() {
            return Err(Error::config("export format is empty", "export_format"));
        }
        self.poll.validate()
    }

    /// Base URL without trailing slashes, ready for path concatenation
    pub fn api_base(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }
}

/// Export status polling policy
///
/// Polls start at `initial_interval` and grow by `backoff_multiplier` up to
/// `max_interval`. The job fails with a timeout once either `max_attempts`
/// polls have been made or `max_wait` has elapsed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay before the second poll (default: 1000 ms)
    #[serde(default = "default_initial_interval", with = "duration_millis_serde")]
    pub initial_interval: Duration,

    /// Upper bound for the delay between polls (default: 10000 ms)
    #[serde(default = "default_max_interval", with = "duration_millis_serde")]
    pub max_interval: Duration,

    /// Multiplier applied to the delay after each poll (default: 1.5)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Maximum number of status polls (default: 600)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Maximum total time spent polling one job (default: 3600 seconds)
    #[serde(default = "default_max_wait", with = "duration_serde")]
    pub max_wait: Duration,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: default_initial_interval(),
            max_interval: default_max_interval(),
            backoff_multiplier: default_backoff_multiplier(),
            max_attempts: default_max_attempts(),
            max_wait: default_max_wait(),
            jitter: false,
        }
    }
}

impl PollConfig {
    /// Check that the budget allows at least one poll and the schedule never shrinks
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::config(
                "poll budget must allow at least one attempt",
                "poll.max_attempts",
            ));
        }
        if self.initial_interval.is_zero() {
            return Err(Error::config(
                "poll interval must be greater than zero",
                "poll.initial_interval",
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::config(
                format!(
                    "backoff multiplier must be a finite number of at least 1.0, got {}",
                    self.backoff_multiplier
                ),
                "poll.backoff_multiplier",
            ));
        }
        if self.max_interval < self.initial_interval {
            return Err(Error::config(
                "max poll interval is shorter than the initial interval",
                "poll.max_interval",
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("export")
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_format() -> String {
    "nessus".to_string()
}

fn default_folder_name() -> String {
    DEFAULT_FOLDER_NAME.to_string()
}

fn default_chunk_size() -> usize {
    8 * 1024
}

fn default_max_concurrent() -> usize {
    1
}

fn default_initial_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_max_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_max_attempts() -> u32 {
    600
}

fn default_max_wait() -> Duration {
    Duration::from_secs(3600)
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
