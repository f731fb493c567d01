//! Error types for nessus-export
//!
//! Errors are split along the run's propagation boundary:
//! - [`Error`] covers failures that end the whole run (authentication, catalog,
//!   configuration) plus the clean [`Error::Cancelled`] marker
//! - [`ExportError`] covers failures scoped to a single scan, which the batch
//!   runner reports and then moves past

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{FileId, ScanId};

/// Result type alias for nessus-export operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for nessus-export
#[derive(Debug, Error)]
pub enum Error {
    /// Authentication against the session endpoint failed
    #[error("authentication failed: {reason}")]
    Auth {
        /// HTTP status returned by the server, if one was received
        status: Option<u16>,
        /// Human-readable cause (status text or transport error)
        reason: String,
    },

    /// A catalog request (folders or scans) failed
    #[error("API request to {endpoint} failed: {reason}")]
    Api {
        /// The endpoint that failed (e.g. "/folders")
        endpoint: String,
        /// HTTP status returned by the server, if one was received
        status: Option<u16>,
        /// Human-readable cause
        reason: String,
    },

    /// Export of a single scan failed
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// The run was cancelled by the operator
    #[error("cancelled by user")]
    Cancelled,

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Http(#[source] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error ends the run
    ///
    /// Everything except a per-scan [`Error::Export`] and the clean
    /// [`Error::Cancelled`] is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Export(_) | Error::Cancelled)
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Cancelled => 0,
            Error::Export(_) => 0,
            _ => 1,
        }
    }

    pub(crate) fn config(message: impl Into<String>, key: &str) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Failures scoped to one scan's export
///
/// None of these abort the batch; the runner attributes them to the scan name
/// and continues with the next scan.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The export request was rejected or never answered
    #[error("export request for scan {scan_id} failed: {reason}")]
    Submit {
        /// Scan whose export could not be requested
        scan_id: ScanId,
        /// HTTP status returned by the server, if one was received
        status: Option<u16>,
        /// Human-readable cause
        reason: String,
    },

    /// A status poll failed at the transport or HTTP level, or the server
    /// reported the job as errored
    #[error("status poll for scan {scan_id} (file {file_id}) failed: {reason}")]
    Poll {
        /// Scan being exported
        scan_id: ScanId,
        /// Export job identifier
        file_id: FileId,
        /// Human-readable cause
        reason: String,
    },

    /// The job never became ready within the configured poll budget
    #[error(
        "export for scan {scan_id} (file {file_id}) not ready after {attempts} polls ({elapsed_secs}s)"
    )]
    Timeout {
        /// Scan being exported
        scan_id: ScanId,
        /// Export job identifier
        file_id: FileId,
        /// Number of polls performed
        attempts: u32,
        /// Wall-clock seconds spent polling
        elapsed_secs: u64,
    },

    /// The download request failed or the stream was interrupted
    #[error("download for scan {scan_id} (file {file_id}) failed: {reason}")]
    Download {
        /// Scan being exported
        scan_id: ScanId,
        /// Export job identifier
        file_id: FileId,
        /// Human-readable cause
        reason: String,
    },

    /// The exported file could not be written
    #[error("failed to write {path}: {source}")]
    Io {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Short machine-readable name of the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            ExportError::Submit { .. } => "submit",
            ExportError::Poll { .. } => "poll",
            ExportError::Timeout { .. } => "timeout",
            ExportError::Download { .. } => "download",
            ExportError::Io { .. } => "io",
        }
    }
}

/// Render a reqwest failure with the detail operators care about
pub(crate) fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else if let Some(status) = e.status() {
        format!("HTTP {}", status)
    } else {
        e.to_string()
    }
}
