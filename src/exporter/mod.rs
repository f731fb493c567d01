//! Export pipeline split into focused submodules.
//!
//! The `Exporter` struct and its methods are organized by stage:
//! - [`session`] - Credential exchange for a session token
//! - [`catalog`] - Folder and scan enumeration
//! - [`export_job`] - Export job state machine (submit, poll until ready)
//! - [`download`] - Streaming download of a finished export
//! - [`batch`] - Whole-run orchestration with per-scan failure isolation

mod batch;
mod catalog;
mod download;
mod export_job;
mod session;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use batch::ScanOutcome;
pub use download::DownloadObserver;
pub use export_job::{ExportState, ExportStatus, JobOutcome};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::Event;

/// Header carrying the session token on authenticated requests
pub(crate) const AUTH_HEADER: &str = "X-Cookie";

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Bulk exporter for one scanner (cloneable - all fields are cheap handles)
#[derive(Clone)]
pub struct Exporter {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// HTTP client built from the TLS and timeout settings
    pub(crate) http: reqwest::Client,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Cancelled when the operator interrupts the run
    pub(crate) cancel: CancellationToken,
}

impl Exporter {
    /// Create a new exporter
    ///
    /// Validates the configuration and builds the HTTP client. No network
    /// traffic happens until [`Exporter::run`] or one of the stage methods is
    /// called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid settings and [`Error::Http`] if
    /// the TLS backend cannot be initialised.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.allow_insecure_tls)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("nessus-export/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Http)?;

        if config.allow_insecure_tls {
            tracing::warn!(
                base_url = %config.api_base(),
                "TLS certificate validation is disabled for the scanner connection"
            );
        }

        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config: Arc::new(config),
            http,
            event_tx,
            cancel: CancellationToken::new(),
        })
    }

    /// Subscribe to export events
    ///
    /// Each subscriber receives all events independently. A subscriber that
    /// falls more than the channel capacity behind receives
    /// `RecvError::Lagged` and skips ahead.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Token that cancels the run when triggered
    ///
    /// Cancelling stops new scan exports from starting and aborts in-flight
    /// polls and downloads; files already written are kept.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request cancellation of the run
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Absolute URL for an API path (which must start with '/')
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base(), path)
    }
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
