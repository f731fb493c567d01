//! # nessus-export
//!
//! Bulk exporter for Nessus scan results.
//!
//! Authenticates against a Nessus scanner, enumerates its folders and scans,
//! and exports every scan in the native `.nessus` format into
//! `<output>/<folder name>/<scan name>.nessus`.
//!
//! ## Design
//!
//! - **One session per run** - the token is obtained once and shared read-only
//! - **Failure isolation** - a scan that fails to export is reported and the
//!   batch moves on; only authentication and catalog failures end the run
//! - **Bounded polling** - export jobs are polled with backoff under an attempt
//!   and wall-clock budget
//! - **Event-driven** - consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use nessus_export::{Config, Exporter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new("https://nessus.local:8834", "admin", "secret");
//!     let exporter = Exporter::new(config)?;
//!
//!     // Subscribe to events
//!     let mut events = exporter.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = exporter.run().await?;
//!     println!("exported {} scans", summary.exported.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Poll backoff with attempt and wall-clock budget
pub mod backoff;
/// Command-line interface
pub mod cli;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Core exporter implementation (decomposed into focused submodules)
pub mod exporter;
/// Tracing subscriber setup
pub mod logging;
/// Terminal progress rendering
pub mod progress;
/// Core types and events
pub mod types;
/// Output path and file helpers
pub mod utils;

// Re-export commonly used types
pub use config::{Config, DEFAULT_FOLDER_NAME, PollConfig};
pub use error::{Error, ExportError, Result};
pub use exporter::{
    DownloadObserver, ExportState, ExportStatus, Exporter, JobOutcome, ScanOutcome,
};
pub use types::{
    Event, ExportHandle, ExportSummary, ExportedScan, FailedScan, FileId, Folder, FolderId,
    FolderMap, Scan, ScanId, Session,
};

/// Cancel the exporter when the process receives an interrupt.
///
/// - **Unix:** listens for SIGINT and SIGTERM.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// The returned task ends after the first signal; dropping it does not stop
/// the listener.
pub fn cancel_on_signal(exporter: &Exporter) -> tokio::task::JoinHandle<()> {
    let token = exporter.cancellation_token();
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => token.cancel(),
            _ = token.cancelled() => {}
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
