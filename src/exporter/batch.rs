//! Whole-run orchestration: authenticate, enumerate, then export every scan.
//!
//! Authentication and catalog failures end the run. Everything after that is
//! isolated per scan: a failed export is reported and the batch moves on.

use futures::StreamExt;

use crate::error::{Error, ExportError, Result};
use crate::types::{
    Event, ExportSummary, ExportedScan, FailedScan, FolderMap, Scan, ScanId, Session,
};
use crate::utils::{persist, resolve_path};

use super::{DownloadObserver, Exporter, JobOutcome};

/// Result of exporting one scan
#[derive(Debug)]
pub enum ScanOutcome {
    /// Export written to disk
    Exported(ExportedScan),
    /// Export failed; the batch continues
    Failed {
        /// The scan that failed
        scan: Scan,
        /// Cause of the failure
        error: ExportError,
    },
    /// Not started, or abandoned mid-flight, because the run was cancelled
    Cancelled(Scan),
}

/// Forwards download progress to the event channel
struct EventObserver<'a> {
    exporter: &'a Exporter,
    scan_id: ScanId,
    name: &'a str,
    total_bytes: Option<u64>,
    received_bytes: u64,
}

impl DownloadObserver for EventObserver<'_> {
    fn on_start(&mut self, total_bytes: Option<u64>) {
        self.total_bytes = total_bytes;
        self.exporter.emit_event(Event::DownloadStarted {
            scan_id: self.scan_id,
            name: self.name.to_string(),
            total_bytes,
        });
    }

    fn on_progress(&mut self, increment: u64) {
        self.received_bytes += increment;
        self.exporter.emit_event(Event::Downloading {
            scan_id: self.scan_id,
            received_bytes: self.received_bytes,
            total_bytes: self.total_bytes,
        });
    }
}

impl Exporter {
    /// Run the full export
    ///
    /// Authenticates once, lists folders and scans, then exports each scan to
    /// `output_dir/<folder>/<scan>.<ext>`, up to `max_concurrent_exports` at a
    /// time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] or [`Error::Api`] when the run cannot start, and
    /// [`Error::Cancelled`] if cancellation arrives before the catalog is
    /// loaded. Cancellation during the batch is not an error: the summary has
    /// `cancelled` set and counts the scans that were never exported.
    pub async fn run(&self) -> Result<ExportSummary> {
        let (session, folders, scans) = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::info!("Cancelled before the catalog was loaded");
                self.emit_event(Event::Cancelled);
                return Err(Error::Cancelled);
            }
            startup = self.load_catalog() => startup?,
        };

        let summary = self.export_all(&session, &folders, &scans).await;
        self.emit_event(Event::Finished(summary.clone()));
        Ok(summary)
    }

    async fn load_catalog(&self) -> Result<(Session, FolderMap, Vec<Scan>)> {
        let session = self.authenticate().await?;
        let folders = self.list_folders(&session).await?;
        let scans = self.list_scans(&session).await?;

        self.emit_event(Event::CatalogLoaded {
            folders: folders.len(),
            scans: scans.len(),
        });
        Ok((session, FolderMap::from_folders(&folders), scans))
    }

    /// Export every scan in `scans`, isolating failures per scan
    pub async fn export_all(
        &self,
        session: &Session,
        folders: &FolderMap,
        scans: &[Scan],
    ) -> ExportSummary {
        let outcomes: Vec<ScanOutcome> = futures::stream::iter(scans)
            .map(|scan| self.export_scan(session, folders, scan))
            .buffered(self.config.max_concurrent_exports)
            .collect()
            .await;

        let mut summary = ExportSummary::default();
        for outcome in outcomes {
            match outcome {
                ScanOutcome::Exported(exported) => summary.exported.push(exported),
                ScanOutcome::Failed { scan, error } => summary.failed.push(FailedScan {
                    scan_id: scan.id,
                    name: scan.name,
                    kind: error.kind().to_string(),
                    error: error.to_string(),
                }),
                ScanOutcome::Cancelled(_) => summary.skipped += 1,
            }
        }
        summary.cancelled = self.cancel.is_cancelled();

        if summary.cancelled {
            self.emit_event(Event::Cancelled);
        }
        tracing::info!(
            exported = summary.exported.len(),
            failed = summary.failed.len(),
            skipped = summary.skipped,
            cancelled = summary.cancelled,
            "Batch finished"
        );
        summary
    }

    /// Export one scan: run its job, download, and write the file
    ///
    /// Never fails past this boundary; the outcome says what happened.
    pub async fn export_scan(
        &self,
        session: &Session,
        folders: &FolderMap,
        scan: &Scan,
    ) -> ScanOutcome {
        if self.cancel.is_cancelled() {
            return ScanOutcome::Cancelled(scan.clone());
        }

        let folder_name = folders.name_or(scan.folder_id, &self.config.default_folder_name);
        let path = resolve_path(
            &self.config.output_dir,
            folder_name,
            &scan.name,
            &self.config.file_extension,
        );

        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::info!(scan_id = %scan.id, scan_name = %scan.name, "Export abandoned on cancellation");
                return ScanOutcome::Cancelled(scan.clone());
            }
            fetched = self.fetch_export(session, scan) => fetched,
        };

        let result = match fetched {
            Ok(bytes) => {
                self.emit_event(Event::Saving {
                    scan_id: scan.id,
                    name: scan.name.clone(),
                    path: path.clone(),
                });
                tracing::info!(path = %path.display(), bytes = bytes.len(), "Saving scan");
                persist(&path, &bytes)
                    .await
                    .map(|()| bytes.len() as u64)
                    .map_err(|source| ExportError::Io {
                        path: path.clone(),
                        source,
                    })
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(bytes) => {
                tracing::info!(scan_name = %scan.name, path = %path.display(), "Scan saved");
                self.emit_event(Event::Saved {
                    scan_id: scan.id,
                    name: scan.name.clone(),
                    path: path.clone(),
                    bytes,
                });
                ScanOutcome::Exported(ExportedScan {
                    scan_id: scan.id,
                    name: scan.name.clone(),
                    path,
                    bytes,
                })
            }
            Err(error) => {
                tracing::warn!(
                    scan_id = %scan.id,
                    scan_name = %scan.name,
                    kind = error.kind(),
                    error = %error,
                    "Scan export failed, continuing with next scan"
                );
                self.emit_event(Event::ScanFailed {
                    scan_id: scan.id,
                    name: scan.name.clone(),
                    error: error.to_string(),
                });
                ScanOutcome::Failed {
                    scan: scan.clone(),
                    error,
                }
            }
        }
    }

    async fn fetch_export(&self, session: &Session, scan: &Scan) -> Result<Vec<u8>, ExportError> {
        let handle = match self.run_export_job(session, scan).await {
            JobOutcome::Ready(handle) => handle,
            JobOutcome::Failed(error) => return Err(error),
        };

        let mut observer = EventObserver {
            exporter: self,
            scan_id: scan.id,
            name: &scan.name,
            total_bytes: None,
            received_bytes: 0,
        };
        self.download_export(session, handle, &mut observer).await
    }
}
