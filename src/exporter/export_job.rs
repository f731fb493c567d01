//! Export job state machine: submit, then poll until the server reports ready.
//!
//! ```text
//! Requested ──submit ok──▶ Pending ──status "ready"──▶ Ready
//!     │                     │  ▲
//!     │                     │  └── other status, budget left (sleep)
//!     └──────── error ──────┴──▶ Failed (Submit | Poll | Timeout)
//! ```

use serde::{Deserialize, Serialize};

use crate::backoff::Backoff;
use crate::error::{ExportError, describe_transport_error};
use crate::types::{Event, ExportHandle, FileId, Scan, ScanId, Session};

use super::{AUTH_HEADER, Exporter};

#[derive(Serialize)]
struct ExportRequest<'a> {
    format: &'a str,
}

#[derive(Deserialize)]
struct ExportResponse {
    file: FileId,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: String,
}

/// Export job status as reported by the server
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportStatus {
    /// Output is ready for download
    Ready,
    /// Server gave up on the export
    Error,
    /// Any other status; the job is still being prepared
    Pending(String),
}

impl ExportStatus {
    /// Classify a raw status string
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ready" => ExportStatus::Ready,
            "error" => ExportStatus::Error,
            _ => ExportStatus::Pending(raw.to_string()),
        }
    }
}

/// State of one scan's export job
#[derive(Debug)]
pub enum ExportState {
    /// Export not yet submitted
    Requested {
        /// Scan to export
        scan_id: ScanId,
    },
    /// Submitted; waiting for the server to report ready
    Pending {
        /// Job being polled
        handle: ExportHandle,
    },
    /// Terminal success
    Ready(ExportHandle),
    /// Terminal failure
    Failed(ExportError),
}

impl ExportState {
    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportState::Ready(_) | ExportState::Failed(_))
    }
}

/// Tagged result of driving an export job to a terminal state
#[derive(Debug)]
pub enum JobOutcome {
    /// The job is ready; the handle addresses the download
    Ready(ExportHandle),
    /// The job failed; the cause is scoped to this scan
    Failed(ExportError),
}

impl Exporter {
    /// Drive the export of `scan` from request to a terminal state
    ///
    /// Polls are spaced by the configured backoff and bounded by the attempt
    /// and wall-clock budget. This never returns an error: failures come back
    /// as [`JobOutcome::Failed`].
    pub async fn run_export_job(&self, session: &Session, scan: &Scan) -> JobOutcome {
        let mut backoff = Backoff::new(&self.config.poll);
        let mut state = ExportState::Requested { scan_id: scan.id };

        loop {
            state = match state {
                ExportState::Ready(handle) => return JobOutcome::Ready(handle),
                ExportState::Failed(err) => return JobOutcome::Failed(err),
                state => self.advance(session, scan, state, &mut backoff).await,
            };
        }
    }

    /// Perform one transition out of a non-terminal state
    async fn advance(
        &self,
        session: &Session,
        scan: &Scan,
        state: ExportState,
        backoff: &mut Backoff,
    ) -> ExportState {
        match state {
            ExportState::Requested { scan_id } => {
                self.emit_event(Event::ExportRequested {
                    scan_id,
                    name: scan.name.clone(),
                });
                tracing::info!(scan_id = %scan_id, scan_name = %scan.name, "Exporting scan");

                match self.submit_export(session, scan_id).await {
                    Ok(file_id) => ExportState::Pending {
                        handle: ExportHandle { scan_id, file_id },
                    },
                    Err(e) => ExportState::Failed(e),
                }
            }
            ExportState::Pending { handle } => self.poll_once(session, handle, backoff).await,
            terminal => terminal,
        }
    }

    async fn poll_once(
        &self,
        session: &Session,
        handle: ExportHandle,
        backoff: &mut Backoff,
    ) -> ExportState {
        let attempt = backoff.record_attempt();

        match self.export_status(session, handle).await {
            Ok(ExportStatus::Ready) => {
                tracing::debug!(
                    scan_id = %handle.scan_id,
                    file_id = %handle.file_id,
                    attempt,
                    "Export ready"
                );
                self.emit_event(Event::ExportReady {
                    scan_id: handle.scan_id,
                    file_id: handle.file_id,
                });
                ExportState::Ready(handle)
            }
            Ok(ExportStatus::Error) => ExportState::Failed(ExportError::Poll {
                scan_id: handle.scan_id,
                file_id: handle.file_id,
                reason: "server reported the export as errored".to_string(),
            }),
            Ok(ExportStatus::Pending(status)) => {
                let delay = backoff.next_delay();
                if !backoff.has_budget(delay) {
                    return ExportState::Failed(timeout(handle, backoff));
                }

                tracing::trace!(
                    scan_id = %handle.scan_id,
                    file_id = %handle.file_id,
                    attempt,
                    status = %status,
                    delay_ms = delay.as_millis() as u64,
                    "Export not ready yet"
                );
                self.emit_event(Event::ExportPending {
                    scan_id: handle.scan_id,
                    file_id: handle.file_id,
                    attempt,
                    status,
                });

                tokio::time::sleep(delay).await;
                ExportState::Pending { handle }
            }
            Err(e) => ExportState::Failed(e),
        }
    }

    /// Submit an export request and return the job's file id
    pub(crate) async fn submit_export(
        &self,
        session: &Session,
        scan_id: ScanId,
    ) -> Result<FileId, ExportError> {
        let submit_error = |status: Option<u16>, reason: String| ExportError::Submit {
            scan_id,
            status,
            reason,
        };

        let response = self
            .http
            .post(self.url(&format!("/scans/{}/export", scan_id)))
            .header(AUTH_HEADER, session.cookie_header())
            .json(&ExportRequest {
                format: &self.config.export_format,
            })
            .send()
            .await
            .map_err(|e| submit_error(None, describe_transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(submit_error(
                Some(status.as_u16()),
                format!("HTTP {}", status),
            ));
        }

        let body: ExportResponse = response.json().await.map_err(|e| {
            submit_error(
                Some(status.as_u16()),
                format!("malformed export response: {}", e),
            )
        })?;

        tracing::debug!(scan_id = %scan_id, file_id = %body.file, "Export submitted");
        Ok(body.file)
    }

    /// Query the status of a pending export
    pub(crate) async fn export_status(
        &self,
        session: &Session,
        handle: ExportHandle,
    ) -> Result<ExportStatus, ExportError> {
        let poll_error = |reason: String| ExportError::Poll {
            scan_id: handle.scan_id,
            file_id: handle.file_id,
            reason,
        };

        let response = self
            .http
            .get(self.url(&format!(
                "/scans/{}/export/{}/status",
                handle.scan_id, handle.file_id
            )))
            .header(AUTH_HEADER, session.cookie_header())
            .send()
            .await
            .map_err(|e| poll_error(describe_transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(poll_error(format!("HTTP {}", status)));
        }

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| poll_error(format!("malformed status response: {}", e)))?;

        Ok(ExportStatus::parse(&body.status))
    }
}

fn timeout(handle: ExportHandle, backoff: &Backoff) -> ExportError {
    tracing::warn!(
        scan_id = %handle.scan_id,
        file_id = %handle.file_id,
        attempts = backoff.attempts(),
        "Export not ready within poll budget"
    );
    ExportError::Timeout {
        scan_id: handle.scan_id,
        file_id: handle.file_id,
        attempts: backoff.attempts(),
        elapsed_secs: backoff.elapsed().as_secs(),
    }
}
