//! Streaming download of a finished export.

use futures::TryStreamExt;
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;

use crate::error::{ExportError, describe_transport_error};
use crate::types::{ExportHandle, Session};

use super::{AUTH_HEADER, Exporter};

/// Cap on the up-front buffer reservation taken from the size header
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Receives progress while an export downloads
///
/// Any `FnMut(u64)` closure is an observer that only sees the per-chunk byte
/// increments.
pub trait DownloadObserver {
    /// Called once the response headers arrive, with the expected size if the
    /// server sent one
    fn on_start(&mut self, _total_bytes: Option<u64>) {}

    /// Called once per chunk with the number of bytes just received
    fn on_progress(&mut self, increment: u64);
}

impl<F: FnMut(u64)> DownloadObserver for F {
    fn on_progress(&mut self, increment: u64) {
        self(increment)
    }
}

impl Exporter {
    /// Download a ready export into memory
    ///
    /// The body is read in chunks of at most `download_chunk_size` bytes and
    /// `observer` is told about each one. Nothing touches the disk here; the
    /// caller persists the returned buffer only after the stream completed.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Download`] on a non-success status, a broken
    /// stream, or a body shorter than the advertised size.
    pub async fn download_export<O: DownloadObserver + ?Sized>(
        &self,
        session: &Session,
        handle: ExportHandle,
        observer: &mut O,
    ) -> Result<Vec<u8>, ExportError> {
        let download_error = |reason: String| ExportError::Download {
            scan_id: handle.scan_id,
            file_id: handle.file_id,
            reason,
        };

        let response = self
            .http
            .get(self.url(&format!(
                "/scans/{}/export/{}/download",
                handle.scan_id, handle.file_id
            )))
            .header(AUTH_HEADER, session.cookie_header())
            .send()
            .await
            .map_err(|e| download_error(describe_transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_error(format!("HTTP {}", status)));
        }

        let total_bytes = response.content_length();
        observer.on_start(total_bytes);
        tracing::debug!(
            scan_id = %handle.scan_id,
            file_id = %handle.file_id,
            total_bytes,
            "Download started"
        );

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let reader = StreamReader::new(stream);
        tokio::pin!(reader);

        let mut chunk = vec![0u8; self.config.download_chunk_size];
        let mut content =
            Vec::with_capacity(total_bytes.unwrap_or(0).min(MAX_PREALLOCATION) as usize);

        loop {
            let read = reader
                .read(&mut chunk)
                .await
                .map_err(|e| download_error(format!("stream interrupted: {}", e)))?;
            if read == 0 {
                break;
            }
            content.extend_from_slice(&chunk[..read]);
            observer.on_progress(read as u64);
        }

        if let Some(expected) = total_bytes
            && content.len() as u64 != expected
        {
            return Err(download_error(format!(
                "received {} of {} bytes",
                content.len(),
                expected
            )));
        }

        tracing::debug!(
            scan_id = %handle.scan_id,
            bytes = content.len(),
            "Download complete"
        );
        Ok(content)
    }
}
