//! Terminal rendering of exporter events using indicatif.
//!
//! The [`ProgressRenderer`] subscribes to the exporter's event channel and
//! turns events into status lines plus one progress bar per running download.
//! Status lines are printed through the [`MultiProgress`] so they never tear
//! the bars.

use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::types::{Event, ExportSummary, ScanId};

/// Renders [`Event`]s as status lines and download bars
pub struct ProgressRenderer {
    multi: MultiProgress,
    bars: HashMap<ScanId, ProgressBar>,
    quiet: bool,
}

impl ProgressRenderer {
    /// Create a renderer drawing to stderr
    ///
    /// With `quiet` set nothing is drawn; events are still consumed so the
    /// channel never lags.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        let target = if quiet {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr()
        };
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: HashMap::new(),
            quiet,
        }
    }

    /// Consume events until the run finishes or every sender is dropped
    pub async fn run(mut self, mut events: broadcast::Receiver<Event>) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if !self.handle(event) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Progress display fell behind, skipping events");
                }
                Err(RecvError::Closed) => break,
            }
        }
        self.clear();
    }

    /// Apply one event; returns false once the run has finished
    fn handle(&mut self, event: Event) -> bool {
        if let Some(message) = status_line(&event) {
            self.line(&message);
        }

        match event {
            Event::DownloadStarted {
                scan_id,
                name,
                total_bytes,
            } => self.start_bar(scan_id, &name, total_bytes),
            Event::Downloading {
                scan_id,
                received_bytes,
                ..
            } => {
                if let Some(bar) = self.bars.get(&scan_id) {
                    bar.set_position(received_bytes);
                }
            }
            Event::Saving { scan_id, .. }
            | Event::Saved { scan_id, .. }
            | Event::ScanFailed { scan_id, .. } => self.remove_bar(scan_id),
            Event::Cancelled => self.clear(),
            Event::Finished(_) => return false,
            _ => {}
        }
        true
    }

    fn start_bar(&mut self, scan_id: ScanId, name: &str, total_bytes: Option<u64>) {
        if self.quiet {
            return;
        }

        let bar = match total_bytes {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(download_style());
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(spinner_style());
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            }
        };
        bar.set_message(format!("Downloading {}", name));

        let bar = self.multi.add(bar);
        if let Some(previous) = self.bars.insert(scan_id, bar) {
            previous.finish_and_clear();
        }
    }

    fn remove_bar(&mut self, scan_id: ScanId) {
        if let Some(bar) = self.bars.remove(&scan_id) {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }

    fn clear(&mut self) {
        for (_, bar) in self.bars.drain() {
            bar.finish_and_clear();
        }
    }

    fn line(&self, message: &str) {
        if self.quiet {
            return;
        }
        // Fails only if the terminal is gone
        self.multi.println(message).ok();
    }
}

/// Status line printed for an event, if it has one
fn status_line(event: &Event) -> Option<String> {
    let line = match event {
        Event::LoggingIn => "Logging in...".to_string(),
        Event::LoggedIn => "Login successful.".to_string(),
        Event::RetrievingFolders => "Retrieving folders...".to_string(),
        Event::RetrievingScans => "Retrieving scans...".to_string(),
        Event::CatalogLoaded { folders, scans } => {
            format!("Found {} scans in {} folders.", scans, folders)
        }
        Event::ExportRequested { name, .. } => format!("Exporting scan '{}'...", name),
        Event::Saving { path, .. } => format!("Saving scan to '{}'...", path.display()),
        Event::Saved { name, path, .. } => {
            format!("Scan '{}' saved to '{}'.", name, path.display())
        }
        Event::ScanFailed { name, error, .. } => {
            format!("Failed to export scan '{}': {}", name, error)
        }
        _ => return None,
    };
    Some(line)
}

/// Byte progress with throughput, for downloads with a known size
fn download_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} [speed: {bytes_per_sec}] (ETA: {eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█>-")
}

/// Spinner with running byte count, for downloads without a size header
fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg} {bytes} [speed: {bytes_per_sec}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
}

/// Final report printed after the run
pub fn render_summary(summary: &ExportSummary) -> String {
    let mut out = format!(
        "Exported {} of {} scans",
        summary.exported.len(),
        summary.total()
    );
    if !summary.failed.is_empty() {
        out.push_str(&format!(", {} failed", summary.failed.len()));
    }
    if summary.skipped > 0 {
        out.push_str(&format!(", {} skipped", summary.skipped));
    }
    out.push('.');

    for failed in &summary.failed {
        out.push_str(&format!("\n  {} ({}): {}", failed.name, failed.kind, failed.error));
    }
    out
}
