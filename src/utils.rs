//! Output path resolution and durable file writes

use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Suffix of the scratch file written before the final rename
const PARTIAL_SUFFIX: &str = "part";

/// Make a server-provided name safe to use as a single path component
///
/// Path separators and NUL bytes become `_`, and names that would be empty
/// or refer to the current or parent directory are replaced by `_`.
/// Everything else, including surrounding spaces and unicode, is kept as-is.
///
/// # Examples
///
/// ```
/// use nessus_export::utils::sanitize_component;
///
/// assert_eq!(sanitize_component("Web Apps"), "Web Apps");
/// assert_eq!(sanitize_component("DMZ/Hosts"), "DMZ_Hosts");
/// assert_eq!(sanitize_component(".."), "_");
/// ```
#[must_use]
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Destination of a scan export: `output_root/folder_name/scan_name.extension`
///
/// # Examples
///
/// ```
/// use nessus_export::utils::resolve_path;
/// use std::path::Path;
///
/// let path = resolve_path(Path::new("export"), "Web", "ScanA", "nessus");
/// assert_eq!(path, Path::new("export/Web/ScanA.nessus"));
/// ```
#[must_use]
pub fn resolve_path(
    output_root: &Path,
    folder_name: &str,
    scan_name: &str,
    extension: &str,
) -> PathBuf {
    let file_name = format!("{}.{}", sanitize_component(scan_name), extension);
    output_root
        .join(sanitize_component(folder_name))
        .join(file_name)
}

/// Write `bytes` to `path`, creating parent directories as needed
///
/// The content is written to a sibling `.part` file which is flushed, synced,
/// and then renamed over `path`. An existing file at `path` is replaced (last
/// write wins) but is never left half-written: on any failure the scratch file
/// is removed and the previous content stays in place.
///
/// # Errors
///
/// Returns the underlying I/O error if the directories cannot be created or
/// the file cannot be written or renamed.
pub async fn persist(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let partial = partial_path(path);
    let result = write_and_rename(&partial, path, bytes).await;
    if result.is_err() {
        // Best effort; the scratch file may not exist if creation failed
        let _ = tokio::fs::remove_file(&partial).await;
    }
    result
}

async fn write_and_rename(partial: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    {
        let mut file = tokio::fs::File::create(partial).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
    }
    tokio::fs::rename(partial, path).await
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}
