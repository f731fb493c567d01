//! Core types for nessus-export

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Get the inner i64 value
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

id_newtype!(
    /// Server-assigned folder identifier
    FolderId
);
id_newtype!(
    /// Server-assigned scan identifier
    ScanId
);
id_newtype!(
    /// Identifier of a pending or finished export job
    FileId
);

/// Authenticated session token
///
/// Created once per run and shared read-only with every request. The token is
/// never written to logs; `Debug` prints a redacted placeholder.
#[derive(Clone)]
pub struct Session {
    token: String,
}

impl Session {
    /// Wrap a token returned by the session endpoint
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Value for the `X-Cookie` authentication header
    pub fn cookie_header(&self) -> String {
        format!("token={}", self.token)
    }

    /// The raw bearer token
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("token", &"<redacted>").finish()
    }
}

/// A server-side folder grouping scans
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Folder identifier
    pub id: FolderId,
    /// Display name, used as the output subdirectory
    pub name: String,
}

/// Snapshot of a scan taken when the catalog was fetched
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scan {
    /// Scan identifier
    pub id: ScanId,
    /// Scan name, used as the output file stem
    pub name: String,
    /// Owning folder (some server versions omit it for shared scans)
    #[serde(default)]
    pub folder_id: Option<FolderId>,
}

/// Mapping from folder id to folder name
#[derive(Clone, Debug, Default)]
pub struct FolderMap {
    names: HashMap<FolderId, String>,
}

impl FolderMap {
    /// Build the map from a folder listing
    pub fn from_folders(folders: &[Folder]) -> Self {
        Self {
            names: folders.iter().map(|f| (f.id, f.name.clone())).collect(),
        }
    }

    /// Folder name for `id`, or `default` when the folder is unknown
    pub fn name_or<'a>(&'a self, id: Option<FolderId>, default: &'a str) -> &'a str {
        id.and_then(|id| self.names.get(&id))
            .map(String::as_str)
            .unwrap_or(default)
    }

    /// Number of folders known
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no folders are known
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Handle to an export job that reached the ready state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportHandle {
    /// Scan being exported
    pub scan_id: ScanId,
    /// Export job identifier
    pub file_id: FileId,
}

/// A scan that was exported and written to disk
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportedScan {
    /// Scan identifier
    pub scan_id: ScanId,
    /// Scan name
    pub name: String,
    /// Where the export was written
    pub path: PathBuf,
    /// Size of the written file
    pub bytes: u64,
}

/// A scan whose export failed
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedScan {
    /// Scan identifier
    pub scan_id: ScanId,
    /// Scan name
    pub name: String,
    /// Failure class (submit, poll, timeout, download, io)
    pub kind: String,
    /// Rendered cause
    pub error: String,
}

/// Outcome of a whole batch run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Scans exported successfully
    pub exported: Vec<ExportedScan>,
    /// Scans that failed, with cause
    pub failed: Vec<FailedScan>,
    /// Scans never started because the run was cancelled
    pub skipped: usize,
    /// Whether the operator cancelled the run
    pub cancelled: bool,
}

impl ExportSummary {
    /// Total number of scans accounted for
    pub fn total(&self) -> usize {
        self.exported.len() + self.failed.len() + self.skipped
    }
}

/// Events emitted by the exporter
///
/// Consumers subscribe via [`crate::Exporter::subscribe`]; the binary renders
/// these as status lines and progress bars.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Authentication request sent
    LoggingIn,

    /// Session established
    LoggedIn,

    /// Folder listing requested
    RetrievingFolders,

    /// Scan listing requested
    RetrievingScans,

    /// Folders and scans enumerated
    CatalogLoaded {
        /// Number of folders
        folders: usize,
        /// Number of scans
        scans: usize,
    },

    /// Export requested for a scan
    ExportRequested {
        /// Scan identifier
        scan_id: ScanId,
        /// Scan name
        name: String,
    },

    /// Server reported the export as not ready yet
    ExportPending {
        /// Scan identifier
        scan_id: ScanId,
        /// Export job identifier
        file_id: FileId,
        /// Poll attempt number (1-based)
        attempt: u32,
        /// Status string reported by the server
        status: String,
    },

    /// Export is ready for download
    ExportReady {
        /// Scan identifier
        scan_id: ScanId,
        /// Export job identifier
        file_id: FileId,
    },

    /// Download stream opened
    DownloadStarted {
        /// Scan identifier
        scan_id: ScanId,
        /// Scan name
        name: String,
        /// Expected size from the response header, if present
        #[serde(skip_serializing_if = "Option::is_none")]
        total_bytes: Option<u64>,
    },

    /// Download progress
    Downloading {
        /// Scan identifier
        scan_id: ScanId,
        /// Bytes received so far
        received_bytes: u64,
        /// Expected size, if known
        #[serde(skip_serializing_if = "Option::is_none")]
        total_bytes: Option<u64>,
    },

    /// Download complete; writing the export to disk
    Saving {
        /// Scan identifier
        scan_id: ScanId,
        /// Scan name
        name: String,
        /// Destination path
        path: PathBuf,
    },

    /// Export written to disk
    Saved {
        /// Scan identifier
        scan_id: ScanId,
        /// Scan name
        name: String,
        /// Destination path
        path: PathBuf,
        /// Size written
        bytes: u64,
    },

    /// Export of a scan failed; the batch continues
    ScanFailed {
        /// Scan identifier
        scan_id: ScanId,
        /// Scan name
        name: String,
        /// Rendered cause
        error: String,
    },

    /// Cancellation observed; no further exports will start
    Cancelled,

    /// Batch finished
    Finished(ExportSummary),
}
