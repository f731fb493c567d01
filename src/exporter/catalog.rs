//! Folder and scan enumeration.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result, describe_transport_error};
use crate::types::{Event, Folder, Scan, Session};

use super::{AUTH_HEADER, Exporter};

// The server sends `null` instead of an empty list when nothing exists
#[derive(Deserialize)]
struct FoldersResponse {
    #[serde(default)]
    folders: Option<Vec<Folder>>,
}

#[derive(Deserialize)]
struct ScansResponse {
    #[serde(default)]
    scans: Option<Vec<Scan>>,
}

impl Exporter {
    /// List all folders visible to the session
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on transport failure, non-success status, or a
    /// malformed body.
    pub async fn list_folders(&self, session: &Session) -> Result<Vec<Folder>> {
        self.emit_event(Event::RetrievingFolders);
        tracing::info!("Retrieving folders");
        let body: FoldersResponse = self.get_catalog(session, "/folders").await?;
        let folders = body.folders.unwrap_or_default();
        tracing::info!(count = folders.len(), "Folders retrieved");
        Ok(folders)
    }

    /// List all scans visible to the session
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on transport failure, non-success status, or a
    /// malformed body.
    pub async fn list_scans(&self, session: &Session) -> Result<Vec<Scan>> {
        self.emit_event(Event::RetrievingScans);
        tracing::info!("Retrieving scans");
        let body: ScansResponse = self.get_catalog(session, "/scans").await?;
        let scans = body.scans.unwrap_or_default();
        tracing::info!(count = scans.len(), "Scans retrieved");
        Ok(scans)
    }

    async fn get_catalog<T: DeserializeOwned>(&self, session: &Session, endpoint: &str) -> Result<T> {
        let api_error = |status: Option<u16>, reason: String| Error::Api {
            endpoint: endpoint.to_string(),
            status,
            reason,
        };

        let response = self
            .http
            .get(self.url(endpoint))
            .header(AUTH_HEADER, session.cookie_header())
            .send()
            .await
            .map_err(|e| api_error(None, describe_transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(endpoint, status = status.as_u16(), "Catalog request failed");
            return Err(api_error(Some(status.as_u16()), format!("HTTP {}", status)));
        }

        response.json::<T>().await.map_err(|e| {
            api_error(
                Some(status.as_u16()),
                format!("malformed response body: {}", e),
            )
        })
    }
}
