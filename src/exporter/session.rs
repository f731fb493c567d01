//! Credential exchange for a session token.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, describe_transport_error};
use crate::types::{Event, Session};

use super::Exporter;

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

impl Exporter {
    /// Exchange the configured credentials for a session token
    ///
    /// Called once per run. Any failure, whether transport, TLS, or a
    /// non-success status, is fatal and is not retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] carrying the HTTP status when one was received.
    pub async fn authenticate(&self) -> Result<Session> {
        self.emit_event(Event::LoggingIn);
        tracing::info!(
            base_url = %self.config.api_base(),
            username = %self.config.username,
            "Logging in"
        );

        let response = self
            .http
            .post(self.url("/session"))
            .json(&LoginRequest {
                username: &self.config.username,
                password: &self.config.password,
            })
            .send()
            .await
            .map_err(|e| Error::Auth {
                status: None,
                reason: describe_transport_error(&e),
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "Login rejected");
            return Err(Error::Auth {
                status: Some(status.as_u16()),
                reason: format!("HTTP {}", status),
            });
        }

        let body: LoginResponse = response.json().await.map_err(|e| Error::Auth {
            status: Some(status.as_u16()),
            reason: format!("malformed session response: {}", e),
        })?;

        if body.token.is_empty() {
            return Err(Error::Auth {
                status: Some(status.as_u16()),
                reason: "server returned an empty token".to_string(),
            });
        }

        tracing::info!("Login successful");
        self.emit_event(Event::LoggedIn);
        Ok(Session::new(body.token))
    }
}
