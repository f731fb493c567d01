//! Mock Nessus scanner built on wiremock

use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use nessus_export::{Config, PollConfig};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";
pub const TOKEN: &str = "integration-token";

/// A wiremock server answering the scanner's session, catalog and export endpoints
pub struct MockScanner {
    pub server: MockServer,
}

impl MockScanner {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Exporter config against this scanner with a fast poll schedule
    pub fn config(&self, output_dir: &Path) -> Config {
        let mut config = Config::new(self.uri(), USERNAME, PASSWORD);
        config.output_dir = output_dir.to_path_buf();
        config.poll = PollConfig {
            initial_interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(20),
            backoff_multiplier: 2.0,
            max_attempts: 10,
            max_wait: Duration::from_secs(10),
            jitter: false,
        };
        config
    }

    /// Accept the test credentials
    pub async fn accept_login(&self) {
        Mock::given(method("POST"))
            .and(path("/session"))
            .and(body_json(json!({"username": USERNAME, "password": PASSWORD})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": TOKEN})))
            .mount(&self.server)
            .await;
    }

    /// Reject every login with `status`
    pub async fn reject_login(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({"error": "Invalid Credentials"})))
            .mount(&self.server)
            .await;
    }

    /// Serve the folder and scan listings; `expected` pins how often each is called
    pub async fn catalog(&self, folders: Value, scans: Value, expected: Option<u64>) {
        let folders_mock = Mock::given(method("GET"))
            .and(path("/folders"))
            .and(header("X-Cookie", cookie().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"folders": folders})));
        let scans_mock = Mock::given(method("GET"))
            .and(path("/scans"))
            .and(header("X-Cookie", cookie().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"scans": scans})));

        match expected {
            Some(n) => {
                folders_mock.expect(n).mount(&self.server).await;
                scans_mock.expect(n).mount(&self.server).await;
            }
            None => {
                folders_mock.mount(&self.server).await;
                scans_mock.mount(&self.server).await;
            }
        }
    }

    /// Export lifecycle for one scan: submit, status sequence (last repeats), download
    pub async fn export(&self, scan_id: i64, file_id: i64, statuses: &[&str], body: &[u8]) {
        Mock::given(method("POST"))
            .and(path(format!("/scans/{}/export", scan_id)))
            .and(header("X-Cookie", cookie().as_str()))
            .and(body_json(json!({"format": "nessus"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file": file_id})))
            .mount(&self.server)
            .await;

        let status_path = format!("/scans/{}/export/{}/status", scan_id, file_id);
        if let Some((last, leading)) = statuses.split_last() {
            for (i, status) in leading.iter().enumerate() {
                Mock::given(method("GET"))
                    .and(path(status_path.as_str()))
                    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": status})))
                    .up_to_n_times(1)
                    .with_priority(1 + i as u8)
                    .mount(&self.server)
                    .await;
            }
            Mock::given(method("GET"))
                .and(path(status_path.as_str()))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": last})))
                .with_priority(u8::MAX)
                .mount(&self.server)
                .await;
        }

        Mock::given(method("GET"))
            .and(path(format!("/scans/{}/export/{}/download", scan_id, file_id)))
            .and(header("X-Cookie", cookie().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(&self.server)
            .await;
    }

    /// Reject the export request for `scan_id` with `status`
    pub async fn reject_export(&self, scan_id: i64, status: u16) {
        Mock::given(method("POST"))
            .and(path(format!("/scans/{}/export", scan_id)))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }
}

pub fn cookie() -> String {
    format!("token={}", TOKEN)
}
