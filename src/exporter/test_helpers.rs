//! Shared test helpers for creating Exporter instances against a mock scanner.

use crate::config::{Config, PollConfig};
use crate::exporter::Exporter;
use crate::types::Session;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub(crate) const TEST_TOKEN: &str = "test-token";

/// Config pointing at `server`, writing under `output_dir`, with fast polling
pub(crate) fn test_config(server: &MockServer, output_dir: &Path) -> Config {
    test_config_for(&server.uri(), output_dir)
}

/// Same as [`test_config`] for a scanner that is not a [`MockServer`]
pub(crate) fn test_config_for(base_url: &str, output_dir: &Path) -> Config {
    let mut config = Config::new(base_url, "admin", "secret");
    config.output_dir = output_dir.to_path_buf();
    config.download_chunk_size = 1024;
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

/// Exporter against `server`; keep the returned TempDir alive for the test
pub(crate) fn create_test_exporter(server: &MockServer) -> (Exporter, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::new(test_config(server, temp_dir.path())).unwrap();
    (exporter, temp_dir)
}

pub(crate) fn test_session() -> Session {
    Session::new(TEST_TOKEN)
}

pub(crate) fn auth_cookie() -> String {
    format!("token={}", TEST_TOKEN)
}

pub(crate) async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/session"))
        .and(body_json(json!({"username": "admin", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": TEST_TOKEN})))
        .mount(server)
        .await;
}

pub(crate) async fn mount_catalog(
    server: &MockServer,
    folders: serde_json::Value,
    scans: serde_json::Value,
) {
    Mock::given(method("GET"))
        .and(path("/folders"))
        .and(header("X-Cookie", auth_cookie().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"folders": folders})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/scans"))
        .and(header("X-Cookie", auth_cookie().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"scans": scans})))
        .mount(server)
        .await;
}

/// Mount a full export lifecycle: submit returns `file_id`, the status
/// endpoint walks through `statuses` (the last one repeats), and the
/// download serves `body`
pub(crate) async fn mount_export(
    server: &MockServer,
    scan_id: i64,
    file_id: i64,
    statuses: &[&str],
    body: &[u8],
) {
    Mock::given(method("POST"))
        .and(path(format!("/scans/{}/export", scan_id)))
        .and(header("X-Cookie", auth_cookie().as_str()))
        .and(body_json(json!({"format": "nessus"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file": file_id})))
        .mount(server)
        .await;

    mount_statuses(server, scan_id, file_id, statuses).await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/scans/{}/export/{}/download",
            scan_id, file_id
        )))
        .and(header("X-Cookie", auth_cookie().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Status sequence: each entry but the last answers exactly once, in order
pub(crate) async fn mount_statuses(
    server: &MockServer,
    scan_id: i64,
    file_id: i64,
    statuses: &[&str],
) {
    let status_path = format!("/scans/{}/export/{}/status", scan_id, file_id);
    let Some((last, leading)) = statuses.split_last() else {
        return;
    };

    for (i, status) in leading.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path(status_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": status})))
            .up_to_n_times(1)
            .with_priority(1 + i as u8)
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path(status_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": last})))
        .with_priority(u8::MAX)
        .mount(server)
        .await;
}

/// Raw scanner whose download advertises `advertised` bytes but sends only
/// `sent` before closing the connection
///
/// Submit answers with file 77 and every status poll answers ready, so a
/// full export of any scan reaches the truncated download. Returns the base
/// URL.
pub(crate) async fn spawn_truncating_server(advertised: usize, sent: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut stream = BufReader::new(stream);

                let mut request_line = String::new();
                stream.read_line(&mut request_line).await.unwrap();
                let mut content_length = 0;
                loop {
                    let mut line = String::new();
                    stream.read_line(&mut line).await.unwrap();
                    if line.trim().is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':')
                        && name.eq_ignore_ascii_case("content-length")
                    {
                        content_length = value.trim().parse().unwrap();
                    }
                }
                let mut body = vec![0u8; content_length];
                stream.read_exact(&mut body).await.unwrap();

                let target = request_line.split_whitespace().nth(1).unwrap_or_default();
                let response = if target.ends_with("/download") {
                    let mut response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n",
                        advertised
                    )
                    .into_bytes();
                    response.extend(std::iter::repeat_n(b'x', sent));
                    response
                } else {
                    let json = if target.ends_with("/status") {
                        r#"{"status":"ready"}"#
                    } else {
                        r#"{"file":77}"#
                    };
                    format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                        json.len(),
                        json
                    )
                    .into_bytes()
                };

                let mut stream = stream.into_inner();
                stream.write_all(&response).await.unwrap();
                stream.flush().await.unwrap();
                stream.shutdown().await.ok();
            });
        }
    });

    format!("http://{}", addr)
}
