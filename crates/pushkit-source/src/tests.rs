use super::*;
use ed25519_dalek::{Signer, SigningKey};
use pushkit_core::{
    Platform, RawUpdateInfo, ReleaseEntry, ReleaseHistory, ReleaseHistoryFetcher, ReleaseLabel,
    UpdateCheckRequest, UpdateCheckResponse, UpdateOracle,
};
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

#[test]
fn history_path_follows_platform_identifier_version_layout() {
    let path = history_path(Platform::Android, "production", "1.2.0").expect("must build path");
    assert_eq!(path, "histories/android/production/1.2.0.json");
}

#[test]
fn history_path_rejects_traversal_segments() {
    let err = history_path(Platform::Ios, "..", "1.0.0").expect_err("must reject '..'");
    assert!(err.to_string().contains("invalid deployment identifier"));

    let err = history_path(Platform::Ios, "production", "1.0/../../etc")
        .expect_err("must reject separators");
    assert!(err.to_string().contains("invalid app version"));
}

#[test]
fn fs_source_treats_missing_history_as_empty() {
    let root = test_source_root();
    let source = FsHistorySource::new(&root, Platform::Android, "production");

    let history = source
        .fetch_history(&check_request("1.0.0"))
        .expect("missing history must not fail");
    assert!(history.is_empty());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn fs_source_reads_history_for_requested_binary() {
    let root = test_source_root();
    write_history(&root, "1.0.0", &history_json(&[("v1", "h1"), ("v2", "h2")]));
    write_history(&root, "2.0.0", &history_json(&[("v9", "h9")]));
    let source = FsHistorySource::new(&root, Platform::Android, "production");

    let history = source
        .fetch_history(&check_request("1.0.0"))
        .expect("must read history");

    let labels: Vec<String> = history.iter().map(|(label, _)| label.to_string()).collect();
    assert_eq!(labels, vec!["v1", "v2"]);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn fs_source_accepts_valid_signature() {
    let root = test_source_root();
    let key = signing_key();
    let body = history_json(&[("v1", "h1")]);
    let path = write_history(&root, "1.0.0", &body);
    write_signature(&path, &key, body.as_bytes());
    let source = FsHistorySource::new(&root, Platform::Android, "production")
        .with_public_key(public_key_hex(&key));

    let history = source
        .fetch_history(&check_request("1.0.0"))
        .expect("signed history must load");
    assert_eq!(history.len(), 1);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn fs_source_rejects_tampered_history() {
    let root = test_source_root();
    let key = signing_key();
    let body = history_json(&[("v1", "h1")]);
    let path = write_history(&root, "1.0.0", &body);
    write_signature(&path, &key, body.as_bytes());
    fs::write(&path, history_json(&[("v1", "evil")])).expect("must tamper history");
    let source = FsHistorySource::new(&root, Platform::Android, "production")
        .with_public_key(public_key_hex(&key));

    let err = source
        .fetch_history(&check_request("1.0.0"))
        .expect_err("tampered history must be rejected");
    assert!(format!("{err:#}").contains("signature"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn fs_source_rejects_signature_from_other_key() {
    let root = test_source_root();
    let body = history_json(&[("v1", "h1")]);
    let path = write_history(&root, "1.0.0", &body);
    write_signature(&path, &SigningKey::from_bytes(&[9u8; 32]), body.as_bytes());
    let source = FsHistorySource::new(&root, Platform::Android, "production")
        .with_public_key(public_key_hex(&signing_key()));

    let err = source
        .fetch_history(&check_request("1.0.0"))
        .expect_err("foreign signature must be rejected");
    assert!(format!("{err:#}").contains("does not match"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn fs_source_requires_signature_when_key_is_configured() {
    let root = test_source_root();
    write_history(&root, "1.0.0", &history_json(&[("v1", "h1")]));
    let source = FsHistorySource::new(&root, Platform::Android, "production")
        .with_public_key(public_key_hex(&signing_key()));

    let err = source
        .fetch_history(&check_request("1.0.0"))
        .expect_err("unsigned history must be rejected");
    assert!(err.to_string().contains("failed reading release history signature"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn fs_source_rejects_out_of_range_rollout() {
    let root = test_source_root();
    write_history(
        &root,
        "1.0.0",
        r#"{"v1":{"downloadUrl":"https://example.test/v1.zip","enabled":true,"packageHash":"h1","mandatory":false,"rollout":150}}"#,
    );
    let source = FsHistorySource::new(&root, Platform::Android, "production");

    let err = source
        .fetch_history(&check_request("1.0.0"))
        .expect_err("rollout above 100 must be rejected");
    assert!(format!("{err:#}").contains("rollout must be between 0 and 100"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn http_source_fetches_history_and_signature() {
    let key = signing_key();
    let body = history_json(&[("v1", "h1"), ("v2", "h2")]);
    let signature = hex::encode(key.sign(body.as_bytes()).to_bytes());
    let server = OneShotServer::start(vec![
        (200, body.into_bytes()),
        (200, signature.into_bytes()),
    ]);
    let source = HttpHistorySource::new(server.base_url(), Platform::Ios, "staging")
        .expect("must build source")
        .with_public_key(public_key_hex(&key));

    let history = source
        .fetch_history(&check_request("3.1.0"))
        .expect("must fetch signed history");
    assert_eq!(history.len(), 2);

    let requests = server.finish();
    assert_eq!(
        requests[0].request_line,
        "GET /histories/ios/staging/3.1.0.json HTTP/1.1"
    );
    assert_eq!(
        requests[1].request_line,
        "GET /histories/ios/staging/3.1.0.json.sig HTTP/1.1"
    );
}

#[test]
fn http_source_treats_not_found_as_empty_history() {
    let server = OneShotServer::start(vec![(404, b"not found".to_vec())]);
    let source = HttpHistorySource::new(
        format!("{}/", server.base_url()),
        Platform::Android,
        "production",
    )
    .expect("must build source");

    let history = source
        .fetch_history(&check_request("1.0.0"))
        .expect("404 must not fail");
    assert!(history.is_empty());

    let requests = server.finish();
    assert_eq!(
        requests[0].request_line,
        "GET /histories/android/production/1.0.0.json HTTP/1.1"
    );
}

#[test]
fn http_source_surfaces_server_errors() {
    let server = OneShotServer::start(vec![(500, b"boom".to_vec())]);
    let source = HttpHistorySource::new(server.base_url(), Platform::Android, "production")
        .expect("must build source");

    let err = source
        .fetch_history(&check_request("1.0.0"))
        .expect_err("server error must fail the fetch");
    assert!(err.to_string().contains("request rejected"));

    server.finish();
}

#[test]
fn oracle_posts_request_and_decodes_descriptor() {
    let response = UpdateCheckResponse {
        update_info: Some(RawUpdateInfo {
            download_url: Some("https://example.test/v4.zip".to_string()),
            is_available: true,
            label: Some("v4".to_string()),
            package_hash: Some("h4".to_string()),
            package_size: Some(4096),
            target_binary_range: Some("1.0.0".to_string()),
            ..RawUpdateInfo::default()
        }),
    };
    let server = OneShotServer::start(vec![(
        200,
        serde_json::to_vec(&response).expect("must encode response"),
    )]);
    let oracle = HttpUpdateOracle::new(format!("{}/updateCheck", server.base_url()))
        .expect("must build oracle");

    let decoded = oracle
        .check(&check_request("1.0.0"))
        .expect("must decode response");
    assert_eq!(decoded, response);

    let requests = server.finish();
    assert_eq!(requests[0].request_line, "POST /updateCheck HTTP/1.1");
    let sent: UpdateCheckRequest =
        serde_json::from_slice(&requests[0].body).expect("request body must be JSON");
    assert_eq!(sent, check_request("1.0.0"));
}

#[test]
fn oracle_reports_malformed_response() {
    let server = OneShotServer::start(vec![(200, b"<html>".to_vec())]);
    let oracle = HttpUpdateOracle::new(server.base_url()).expect("must build oracle");

    let err = oracle
        .check(&check_request("1.0.0"))
        .expect_err("malformed body must fail");
    assert!(err.to_string().contains("failed parsing update check response"));

    server.finish();
}

fn check_request(app_version: &str) -> UpdateCheckRequest {
    UpdateCheckRequest {
        app_version: app_version.to_string(),
        package_hash: None,
        is_companion: false,
        label: None,
        client_unique_id: "device-1".to_string(),
    }
}

fn history_json(releases: &[(&str, &str)]) -> String {
    let history: ReleaseHistory = releases
        .iter()
        .map(|(label, hash)| {
            (
                ReleaseLabel::parse(label).expect("must parse label"),
                ReleaseEntry {
                    download_url: format!("https://example.test/{hash}.zip"),
                    enabled: true,
                    package_hash: hash.to_string(),
                    mandatory: false,
                    rollout: None,
                    description: None,
                },
            )
        })
        .collect();
    serde_json::to_string_pretty(&history).expect("must serialize history")
}

fn write_history(root: &Path, app_version: &str, body: &str) -> PathBuf {
    let path = root
        .join("histories")
        .join("android")
        .join("production")
        .join(format!("{app_version}.json"));
    fs::create_dir_all(path.parent().expect("history path has a parent"))
        .expect("must create history dir");
    fs::write(&path, body).expect("must write history");
    path
}

fn write_signature(history_path: &Path, signing_key: &SigningKey, payload: &[u8]) {
    let signature = signing_key.sign(payload);
    fs::write(
        history_path.with_extension("json.sig"),
        hex::encode(signature.to_bytes()),
    )
    .expect("must write signature sidecar");
}

fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

fn public_key_hex(signing_key: &SigningKey) -> String {
    hex::encode(signing_key.verifying_key().to_bytes())
}

static TEST_SOURCE_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_source_root() -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let counter = TEST_SOURCE_ROOT_COUNTER.fetch_add(1, Ordering::SeqCst);
    path.push(format!(
        "pushkit-source-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        counter
    ));
    path
}

struct CapturedRequest {
    request_line: String,
    body: Vec<u8>,
}

/// Loopback HTTP responder that answers one connection per scripted response.
struct OneShotServer {
    base_url: String,
    handle: thread::JoinHandle<Vec<CapturedRequest>>,
}

impl OneShotServer {
    fn start(responses: Vec<(u16, Vec<u8>)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("must bind loopback listener");
        let base_url = format!(
            "http://{}",
            listener.local_addr().expect("listener has an address")
        );
        let handle = thread::spawn(move || {
            let mut captured = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().expect("must accept connection");
                captured.push(read_request(&mut stream));
                let head = format!(
                    "HTTP/1.1 {status} Scripted\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                stream
                    .write_all(head.as_bytes())
                    .expect("must write response head");
                stream.write_all(&body).expect("must write response body");
            }
            captured
        });
        Self { base_url, handle }
    }

    fn base_url(&self) -> String {
        self.base_url.clone()
    }

    fn finish(self) -> Vec<CapturedRequest> {
        self.handle.join().expect("server thread must not panic")
    }
}

fn read_request(stream: &mut impl Read) -> CapturedRequest {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let read = stream.read(&mut chunk).expect("must read request");
        assert!(read > 0, "connection closed before headers were complete");
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .map(|(_, value)| value.trim().parse::<usize>().expect("numeric content-length"))
        .unwrap_or(0);
    while buffer.len() < header_end + content_length {
        let read = stream.read(&mut chunk).expect("must read request body");
        assert!(read > 0, "connection closed before body was complete");
        buffer.extend_from_slice(&chunk[..read]);
    }

    CapturedRequest {
        request_line: head.lines().next().unwrap_or_default().to_string(),
        body: buffer[header_end..header_end + content_length].to_vec(),
    }
}
