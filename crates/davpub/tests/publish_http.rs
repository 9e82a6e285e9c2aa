use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use davpub::config::Config;
use davpub::dav::{Credentials, DavClient};
use davpub::error::PublishError;
use davpub::ledger::Ledger;
use davpub::publisher::{PublishMode, Publisher, RunStage};
use davpub::reporter::CollectingReporter;
use tempfile::{TempDir, tempdir};
use tiny_http::{Response, Server, StatusCode};

#[derive(Debug, Clone)]
struct Seen {
    method: String,
    path: String,
    destination: Option<String>,
    depth: Option<String>,
    body: Vec<u8>,
}

struct TestDavServer {
    base_url: String,
    seen: Arc<Mutex<Vec<Seen>>>,
    handle: thread::JoinHandle<()>,
}

impl TestDavServer {
    fn join(self) -> Vec<Seen> {
        self.handle.join().expect("join server");
        let seen = self.seen.lock().expect("lock");
        seen.clone()
    }
}

/// Serves `expected` requests, answering each with `route(method, path)`.
fn spawn_dav_server<F>(expected: usize, mut route: F) -> TestDavServer
where
    F: FnMut(&str, &str) -> u16 + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").expect("server");
    let base_url = format!("http://{}", server.server_addr());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_thread = Arc::clone(&seen);

    let handle = thread::spawn(move || {
        for _ in 0..expected {
            let Some(mut req) = server
                .recv_timeout(Duration::from_secs(10))
                .expect("recv")
            else {
                break;
            };
            let mut body = Vec::new();
            req.as_reader().read_to_end(&mut body).expect("body");
            let header = |name: &str| {
                req.headers()
                    .iter()
                    .find(|h| h.field.to_string().eq_ignore_ascii_case(name))
                    .map(|h| h.value.to_string())
            };
            let entry = Seen {
                method: req.method().to_string(),
                path: req.url().to_string(),
                destination: header("Destination"),
                depth: header("Depth"),
                body,
            };
            let status = route(&entry.method, &entry.path);
            seen_thread.lock().expect("lock").push(entry);
            req.respond(Response::empty(StatusCode(status)))
                .expect("respond");
        }
    });

    TestDavServer {
        base_url,
        seen,
        handle,
    }
}

fn default_status(method: &str) -> u16 {
    match method {
        "HEAD" => 200,
        _ => 201,
    }
}

fn project() -> (TempDir, Config) {
    let td = tempdir().expect("tempdir");
    let dist = td.path().join("dist");
    let docs = td.path().join("docs");
    fs::create_dir_all(&dist).expect("mkdir");
    fs::create_dir_all(&docs).expect("mkdir");
    fs::write(dist.join("dist.zip"), "zip bytes").expect("write");
    fs::write(dist.join("dist.zip.sha1"), "da39a3ee").expect("write");
    fs::write(docs.join("index.html"), "<html></html>").expect("write");

    let mut config = Config::default();
    config.layout.dist_dir = PathBuf::from("dist");
    config.layout.dist_files = vec!["dist.zip".to_string()];
    config.layout.docs_tree = Some(PathBuf::from("docs"));
    config.layout.ledger_file = PathBuf::from("out/published-artifacts.json");
    (td, config)
}

fn publisher(root: &Path, config: &Config, base_url: &str) -> Publisher {
    let dav = DavClient::http(Credentials::new("deploy", "s3cret")).expect("client");
    Publisher::from_config(
        root,
        config,
        PublishMode::Incremental { build_number: 42 },
        base_url,
        dav,
    )
}

fn calls(seen: &[Seen]) -> Vec<(&str, &str)> {
    seen.iter()
        .map(|s| (s.method.as_str(), s.path.as_str()))
        .collect()
}

#[test]
fn incremental_run_publishes_verifies_and_promotes() {
    let (td, config) = project();
    // An existing build collection answers 405; the run carries on.
    let server = spawn_dav_server(11, |method, path| match (method, path) {
        ("MKCOL", "/incremental/42") => 405,
        (m, _) => default_status(m),
    });
    let base = format!("{}/incremental", server.base_url);
    let mut publisher = publisher(td.path(), &config, &base);
    let mut reporter = CollectingReporter::default();

    let receipt = publisher.publish_all(&mut reporter).expect("publish");
    let seen = server.join();

    assert_eq!(
        calls(&seen),
        vec![
            ("MKCOL", "/incremental/42"),
            ("PUT", "/incremental/42/dist.zip"),
            ("PUT", "/incremental/42/dist.zip.sha1"),
            ("HEAD", "/incremental/42/dist.zip"),
            ("HEAD", "/incremental/42/dist.zip.sha1"),
            ("MKCOL", "/incremental/42/html-docs"),
            ("PUT", "/incremental/42/html-docs/index.html"),
            ("PUT", "/incremental/42/published-artifacts.json"),
            ("COPY", "/incremental/42/"),
            ("HEAD", "/incremental/LATEST/dist.zip"),
            ("HEAD", "/incremental/LATEST/dist.zip.sha1"),
        ]
    );

    assert_eq!(seen[1].body, b"zip bytes");
    assert_eq!(
        seen[8].destination.as_deref(),
        Some(format!("{base}/LATEST/").as_str())
    );
    assert_eq!(seen[8].depth.as_deref(), Some("infinity"));

    let expected_ledger = vec![
        format!("{base}/42/dist.zip"),
        format!("{base}/42/dist.zip.sha1"),
        format!("{base}/42/html-docs"),
    ];
    let uploaded: Vec<String> = serde_json::from_slice(&seen[7].body).expect("ledger json");
    assert_eq!(uploaded, expected_ledger);
    assert_eq!(receipt.ledger, expected_ledger);
    assert_eq!(receipt.stage, RunStage::Done);
    assert_eq!(
        receipt.destinations.alias_root.as_deref(),
        Some(format!("{base}/LATEST").as_str())
    );

    let local = Ledger::load(&td.path().join("out/published-artifacts.json")).expect("load");
    assert_eq!(local.entries(), expected_ledger.as_slice());
    assert!(reporter.errors.is_empty());
}

#[test]
fn failed_verification_halts_before_docs_and_promotion() {
    let (td, config) = project();
    let server = spawn_dav_server(4, |method, path| match (method, path) {
        ("HEAD", "/incremental/42/dist.zip") => 404,
        (m, _) => default_status(m),
    });
    let base = format!("{}/incremental", server.base_url);
    let mut publisher = publisher(td.path(), &config, &base);
    let mut reporter = CollectingReporter::default();

    let err = publisher.publish_all(&mut reporter).expect_err("verification");
    let seen = server.join();

    assert_eq!(
        calls(&seen),
        vec![
            ("MKCOL", "/incremental/42"),
            ("PUT", "/incremental/42/dist.zip"),
            ("PUT", "/incremental/42/dist.zip.sha1"),
            ("HEAD", "/incremental/42/dist.zip"),
        ]
    );
    match err.downcast_ref::<PublishError>() {
        Some(PublishError::Verification {
            artifact, status, ..
        }) => {
            assert_eq!(artifact, "dist.zip");
            assert_eq!(status, "404");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(publisher.stage(), RunStage::Failed);
    assert_eq!(publisher.ledger().len(), 2);
    assert!(!td.path().join("out/published-artifacts.json").exists());
}

#[test]
fn server_errors_are_replayed_until_the_upload_lands() {
    let (td, config) = project();
    let mut put_failures = 2;
    let server = spawn_dav_server(13, move |method, path| match (method, path) {
        ("PUT", "/incremental/42/dist.zip") if put_failures > 0 => {
            put_failures -= 1;
            503
        }
        (m, _) => default_status(m),
    });
    let base = format!("{}/incremental", server.base_url);
    let mut publisher = publisher(td.path(), &config, &base);
    let mut reporter = CollectingReporter::default();

    let receipt = publisher.publish_all(&mut reporter).expect("publish");
    let seen = server.join();

    let puts = seen
        .iter()
        .filter(|s| s.method == "PUT" && s.path == "/incremental/42/dist.zip")
        .count();
    assert_eq!(puts, 3);
    assert_eq!(receipt.ledger[0], format!("{base}/42/dist.zip"));
    assert!(
        reporter
            .warns
            .iter()
            .any(|w| w.contains("needed 3 attempts"))
    );
}

#[test]
fn missing_docs_tree_fails_without_contacting_the_server() {
    let (td, config) = project();
    fs::remove_dir_all(td.path().join("docs")).expect("rm");
    let server = spawn_dav_server(0, |method, _| default_status(method));
    let base = format!("{}/incremental", server.base_url);
    let mut publisher = publisher(td.path(), &config, &base);
    let mut reporter = CollectingReporter::default();

    let err = publisher.publish_all(&mut reporter).expect_err("precondition");
    let seen = server.join();

    assert!(seen.is_empty());
    assert!(matches!(
        err.downcast_ref::<PublishError>(),
        Some(PublishError::MissingDocs { .. })
    ));
}
