use assert_cmd::cargo::{cargo_bin_cmd, CommandCargoExt};
use reqwest::blocking::Client;
use serde_json::Value;
use std::net::TcpListener;
use std::path::Path;
use std::process::{Child, Command};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

const FIXTURE_DIR: &str = "tests/fixtures/doxygen_search";

struct TestDaemon {
    base_url: String,
    child: Child,
}

impl TestDaemon {
    fn spawn() -> Self {
        // Bind an ephemeral port first so we know which port to pass
        // to the CLI `doxsearch serve` subcommand.
        let listener =
            TcpListener::bind("127.0.0.1:0").expect("bind ephemeral TCP listener for daemon");
        let port = listener
            .local_addr()
            .expect("local_addr for daemon listener")
            .port();
        drop(listener);

        let addr_arg = format!("127.0.0.1:{port}");
        let base_url = format!("http://{addr_arg}");

        // Capture daemon output to temp files for debugging failed runs.
        let log_dir = std::env::temp_dir();
        let stdout_file = std::fs::File::create(
            log_dir.join(format!("doxsearch_daemon_{port}_stdout.log")),
        )
        .expect("create daemon stdout log file");
        let stderr_file = std::fs::File::create(
            log_dir.join(format!("doxsearch_daemon_{port}_stderr.log")),
        )
        .expect("create daemon stderr log file");

        let mut cmd = Command::cargo_bin("doxsearch").expect("locate doxsearch binary");
        cmd.args(["serve", "--addr", &addr_arg])
            .env("DOXSEARCH_LOG", "info")
            .stdout(stdout_file)
            .stderr(stderr_file);
        let child = cmd.spawn().expect("spawn doxsearch serve daemon");

        wait_for_health(&base_url);

        Self { base_url, child }
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn wait_for_health(base_url: &str) {
    let client = Client::new();
    let url = format!("{}/v1/health", base_url);

    let mut last_err = None;
    for _ in 0..150 {
        match client.get(&url).send() {
            Ok(resp) if resp.status().is_success() => return,
            Err(e) => {
                last_err = Some(format!("HTTP error: {}", e));
                thread::sleep(Duration::from_millis(100));
            }
            Ok(resp) => {
                last_err = Some(format!("unexpected status: {}", resp.status()));
                thread::sleep(Duration::from_millis(100));
            }
        }
    }

    panic!(
        "doxsearch HTTP daemon did not become healthy in time. Last error: {}",
        last_err.unwrap_or_else(|| "unknown".to_string())
    );
}

fn run_json(args: &[&str]) -> Value {
    let mut cmd = cargo_bin_cmd!("doxsearch");
    cmd.args(args);
    let assert = cmd.assert().success();
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json output")
}

#[test]
fn cli_serve_health_endpoint_reports_ok_status() {
    let daemon = TestDaemon::spawn();
    let client = Client::new();
    let url = format!("{}/v1/health", daemon.base_url);

    let resp = client.get(&url).send().expect("health response");
    assert!(resp.status().is_success());

    let value: Value = resp.json().expect("valid health JSON body");
    assert_eq!(value["status"], "ok");
}

#[test]
fn cli_search_via_server_matches_local_search() {
    let daemon = TestDaemon::spawn();

    for pattern in ["addParticles", "scope:ItoParticle", "name:tag|tmp section:functions"] {
        let local = run_json(&["search", pattern, "--path", FIXTURE_DIR, "--format", "json"]);
        let remote = run_json(&[
            "search",
            pattern,
            "--path",
            FIXTURE_DIR,
            "--format",
            "json",
            "--server",
            &daemon.base_url,
        ]);

        assert_eq!(
            local, remote,
            "daemon-backed search should match local CLI search for `{pattern}`"
        );
    }
}

#[test]
fn cli_validate_via_server_matches_local_validate() {
    let daemon = TestDaemon::spawn();

    let local = run_json(&["validate", "--path", FIXTURE_DIR, "--format", "json"]);
    let remote = run_json(&[
        "validate",
        "--path",
        FIXTURE_DIR,
        "--format",
        "json",
        "--server",
        &daemon.base_url,
    ]);
    assert_eq!(local, remote);
    assert_eq!(remote["summary"]["passed"], true);

    let mut broken = cargo_bin_cmd!("doxsearch");
    broken.args([
        "validate",
        "--path",
        "tests/fixtures/broken_search",
        "--server",
        &daemon.base_url,
    ]);
    broken.assert().failure();
}

fn assert_index_parity_via_daemon(backend: &str, index_path: &Path) {
    let daemon = TestDaemon::spawn();
    let index_path = index_path.to_str().unwrap();

    let base = run_json(&["search", "key:t", "--path", FIXTURE_DIR, "--format", "json"]);

    let summary = run_json(&[
        "index",
        "--path",
        FIXTURE_DIR,
        "--index-backend",
        backend,
        "--index-path",
        index_path,
        "--format",
        "json",
        "--server",
        &daemon.base_url,
    ]);
    assert_eq!(summary["backend"], backend);
    assert_eq!(summary["entries_indexed"], 102);

    let info = run_json(&[
        "index-info",
        "--index-backend",
        backend,
        "--index-path",
        index_path,
        "--format",
        "json",
        "--server",
        &daemon.base_url,
    ]);
    assert_eq!(info["files_indexed"], 2);

    let indexed = run_json(&[
        "search",
        "key:t",
        "--path",
        FIXTURE_DIR,
        "--format",
        "json",
        "--use-index",
        "--index-backend",
        backend,
        "--index-path",
        index_path,
        "--server",
        &daemon.base_url,
    ]);

    assert_eq!(
        base, indexed,
        "indexed search via daemon should match non-indexed local search for backend {backend}"
    );
}

#[test]
fn cli_index_and_search_via_server_file_backend_matches_local_search() {
    let tmp = tempdir().expect("tempdir");
    assert_index_parity_via_daemon("file", &tmp.path().join("file_index"));
}

#[test]
fn cli_index_and_search_via_server_sqlite_backend_matches_local_search() {
    let tmp = tempdir().expect("tempdir");
    assert_index_parity_via_daemon("sqlite", &tmp.path().join("index.sqlite"));
}

#[test]
fn cli_via_server_surfaces_http_errors() {
    let daemon = TestDaemon::spawn();

    let mut search = cargo_bin_cmd!("doxsearch");
    search.args([
        "search",
        "foo",
        "--path",
        "definitely/does/not/exist",
        "--server",
        &daemon.base_url,
    ]);
    let assert = search.assert().failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).expect("utf-8 stderr");
    assert!(
        stderr.contains("server returned 400") && stderr.contains("search path does not exist"),
        "expected the daemon's error message, got: {stderr}"
    );

    let tmp = tempdir().expect("tempdir");
    let missing = tmp.path().join("missing");
    let mut info = cargo_bin_cmd!("doxsearch");
    info.args([
        "index-info",
        "--index-path",
        missing.to_str().unwrap(),
        "--server",
        &daemon.base_url,
    ]);
    let assert = info.assert().failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).expect("utf-8 stderr");
    assert!(stderr.contains("server returned 404"), "{stderr}");
}
