use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn copy_fixture_dir(name: &str) -> (tempfile::TempDir, PathBuf) {
    let src_root = PathBuf::from("tests/fixtures").join(name);
    let tmp = tempdir().expect("tempdir");
    let dst_root = tmp.path().join(name);
    fs::create_dir_all(&dst_root).expect("create dst_root");

    for entry in fs::read_dir(&src_root).expect("read src_root") {
        let entry = entry.expect("entry");
        if entry.file_type().expect("file_type").is_file() {
            fs::copy(entry.path(), dst_root.join(entry.file_name())).expect("copy file");
        }
    }

    (tmp, dst_root)
}

fn index_json(root: &Path, index_path: &Path) -> Value {
    let mut cmd = cargo_bin_cmd!("doxsearch");
    cmd.args([
        "index",
        "--path",
        root.to_str().unwrap(),
        "--index-path",
        index_path.to_str().unwrap(),
        "--format",
        "json",
    ]);
    let assert = cmd.assert().success();
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json output")
}

fn index_info_json(index_path: &Path, backend: &str) -> Value {
    let mut cmd = cargo_bin_cmd!("doxsearch");
    cmd.args([
        "index-info",
        "--index-backend",
        backend,
        "--index-path",
        index_path.to_str().unwrap(),
        "--format",
        "json",
    ]);
    let assert = cmd.assert().success();
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json output")
}

#[test]
fn cli_index_file_backend_writes_jsonl_and_reports_counts() {
    let (tmp, root) = copy_fixture_dir("doxygen_search");
    let index_path = tmp.path().join(".doxsearch");

    let summary = index_json(&root, &index_path);
    assert_eq!(summary["backend"], "file");
    assert_eq!(summary["files_indexed"], 2);
    assert_eq!(summary["entries_indexed"], 102);

    assert!(index_path.join("meta.json").is_file());
    assert!(index_path.join("files.jsonl").is_file());
    assert!(index_path.join("entries.jsonl").is_file());

    let info = index_info_json(&index_path, "file");
    assert_eq!(info["files_indexed"], 2);
    assert_eq!(info["entries_indexed"], 102);
    assert_eq!(info["schema_version"], "1");
    assert!(info["created_at"].as_str().is_some());
}

#[test]
fn cli_index_sqlite_is_incremental() {
    let (tmp, root) = copy_fixture_dir("doxygen_search");
    let index_path = tmp.path().join("index.sqlite");

    let first = index_json(&root, &index_path);
    assert_eq!(first["backend"], "sqlite");
    assert_eq!(first["files_indexed"], 2);

    let second = index_json(&root, &index_path);
    assert_eq!(second["files_indexed"], 0);
    assert_eq!(second["entries_indexed"], 0);

    fs::remove_file(root.join("functions_0.js")).expect("remove");
    index_json(&root, &index_path);

    let info = index_info_json(&index_path, "sqlite");
    assert_eq!(info["files_indexed"], 1);
    assert_eq!(info["entries_indexed"], 25);
}

#[test]
fn cli_index_text_summary() {
    let (tmp, root) = copy_fixture_dir("doxygen_search");
    let index_path = tmp.path().join(".doxsearch");

    let mut cmd = cargo_bin_cmd!("doxsearch");
    cmd.args([
        "index",
        "--path",
        root.to_str().unwrap(),
        "--index-path",
        index_path.to_str().unwrap(),
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Indexed 2 files and 102 entries"));
}

#[test]
fn cli_index_info_missing_index_fails() {
    let tmp = tempdir().expect("tempdir");
    let missing = tmp.path().join("nope");

    let mut cmd = cargo_bin_cmd!("doxsearch");
    cmd.args(["index-info", "--index-path", missing.to_str().unwrap()]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("index not found at"));
}

#[test]
fn cli_index_refuses_other_root() {
    let (tmp, root) = copy_fixture_dir("doxygen_search");
    let index_path = tmp.path().join(".doxsearch");
    index_json(&root, &index_path);

    let other = tmp.path().join("other");
    fs::create_dir_all(&other).expect("mkdir");

    let mut cmd = cargo_bin_cmd!("doxsearch");
    cmd.args([
        "index",
        "--path",
        other.to_str().unwrap(),
        "--index-path",
        index_path.to_str().unwrap(),
    ]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("index root_path mismatch"));
}
