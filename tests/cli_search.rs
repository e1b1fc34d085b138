use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::path::PathBuf;
use tempfile::tempdir;

fn fixture_dir() -> PathBuf {
    PathBuf::from("tests/fixtures/doxygen_search")
}

fn hit_keys(value: &Value) -> Vec<String> {
    value["hits"]
        .as_array()
        .expect("hits array")
        .iter()
        .map(|h| h["key"].as_str().expect("key").to_string())
        .collect()
}

fn search_json(args: &[&str]) -> Value {
    let fixture_dir = fixture_dir();

    let mut cmd = cargo_bin_cmd!("doxsearch");
    cmd.args(["search"])
        .args(args)
        .args(["--path", fixture_dir.to_str().unwrap(), "--format", "json"]);

    let assert = cmd.assert().success();
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json output")
}

#[test]
fn cli_search_text_lists_hits_with_links() {
    let fixture_dir = fixture_dir();

    let mut cmd = cargo_bin_cmd!("doxsearch");
    cmd.args([
        "search",
        "axby",
        "--path",
        fixture_dir.to_str().unwrap(),
        "--format",
        "text",
    ]);

    let assert = cmd.assert().success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).expect("utf-8");
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(
        lines,
        vec![
            "tests/fixtures/doxygen_search/functions_0.js: functions: axby (axby_3707)",
            "    EBHelmholtzOp::axby()  ../classEBHelmholtzOp.html#a0d5b4cd2407b1c002ad9e8139477df05",
            "    MFHelmholtzOp::axby()  ../classMFHelmholtzOp.html#a6d050a3021de6a4c27a6b714010a6037",
        ]
    );
}

#[test]
fn cli_search_json_uses_key_prefix_semantics() {
    let value = search_json(&["addParticles"]);

    assert_eq!(value["version"], "1.0.0");
    assert_eq!(value["query"], "addParticles");
    assert_eq!(
        hit_keys(&value),
        vec!["addparticles_3636", "addparticlesdestructive_3637"]
    );

    let first_link = &value["hits"][0]["links"][1];
    assert_eq!(
        first_link["scope"],
        "ParticleContainer::addParticles(const List< P > &a_particles)"
    );
    assert_eq!(first_link["owner"], "ParticleContainer");
    assert_eq!(first_link["page"], "classParticleContainer.html");
    assert_eq!(first_link["compound"]["kind"], "class");
}

#[test]
fn cli_search_literal_requires_whole_key() {
    let value = search_json(&["addParticles", "--literal"]);
    assert_eq!(hit_keys(&value), vec!["addparticles_3636"]);
}

#[test]
fn cli_search_fielded_query_and_section_filter() {
    let value = search_json(&["name:Timer", "--section", "functions"]);
    assert_eq!(hit_keys(&value), vec!["timer_4950"]);

    let none = search_json(&["name:Timer", "--section", "classes,variables"]);
    assert!(hit_keys(&none).is_empty());
    assert_eq!(none["summary"]["total_matches"], 0);
}

#[test]
fn cli_search_limit_reports_truncation() {
    let value = search_json(&["t", "--limit", "3"]);

    assert_eq!(hit_keys(&value).len(), 3);
    assert_eq!(value["summary"]["total_matches"], 25);
    assert_eq!(value["summary"]["truncated"], true);
}

#[test]
fn cli_search_table_has_header_and_rows() {
    let fixture_dir = fixture_dir();

    let mut cmd = cargo_bin_cmd!("doxsearch");
    cmd.args([
        "search",
        "timestep",
        "--path",
        fixture_dir.to_str().unwrap(),
        "--format",
        "table",
    ]);

    let assert = cmd.assert().success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).expect("utf-8");
    let rows: Vec<Vec<&str>> = output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split_whitespace().collect())
        .collect();

    assert_eq!(rows[0], vec!["SECTION", "KEY", "NAME", "LINKS", "SCOPE"]);
    assert_eq!(
        rows[1],
        vec!["functions", "timestepper_4951", "TimeStepper", "1", "TimeStepper"]
    );
    assert_eq!(rows.len(), 2);
}

#[test]
fn cli_search_with_sqlite_index_matches_plain_search() {
    let tmp = tempdir().expect("tempdir");
    let index_path = tmp.path().join("index.sqlite");
    let fixture_dir = fixture_dir();

    let mut index_cmd = cargo_bin_cmd!("doxsearch");
    index_cmd.args([
        "index",
        "--path",
        fixture_dir.to_str().unwrap(),
        "--index-path",
        index_path.to_str().unwrap(),
    ]);
    index_cmd.assert().success();

    let indexed = search_json(&[
        "key:tim",
        "--use-index",
        "--index-path",
        index_path.to_str().unwrap(),
    ]);
    let plain = search_json(&["key:tim"]);

    assert_eq!(hit_keys(&indexed), hit_keys(&plain));
    assert_eq!(hit_keys(&plain), vec!["timer_4950", "timestepper_4951"]);
}

#[test]
fn cli_search_rejects_missing_path() {
    let mut cmd = cargo_bin_cmd!("doxsearch");
    cmd.args(["search", "foo", "--path", "definitely/does/not/exist"]);

    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("search path does not exist"));
}
