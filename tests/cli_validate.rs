use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

#[test]
fn cli_validate_accepts_real_doxygen_output() {
    let mut cmd = cargo_bin_cmd!("doxsearch");
    cmd.args(["validate", "--path", "tests/fixtures/doxygen_search", "--strict"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "ok: 2 file(s), 102 entries, 0 error(s), 0 warning(s)",
        ));
}

#[test]
fn cli_validate_reports_each_problem_and_fails() {
    let mut cmd = cargo_bin_cmd!("doxsearch");
    cmd.args(["validate", "--path", "tests/fixtures/broken_search"]);

    let assert = cmd
        .assert()
        .failure()
        .stderr(predicate::str::contains("validation failed"));
    let output = String::from_utf8(assert.get_output().stdout.clone()).expect("utf-8");

    for code in [
        "key-name-mismatch",
        "empty-anchor",
        "duplicate-key",
        "empty-results",
        "mixed-partition",
        "parse-error",
    ] {
        assert!(output.contains(code), "missing {code} in:\n{output}");
    }
    assert!(output.contains("FAILED"));
}

#[test]
fn cli_validate_json_report() {
    let mut cmd = cargo_bin_cmd!("doxsearch");
    cmd.args([
        "validate",
        "--path",
        "tests/fixtures/broken_search",
        "--format",
        "json",
    ]);

    let assert = cmd.assert().failure();
    let value: Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("valid json output");

    assert_eq!(value["version"], "1.0.0");
    assert_eq!(value["summary"]["passed"], false);
    assert_eq!(value["summary"]["files_checked"], 2);
    assert_eq!(value["summary"]["entries_checked"], 4);

    let issues = value["issues"].as_array().expect("issues");
    let duplicate = issues
        .iter()
        .find(|i| i["code"] == "duplicate-key")
        .expect("duplicate-key issue");
    assert_eq!(duplicate["severity"], "error");
    assert_eq!(duplicate["key"], "beta_2");
}

#[test]
fn cli_validate_strict_fails_on_warnings_only() {
    let tmp = tempdir().expect("tempdir");
    let file = tmp.path().join("custom.js");
    fs::copy("tests/fixtures/doxygen_search/functions_13.js", &file).expect("copy");

    let mut lenient = cargo_bin_cmd!("doxsearch");
    lenient.args(["validate", "--path", file.to_str().unwrap()]);
    lenient
        .assert()
        .success()
        .stdout(predicate::str::contains("unknown-partition"));

    let mut strict = cargo_bin_cmd!("doxsearch");
    strict.args(["validate", "--path", file.to_str().unwrap(), "--strict"]);
    strict.assert().failure();
}

#[test]
fn cli_validate_cross_checks_searchdata_js() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    fs::copy("tests/fixtures/doxygen_search/functions_0.js", root.join("functions_0.js"))
        .expect("copy");
    fs::write(
        root.join("searchdata.js"),
        "var indexSectionsWithContent =\n{\n  0: \"ab\"\n};\n\nvar indexSectionNames =\n{\n  0: \"functions\"\n};\n",
    )
    .expect("write");

    let mut cmd = cargo_bin_cmd!("doxsearch");
    cmd.args(["validate", "--path", root.to_str().unwrap()]);

    let assert = cmd.assert().failure();
    let output = String::from_utf8(assert.get_output().stdout.clone()).expect("utf-8");
    assert!(output.contains("missing-partition"), "{output}");
    assert!(output.contains("functions_1.js"), "{output}");
}
