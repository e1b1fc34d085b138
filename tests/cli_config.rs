use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn copy_fixture_dir(name: &str) -> (tempfile::TempDir, PathBuf) {
    let src_root = PathBuf::from("tests/fixtures").join(name);
    let tmp = tempdir().expect("tempdir");
    let dst_root = tmp.path().join(name);
    fs::create_dir_all(&dst_root).expect("create dst_root");

    for entry in fs::read_dir(&src_root).expect("read src_root") {
        let entry = entry.expect("entry");
        let file_type = entry.file_type().expect("file_type");
        if file_type.is_file() {
            let file_name = entry.file_name();
            let dst_path = dst_root.join(file_name);
            fs::copy(entry.path(), &dst_path).expect("copy file");
        }
    }

    (tmp, dst_root)
}

#[test]
fn cli_search_uses_project_config_defaults_for_paths_and_format() {
    let (_tmp, root) = copy_fixture_dir("doxygen_search");
    let doxsearch_dir = root.join(".doxsearch");
    fs::create_dir_all(&doxsearch_dir).expect("create .doxsearch directory");

    let config_toml = r#"
[search]
paths = ["."]
format = "json"
sections = ["functions"]
"#;
    fs::write(doxsearch_dir.join("config.toml"), config_toml).expect("write config.toml");

    let mut cmd = cargo_bin_cmd!("doxsearch");
    cmd.current_dir(&root);
    cmd.args(["search", "timer"]);

    let assert = cmd.assert().success();
    let value: Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("valid json output");

    assert_eq!(value["query"], "timer");
    let hits = value["hits"].as_array().expect("hits array");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["key"], "timer_4950");
}

#[test]
fn cli_search_config_can_disable_server_even_with_env() {
    let (_tmp, root) = copy_fixture_dir("doxygen_search");
    let doxsearch_dir = root.join(".doxsearch");
    fs::create_dir_all(&doxsearch_dir).expect("create .doxsearch directory");

    let config_toml = r#"
[search]
paths = ["."]
format = "text"
no_server = true
"#;
    fs::write(doxsearch_dir.join("config.toml"), config_toml).expect("write config.toml");

    let mut cmd = cargo_bin_cmd!("doxsearch");
    cmd.current_dir(&root);
    cmd.env("DOXSEARCH_SERVER_URL", "http://127.0.0.1:9");
    cmd.args(["search", "axby"]);

    let assert = cmd.assert().success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).expect("utf-8");

    assert!(
        output.contains("axby (axby_3707)"),
        "expected local search output when config sets no_server = true"
    );
}

#[test]
fn cli_validate_and_generate_read_their_sections() {
    let (tmp, root) = copy_fixture_dir("doxygen_search");
    let doxsearch_dir = root.join(".doxsearch");
    fs::create_dir_all(&doxsearch_dir).expect("create .doxsearch directory");

    let symbols = tmp.path().join("symbols.json");
    fs::copy("tests/fixtures/symbols.json", &symbols).expect("copy symbols");

    let config_toml = r#"
[validate]
paths = ["."]
strict = true
format = "json"

[generate]
output_dir = "generated"
start_id = 500
"#;
    fs::write(doxsearch_dir.join("doxsearch.toml"), config_toml).expect("write doxsearch.toml");

    let mut validate = cargo_bin_cmd!("doxsearch");
    validate.current_dir(&root);
    validate.args(["validate"]);
    let assert = validate.assert().success();
    let report: Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("valid json output");
    assert_eq!(report["summary"]["passed"], true);
    assert_eq!(report["summary"]["files_checked"], 2);

    let mut generate = cargo_bin_cmd!("doxsearch");
    generate.current_dir(&root);
    generate.args(["generate", symbols.to_str().unwrap()]);
    generate.assert().success();

    let first = fs::read_to_string(root.join("generated").join("all_0.js")).expect("all_0.js");
    assert!(first.contains("'_7etimestepper_500'"), "{first}");
}
