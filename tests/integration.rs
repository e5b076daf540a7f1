use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn callboard_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("callboard");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/callboard.sqlite"

[server]
bind = "127.0.0.1:7332"

[adapters.grants_gov]
rows = 10
"#,
        root.display()
    );

    let config_path = config_dir.join("callboard.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_callboard(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = callboard_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run callboard binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_callboard(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/callboard.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_callboard(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_callboard(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_sources_lists_configured_adapters() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_callboard(&config_path, &["sources"]);
    assert!(success);
    assert!(stdout.contains("grants_gov"));
}

#[test]
fn test_sources_reports_empty_config() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("callboard.toml");
    fs::write(
        &config_path,
        format!(
            "[db]\npath = \"{}/data/callboard.sqlite\"\n\n[server]\nbind = \"127.0.0.1:7332\"\n",
            tmp.path().display()
        ),
    )
    .unwrap();

    let (stdout, _, success) = run_callboard(&config_path, &["sources"]);
    assert!(success);
    assert!(stdout.contains("No sources configured"));
}

#[test]
fn test_search_empty_store() {
    let (_tmp, config_path) = setup_test_env();

    run_callboard(&config_path, &["init"]);
    let (stdout, stderr, success) = run_callboard(&config_path, &["search", "anything"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_unknown_ingest_source_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_callboard(&config_path, &["init"]);
    let (_, stderr, success) =
        run_callboard(&config_path, &["ingest", "--source", "does_not_exist"]);
    assert!(!success);
    assert!(stderr.contains("Unknown source"));
}

#[test]
fn test_missing_config_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("nope.toml");

    let (_, stderr, success) = run_callboard(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
