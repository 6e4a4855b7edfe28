//! End-to-end CLI tests for the rangeget binary.

use std::sync::Arc;

use assert_cmd::Command;
use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::range_server::{mount_ranged, payload};
use support::socket_guard::start_mock_server_or_skip;

/// Command with config lookup pointed at an empty directory.
fn rangeget(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("rangeget").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("RUST_LOG");
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("rangeget").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("concurrent HTTP range requests"))
        .stdout(predicate::str::contains("--streams"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("rangeget").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

/// Test that a missing URL causes non-zero exit.
#[test]
fn test_binary_requires_url() {
    let mut cmd = Command::cargo_bin("rangeget").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let mut cmd = Command::cargo_bin("rangeget").unwrap();
    cmd.args(["https://example.com/a.bin", "--invalid-flag"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Test that an invalid config file value is reported with its key.
#[test]
fn test_binary_rejects_invalid_config_file() {
    let config_home = TempDir::new().unwrap();
    let config_dir = config_home.path().join("rangeget");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "streams = 0\n").unwrap();

    rangeget(&config_home)
        .args(["https://example.com/a.bin", "--no-progress"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("streams"));
}

/// Test a full download through the binary against a mock server.
#[tokio::test(flavor = "multi_thread")]
async fn test_binary_downloads_file() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let body = Arc::new(payload(300_000));
    mount_ranged(&mock_server, "/movie.bin", Arc::clone(&body)).await;

    let config_home = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let url = format!("{}/movie.bin", mock_server.uri());
    let out_path = out_dir.path().to_path_buf();

    let output = tokio::task::spawn_blocking(move || {
        rangeget(&config_home)
            .args([
                url.as_str(),
                "-o",
                out_path.to_str().unwrap(),
                "-s",
                "2",
                "--chunk-size",
                "65536",
                "--no-progress",
            ])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    output
        .assert()
        .success()
        .stdout(predicate::str::contains("Downloaded"))
        .stdout(predicate::str::contains("ranged"));
    assert_eq!(std::fs::read(out_dir.path().join("movie.bin")).unwrap(), *body);
}

/// Test that an HTTP error fails the run with a non-zero exit.
#[tokio::test(flavor = "multi_thread")]
async fn test_binary_reports_http_error() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("HEAD"))
        .and(path("/gone.bin"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config_home = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let url = format!("{}/gone.bin", mock_server.uri());
    let out_file = out_dir.path().join("gone.bin");

    let output = tokio::task::spawn_blocking(move || {
        rangeget(&config_home)
            .args([url.as_str(), "-o", out_file.to_str().unwrap(), "-q"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    output
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("404"));
}
