//! Smoke tests to verify command wiring

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn studyquiz() -> Command {
    let mut cmd = Command::cargo_bin("studyquiz").unwrap();
    cmd.env_remove("DATABASE_URL").env_remove("STUDYQUIZ_CONFIG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    studyquiz()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_serve_help() {
    studyquiz()
        .arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Address to bind to"));
}

#[test]
fn test_config_path_respects_flag() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");

    studyquiz()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .arg("path")
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_init_then_show() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    studyquiz()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(path.exists());

    // second init refuses to clobber
    studyquiz()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    studyquiz()
        .arg("--config")
        .arg(&path)
        .env("OPENAI_API_KEY", "sk-secret")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[server]"))
        .stdout(predicate::str::contains("sk-secret").not());
}

#[test]
fn test_missing_config_file_fails() {
    studyquiz()
        .args(["--config", "/nonexistent/studyquiz.toml", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
