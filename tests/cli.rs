//! CLI-surface smoke tests (§6.1): exit codes and missing-init behavior.

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::tempdir;

#[test]
fn init_creates_locus_dir_and_claude_md() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("locus-agent").unwrap();
    cmd.args(["--dir", dir.path().to_str().unwrap(), "init"]);
    cmd.assert().success().stdout(contains("Initialized"));

    assert!(dir.path().join(".locus/config.json").is_file());
    assert!(dir.path().join("CLAUDE.md").is_file());
}

#[test]
fn init_is_idempotent_on_second_invocation() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("locus-agent")
        .unwrap()
        .args(["--dir", dir.path().to_str().unwrap(), "init"])
        .assert()
        .success();

    Command::cargo_bin("locus-agent")
        .unwrap()
        .args(["--dir", dir.path().to_str().unwrap(), "init"])
        .assert()
        .success();
}

#[test]
fn index_without_init_fails_with_actionable_message() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("locus-agent").unwrap();
    cmd.args(["--dir", dir.path().to_str().unwrap(), "index"]);
    // tracing_subscriber::fmt()'s default writer is stdout, so the fatal
    // `error!("{err:?}")` log line lands there rather than on stderr.
    cmd.assert().failure().code(1).stdout(contains("locus-agent init"));
}

#[test]
fn run_without_init_fails_with_actionable_message() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("locus-agent").unwrap();
    cmd.args([
        "--dir",
        dir.path().to_str().unwrap(),
        "run",
        "--api-key",
        "k",
        "--workspace",
        "11111111-1111-1111-1111-111111111111",
    ]);
    cmd.assert().failure().code(1).stdout(contains("locus-agent init"));
}

#[test]
fn run_after_init_without_api_key_fails_with_auth_missing() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("locus-agent")
        .unwrap()
        .args(["--dir", dir.path().to_str().unwrap(), "init"])
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("locus-agent").unwrap();
    cmd.env_remove("LOCUS_API_KEY")
        .env_remove("LOCUS_WORKSPACE_ID")
        .args([
            "--dir",
            dir.path().to_str().unwrap(),
            "run",
            "--workspace",
            "11111111-1111-1111-1111-111111111111",
        ]);
    cmd.assert().failure().code(1).stdout(contains("LOCUS_API_KEY"));
}
