use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cli(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("miwifi-cache").unwrap();
    cmd.arg("--config")
        .arg(config_dir.path().join("config.toml"))
        .env_remove("MIWIFI_CACHE__TTL_SECS");
    cmd
}

#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin("miwifi-cache").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_config_path_follows_flag() {
    let dir = TempDir::new().unwrap();
    let expected = dir.path().join("config.toml");

    cli(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.display().to_string()));
}

#[test]
fn test_config_show_merges_file_and_env() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "[cache]\nttl_secs = 42\n\n[fetcher]\nmax_workers = 2\n",
    )
    .unwrap();

    cli(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ttl_secs = 42"))
        .stdout(predicate::str::contains("max_workers = 2"));

    cli(&dir)
        .env("MIWIFI_CACHE__TTL_SECS", "7")
        .args(["config", "get", "cache.ttl_secs"])
        .assert()
        .success()
        .stdout(predicate::str::diff("7\n"));
}

#[test]
fn test_config_set_then_get() {
    let dir = TempDir::new().unwrap();

    cli(&dir)
        .args(["config", "set", "cache.size_limit", "16"])
        .assert()
        .success();

    cli(&dir)
        .args(["config", "get", "cache.size_limit"])
        .assert()
        .success()
        .stdout(predicate::str::diff("16\n"));
}

#[test]
fn test_config_set_rejects_zero_ttl() {
    let dir = TempDir::new().unwrap();

    cli(&dir)
        .args(["config", "set", "cache.ttl_secs", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ttl_secs"));
}

#[test]
fn test_simulate_fetches_then_serves_from_cache() {
    let dir = TempDir::new().unwrap();

    cli(&dir)
        .args([
            "simulate",
            "--rounds",
            "3",
            "--interval-ms",
            "0",
            "--latency-ms",
            "0",
            "--no-refresh",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("round   1"))
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("cache"))
        .stdout(predicate::str::contains("router calls: 4"));
}

#[test]
fn test_simulate_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.toml"), "[cache]\nttl_secs = 0\n").unwrap();

    cli(&dir)
        .args(["simulate", "--rounds", "1", "--latency-ms", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}
