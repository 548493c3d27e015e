use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--catalog"))
        .stdout(predicate::str::contains("--db-path"))
        .stdout(predicate::str::contains("--webhook-secret"));

    Ok(())
}

#[test]
fn test_missing_catalog_is_a_startup_error() {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("--catalog")
        .arg("tests/fixtures/does_not_exist.csv")
        .arg("--port")
        .arg("0")
        .env_remove("STRIPE_SECRET_KEY");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("reading catalog"));
}

#[test]
fn test_rejects_unknown_flags() {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("--no-such-flag");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unexpected argument"));
}

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::new(cargo_bin!());
    // the missing catalog stops startup right after storage is chosen
    cmd.arg("--db-path")
        .arg(dir.path().join("marketplace_db"))
        .arg("--catalog")
        .arg("tests/fixtures/does_not_exist.csv");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("falling back to in-memory storage"));
}
