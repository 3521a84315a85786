//! Integration tests for the anthro binary.
//!
//! These tests verify end-to-end behavior including:
//! - Z-score reports in table and JSON form
//! - SD curve export as CSV
//! - Median prefill values
//! - Configuration and argument errors

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const LMS: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../anthro_core/tests/fixtures/lms_sample.csv"
);

/// Temp dir holding an empty config so the user's own config is never read
fn setup_test_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("config.toml"), "").expect("Failed to write config");
    dir
}

/// CLI command with the sample LMS table and an isolated config
fn cli(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("anthro"));
    cmd.arg("--config")
        .arg(dir.path().join("config.toml"))
        .arg("--lms")
        .arg(LMS);
    cmd
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("anthro"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Child growth Z-scores"));
}

#[test]
fn test_analyze_typical_child() {
    let dir = setup_test_dir();

    cli(&dir)
        .args(["analyze", "--sex", "m", "--age-months", "12"])
        .args(["--weight", "9,0", "--height", "74", "--head", "46"])
        .assert()
        .success()
        .stdout(predicate::str::contains("weight-for-age"))
        .stdout(predicate::str::contains("-0.63"))
        .stdout(predicate::str::contains("normal"));
}

#[test]
fn test_analyze_json_report() {
    let dir = setup_test_dir();

    let output = cli(&dir)
        .args(["analyze", "--sex", "female", "--age-months", "24"])
        .args(["--weight", "6", "--height", "70", "--json"])
        .output()
        .expect("Failed to run analyze");
    assert!(output.status.success());

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output should be JSON");
    let waz = report["z"]["waz"].as_f64().expect("waz present");
    assert!(waz < -3.0);
    assert!(report["z"]["hcz"].is_null());
    assert!(report["percentiles"]["hcz"].is_null());
    assert_eq!(report["who"]["hcz"], "data_unavailable");
    assert_eq!(report["who"]["rule_set"], "who");
    assert_eq!(report["national"]["rule_set"], "national");
}

#[test]
fn test_analyze_from_dates() {
    let dir = setup_test_dir();

    cli(&dir)
        .args(["analyze", "--sex", "p", "--born", "01/01/2022"])
        .args(["--measured", "2024-01-01", "--weight", "6"])
        .assert()
        .success()
        .stdout(predicate::str::contains("730 days"))
        .stdout(predicate::str::contains("severely underweight"));
}

#[test]
fn test_clamped_age_reports_matching_days() {
    let dir = setup_test_dir();

    cli(&dir)
        .args(["analyze", "--sex", "m", "--age-months", "72", "--weight", "18"])
        .assert()
        .success()
        .stdout(predicate::str::contains("60.00 months (1826 days)"));
}

#[test]
fn test_analyze_rejects_measurement_before_birth() {
    let dir = setup_test_dir();

    cli(&dir)
        .args(["analyze", "--sex", "m", "--born", "2024-01-01"])
        .args(["--measured", "2023-01-01", "--weight", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("before birth date"));
}

#[test]
fn test_curve_csv_export() {
    let dir = setup_test_dir();

    let output = cli(&dir)
        .args(["curve", "--sex", "m", "--indicator", "wfa", "--z", "-2"])
        .output()
        .expect("Failed to run curve");
    assert!(output.status.success());

    let mut reader = csv::Reader::from_reader(output.stdout.as_slice());
    let headers = reader.headers().expect("Header row").clone();
    assert_eq!(&headers[0], "age_months");
    assert_eq!(&headers[1], "value");

    let rows: Vec<(f64, f64)> = reader
        .records()
        .map(|r| {
            let r = r.expect("CSV row");
            (r[0].parse().unwrap(), r[1].parse().unwrap())
        })
        .collect();
    assert_eq!(rows.len(), 241);
    assert_eq!(rows[0].0, 0.0);
    assert_eq!(rows[240].0, 60.0);
    assert!(rows.windows(2).all(|w| w[1].1 > w[0].1));
}

#[test]
fn test_weight_for_length_curve_needs_age() {
    let dir = setup_test_dir();

    cli(&dir)
        .args(["curve", "--sex", "f", "--indicator", "wfl", "--z", "0"])
        .assert()
        .failure();

    cli(&dir)
        .args(["curve", "--sex", "f", "--indicator", "wfl", "--z", "0", "--age", "12"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("length_cm,value"));
}

#[test]
fn test_median_prefill() {
    let dir = setup_test_dir();

    cli(&dir)
        .args(["median", "--sex", "male", "--age-months", "12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("9.65 kg"))
        .stdout(predicate::str::contains("75.7 cm"));
}

#[test]
fn test_missing_reference_table_is_an_error() {
    let dir = setup_test_dir();

    Command::new(assert_cmd::cargo::cargo_bin!("anthro"))
        .arg("--config")
        .arg(dir.path().join("config.toml"))
        .args(["median", "--sex", "m", "--age-months", "6"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no LMS table configured"));
}

#[test]
fn test_lms_path_from_config() {
    let dir = setup_test_dir();
    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        format!("[reference]\nlms_path = {:?}\n\n[curves]\ncache_capacity = 0\n", LMS),
    )
    .unwrap();

    Command::new(assert_cmd::cargo::cargo_bin!("anthro"))
        .arg("--config")
        .arg(&config)
        .args(["median", "--sex", "f", "--age-months", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Median values"));
}

#[test]
fn test_unknown_sex_is_rejected() {
    let dir = setup_test_dir();

    cli(&dir)
        .args(["median", "--sex", "x", "--age-months", "6"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sex"));
}
