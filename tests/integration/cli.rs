//! Integration tests for the jolpica binary

use assert_cmd::Command;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

use crate::support::stub_server::*;

fn jolpica() -> Command {
    let mut cmd = Command::cargo_bin("jolpica").unwrap();
    for var in [
        "JOLPICA_BASE_URL",
        "JOLPICA_CACHE_DIR",
        "JOLPICA_CACHE_TTL_HOURS",
        "JOLPICA_MAX_RETRIES",
        "JOLPICA_FAIL_FAST",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_help_lists_resources() {
    let output = jolpica().arg("--help").output().unwrap();
    assert!(output.status.success());

    let help = String::from_utf8_lossy(&output.stdout);
    for command in ["qualifying", "results", "laps", "driver-standings", "pitstops", "cache"] {
        assert!(help.contains(command), "help is missing {command}");
    }
}

#[test]
fn test_invalid_season_fails() {
    jolpica()
        .args(["races", "--season", "24", "--base-url", "http://127.0.0.1:9"])
        .assert()
        .failure();
}

#[test]
fn test_max_retries_out_of_range_is_rejected() {
    jolpica()
        .args(["races", "--max-retries", "50"])
        .assert()
        .failure();
}

#[test]
fn test_races_prints_envelope() {
    let body = json!({"MRData": {"total": "24", "RaceTable": {"season": "2024", "Races": []}}});
    let server = StubServer::start(vec![json_ok(&body)]);

    let output = jolpica()
        .args(["races", "--season", "2024", "--base-url", &server.base_url()])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(stdout_json(&output), body);
    assert!(server.requests()[0].starts_with("GET /2024/races?"));
}

#[test]
fn test_laps_reassembles_pages() {
    let lap = |n: &str| {
        json!({"number": n, "Timings": [
            {"driverId": "a", "position": "1", "time": "1:30.000"},
            {"driverId": "b", "position": "2", "time": "1:30.500"}
        ]})
    };
    let page = |laps: Vec<Value>| {
        json!({"MRData": {"total": "4", "RaceTable": {"Races": [{"raceName": "Test GP", "Laps": laps}]}}})
    };
    let server = StubServer::start(vec![
        json_ok(&page(vec![lap("1")])),
        json_ok(&page(vec![lap("1"), lap("2")])),
    ]);

    let output = jolpica()
        .args([
            "laps",
            "--season",
            "2024",
            "--round",
            "5",
            "--compact",
            "--base-url",
            &server.base_url(),
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let envelope = stdout_json(&output);
    assert_eq!(envelope["MRData"]["total"], "4");
    assert_eq!(
        envelope["MRData"]["RaceTable"]["Races"][0]["Laps"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
    assert_eq!(server.requests().len(), 2);
}

#[test]
fn test_server_error_exits_nonzero() {
    let server = StubServer::start(vec![http_response(503, &[], "")]);

    jolpica()
        .args([
            "results",
            "--season",
            "2024",
            "--round",
            "1",
            "--max-retries",
            "1",
            "--base-url",
            &server.base_url(),
        ])
        .assert()
        .failure();
}

#[test]
fn test_disk_cache_is_reused_between_runs() {
    let dir = TempDir::new().unwrap();
    let body = json!({"MRData": {"total": "20", "RaceTable": {"Races": []}}});
    let server = StubServer::start(vec![json_ok(&body)]);
    let args = |base_url: &str| {
        vec![
            "qualifying".to_string(),
            "--season".to_string(),
            "2024".to_string(),
            "--round".to_string(),
            "5".to_string(),
            "--cache-dir".to_string(),
            dir.path().display().to_string(),
            "--base-url".to_string(),
            base_url.to_string(),
        ]
    };

    jolpica().args(args(&server.base_url())).assert().success();
    // Second run is answered from disk; the stub only had one reply
    let output = jolpica().args(args(&server.base_url())).output().unwrap();

    assert!(output.status.success());
    assert_eq!(stdout_json(&output), body);
    assert_eq!(server.requests().len(), 1);
}

#[test]
fn test_cache_clear() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.json"), "{}").unwrap();
    fs::write(dir.path().join("b.json"), "{}").unwrap();
    fs::write(dir.path().join("notes.txt"), "keep").unwrap();

    let output = jolpica()
        .args(["cache", "clear", "--cache-dir"])
        .arg(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["removed"], 2);
    assert!(dir.path().join("notes.txt").exists());
    assert!(!dir.path().join("a.json").exists());
}

#[test]
fn test_cache_info_counts_entries() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.json"), "{}").unwrap();

    let output = jolpica()
        .args(["cache", "info", "--cache-dir"])
        .arg(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["entries"], 1);
}

#[test]
fn test_cache_commands_need_a_directory() {
    jolpica().args(["cache", "clear"]).assert().failure();
}

#[test]
fn test_cache_evict_needs_ttl() {
    let dir = TempDir::new().unwrap();
    jolpica()
        .args(["cache", "evict", "--cache-dir"])
        .arg(dir.path())
        .assert()
        .failure();
}
