//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway data directory.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_focustrainer"))
        .env("FOCUSTRAINER_DATA_DIR", data_dir)
        .env_remove("FOCUSTRAINER_LOG")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

fn event_types(report: &serde_json::Value) -> Vec<String> {
    report["events"]
        .as_array()
        .expect("events array")
        .iter()
        .map(|e| e["type"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_status_starts_idle_in_focus() {
    let dir = TempDir::new().unwrap();
    let report = run_json(dir.path(), &["timer", "status"]);
    assert_eq!(report["timer"]["phase"], "focus");
    assert_eq!(report["timer"]["status"], "idle");
    assert_eq!(report["timer"]["remaining"], "25:00");
    assert_eq!(report["timer"]["completed_focus_sessions"], 0);
}

#[test]
fn test_state_survives_between_invocations() {
    let dir = TempDir::new().unwrap();
    let started = run_json(dir.path(), &["timer", "start", "--intention", "draft chapter"]);
    assert_eq!(event_types(&started), ["TimerStarted"]);

    let paused = run_json(dir.path(), &["timer", "pause"]);
    assert_eq!(event_types(&paused), ["TimerPaused"]);
    assert_eq!(paused["timer"]["status"], "paused");

    let status = run_json(dir.path(), &["timer", "status"]);
    assert_eq!(status["timer"]["status"], "paused");
    assert_eq!(status["timer"]["intention"], "draft chapter");

    let resumed = run_json(dir.path(), &["timer", "resume"]);
    assert_eq!(resumed["timer"]["status"], "running");
}

#[test]
fn test_add_minute_extends_idle_target() {
    let dir = TempDir::new().unwrap();
    let report = run_json(dir.path(), &["timer", "add-minute"]);
    assert_eq!(report["timer"]["remaining"], "26:00");

    let status = run_json(dir.path(), &["timer", "status"]);
    assert_eq!(status["timer"]["remaining"], "26:00");
    let started = run_json(dir.path(), &["timer", "start"]);
    assert_eq!(started["timer"]["target_duration_ms"], 26 * 60_000);
}

#[test]
fn test_idle_intention_is_kept_until_start() {
    let dir = TempDir::new().unwrap();
    let report = run_json(dir.path(), &["timer", "intention", "write docs"]);
    assert_eq!(report["timer"]["intention"], "write docs");

    let started = run_json(dir.path(), &["timer", "start"]);
    assert_eq!(started["timer"]["status"], "running");
    assert_eq!(started["timer"]["intention"], "write docs");
}

#[test]
fn test_skip_running_focus_records_history() {
    let dir = TempDir::new().unwrap();
    run_json(dir.path(), &["timer", "start"]);
    run_json(dir.path(), &["timer", "distraction", "phone", "--note", "buzz"]);
    let skipped = run_json(dir.path(), &["timer", "skip"]);
    assert_eq!(event_types(&skipped), ["PhaseCompleted", "TimerSkipped"]);
    assert_eq!(skipped["timer"]["phase"], "shortBreak");
    assert_eq!(skipped["timer"]["completed_focus_sessions"], 1);

    let id = skipped["recorded"][0].as_str().unwrap().to_string();
    let history = run_json(dir.path(), &["history", "list"]);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["id"], id.as_str());
    assert_eq!(history[0]["distractions"][0]["kind"], "phone");

    let reflected = run_json(
        dir.path(),
        &["history", "reflect", &id, "--quality", "great", "--biggest", "phone"],
    );
    assert_eq!(reflected["reflection"]["quality"], "great");

    let (_, stderr, code) = run_cli(dir.path(), &["history", "reflect", &id, "--quality", "okay"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already has a reflection"), "{stderr}");
}

#[test]
fn test_reset_running_focus_records_abandonment() {
    let dir = TempDir::new().unwrap();
    run_json(dir.path(), &["timer", "start"]);
    let reset = run_json(dir.path(), &["timer", "reset"]);
    assert_eq!(event_types(&reset), ["SessionAbandoned", "TimerReset"]);
    assert_eq!(reset["timer"]["status"], "idle");

    let history = run_json(dir.path(), &["history", "list"]);
    assert_eq!(history[0]["completed"], false);
}

#[test]
fn test_unknown_history_id_fails() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["history", "show", "missing"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"), "{stderr}");
}

#[test]
fn test_invalid_distraction_kind_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["timer", "distraction", "weather"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_set_changes_focus_duration() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "set", "timer.focus_duration", "30"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "timer.focus_duration"]);
    assert_eq!(stdout.trim(), "30");

    let status = run_json(dir.path(), &["timer", "status"]);
    assert_eq!(status["timer"]["remaining"], "30:00");
}

#[test]
fn test_config_set_rejects_out_of_range() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", "timer.focus_duration", "5"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("focus_duration"), "{stderr}");

    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "timer.focus_duration"]);
    assert_eq!(stdout.trim(), "25");
}

#[test]
fn test_out_of_range_config_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[timer]\nfocus_duration = 0\n",
    )
    .unwrap();

    let status = run_json(dir.path(), &["timer", "status"]);
    assert_eq!(status["timer"]["target_duration_ms"], 25 * 60_000);

    let (_, stderr, code) = run_cli(dir.path(), &["config", "list"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("focus_duration"), "{stderr}");
}

#[test]
fn test_history_list_filters_by_date() {
    let dir = TempDir::new().unwrap();
    run_json(dir.path(), &["timer", "start"]);
    let skipped = run_json(dir.path(), &["timer", "skip"]);
    let id = skipped["recorded"][0].as_str().unwrap().to_string();

    let all = run_json(dir.path(), &["history", "list"]);
    let date = all[0]["date"].as_str().unwrap().to_string();
    let on_day = run_json(dir.path(), &["history", "list", "--date", &date]);
    assert_eq!(on_day[0]["id"], id.as_str());

    let empty = run_json(dir.path(), &["history", "list", "--date", "2001-01-01"]);
    assert!(empty.as_array().unwrap().is_empty());
}

#[test]
fn test_config_list_and_reset() {
    let dir = TempDir::new().unwrap();
    run_cli(dir.path(), &["config", "set", "timer.auto_advance", "false"]);
    let list = run_json(dir.path(), &["config", "list"]);
    assert_eq!(list["timer"]["auto_advance"], false);

    let (_, _, code) = run_cli(dir.path(), &["config", "reset"]);
    assert_eq!(code, 0);
    let list = run_json(dir.path(), &["config", "list"]);
    assert_eq!(list["timer"]["auto_advance"], true);
}

#[test]
fn test_watch_stops_when_idle() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["timer", "watch", "--interval-ms", "50"]);
    assert_eq!(code, 0);
    let first: serde_json::Value = serde_json::from_str(stdout.lines().next().unwrap()).unwrap();
    assert_eq!(first["timer"]["status"], "idle");
}

#[test]
fn test_completions_generate() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("focustrainer"));
}
