use assert_cmd::Command;
use tempfile::tempdir;

// Drives the compiled binary with piped stdin. A temp config path keeps the
// user's own config out of the run.

fn studyclock(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("studyclock").unwrap();
    cmd.arg("--config").arg(dir.join("config.json"));
    cmd.env("HOME", dir);
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn scripted_session_prints_log_and_totals() {
    let dir = tempdir().unwrap();
    let output = studyclock(dir.path())
        .args(["--tick-ms", "10"])
        .write_stdin("start q1\nstart q2\nstop\nstop\nlog\ntoday\nstatus\nquit\n")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("started q1"));
    assert!(stdout.contains("started q2"));
    assert!(stdout.contains("stopped q2 after 00:00"));
    assert!(stdout.contains("no active session"));
    assert!(stdout.contains(" q2 00:00"));
    assert!(!stdout.contains(" q1 00:00"));
    assert!(stdout.contains("today 0s"));
    assert!(stdout.contains("idle (1 logged)"));
}

#[test]
fn bad_commands_are_reported_not_fatal() {
    let dir = tempdir().unwrap();
    let output = studyclock(dir.path())
        .write_stdin("frobnicate\nstart\nstop please\ntotal\n")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("error: unknown command 'frobnicate'"));
    assert!(stdout.contains("error: 'start' needs a subject id"));
    assert!(stdout.contains("error: 'stop' takes no argument"));
    assert!(stdout.contains("total 0s"));
}

#[test]
fn report_is_written_on_exit() {
    let dir = tempdir().unwrap();
    let report = dir.path().join("out").join("report.json");
    let output = studyclock(dir.path())
        .args(["--format", "json", "--out"])
        .arg(&report)
        .write_stdin("start q1\nstop\nstart q2\nstop\n")
        .output()
        .unwrap();

    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&report).unwrap()).unwrap();
    assert_eq!(value["session_count"], 2);
    assert_eq!(value["sessions"][0]["subject_id"], "q1");
    assert_eq!(value["sessions"][1]["subject_id"], "q2");
}

#[test]
fn save_config_persists_effective_settings() {
    let dir = tempdir().unwrap();
    let output = studyclock(dir.path())
        .args(["--tick-ms", "250", "--max-log-entries", "5", "--save-config"])
        .write_stdin("quit\n")
        .output()
        .unwrap();
    assert!(output.status.success());

    let saved: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("config.json")).unwrap())
            .unwrap();
    assert_eq!(saved["tick_interval_ms"], 250);
    assert_eq!(saved["max_log_entries"], 5);
}

#[test]
fn zero_tick_is_rejected() {
    let dir = tempdir().unwrap();
    let output = studyclock(dir.path())
        .args(["--tick-ms", "0"])
        .write_stdin("quit\n")
        .output()
        .unwrap();
    assert!(!output.status.success());
}
