use std::fs;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn run_progress(home: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_progress"))
        .args(args)
        .env("HOME", home.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("run progress")
}

#[test]
fn relays_stdout_and_reports_summary() {
    let home = TempDir::new().expect("temp home");
    let output = run_progress(
        &home,
        &["-i", "0.05", "--label", "seq", "--", "for i in 1 2 3; do echo line$i; done"],
    );

    assert!(output.status.success(), "status: {:?}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "line1\nline2\nline3\n");
    let stderr = String::from_utf8_lossy(&output.stderr);
    let last = stderr.lines().last().expect("summary line");
    assert!(
        last.starts_with("progress: seq lines=3 elapsed="),
        "unexpected summary: {last:?}"
    );
    assert!(last.ends_with(" done exit=0"), "unexpected summary: {last:?}");
}

#[test]
fn relays_non_utf8_output_unchanged() {
    let home = TempDir::new().expect("temp home");
    let output = run_progress(
        &home,
        &["-i", "5", "--label", "bytes", "--", "printf 'a\\377b\\n'; seq 1 20000"],
    );

    assert!(output.status.success(), "status: {:?}", output.status);
    assert!(output.stdout.starts_with(b"a\xffb\n1\n2\n"));
    assert!(output.stdout.ends_with(b"\n20000\n"));
    assert_eq!(output.stdout.iter().filter(|byte| **byte == b'\n').count(), 20001);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let last = stderr.lines().last().expect("summary line");
    assert!(
        last.starts_with("progress: bytes lines=20001 "),
        "unexpected summary: {last:?}"
    );
    assert!(last.ends_with(" done exit=0"), "unexpected summary: {last:?}");
}

#[test]
fn reports_periodically_while_command_runs() {
    let home = TempDir::new().expect("temp home");
    let output = run_progress(
        &home,
        &["-i", "0.05", "--label", "slow", "--", "echo a; sleep 0.4; echo b"],
    );

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let periodic = stderr
        .lines()
        .filter(|line| line.starts_with("progress: slow lines=") && !line.contains(" done"))
        .count();
    assert!(periodic >= 2, "expected periodic reports, got: {stderr}");
}

#[test]
fn json_format_from_config_file() {
    let home = TempDir::new().expect("temp home");
    let config_dir = home.path().join(".config");
    fs::create_dir_all(&config_dir).expect("config dir");
    fs::write(
        config_dir.join("progress.yml"),
        "interval: 0.05\nformat: json\n",
    )
    .expect("write config");

    let output = run_progress(&home, &["--label", "j", "--", "echo x"]);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let last = stderr.lines().last().expect("summary");
    let summary: serde_json::Value = serde_json::from_str(last).expect("json summary");
    assert_eq!(summary["label"], "j");
    assert_eq!(summary["lines"], 1);
    assert_eq!(summary["done"], true);
    assert_eq!(summary["exit_code"], 0);
}

#[test]
fn exits_with_command_exit_code() {
    let home = TempDir::new().expect("temp home");
    let output = run_progress(&home, &["-i", "0.05", "--", "echo partial; exit 7"]);

    assert_eq!(output.status.code(), Some(7));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("done exit=7"), "{stderr}");
}

#[test]
fn rejects_non_positive_interval() {
    let home = TempDir::new().expect("temp home");
    let output = run_progress(&home, &["-i", "0", "--", "true"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("interval"), "{stderr}");
}

#[test]
fn missing_explicit_config_fails_setup() {
    let home = TempDir::new().expect("temp home");
    let missing = home.path().join("nope.yml");
    let output = run_progress(
        &home,
        &["-c", missing.to_str().expect("utf8 path"), "--", "true"],
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Missing config file"), "{stderr}");
}
