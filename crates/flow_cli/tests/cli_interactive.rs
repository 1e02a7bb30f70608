use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("focusflow-{nanos}-{file_name}"))
}

fn run_session(store_path: &Path, script: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_flow"))
        .env("FLOW_STORE_PATH", store_path)
        .env("FLOW_CONFIG_PATH", store_path.with_extension("config.json"))
        .env("FLOW_TODAY", "2024-01-01")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn flow");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(script.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn interactive_session_runs_commands_until_quit() {
    let store_path = temp_path("cli-interactive.json");

    let output = run_session(
        &store_path,
        "plan \"Write intro\" \"Draft chapter\" --per-day 2\n\ndone 1\nprogress\nquit\nprogress\n",
    );
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Planned 2 tasks from 2024-01-01 to 2024-01-01."));
    assert!(stdout.contains("Completed task: Write intro (1)"));
    assert_eq!(stdout.matches("1/2 tasks done (50%)").count(), 1);
}

#[test]
fn interactive_errors_do_not_end_the_session() {
    let store_path = temp_path("cli-interactive-errors.json");

    let output = run_session(
        &store_path,
        "bogus\nplan\nplan \"unterminated\ndone 1\nplan a\nexport\n",
    );
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input - unrecognized subcommand"));
    assert!(stderr.contains("tasks are required"));
    assert!(stderr.contains("unterminated quote"));
    assert!(stderr.contains("no plan yet"));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("- a"));
}

#[test]
fn interactive_help_prints_usage() {
    let store_path = temp_path("cli-interactive-help.json");

    let output = run_session(&store_path, "help\nexit\n");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("reorder"));
}
