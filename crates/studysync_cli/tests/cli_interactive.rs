use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("studysync-{nanos}-{file_name}"))
}

fn run_interactive(name: &str, input: &str) -> std::process::Output {
    let store_path = temp_path(name);

    let mut child = Command::new(env!("CARGO_BIN_EXE_studysync"))
        .env("STUDYSYNC_STORE_PATH", &store_path)
        .env("STUDYSYNC_CONFIG_PATH", store_path.with_extension("config.json"))
        .env("STUDYSYNC_DISABLE_NOTIFICATIONS", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn interactive session");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        stdin
            .write_all(input.as_bytes())
            .expect("failed to write to stdin");
    }

    let output = child
        .wait_with_output()
        .expect("failed to read interactive output");

    std::fs::remove_file(&store_path).ok();
    output
}

#[test]
fn interactive_help_shows_usage() {
    let output = run_interactive("repl-help.json", "help\nexit\n");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage") || stdout.contains("USAGE"));
}

#[test]
fn interactive_invalid_command_prints_error_and_continues() {
    let output = run_interactive("repl-invalid.json", "nope\ndashboard\nexit\n");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Total tasks:"));
}

#[test]
fn interactive_unterminated_quote_is_reported() {
    let output = run_interactive("repl-quote.json", "add \"Essay\nquit\n");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input - unterminated quote in command"));
}

#[test]
fn interactive_session_shares_the_store() {
    let output = run_interactive(
        "repl-session.json",
        "add \"Read chapter 2\" --subject History\nlist --status pending\n",
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Added task: Read chapter 2"));
    assert!(stdout.contains("History"));
}
