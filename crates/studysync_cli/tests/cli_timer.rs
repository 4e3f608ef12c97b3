use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("studysync-{nanos}-{file_name}"))
}

fn run(store_path: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_studysync"))
        .args(args)
        .env("STUDYSYNC_STORE_PATH", store_path)
        .env("STUDYSYNC_CONFIG_PATH", store_path.with_extension("config.json"))
        .env("STUDYSYNC_DISABLE_NOTIFICATIONS", "1")
        .output()
        .expect("failed to run studysync")
}

#[test]
fn focus_run_credits_counter_and_hours() {
    let store_path = temp_path("cli-timer-focus.json");

    let output = run(
        &store_path,
        &["timer", "run", "--json", "--config-override", "timer.focus=1"],
    );
    let stored = std::fs::read_to_string(&store_path).unwrap();

    std::fs::remove_file(&store_path).ok();
    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["completed"], "Focus");
    assert_eq!(result["next"], "Short Break");
    assert_eq!(result["total_pomodoros"], 1);

    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored["entries"]["ss_pomodoros"], 1);
    let hours: f64 = stored["entries"]["ss_hours"]
        .as_array()
        .unwrap()
        .iter()
        .map(|value| value.as_f64().unwrap())
        .sum();
    assert_eq!(hours, 20.5);
}

#[test]
fn break_run_prints_countdown_and_notice() {
    let store_path = temp_path("cli-timer-break.json");

    let output = run(
        &store_path,
        &[
            "timer",
            "run",
            "--mode",
            "short",
            "--config-override",
            "timer.short_break=2",
        ],
    );

    let exists = store_path.exists();
    std::fs::remove_file(&store_path).ok();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Short Break | ○○○○"));
    assert!(stdout.contains("00:02"));
    assert!(stdout.contains("00:00"));
    assert!(stdout.contains("Break over! Ready to focus?"));
    assert!(!exists);
}

#[test]
fn unknown_mode_is_rejected() {
    let store_path = temp_path("cli-timer-mode.json");

    let output = run(&store_path, &["timer", "run", "--mode", "nap"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
}
