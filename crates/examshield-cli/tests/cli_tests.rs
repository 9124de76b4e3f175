//! CLI integration tests using assert_cmd.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const BANK: &str = "../../question-banks/physics-medium.toml";
const ANSWERS: &str = "../../demos/answers/physics-sample.toml";

fn examshield() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("examshield").unwrap()
}

/// Write a placeholder-grader config so tests ignore any user config.
fn write_config(dir: &TempDir, extra: &str) -> PathBuf {
    let path = dir.path().join("examshield.toml");
    std::fs::write(&path, format!("{extra}\n[grader]\ntype = \"placeholder\"\n")).unwrap();
    path
}

fn write_script(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("answers.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn validate_sample_bank() {
    examshield()
        .arg("validate")
        .arg("--bank")
        .arg(BANK)
        .assert()
        .success()
        .stdout(predicate::str::contains("7 questions"))
        .stdout(predicate::str::contains("5 MCQ, 1 short, 1 long"))
        .stdout(predicate::str::contains("All question banks valid"));
}

#[test]
fn validate_directory() {
    examshield()
        .arg("validate")
        .arg("--bank")
        .arg("../../question-banks")
        .assert()
        .success()
        .stdout(predicate::str::contains("physics-medium"));
}

#[test]
fn validate_nonexistent_file() {
    examshield()
        .arg("validate")
        .arg("--bank")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let bank = dir.path().join("bank.toml");
    std::fs::write(
        &bank,
        r#"
[bank]
id = "thin"
subject = "Physics"

[[questions]]
id = "q1"
type = "short"
prompt = "State Newton's second law."
topic = "Mechanics"
"#,
    )
    .unwrap();

    examshield()
        .arg("validate")
        .arg("--bank")
        .arg(&bank)
        .assert()
        .success()
        .stdout(predicate::str::contains("[q1] WARNING"))
        .stdout(predicate::str::contains("1 warning(s) found"));
}

#[test]
fn take_sample_script_text() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "");

    examshield()
        .arg("take")
        .arg("--bank")
        .arg(BANK)
        .arg("--answers")
        .arg(ANSWERS)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 14/25"))
        .stdout(predicate::str::contains("Accuracy: 56%"))
        .stdout(predicate::str::contains("Time: 20 min"))
        .stdout(predicate::str::contains("Tab switches: 1"))
        .stdout(predicate::str::contains(
            "Weak topics: Magnetism, Mechanics, Optics, Waves",
        ))
        .stderr(predicate::str::contains("Tab switch detected! Warning 1/3"));
}

#[test]
fn take_sample_script_json() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "");

    let output = examshield()
        .arg("take")
        .arg("--bank")
        .arg(BANK)
        .arg("--answers")
        .arg(ANSWERS)
        .arg("--config")
        .arg(&config)
        .arg("--format")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["score"], 14);
    assert_eq!(result["total_marks"], 25);
    assert_eq!(result["accuracy"], 56);
    assert_eq!(result["submit_reason"], "manual");
    assert_eq!(result["integrity_warnings"], 1);
    assert_eq!(result["topic_breakdown"]["Mechanics"]["total"], 2);
    assert_eq!(result["questions"].as_array().unwrap().len(), 7);
}

#[test]
fn take_runs_out_of_time_without_submit() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "");
    let script = write_script(
        &dir,
        r#"
[[events]]
action = "select"
question = "q1"
option = 0
"#,
    );

    examshield()
        .arg("take")
        .arg("--bank")
        .arg(BANK)
        .arg("--answers")
        .arg(&script)
        .arg("--config")
        .arg(&config)
        .arg("--minutes")
        .arg("1")
        .arg("--tick-ms")
        .arg("1")
        .assert()
        .success()
        .stderr(predicate::str::contains("time expired"))
        .stdout(predicate::str::contains("Score: 2/25"))
        .stdout(predicate::str::contains("Time: 1 min"));
}

#[test]
fn take_reports_rejected_events() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "");
    let script = write_script(
        &dir,
        r#"
[[events]]
action = "select"
question = "q1"
option = 9

[[events]]
action = "text"
question = "q1"
text = "not an MCQ answer"

[[events]]
action = "submit"

[[events]]
action = "select"
question = "q2"
option = 1
"#,
    );

    examshield()
        .arg("take")
        .arg("--bank")
        .arg(BANK)
        .arg("--answers")
        .arg(&script)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stderr(predicate::str::contains("Rejected select"))
        .stderr(predicate::str::contains("Rejected text"))
        .stdout(predicate::str::contains("Score: 0/25"));
}

#[test]
fn take_rejects_subject_mismatch() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "");

    examshield()
        .arg("take")
        .arg("--bank")
        .arg(BANK)
        .arg("--answers")
        .arg(ANSWERS)
        .arg("--config")
        .arg(&config)
        .arg("--subject")
        .arg("Chemistry")
        .assert()
        .failure()
        .stderr(predicate::str::contains("covers Physics"));
}

#[test]
fn take_uses_configured_threshold() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "weak_topic_threshold = 40.0");

    examshield()
        .arg("take")
        .arg("--bank")
        .arg(BANK)
        .arg("--answers")
        .arg(ANSWERS)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Weak topics: Magnetism, Optics, Waves"));
}

#[test]
fn show_config_masks_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("examshield.toml");
    std::fs::write(
        &path,
        r#"
[grader]
type = "remote"
base_url = "https://grader.example.com"
api_key = "sk-very-secret"
"#,
    )
    .unwrap();

    examshield()
        .arg("show-config")
        .arg("--config")
        .arg(&path)
        .env_remove("EXAMSHIELD_GRADER_KEY")
        .assert()
        .success()
        .stdout(predicate::str::contains("Grader: remote at https://grader.example.com"))
        .stdout(predicate::str::contains("sk-very-secret").not());
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    examshield()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created examshield.toml"))
        .stdout(predicate::str::contains("Created question-banks/sample.toml"))
        .stdout(predicate::str::contains("Created answers/sample.toml"));

    assert!(dir.path().join("examshield.toml").exists());

    examshield()
        .current_dir(dir.path())
        .arg("take")
        .arg("--bank")
        .arg("question-banks/sample.toml")
        .arg("--answers")
        .arg("answers/sample.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 5/9"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    examshield()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    examshield()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn help_output() {
    examshield()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Timed practice test engine"));
}

#[test]
fn version_output() {
    examshield()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("examshield"));
}
