use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

const HANDSHAKE: &str = r#"{"magic_cookie":"alertflow-runner-plugin","protocol_version":1}"#;

fn collect_data(config: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_collect-data"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("COLLECT_DATA_BACKEND_URL")
        .env_remove("COLLECT_DATA_API_KEY")
        .env_remove("COLLECT_DATA_MAGIC_COOKIE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start collect-data");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().expect("Failed to wait for collect-data")
}

fn stdout_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout carries only JSON lines"))
        .collect()
}

#[test]
fn test_details_prints_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    let output = collect_data(&dir.path().join("config.toml"), &["details"], "");

    assert!(output.status.success());
    let descriptor: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(descriptor["name"], "Collect Data");
    assert_eq!(descriptor["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(descriptor["action"]["id"], "collect_data");
}

#[test]
fn test_serve_exits_cleanly_when_input_closes() {
    let dir = tempfile::tempdir().unwrap();
    let input = format!("{}\n{{\"action\":\"details\"}}\n", HANDSHAKE);
    let output = collect_data(&dir.path().join("config.toml"), &["serve"], &input);

    assert_eq!(output.status.code(), Some(0));
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["success"], true);
    assert_eq!(lines[1]["plugin"]["name"], "Collect Data");
}

#[test]
fn test_serve_is_the_default_command() {
    let dir = tempfile::tempdir().unwrap();
    let output = collect_data(&dir.path().join("config.toml"), &[], &format!("{}\n", HANDSHAKE));

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout_lines(&output)[0]["protocol_version"], 1);
}

#[test]
fn test_handshake_mismatch_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let input = "{\"magic_cookie\":\"intruder\",\"protocol_version\":1}\n";
    let output = collect_data(&dir.path().join("config.toml"), &["serve"], input);

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stdout_lines(&output)[0]["success"], false);
}

#[test]
fn test_malformed_request_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let input = format!("{}\nthis is not json\n", HANDSHAKE);
    let output = collect_data(&dir.path().join("config.toml"), &["serve"], &input);

    assert_eq!(output.status.code(), Some(1));
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["success"], false);
}

#[test]
fn test_magic_cookie_flag() {
    let dir = tempfile::tempdir().unwrap();
    let input = "{\"magic_cookie\":\"custom\",\"protocol_version\":1}\n";
    let output = collect_data(
        &dir.path().join("config.toml"),
        &["--magic-cookie", "custom", "serve"],
        input,
    );

    assert_eq!(output.status.code(), Some(0));
}
