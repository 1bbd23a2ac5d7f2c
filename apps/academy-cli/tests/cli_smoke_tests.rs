#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CLI smoke tests for the academy-cli binary
//!
//! Every run gets its own home directory so session state never leaks
//! between tests or into the developer's real home.

use std::path::Path;
use std::process::{Command, Output, Stdio};

use httpmock::prelude::*;
use serde_json::json;
use tempfile::TempDir;

/// Run academy-cli with an isolated home directory
fn run_cli(home: &Path, args: &[&str]) -> Output {
    run_cli_with_env(home, args, &[])
}

fn run_cli_with_env(home: &Path, args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_academy-cli"));
    cmd.arg("--home-dir")
        .arg(home)
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in env {
        cmd.env(key, value);
    }
    cmd.output().expect("Failed to execute academy-cli")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn mock_env(server: &MockServer) -> Vec<(&'static str, String)> {
    vec![
        ("ACADEMY__API__BASE_URL", server.base_url()),
        ("ACADEMY__HTTP__ALLOW_INSECURE_HTTP", "true".to_owned()),
    ]
}

fn as_refs<'a>(env: &'a [(&'static str, String)]) -> Vec<(&'static str, &'a str)> {
    env.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

#[test]
fn test_cli_help_command() {
    let home = TempDir::new().unwrap();
    let output = run_cli(home.path(), &["--help"]);

    assert!(output.status.success(), "Help command should succeed");
    let stdout = stdout(&output);
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    for sub in ["tenant", "login", "logout", "me", "get", "check"] {
        assert!(stdout.contains(sub), "Should list '{sub}': {stdout}");
    }
    assert!(stdout.contains("--config"), "Should mention config option");
}

#[test]
fn test_cli_version_command() {
    let home = TempDir::new().unwrap();
    let output = run_cli(home.path(), &["--version"]);

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("academy-cli"));
    assert!(stdout.chars().any(|c| c.is_ascii_digit()));
}

#[test]
fn test_cli_invalid_command() {
    let home = TempDir::new().unwrap();
    let output = run_cli(home.path(), &["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");
    assert!(stderr(&output).contains("error"));
}

#[test]
fn test_cli_config_missing_file() {
    let home = TempDir::new().unwrap();
    let output = run_cli(home.path(), &["-c", "/nonexistent/academy.yaml", "check"]);

    assert!(!output.status.success());
    let stderr = stderr(&output);
    assert!(stderr.contains("does not exist"), "{stderr}");
}

#[test]
fn test_cli_config_invalid_yaml() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("invalid.yaml");
    std::fs::write(&config_path, "api: [unclosed").unwrap();

    let output = run_cli(home.path(), &["-c", config_path.to_str().unwrap(), "check"]);

    assert!(!output.status.success(), "Should fail with invalid YAML");
    assert!(stderr(&output).contains("configuration"));
}

#[test]
fn test_cli_check_prints_effective_config() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("academy.yaml");
    std::fs::write(
        &config_path,
        r#"
api:
  base_url: "https://api.hakwonplus.com"
tenant:
  base_domains: ["basedomain.com"]
playback:
  flush_interval: "5s"
"#,
    )
    .unwrap();

    let output = run_cli(home.path(), &["-c", config_path.to_str().unwrap(), "check"]);

    assert!(output.status.success(), "{}", stderr(&output));
    let stdout = stdout(&output);
    assert!(stdout.contains("Configuration is valid"));
    assert!(stdout.contains("https://api.hakwonplus.com"));
    assert!(stdout.contains("basedomain.com"));
    assert!(stdout.contains("5s"));
}

#[test]
fn test_cli_env_overrides_file() {
    let home = TempDir::new().unwrap();
    let output = run_cli_with_env(
        home.path(),
        &["--print-config"],
        &[("ACADEMY__API__BASE_URL", "https://staging.example")],
    );

    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("https://staging.example"));
}

#[test]
fn test_cli_tenant_list() {
    let home = TempDir::new().unwrap();
    let output = run_cli(home.path(), &["tenant", "list"]);

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("hakwonplus"));
    assert!(stdout.contains("tchul"));
}

#[test]
fn test_cli_tenant_resolve_from_hostname() {
    let home = TempDir::new().unwrap();
    let output = run_cli(home.path(), &["tenant", "resolve", "--host", "tchul.com"]);

    assert!(output.status.success(), "{}", stderr(&output));
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["status"], "resolved");
    assert_eq!(value["code"], "tchul");
    assert_eq!(value["source"], "hostname");
}

#[test]
fn test_cli_tenant_resolve_ambiguous() {
    let home = TempDir::new().unwrap();
    let output = run_cli(home.path(), &["tenant", "resolve", "--host", "localhost"]);

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["status"], "unresolved");
    assert_eq!(value["reason"], "ambiguous");
}

#[test]
fn test_cli_tenant_override_persists_until_cleared() {
    let home = TempDir::new().unwrap();

    let set = run_cli(home.path(), &["tenant", "set", "ymath"]);
    assert!(set.status.success(), "{}", stderr(&set));

    let resolved = run_cli(home.path(), &["tenant", "resolve", "--host", "tchul.com"]);
    let value: serde_json::Value = serde_json::from_str(&stdout(&resolved)).unwrap();
    assert_eq!(value["code"], "ymath");
    assert_eq!(value["source"], "storage");

    let clear = run_cli(home.path(), &["tenant", "clear"]);
    assert!(clear.status.success());

    let resolved = run_cli(home.path(), &["tenant", "resolve", "--host", "tchul.com"]);
    let value: serde_json::Value = serde_json::from_str(&stdout(&resolved)).unwrap();
    assert_eq!(value["code"], "tchul");
}

#[test]
fn test_cli_tenant_set_rejects_bad_code() {
    let home = TempDir::new().unwrap();
    let output = run_cli(home.path(), &["tenant", "set", "not a code"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid tenant code"));
}

#[test]
fn test_cli_me_without_session() {
    let home = TempDir::new().unwrap();
    let output = run_cli(home.path(), &["me"]);

    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("not logged in"));
}

#[test]
fn test_cli_login_then_get_then_logout() {
    let server = MockServer::start();
    let login = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/token/")
            .header("x-tenant-code", "tchul")
            .json_body(json!({"username": "teacher01", "password": "pw"}));
        then.status(200)
            .json_body(json!({"access": "a1", "refresh": "r1"}));
    });
    let students = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/students/")
            .query_param("page", "2")
            .header("authorization", "Bearer a1")
            .header("x-tenant-code", "tchul");
        then.status(200).json_body(json!({"count": 1, "results": [{"id": 9}]}));
    });

    let home = TempDir::new().unwrap();
    let env = mock_env(&server);
    let env = as_refs(&env);

    let output = run_cli_with_env(
        home.path(),
        &["--host", "tchul.com", "login", "-u", "teacher01", "-p", "pw"],
        &env,
    );
    assert!(output.status.success(), "{}", stderr(&output));
    login.assert();

    let output = run_cli_with_env(
        home.path(),
        &["--host", "tchul.com", "get", "/students/", "-q", "page=2"],
        &env,
    );
    assert!(output.status.success(), "{}", stderr(&output));
    students.assert();
    let body: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(body["count"], 1);

    let output = run_cli_with_env(home.path(), &["logout"], &env);
    assert!(output.status.success());
    let stored = std::fs::read_to_string(home.path().join("storage.json")).unwrap();
    assert!(!stored.contains("a1"), "tokens removed: {stored}");
}

#[test]
fn test_cli_get_reports_api_errors() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/students/");
        then.status(403)
            .json_body(json!({"detail": "You do not have permission to perform this action."}));
    });

    let home = TempDir::new().unwrap();
    let env = mock_env(&server);
    let output = run_cli_with_env(home.path(), &["get", "/students/"], &as_refs(&env));

    assert!(!output.status.success());
    let stderr = stderr(&output);
    assert!(stderr.contains("forbidden"), "{stderr}");
    assert!(stderr.contains("permission"), "{stderr}");
}

fn mock_playback(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/student/video/videos/5/playback/")
            .query_param("enrollment", "9");
        then.status(200).json_body(json!({
            "video": {"id": 5, "title": "Quadratics", "duration": 600.0},
            "hls_url": "https://cdn.example/5/master.m3u8",
            "policy": {"access_mode": "PROCTORED_CLASS", "seek": {"mode": "blocked"}}
        }));
    })
}

#[test]
fn test_cli_playback_info() {
    let server = MockServer::start();
    let playback = mock_playback(&server);

    let home = TempDir::new().unwrap();
    let env = mock_env(&server);
    let output = run_cli_with_env(
        home.path(),
        &["playback", "info", "5", "--enrollment", "9"],
        &as_refs(&env),
    );

    assert!(output.status.success(), "{}", stderr(&output));
    playback.assert();
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["video_id"], 5);
    assert_eq!(value["title"], "Quadratics");
    assert_eq!(value["stream_url"], "https://cdn.example/5/master.m3u8");
    assert_eq!(value["policy"]["monitoring_enabled"], true);
    assert_eq!(value["policy"]["seek"]["mode"], "blocked");
}

#[test]
fn test_cli_playback_watch_ends_session_before_exit() {
    let server = MockServer::start();
    let playback = mock_playback(&server);
    let end = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/videos/playback/end/")
            .json_body(json!({"token": "tok"}));
        then.status(200).json_body(json!({"ok": true}));
    });
    let progress = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/student/video/videos/5/progress/")
            .body_includes(r#""completed":false"#);
        then.status(200).json_body(json!({
            "id": 1, "video_id": 5, "progress": 0.0, "completed": false, "last_position": 0.0
        }));
    });

    let home = TempDir::new().unwrap();
    let env = mock_env(&server);
    let runs = 3;
    for _ in 0..runs {
        let output = run_cli_with_env(
            home.path(),
            &[
                "playback", "watch", "5", "--enrollment", "9", "--token", "tok", "--for", "1ms",
            ],
            &as_refs(&env),
        );
        assert!(output.status.success(), "{}", stderr(&output));
        assert!(stdout(&output).contains("progress saved"));
    }

    assert_eq!(playback.calls(), runs);
    assert_eq!(end.calls(), runs, "every run delivers the end notice");
    assert_eq!(progress.calls(), runs);
}
