//! Integration tests for the `vpnlink` CLI binary.
//!
//! Argument parsing, help output, shell completions, config handling and
//! error exit codes, plus a few commands against a scripted fake daemon on
//! a Unix socket.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `vpnlink` binary with env isolation.
///
/// Clears `VPNLINK_*` env vars and points the config file into `dir` so
/// tests never touch the user's real configuration.
fn vpnlink_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("vpnlink");
    cmd.env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir)
        .env("VPNLINK_CONFIG", dir.join("config.toml"))
        .env("NO_COLOR", "1")
        .env_remove("VPNLINK_ENDPOINT")
        .env_remove("VPNLINK_OUTPUT")
        .env_remove("VPNLINK_TIMEOUT")
        .env_remove("VPNLINK_ACCOUNT_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = vpnlink_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    vpnlink_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("status")
                .and(predicate::str::contains("connect"))
                .and(predicate::str::contains("allow-lan"))
                .and(predicate::str::contains("events")),
        );
}

#[test]
fn version_flag() {
    let dir = tempfile::tempdir().unwrap();
    vpnlink_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vpnlink"));
}

#[test]
fn completions_zsh() {
    let dir = tempfile::tempdir().unwrap();
    vpnlink_cmd(dir.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Argument errors ─────────────────────────────────────────────────

#[test]
fn invalid_output_format() {
    let dir = tempfile::tempdir().unwrap();
    let output = vpnlink_cmd(dir.path())
        .args(["--output", "table", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("possible values"));
}

#[test]
fn bridge_rejects_unknown_mode() {
    let dir = tempfile::tempdir().unwrap();
    vpnlink_cmd(dir.path())
        .args(["bridge", "sometimes"])
        .assert()
        .code(2);
}

#[test]
fn account_token_conflicts_with_logout() {
    let dir = tempfile::tempdir().unwrap();
    vpnlink_cmd(dir.path())
        .args(["account", "1234", "--logout"])
        .assert()
        .code(2);
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn config_path_honors_override() {
    let dir = tempfile::tempdir().unwrap();
    vpnlink_cmd(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn config_init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    vpnlink_cmd(dir.path()).args(["config", "init"]).assert().success();
    assert!(dir.path().join("config.toml").exists());

    vpnlink_cmd(dir.path())
        .args(["config", "init"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--force"));

    vpnlink_cmd(dir.path())
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn config_show_masks_token() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "account_token = \"1234567890\"\n",
    )
    .unwrap();

    vpnlink_cmd(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("****").and(predicate::str::contains("1234567890").not()));
}

#[test]
fn config_show_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let output = vpnlink_cmd(dir.path())
        .args(["--output", "json", "config", "show", "--endpoint", "tcp://127.0.0.1:4000"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["endpoint"], "tcp://127.0.0.1:4000");
    assert_eq!(value["timeouts"]["default_ms"], 5000);
}

#[test]
fn invalid_endpoint_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    vpnlink_cmd(dir.path())
        .args(["--endpoint", "tcp://no-port", "status"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("endpoint"));
}

// ── Daemon connection ───────────────────────────────────────────────

#[cfg(unix)]
#[test]
fn missing_daemon_exits_with_connection_code() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("missing.sock");
    vpnlink_cmd(dir.path())
        .args(["--endpoint", socket.to_str().unwrap(), "status"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Could not connect to the daemon"));
}

#[cfg(unix)]
mod fake_daemon {
    use std::io::{BufRead, BufReader, Write};
    use std::os::unix::net::UnixListener;
    use std::path::PathBuf;
    use std::thread::JoinHandle;

    use serde_json::{Value, json};

    /// Serves one connection, answering each request from `answer`, and
    /// returns every request it saw.
    pub fn spawn(
        path: PathBuf,
        answer: fn(&str) -> Value,
    ) -> JoinHandle<Vec<Value>> {
        spawn_with_events(path, answer, |_| None)
    }

    /// Like [`spawn`], additionally pushing `event(method)` as a
    /// `daemon_event` right after answering `method`.
    pub fn spawn_with_events(
        path: PathBuf,
        answer: fn(&str) -> Value,
        event: fn(&str) -> Option<Value>,
    ) -> JoinHandle<Vec<Value>> {
        let listener = UnixListener::bind(&path).unwrap();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut seen = Vec::new();
            for line in BufReader::new(stream).lines() {
                let Ok(line) = line else { break };
                let request: Value = serde_json::from_str(&line).unwrap();
                let method = request["method"].as_str().unwrap_or_default().to_owned();
                let reply = json!({
                    "jsonrpc": "2.0",
                    "id": request["id"],
                    "result": answer(&method),
                });
                writeln!(writer, "{reply}").unwrap();
                if let Some(payload) = event(&method) {
                    let push = json!({
                        "jsonrpc": "2.0",
                        "method": "daemon_event",
                        "params": {"subscription": 1, "result": payload},
                    });
                    writeln!(writer, "{push}").unwrap();
                }
                seen.push(request);
            }
            seen
        })
    }
}

#[cfg(unix)]
#[test]
fn status_reads_tunnel_state() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("daemon.sock");
    let daemon = fake_daemon::spawn(socket.clone(), |method| match method {
        "get_state" => serde_json::json!({"state": "blocked", "details": {"reason": "is_offline"}}),
        _ => serde_json::Value::Null,
    });

    vpnlink_cmd(dir.path())
        .args(["--endpoint", socket.to_str().unwrap(), "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("blocked (is_offline)"));

    let requests = daemon.join().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["method"], "get_state");
    assert_eq!(requests[0]["id"], 1);
}

#[cfg(unix)]
#[test]
fn connect_wait_subscribes_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("daemon.sock");
    let daemon = fake_daemon::spawn_with_events(
        socket.clone(),
        |method| match method {
            "daemon_event_subscribe" => serde_json::json!(1),
            "get_state" => serde_json::json!({"state": "disconnected"}),
            _ => serde_json::Value::Null,
        },
        |method| {
            (method == "connect")
                .then(|| serde_json::json!({"tunnel_state": {"state": "connected"}}))
        },
    );

    vpnlink_cmd(dir.path())
        .args(["--endpoint", socket.to_str().unwrap(), "connect", "--wait"])
        .assert()
        .success()
        .stdout(predicate::str::contains("connected"));

    let methods: Vec<_> = daemon
        .join()
        .unwrap()
        .iter()
        .map(|request| request["method"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(methods, ["daemon_event_subscribe", "get_state", "connect"]);
}

#[cfg(unix)]
#[test]
fn allow_lan_sends_flag() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("daemon.sock");
    let daemon = fake_daemon::spawn(socket.clone(), |_| serde_json::Value::Null);

    vpnlink_cmd(dir.path())
        .args(["--endpoint", socket.to_str().unwrap(), "allow-lan", "on"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Allow LAN: on"));

    let requests = daemon.join().unwrap();
    assert_eq!(requests[0]["method"], "set_allow_lan");
    assert_eq!(requests[0]["params"], serde_json::json!([true]));
}

#[cfg(unix)]
#[test]
fn invalid_account_exits_with_auth_code() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("daemon.sock");
    let listener = std::os::unix::net::UnixListener::bind(&socket).unwrap();
    let daemon = std::thread::spawn(move || {
        use std::io::{BufRead, BufReader, Write};

        let (stream, _) = listener.accept().unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut line = String::new();
        BufReader::new(stream).read_line(&mut line).unwrap();
        let request: serde_json::Value = serde_json::from_str(&line).unwrap();
        let reply = serde_json::json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "error": {"code": -200, "message": "account does not exist"},
        });
        writeln!(writer, "{reply}").unwrap();
        request
    });

    vpnlink_cmd(dir.path())
        .env("VPNLINK_ACCOUNT_TOKEN", "0000000000000000")
        .args(["--endpoint", socket.to_str().unwrap(), "account"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid account"));

    let request = daemon.join().unwrap();
    assert_eq!(request["method"], "get_account_data");
    assert_eq!(request["params"], "0000000000000000");
}
