//! Integration tests for the `gatewatch` CLI binary.
//!
//! Captures are written to temp files or piped through stdin; the user's
//! real configuration is never read.
#![allow(clippy::unwrap_used)]

use std::io::Write;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

const DID: &str = "lumi.158d0001a2b3c4";
const IEEE: &str = "0x00158D0001A2B3C4";

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `gatewatch` binary with env isolation.
///
/// Clears `GATEWATCH_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn gatewatch_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("gatewatch");
    cmd.env("HOME", "/tmp/gatewatch-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/gatewatch-test-nonexistent")
        .env_remove("GATEWATCH_CONFIG")
        .env_remove("GATEWATCH_OUTPUT")
        .env_remove("GATEWATCH_PULSE_DELAY_MS")
        .env_remove("RUST_LOG");
    cmd
}

fn temp_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn telemetry_line(aps: u8, zcl: u8) -> String {
    format!(
        concat!(
            r#"{{"key":"{IEEE}","frame":{{"sourceAddress":"0x1234","linkQuality":96,"#,
            r#""rssi":-70,"clusterId":6,"APSCounter":"0x{aps:02x}","#,
            r#""APSPlayload":"0x18{zcl:02x}0a"}}}}"#,
        ),
        IEEE = IEEE,
        aps = aps,
        zcl = zcl,
    )
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = gatewatch_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "Expected 'Usage' in output:\n{stderr}");
}

#[test]
fn test_help_lists_commands() {
    gatewatch_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("replay")
            .and(predicate::str::contains("config"))
            .and(predicate::str::contains("completions")),
    );
}

#[test]
fn test_version_flag() {
    gatewatch_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gatewatch"));
}

#[test]
fn test_completions_zsh() {
    gatewatch_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_flag() {
    gatewatch_cmd()
        .args(["config", "path", "--config", "/etc/gatewatch/custom.toml"])
        .assert()
        .success()
        .stdout("/etc/gatewatch/custom.toml\n");
}

#[test]
fn test_config_show_json() {
    let config = temp_file("pulse_delay_ms = 250\n\n[[entities]]\nkind = \"scanner\"\n");
    gatewatch_cmd()
        .args(["config", "show", "-o", "json", "--config"])
        .arg(config.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"pulse_delay_ms\": 250")
                .and(predicate::str::contains("\"kind\": \"scanner\"")),
        );
}

#[test]
fn test_invalid_config_exits_3() {
    let config = temp_file("pulse_delay_ms = 0\n");
    let capture = temp_file("");
    gatewatch_cmd()
        .args(["replay", "--zigbee", DID, "--config"])
        .arg(config.path())
        .arg(capture.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("pulse_delay_ms"));
}

// ── Replay ──────────────────────────────────────────────────────────

#[test]
fn test_replay_without_entities_is_usage_error() {
    gatewatch_cmd()
        .arg("replay")
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No entities"));
}

#[test]
fn test_replay_invalid_device_id() {
    gatewatch_cmd()
        .args(["replay", "--zigbee", "nope"])
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_replay_missing_capture_file() {
    gatewatch_cmd()
        .args(["replay", "--scanner", "/tmp/gatewatch-test-nonexistent/capture.ndjson"])
        .assert()
        .code(4);
}

#[test]
fn test_replay_zigbee_counts_missed_messages() {
    let unresponsive = format!(r#"{{"key":"{IEEE}","frame":{{"deviceState":17}}}}"#);
    let capture = temp_file(&format!(
        "{}\n{}\n{unresponsive}\n",
        telemetry_line(10, 10),
        telemetry_line(15, 14),
    ));

    let output = gatewatch_cmd()
        .args(["replay", "-o", "json", "--zigbee", DID])
        .arg(capture.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let published: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let attributes = &published[0]["attributes"];
    assert_eq!(published[0]["entity_id"], "sensor.lumi_158d0001a2b3c4_zigbee");
    assert_eq!(attributes["ieee"], IEEE);
    assert_eq!(attributes["msg_received"], 2);
    assert_eq!(attributes["msg_missed"], 3);
    assert_eq!(attributes["unresponsive"], 1);
    assert_eq!(attributes["last_msg"], "OnOff");
}

#[test]
fn test_replay_skips_malformed_lines() {
    let capture = temp_file(&format!(
        "{}\nnot json\n{}\n",
        telemetry_line(1, 1),
        telemetry_line(2, 2)
    ));
    gatewatch_cmd()
        .args(["replay", "-o", "json-compact", "--zigbee", DID])
        .arg(capture.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"msg_received\":2"))
        .stderr(predicate::str::contains("skipping malformed line"));
}

#[test]
fn test_replay_strict_rejects_malformed_lines() {
    let capture = temp_file(&format!("{}\nnot json\n", telemetry_line(1, 1)));
    gatewatch_cmd()
        .args(["replay", "--strict", "--zigbee", DID])
        .arg(capture.path())
        .assert()
        .code(4)
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn test_replay_scanner_from_stdin() {
    let capture = concat!(
        r#"{"key":"ble_scanner","frame":{"mac":"01000038c1a4","adv":"50205b050a"}}"#,
        "\n",
        r#"{"key":"ble_scanner","frame":{"mac":"01000038c1a4","adv":"50205b050a"}}"#,
        "\n",
    );
    gatewatch_cmd()
        .args(["replay", "-", "--scanner", "-o", "json-compact"])
        .write_stdin(capture)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"state\":1").and(predicate::str::contains(
                "\"unknown_macs\":[\"a4:c1:38:00:00:01 LYWSD03MMC\"]",
            )),
        );
}

#[test]
fn test_replay_follow_shows_action_pulse() {
    let capture = r#"{"key":"lumi.158d0001","frame":{"button":1}}"#;
    gatewatch_cmd()
        .args([
            "replay",
            "--follow",
            "--action",
            "lumi.158d0001",
            "--pulse-delay-ms",
            "10",
            "-o",
            "json-compact",
        ])
        .write_stdin(capture)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"state\":\"single\"")
                .and(predicate::str::contains("\"click_type\":\"single\""))
                .and(predicate::str::contains("\"state\":\"\"")),
        );
}

#[test]
fn test_replay_gateway_offline() {
    gatewatch_cmd()
        .args(["replay", "--gateway", "lumi.0", "--gateway-offline", "-o", "json-compact"])
        .write_stdin("{\"key\":\"lumi.0\",\"frame\":{}}\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"state\":null"));
}

#[test]
fn test_replay_sensor_keeps_last_value() {
    let capture = concat!(
        r#"{"key":"lumi.1","frame":{"temperature":21.5}}"#,
        "\n",
        r#"{"key":"lumi.1","frame":{"humidity":40}}"#,
        "\n",
    );
    gatewatch_cmd()
        .args(["replay", "--sensor", "lumi.1=temperature", "-o", "json-compact"])
        .write_stdin(capture)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"entity_id\":\"sensor.lumi_1_temperature\"")
                .and(predicate::str::contains("\"state\":21.5")),
        );
}
