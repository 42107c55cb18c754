// snakecharm/tests/cli_integration_tests.rs
//! Command-line integration tests for the `snakecharm` binary.
//!
//! These run the built executable with `assert_cmd`, feed payloads through
//! arguments or stdin, and check stdout, stderr and the exit code. Output is
//! passed through `strip_ansi_escapes` before comparing text.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};
use test_log::test;

use strip_ansi_escapes::strip as strip_ansi_escapes_fn;

fn snakecharm() -> Command {
    let mut cmd = Command::cargo_bin("snakecharm").unwrap();
    cmd.env_remove("SNAKECHARM_PROFILE");
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn strip_ansi(bytes: &[u8]) -> String {
    String::from_utf8_lossy(&strip_ansi_escapes_fn(bytes)).to_string()
}

fn first_line(bytes: &[u8]) -> String {
    strip_ansi(bytes).lines().next().unwrap_or_default().to_string()
}

#[test]
fn test_bypass_integer_from_argument() -> Result<()> {
    let output = snakecharm().args(["bypass", "-b", "1", "10"]).output()?;
    assert!(output.status.success(), "{}", strip_ansi(&output.stderr));
    let payload = first_line(&output.stdout);
    assert!(!payload.is_empty());
    assert!(!payload.contains('1'), "{payload}");
    Ok(())
}

#[test]
fn test_bypass_reads_payload_from_stdin() -> Result<()> {
    let output = snakecharm()
        .args(["bypass", "-b", "__"])
        .write_stdin("__import__('os').system('ls')\n")
        .output()?;
    assert!(output.status.success(), "{}", strip_ansi(&output.stderr));
    let payload = first_line(&output.stdout);
    assert!(!payload.contains("__"), "{payload}");
    assert!(payload.contains("import"), "{payload}");
    Ok(())
}

#[test]
fn test_comma_separated_blacklist_and_minlen() -> Result<()> {
    let output = snakecharm()
        .args(["bypass", "--blacklist", "',\"", "--minlen", "'abc'"])
        .output()?;
    assert!(output.status.success(), "{}", strip_ansi(&output.stderr));
    let payload = first_line(&output.stdout);
    assert!(!payload.contains('\'') && !payload.contains('"'), "{payload}");
    Ok(())
}

#[test]
fn test_json_output_describes_the_report() -> Result<()> {
    let output = snakecharm().args(["bypass", "-b", "1", "--json", "10"]).output()?;
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value["status"], "found");
    assert_eq!(value["report"]["original"], "10");
    assert_eq!(value["report"]["mode"], "first-success");
    let text = value["report"]["rendering"]["text"].as_str().unwrap_or_default();
    assert!(!text.contains('1'), "{text}");
    assert_eq!(value["report"]["length"].as_u64(), Some(text.chars().count() as u64));
    Ok(())
}

#[test]
fn test_no_bypass_exits_with_one() -> Result<()> {
    let filter = write_temp("white:\n  Bypass_Name: [by_builtins]\n", ".yaml")?;
    snakecharm()
        .args(["bypass", "-b", "__", "--filter"])
        .arg(filter.path())
        .arg("__import__('os')")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no bypass found"));
    Ok(())
}

#[test]
fn test_parse_error_exits_with_two() {
    snakecharm()
        .args(["bypass", "-b", "1", "print((1)"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_conflicting_rule_modes_exit_with_two() {
    snakecharm()
        .args(["bypass", "-b", "1", "--whitelist", "abc", "10"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("blacklist + whitelist"));
}

#[test]
fn test_rules_file() -> Result<()> {
    let rules = write_temp("groups:\n  quotes: [\"'\", '\"']\n", ".yaml")?;
    let output = snakecharm()
        .args(["bypass", "--rules"])
        .arg(rules.path())
        .arg("'os'")
        .output()?;
    assert!(output.status.success(), "{}", strip_ansi(&output.stderr));
    let payload = first_line(&output.stdout);
    assert!(!payload.contains('\''), "{payload}");
    Ok(())
}

#[test]
fn test_profile_file() -> Result<()> {
    let profile = write_temp(
        "profile_name: dotless\nrules:\n  blacklist: [\".\"]\nmode: minlen\n",
        ".yaml",
    )?;
    let output = snakecharm()
        .args(["bypass", "--profile"])
        .arg(profile.path())
        .arg("os.system('id')")
        .output()?;
    assert!(output.status.success(), "{}", strip_ansi(&output.stderr));
    assert!(strip_ansi(&output.stdout).contains("(minlen)"));
    assert!(!first_line(&output.stdout).contains('.'));
    Ok(())
}

#[test]
fn test_missing_profile_exits_with_two() {
    snakecharm()
        .args(["bypass", "--profile", "no-such-profile-anywhere", "10"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no-such-profile-anywhere"));
}

#[test]
fn test_memo_file_is_written_and_reused() -> Result<()> {
    let dir = tempdir()?;
    let memo = dir.path().join("memo.bin");
    let first = snakecharm()
        .args(["bypass", "-b", "1", "--minlen", "--memo"])
        .arg(&memo)
        .arg("10+11")
        .output()?;
    assert!(first.status.success());
    assert!(memo.exists());

    let second = snakecharm()
        .args(["bypass", "-b", "1", "--minlen", "--memo"])
        .arg(&memo)
        .arg("10+11")
        .output()?;
    assert!(second.status.success());
    assert_eq!(first_line(&first.stdout), first_line(&second.stdout));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_check_command_can_refuse_everything() {
    snakecharm()
        .args(["bypass", "-b", "1", "--check-cmd", "false", "10"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("refused"));
}

#[cfg(unix)]
#[test]
fn test_check_command_accepting() {
    snakecharm()
        .args(["bypass", "-b", "1", "--check-cmd", "cat", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("accepted by checker"));
}

#[test]
fn test_strategies_listing() {
    snakecharm()
        .args(["strategies", "--category", "Bypass_Int"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[int]").and(predicate::str::contains("by_hex")));
}

#[test]
fn test_strategies_unknown_category() {
    snakecharm()
        .args(["strategies", "--category", "float"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("float"));
}

#[test]
fn test_strategies_json() -> Result<()> {
    let output = snakecharm().args(["strategies", "--json"]).output()?;
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let entries = value.as_array().cloned().unwrap_or_default();
    assert!(entries.iter().any(|e| e["reference"] == "attribute.by_getattr"));
    Ok(())
}

fn write_temp(content: &str, suffix: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile()?;
    file.write_all(content.as_bytes())?;
    Ok(file)
}
