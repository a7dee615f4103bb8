#![allow(deprecated)] // cargo_bin! macro doesn't exist yet in assert_cmd 2.1

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const SELECT_LITE_ONE: &str =
    "sp=0001,wp=0000,r_lite=0001,r_heavy=0000,w_ins=0000,w_up_tiny=0000,w_up_wide=0000";

fn poolsweep() -> Command {
    let mut cmd = Command::cargo_bin("poolsweep").unwrap();
    for var in ["POOLSWEEP_HOST", "POOLSWEEP_OUTPUT", "RUST_LOG"] {
        cmd.env_remove(var);
    }
    cmd
}

fn quick_run(output: &Path) -> Command {
    let mut cmd = poolsweep();
    cmd.args([
        "run",
        "--store",
        "memory",
        "--suite",
        "select-lite",
        "--pool-sizes",
        "1",
        "--window",
        "1",
        "--warmup-first",
        "0",
        "--warmup",
        "0",
        "--cooldown",
        "0",
        "--grace-ms",
        "10",
        "--tick-ms",
        "50",
        "--no-progress",
        "--output",
    ])
    .arg(output);
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    poolsweep()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("plan"));
}

#[test]
fn test_unknown_store_rejected() {
    poolsweep()
        .args(["plan", "--store", "mongo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown store"));
}

#[test]
fn test_plan_lists_pending_runs() {
    let temp = TempDir::new().unwrap();
    poolsweep()
        .args(["plan", "--store", "memory", "--pool-sizes", "1,2", "--simple-only", "--output"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("insert-only"))
        .stdout(predicate::str::contains("pending"))
        .stdout(predicate::str::contains("done").not())
        .stderr(predicate::str::contains("10 runs, 0 already recorded"));

    assert!(!temp.path().join("memory").exists(), "plan must not write anything");
}

#[test]
fn test_plan_json_reports_artifacts() {
    let temp = TempDir::new().unwrap();
    let output = poolsweep()
        .args(["plan", "--store", "sqlite", "--suite", "select-lite", "--pool-sizes", "3", "--json"])
        .args(["--host", "db1", "--output"])
        .arg(temp.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let runs: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let runs = runs.as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["store"], "sqlite");
    assert_eq!(runs[0]["done"], false);
    let artifact = runs[0]["artifact"].as_str().unwrap();
    assert!(artifact.ends_with("r_lite=0003,r_heavy=0000,w_ins=0000,w_up_tiny=0000,w_up_wide=0000.csv"));
    assert!(Path::new(artifact).starts_with(temp.path().join("sqlite").join("db1")));
}

#[test]
fn test_memory_run_writes_artifact_then_skips() {
    let temp = TempDir::new().unwrap();
    quick_run(temp.path()).assert().success();

    let artifact = temp
        .path()
        .join("memory")
        .join("localhost")
        .join(format!("{SELECT_LITE_ONE}.csv"));
    let text = std::fs::read_to_string(&artifact).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "'Time','ReadOps','ReadErr','WriteOps','WriteErr'");
    assert!(lines[1].starts_with("0,"));

    quick_run(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("already recorded"));
    assert_eq!(std::fs::read_to_string(&artifact).unwrap(), text);

    poolsweep()
        .args(["plan", "--store", "memory", "--suite", "select-lite", "--pool-sizes", "1", "--output"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("done"));
}
