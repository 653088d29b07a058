// SPDX-License-Identifier: Apache-2.0

//! Tests that invoke the `lutresub` binary.

use std::io::Write;
use std::process::Command;

const AND3: &str = r#"{
  "name": "and3",
  "k": 3,
  "inputs": ["a", "b", "c"],
  "logic": [
    {"name": "g1", "op": "and", "fanins": [{"node": "a"}, {"node": "b"}]},
    {"name": "g2", "op": "and", "fanins": [{"node": "g1"}, {"node": "c", "inverted": true}]}
  ],
  "outputs": [{"name": "f", "fanin": {"node": "g2"}}],
  "cuts": {"g2": [["a", "b", "c"]]}
}"#;

fn write_problem(text: &str) -> tempfile::TempPath {
    let mut temp_file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(temp_file, "{}", text).unwrap();
    temp_file.into_temp_path()
}

#[test]
fn test_json_report() {
    let _ = env_logger::builder().is_test(true).try_init();
    let path = write_problem(AND3);
    let output = Command::new(env!("CARGO_BIN_EXE_lutresub"))
        .arg("--json")
        .arg("--min-depth")
        .arg("--slack=0")
        .arg(path.to_str().unwrap())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["name"], "and3");
    assert_eq!(report["before"]["lut_num"], 2);
    assert_eq!(report["before"]["depth"], 2);
    assert_eq!(report["after"]["lut_num"], 1);
    assert_eq!(report["after"]["depth"], 1);
    assert_eq!(report["resub"]["substitutions"], 1);
    assert_eq!(report["min_depth"]["max_depth"], 1);
    assert_eq!(report["mapping"]["g2"], serde_json::json!(["a", "b", "c"]));
    assert!(report["mapping"].get("g1").is_none());
}

#[test]
fn test_text_report() {
    let path = write_problem(AND3);
    let output = Command::new(env!("CARGO_BIN_EXE_lutresub"))
        .arg(path.to_str().unwrap())
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("after:  1 LUTs, depth 1"), "{}", stdout);
    assert!(stdout.contains("g2 <- a b c"), "{}", stdout);
}

#[test]
fn test_bad_problem_fails() {
    let path = write_problem(
        r#"{"name": "bad", "inputs": ["a"], "outputs": [{"name": "o", "fanin": {"node": "zz"}}]}"#,
    );
    let output = Command::new(env!("CARGO_BIN_EXE_lutresub"))
        .arg(path.to_str().unwrap())
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown node"), "{}", stderr);
}
