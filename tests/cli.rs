//! Drives the compiled `statemap` binary end-to-end with `assert_cmd`,
//! following the teacher's pattern of exercising binaries as
//! subprocesses rather than only testing the library in-process.

mod common;

use assert_cmd::Command;
use common::write_raw_trace;
use predicates::prelude::*;

const TRACE: &str = r#"{"states":{"on":{"value":0},"off":{"value":1}}}
{"entity":"web-0","time":0,"state":0}
{"entity":"web-0","time":100,"state":1}
{"entity":"web-0","time":300,"state":0}
"#;

#[test]
fn emits_one_ndjson_line_per_record() {
    let file = write_raw_trace(TRACE);

    let assert = Command::cargo_bin("statemap")
        .unwrap()
        .arg(file.path())
        .assert()
        .success();

    let output = assert.get_output();
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();

    // One rectangle for [0,100) plus one for the finalized [100,300).
    assert_eq!(lines.len(), 2);
    for line in &lines {
        let value: serde_json::Value = serde_json::from_str(line).expect("valid JSON per line");
        assert_eq!(value["kind"], "rectangle");
        assert_eq!(value["entity"], "web-0");
    }
}

#[test]
fn honors_maxrect_flag() {
    let body = r#"{"states":{"on":{"value":0},"off":{"value":1}}}
{"entity":"A","time":0,"state":0}
{"entity":"A","time":10,"state":1}
{"entity":"A","time":20,"state":0}
{"entity":"A","time":100,"state":1}
"#;
    let file = write_raw_trace(body);

    let assert = Command::cargo_bin("statemap")
        .unwrap()
        .arg("--maxrect")
        .arg("2")
        .arg(file.path())
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.lines().count(), 2);
}

#[test]
fn reports_malformed_trace_on_stderr_with_nonzero_exit() {
    let file = write_raw_trace("not json at all");

    Command::cargo_bin("statemap")
        .unwrap()
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("statemap:"));
}

#[test]
fn rejects_missing_trace_file() {
    Command::cargo_bin("statemap")
        .unwrap()
        .arg("/nonexistent/path/to/trace.json")
        .assert()
        .failure();
}
