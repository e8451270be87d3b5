use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn cox() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("cox"))
}

fn source_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

#[test]
fn runs_file_successfully() {
    let file = source_file("print 1 + 2;\nprint \"done\";\n");

    cox()
        .arg("run")
        .arg(file.path())
        .assert()
        .success()
        .stdout("3\ndone\n");
}

#[test]
fn runs_empty_file() {
    let file = source_file("");

    cox().arg("run").arg(file.path()).assert().success().stdout("");
}

#[test]
fn static_error_exits_65() {
    let file = source_file("print ;\n");

    cox()
        .arg("run")
        .arg(file.path())
        .assert()
        .code(65)
        .stderr(predicate::str::contains(
            "[line 1] Error at ';': Expect expression.",
        ));
}

#[test]
fn runtime_error_exits_70() {
    let file = source_file("print 1;\nprint -\"x\";\n");

    cox()
        .arg("run")
        .arg(file.path())
        .assert()
        .code(70)
        .stdout("1\n")
        .stderr(predicate::str::contains("Operand must be a number.\n[line 2]"));
}

#[test]
fn missing_file_is_reported() {
    cox()
        .args(["run", "no_such_file.cox"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open file"));
}

#[test]
fn tokenize_prints_one_token_per_line() {
    let file = source_file("var x = 1;");

    cox()
        .arg("tokenize")
        .arg(file.path())
        .assert()
        .success()
        .stdout(
            "VAR var null\nIDENTIFIER x null\nEQUAL = null\nNUMBER 1 1.0\nSEMICOLON ; null\nEOF  null\n",
        );
}

#[test]
fn tokenize_reports_lexical_errors() {
    let file = source_file("1 # 2");

    cox()
        .arg("tokenize")
        .arg(file.path())
        .assert()
        .code(65)
        .stdout(predicate::str::contains("NUMBER 2 2.0"))
        .stderr(predicate::str::contains(
            "[line 1] Error: Unexpected character: #",
        ));
}

#[test]
fn tokenize_json() {
    let file = source_file("print");

    cox()
        .args(["tokenize", "--json"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""lexeme":"print""#))
        .stdout(predicate::str::contains(r#""token_type":"PRINT""#));
}

#[test]
fn parse_prints_source_back() {
    let file = source_file("for (var i = 0; i < 2; i += 1) print i;");

    cox()
        .arg("parse")
        .arg(file.path())
        .assert()
        .success()
        .stdout("{\n    var i = 0;\n    while (i < 2) {\n        print i;\n        i = i + 1;\n    }\n}\n");
}

#[test]
fn repl_exits_on_eof() {
    cox().write_stdin("").assert().success();
}

#[test]
fn repl_keeps_state_between_lines() {
    cox()
        .write_stdin("var a = 20;\nprint a + 22;\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("42"));
}

#[test]
fn repl_recovers_after_static_error() {
    cox()
        .write_stdin("print ;\nprint 3;\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Expect expression."))
        .stdout(predicate::str::contains("3"));
}

#[test]
fn repl_remembers_runtime_errors() {
    cox()
        .arg("run")
        .write_stdin("print nope;\nprint 1;\n")
        .assert()
        .code(70)
        .stdout(predicate::str::contains("1"));
}

#[test]
fn repl_stops_at_blank_line() {
    cox()
        .write_stdin("print 1;\n\nprint 2;\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("1").and(predicate::str::contains("2").not()));
}

#[test]
fn log_flag_writes_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("trace.log");
    let file = source_file("print 1;");

    cox()
        .arg("--log")
        .arg("--log-file")
        .arg(&log)
        .arg("run")
        .arg(file.path())
        .assert()
        .success();

    let contents = std::fs::read_to_string(&log).unwrap();
    assert!(contents.contains("Interpretation completed successfully"));
}
