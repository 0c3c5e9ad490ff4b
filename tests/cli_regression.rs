// Regression test: exercises the `hqlc` binary end to end rather than the
// library API, checking both the success path's JSON output and the
// failure path's rendered miette diagnostic.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

#[test]
fn compile_success_prints_json_target_ast() {
    let dir = std::env::temp_dir().join(format!("hqlc-cli-ok-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    let file = dir.join("main.hql");
    fs::write(&file, "(def x 1)").unwrap();

    let mut cmd = Command::cargo_bin("hqlc").unwrap();
    cmd.arg("compile").arg(&file);
    cmd.assert().success().stdout(contains("VariableStatement"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn compile_failure_renders_miette_diagnostic() {
    let dir = std::env::temp_dir().join(format!("hqlc-cli-err-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    let file = dir.join("main.hql");
    // Unclosed list: a structural parse failure.
    fs::write(&file, "(def x 1").unwrap();

    let mut cmd = Command::cargo_bin("hqlc").unwrap();
    cmd.arg("compile").arg(&file);
    cmd.assert().failure().stderr(contains("hql::parse").or(contains("help:")));

    let _ = fs::remove_dir_all(&dir);
}
