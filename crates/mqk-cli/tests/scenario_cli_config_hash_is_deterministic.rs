//! `mqk config-hash` is a thin process-level wrapper around
//! `mqk_config::load_layered_yaml` — this test drives the actual binary via
//! `assert_cmd`, matching the teacher's process-level CLI test style.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn write_yaml(contents: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("create temp yaml file");
    write!(f, "{contents}").expect("write temp yaml file");
    f
}

#[test]
fn config_hash_prints_a_hash_and_the_merged_json() {
    let base = write_yaml("engine:\n  id: MAIN\nrisk:\n  max_drawdown_pct: 10\n");

    let mut cmd = Command::cargo_bin("mqk").expect("find mqk binary");
    cmd.arg("config-hash").arg(base.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("config_hash="))
        .stdout(predicate::str::contains("\"max_drawdown_pct\":10"));
}

#[test]
fn config_hash_is_stable_across_merge_order_of_untouched_siblings() {
    let base = write_yaml("a: 1\nb:\n  c: 2\n  d: 3\n");
    let overlay = write_yaml("b:\n  c: 20\n");

    let mut first = Command::cargo_bin("mqk").expect("find mqk binary");
    first.arg("config-hash").arg(base.path()).arg(overlay.path());
    let first_out = first.output().expect("run mqk config-hash");

    let mut second = Command::cargo_bin("mqk").expect("find mqk binary");
    second.arg("config-hash").arg(base.path()).arg(overlay.path());
    let second_out = second.output().expect("run mqk config-hash");

    assert_eq!(first_out.stdout, second_out.stdout);
}

#[test]
fn config_hash_reports_an_unreadable_path() {
    let mut cmd = Command::cargo_bin("mqk").expect("find mqk binary");
    cmd.arg("config-hash").arg("/nonexistent/path/to/config.yaml");
    cmd.assert().failure().stderr(predicate::str::contains("error:"));
}
