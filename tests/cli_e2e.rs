//! End-to-end CLI tests for the topiclabel binary.

// `Command::cargo_bin` is deprecated in assert_cmd >=2.0.17 in favor of
// `cargo::cargo_bin_cmd!` macro. Suppressed until migration to the new API.
#![allow(deprecated)]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn topiclabel(config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("topiclabel").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home).env_remove("RUST_LOG");
    cmd
}

fn write_corpus(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("papers.csv");
    fs::write(
        &path,
        "Title,Keywords,Abstract\n\
         Drip irrigation efficiency,Irrig;water efficiency,a\n\
         Terracing for soil conservation,soil erosion;control,b\n\
         Untitled,,c\n",
    )
    .unwrap();
    path
}

#[test]
fn test_binary_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    topiclabel(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("summarize"))
        .stdout(predicate::str::contains("classify"))
        .stdout(predicate::str::contains("run"));
}

#[test]
fn test_binary_version_displays_version() {
    let dir = TempDir::new().unwrap();
    topiclabel(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_summarize_writes_summary_topic_column() {
    let dir = TempDir::new().unwrap();
    let input = write_corpus(dir.path());
    let output = dir.path().join("out.csv");

    topiclabel(dir.path())
        .args(["summarize", input.to_str().unwrap(), "-o", output.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Summarized 3 documents (1 unlabeled)"));

    let written = fs::read_to_string(&output).unwrap();
    let mut lines = written.lines();
    assert_eq!(lines.next(), Some("Title,Keywords,Abstract,Summary topic"));
    assert!(lines.next().unwrap().ends_with(",Water Use Efficiency"));
    assert!(lines.next().unwrap().ends_with(",Soil Erosion Control"));
    assert!(lines.next().unwrap().ends_with(",Unlabeled"));
}

#[test]
fn test_summarize_default_output_next_to_input() {
    let dir = TempDir::new().unwrap();
    let input = write_corpus(dir.path());

    topiclabel(dir.path())
        .args(["-q", "summarize", input.to_str().unwrap()])
        .assert()
        .success();
    assert!(dir.path().join("papers_summarized.csv").is_file());
}

#[test]
fn test_summarize_missing_column_fails_with_suggestion() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("papers.csv");
    fs::write(&input, "Title,Keywrods\nA,b\n").unwrap();

    topiclabel(dir.path())
        .args(["summarize", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Keywords"))
        .stderr(predicate::str::contains("Keywrods"));
}

#[test]
fn test_summarize_rejects_unsupported_spreadsheet() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("papers.ods");
    fs::write(&input, "PK").unwrap();

    topiclabel(dir.path())
        .args(["summarize", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'ods'"))
        .stderr(predicate::str::contains(".xlsx"));
}

#[test]
fn test_summarize_xlsx_writes_xlsx_next_to_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("papers.xlsx");
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in ["Title", "Keywords"].into_iter().enumerate() {
        sheet.write_string(0, u16::try_from(col).unwrap(), header).unwrap();
    }
    sheet.write_string(1, 0, "Drip irrigation efficiency").unwrap();
    sheet.write_string(1, 1, "Irrig;water efficiency").unwrap();
    workbook.save(&input).unwrap();

    topiclabel(dir.path())
        .args(["summarize", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("papers_summarized.xlsx"));

    let output = dir.path().join("papers_summarized.xlsx");
    let table = topiclabel_core::Table::read(&output).unwrap();
    assert_eq!(table.headers(), ["Title", "Keywords", "Summary topic"]);
    assert_eq!(table.rows()[0][2], "Water Use Efficiency");
}

#[test]
fn test_classify_uses_topic_table() {
    let dir = TempDir::new().unwrap();
    let input = write_corpus(dir.path());
    let topics = dir.path().join("topics.csv");
    fs::write(
        &topics,
        "Topic label,Keywords,source text,Summary topic\n\
         Topic 1,irrigation water,a,Water Use Efficiency\n\
         Topic 2,soil conservation terracing,b,Soil Erosion Control\n",
    )
    .unwrap();
    let output = dir.path().join("classified.csv");

    topiclabel(dir.path())
        .args([
            "classify",
            input.to_str().unwrap(),
            "--topics",
            topics.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("against 2 topics"));

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("Title,Keywords,Abstract,Assigned Topic"));
    assert!(written.contains("Drip irrigation efficiency,Irrig;water efficiency,a,Water Use Efficiency"));
    assert!(written.contains(",Unlabeled"));
}

#[test]
fn test_config_unknown_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config_dir = dir.path().join("topiclabel");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), "concurrency = 4\n").unwrap();
    let input = write_corpus(dir.path());

    topiclabel(dir.path())
        .args(["summarize", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_run_without_scripts_explains_missing_configuration() {
    let dir = TempDir::new().unwrap();
    let input = write_corpus(dir.path());

    topiclabel(dir.path())
        .args(["run", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--fit-script"));
}

#[cfg(unix)]
#[test]
fn test_run_reports_failure_kind_and_writes_manifest() {
    let dir = TempDir::new().unwrap();
    let input = write_corpus(dir.path());
    let fit = dir.path().join("fit.sh");
    fs::write(&fit, "echo 'cannot fit' >&2\nexit 3\n").unwrap();
    let runs = dir.path().join("runs");

    topiclabel(dir.path())
        .args([
            "run",
            input.to_str().unwrap(),
            "--rscript",
            "sh",
            "--fit-script",
            fit.to_str().unwrap(),
            "--assess-script",
            fit.to_str().unwrap(),
            "--output-dir",
            runs.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("external_process_failure"))
        .stderr(predicate::str::contains("cannot fit"));

    let run_dir = fs::read_dir(&runs).unwrap().next().unwrap().unwrap().path();
    let manifest = fs::read_to_string(run_dir.join("run.json")).unwrap();
    assert!(manifest.contains("\"status\": \"failed\""));
}
