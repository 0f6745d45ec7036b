//! CLI integration tests
//!
//! These run the compiled `buildmeta` binary and check:
//! - JSON written to stdout
//! - Exit codes (0 success, 1 extraction failure, 2 no extractor)
//! - Environment-driven configuration

mod support;

use std::process::{Command, Output};
use support::{buildmeta_bin, write_project};
use tempfile::TempDir;

fn run(args: &[&str]) -> Output {
    Command::new(buildmeta_bin())
        .args(args)
        .env_remove("BUILDMETA_EXTRACTORS")
        .env_remove("BUILDMETA_LOG_LEVEL")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute buildmeta")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_cli_help() {
    let output = run(&["--help"]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("extract"));
    assert!(text.contains("detect"));
    assert!(text.contains("matrix"));
}

#[test]
fn test_cli_version() {
    let output = run(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_extract_prints_json() {
    let temp = TempDir::new().unwrap();
    write_project(
        temp.path(),
        &[(
            "composer.json",
            r#"{"name": "acme/api", "version": "3.1.0", "type": "project", "require": {"laravel/framework": "^10.0"}}"#,
        )],
    );

    let output = run(&["extract", temp.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0));

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["extractor"], "php");
    assert_eq!(value["metadata"]["name"], "acme/api");
    assert_eq!(value["metadata"]["version"], "3.1.0");
    assert_eq!(value["metadata"]["language_specific"]["framework"], "Laravel");
    assert_eq!(value["metadata"]["language_specific"]["is_library"], false);
}

#[test]
fn test_extract_compact_output() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path(), &[("main.tf", "terraform {}\n")]);

    let output = run(&["extract", "--compact", temp.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output).trim_end().lines().count(), 1);
}

#[test]
fn test_extract_unsupported_directory_exits_2() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path(), &[("notes.txt", "hello")]);

    let output = run(&["extract", temp.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_extract_broken_manifest_exits_1() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path(), &[("composer.json", "not json")]);

    let output = run(&["extract", temp.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_detect_all() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path(), &[("main.tf", ""), ("src/app.cpp", "")]);

    let output = run(&["detect", "--all", temp.path().to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).lines().collect::<Vec<_>>(), ["cpp", "terraform"]);
}

#[test]
fn test_extractor_filter_from_environment() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path(), &[("main.tf", ""), ("src/app.cpp", "")]);

    let output = Command::new(buildmeta_bin())
        .args(["detect", temp.path().to_str().unwrap()])
        .env("BUILDMETA_EXTRACTORS", "terraform")
        .output()
        .expect("Failed to execute buildmeta");

    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "terraform");
}

#[test]
fn test_invalid_extractor_filter_fails() {
    let output = Command::new(buildmeta_bin())
        .arg("list")
        .env("BUILDMETA_EXTRACTORS", "cobol")
        .output()
        .expect("Failed to execute buildmeta");

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_list_shows_registration_order() {
    let output = run(&["list"]);
    assert!(output.status.success());

    let names: Vec<String> = stdout(&output)
        .lines()
        .filter_map(|line| line.split_whitespace().next().map(str::to_string))
        .collect();
    assert_eq!(names, ["cpp", "elixir", "php", "scala", "swift", "terraform"]);
}

#[test]
fn test_matrix_command() {
    let output = run(&["matrix", "terraform", ">= 1.0.0"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output).trim(),
        r#"{"terraform-version": ["1.5", "1.6", "1.7", "1.8", "1.9", "1.10"]}"#
    );
}
