//! Binary-level tests for `fob-pack`.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn fob_pack() -> Command {
    let mut cmd = Command::cargo_bin("fob-pack").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn project(manifest: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("package.json"), manifest).unwrap();
    dir
}

#[test]
fn test_help_lists_flags_without_building() {
    let dir = TempDir::new().unwrap();
    fob_pack()
        .current_dir(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--print-config"))
        .stdout(predicate::str::contains("--minify"))
        .stdout(predicate::str::contains("--tsconfig"));
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn test_missing_configuration_exits_with_one() {
    let dir = project(r#"{ "name": "empty" }"#);
    fob_pack()
        .current_dir(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No configuration found"));
}

#[test]
fn test_print_config_outputs_json() {
    let dir = project(
        r#"{
            "name": "pkg",
            "exports": { ".": { "import": "./dist/index.mjs", "types": "./dist/index.d.ts" } },
            "dependencies": { "zod": "^3" }
        }"#,
    );

    let output = fob_pack()
        .current_dir(dir.path())
        .arg("--print-config")
        .output()
        .unwrap();
    assert!(output.status.success());

    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["source"]["kind"], "auto");
    assert_eq!(config["sourceRoot"], "src");
    assert_eq!(
        config["exports"]["targets"]["."]["import"],
        "./dist/index.mjs"
    );
    let externals = config["externals"].as_array().unwrap();
    assert!(externals.iter().any(|e| e == "zod"));
    assert!(!dir.path().join("dist").exists());
}

#[test]
fn test_cli_config_path_wins() {
    let dir = project(r#"{ "exports": "./dist/index.mjs" }"#);
    fs::write(dir.path().join("fob-pack.json"), r#"{ "srcDir": "conventional" }"#).unwrap();
    fs::write(dir.path().join("custom.json"), r#"{ "srcDir": "custom" }"#).unwrap();

    fob_pack()
        .args(["--cwd"])
        .arg(dir.path())
        .args(["--config", "custom.json", "--print-config"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""sourceRoot": "custom""#));
}

#[test]
fn test_missing_cli_config_fails() {
    let dir = project(r#"{ "exports": "./dist/index.mjs" }"#);
    fob_pack()
        .current_dir(dir.path())
        .args(["--config", "nope.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nope.json"));
}

#[test]
fn test_invalid_cwd_fails() {
    fob_pack()
        .args(["--cwd", "/definitely/not/a/project"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not a directory"));
}

#[test]
fn test_builds_package() {
    let dir = project(r#"{ "name": "pkg", "exports": "./dist/index.mjs" }"#);
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(
        dir.path().join("src/index.ts"),
        "export const answer: number = 42;\n",
    )
    .unwrap();

    fob_pack()
        .current_dir(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("./dist/index.mjs"))
        .stderr(predicate::str::contains("Built 1 file"));

    let output = fs::read_to_string(dir.path().join("dist/index.mjs")).unwrap();
    assert!(output.contains("42"));
}
