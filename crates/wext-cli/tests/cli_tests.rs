//! End-to-end tests of the `wext` binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn wext() -> Command {
    let mut cmd = Command::cargo_bin("wext").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("WEXT_BROWSER")
        .env_remove("WEXT_MANIFEST_VERSION");
    cmd
}

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(
        root,
        "package.json",
        r#"{ "name": "demo", "description": "Demo extension", "version": "0.1.0" }"#,
    );
    write(root, "entrypoints/background.ts", "console.log('background');");
    write(root, "entrypoints/popup.html", "<html><head><title>Popup</title></head></html>");
    temp
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn manifest(path: impl AsRef<Path>) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn help_lists_commands() {
    wext()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build").and(predicate::str::contains("dev")));
}

#[test]
fn build_writes_manifest_and_bundles() {
    let temp = project();

    wext()
        .arg("build")
        .arg(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Built extension"));

    let out_dir = temp.path().join(".output/chrome-mv3");
    let manifest = manifest(out_dir.join("manifest.json"));
    assert_eq!(manifest["manifest_version"], 3);
    assert_eq!(manifest["name"], "demo");
    assert_eq!(manifest["background"]["service_worker"], "background.js");
    assert_eq!(manifest["action"]["default_popup"], "popup.html");
    assert!(out_dir.join("background.js").exists());
    assert!(out_dir.join("popup.html").exists());
}

#[test]
fn mv2_flag_changes_target() {
    let temp = project();

    wext()
        .args(["build", "--mv2"])
        .arg(temp.path())
        .assert()
        .success();

    let manifest = manifest(temp.path().join(".output/chrome-mv2/manifest.json"));
    assert_eq!(manifest["manifest_version"], 2);
    assert_eq!(manifest["background"]["scripts"][0], "background.js");
    assert_eq!(manifest["browser_action"]["default_popup"], "popup.html");
}

#[test]
fn firefox_warnings_are_printed() {
    let temp = project();
    write(temp.path(), "entrypoints/sandbox.html", "<html></html>");

    wext()
        .args(["build", "-b", "firefox"])
        .arg(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Sandboxed pages not supported by Firefox"));

    let manifest = manifest(temp.path().join(".output/firefox-mv2/manifest.json"));
    assert!(manifest.get("sandbox").is_none());
}

#[test]
fn config_file_and_env_are_applied() {
    let temp = project();
    write(temp.path(), "wext.toml", "outDir = \"dist\"\n\n[manifest]\npermissions = [\"storage\"]\n");

    wext()
        .arg("build")
        .arg(temp.path())
        .env("WEXT_BROWSER", "edge")
        .assert()
        .success();

    let manifest = manifest(temp.path().join("dist/edge-mv3/manifest.json"));
    assert_eq!(manifest["permissions"][0], "storage");
}

#[test]
fn missing_package_json_fails_with_hint() {
    let temp = project();
    fs::remove_file(temp.path().join("package.json")).unwrap();

    wext()
        .arg("build")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("package.json"));
}

#[test]
fn conflicting_filter_fails() {
    let temp = project();
    write(
        temp.path(),
        "entrypoints/options.html",
        r#"<html><head><meta name="manifest.include" content='["chrome"]'><meta name="manifest.exclude" content='["firefox"]'></head></html>"#,
    );

    wext()
        .arg("build")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("`include`").and(predicate::str::contains("`exclude`")),
        );
}

#[test]
fn missing_project_directory_fails() {
    wext()
        .args(["build", "/definitely/not/a/project"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Directory not found"));
}

#[test]
fn unknown_config_key_fails() {
    let temp = project();
    write(temp.path(), "wext.toml", "outdir = \"dist\"\n");

    wext()
        .arg("build")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}
