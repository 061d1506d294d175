use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{Value, json};

const MANIFEST: &str = r#"
name: fs
version: "1.2.3"
help: true
options:
  - spec: "--no-clear-screen"
    description: Keep the screen
commands:
  - name: "rm <dir>"
    description: Remove a directory
    aliases: [remove]
    examples: ["fs rm ./dist -r"]
    options:
      - spec: "-r, --recursive"
        description: Remove recursively
  - name: "cp <src> [dest...]"
    description: Copy files
  - name: "[...files]"
    description: Show files
"#;

fn write_manifest(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("failed to write manifest");
    path
}

fn argweave(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_argweave"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run argweave")
}

fn parse_json(manifest: &Path, tokens: &[&str]) -> Value {
    let mut args = vec!["parse", manifest.to_str().unwrap(), "--"];
    args.extend_from_slice(tokens);
    let output = argweave(&args);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), "fs.yml", MANIFEST);

    let output = argweave(&["check", manifest.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Manifest `fs` is valid: 3 global option(s), 3 command(s)."));
    assert!(stdout.contains("rm <dir> [aliases: remove]"));
    assert!(stdout.contains("[...files] (default)"));
}

#[test]
fn check_reports_declaration_errors() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        dir.path(),
        "bad.yml",
        "name: bad\ncommands:\n  - name: \"cp [src] <dest>\"\n",
    );

    let output = argweave(&["check", manifest.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error: invalid declaration:"), "{stderr}");
}

#[test]
fn check_rejects_unknown_extension() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), "fs.ini", MANIFEST);
    let output = argweave(&["check", manifest.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unsupported manifest format"));
}

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

#[test]
fn parse_dispatches_matched_command() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), "fs.yml", MANIFEST);

    let report = parse_json(&manifest, &["rm", "a/b", "-r"]);
    assert_eq!(report["command"], json!("rm <dir>"));
    assert_eq!(report["command_name"], json!("rm"));
    assert_eq!(report["args"], json!(["a/b"]));
    assert_eq!(
        report["options"],
        json!({"recursive": true, "clearScreen": true, "--": []})
    );
    assert_eq!(report["result"], json!({"command": "rm <dir>", "args": ["a/b"]}));
}

#[test]
fn parse_expands_variadic_and_passthrough() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), "fs.yml", MANIFEST);

    let report = parse_json(&manifest, &["cp", "a", "b", "c", "--", "--raw"]);
    assert_eq!(report["result"]["args"], json!(["a", ["b", "c"]]));
    assert_eq!(report["options"]["--"], json!(["--raw"]));
}

#[test]
fn parse_uses_default_command() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), "fs.yml", MANIFEST);

    let report = parse_json(&manifest, &["src", "lib", "--no-clear-screen"]);
    assert_eq!(report["command"], json!("[...files]"));
    assert!(report.get("command_name").is_none());
    assert_eq!(report["options"]["clearScreen"], json!(false));
    assert_eq!(report["result"]["args"], json!([["src", "lib"]]));
}

#[test]
fn parse_help_renders_command_usage() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), "fs.yml", MANIFEST);

    let report = parse_json(&manifest, &["remove", "--help"]);
    assert_eq!(report["help_shown"], json!(true));
    assert!(report.get("command").is_none());
    assert!(report.get("result").is_none());
    let text = report["output"].as_str().unwrap();
    assert!(text.contains("$ fs rm <dir>"), "{text}");
    assert!(text.contains("-r, --recursive"), "{text}");
    assert!(text.contains("fs rm ./dist -r"), "{text}");
}

#[test]
fn parse_version_without_command() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), "fs.json", &{
        let yaml: serde_yaml::Value = serde_yaml::from_str(MANIFEST).unwrap();
        serde_json::to_string(&yaml).unwrap()
    });

    let report = parse_json(&manifest, &["--version"]);
    assert_eq!(report["version_shown"], json!(true));
    assert_eq!(report["output"], json!("fs/1.2.3\n"));
}

#[test]
fn parse_no_run_skips_validation() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), "fs.yml", MANIFEST);

    let output = argweave(&["parse", manifest.to_str().unwrap(), "--no-run", "--", "rm"]);
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["command_name"], json!("rm"));
    assert!(report.get("result").is_none());
}

#[test]
fn parse_reports_validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), "fs.yml", MANIFEST);
    let path = manifest.to_str().unwrap();

    let output = argweave(&["parse", path, "--", "rm"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        String::from_utf8_lossy(&output.stderr).trim(),
        "error: missing required args for command `rm <dir>`"
    );

    let output = argweave(&["parse", path, "--", "rm", "x", "--force"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        String::from_utf8_lossy(&output.stderr).trim(),
        "error: unknown option `--force`"
    );
}

#[test]
fn parse_yaml_output() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), "fs.yml", MANIFEST);

    let output = argweave(&[
        "parse",
        manifest.to_str().unwrap(),
        "--format",
        "yaml",
        "--",
        "rm",
        "tmp",
    ]);
    assert!(output.status.success());
    let report: serde_yaml::Value = serde_yaml::from_slice(&output.stdout).unwrap();
    assert_eq!(report["command_name"], serde_yaml::Value::from("rm"));
}
