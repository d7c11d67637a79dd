//! CLI integration tests
//!
//! These tests run the startupgen binary and check:
//! - Command parsing and aliases
//! - The written script and its permissions
//! - Exit codes

use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to get the path to the startupgen binary
fn startupgen_bin() -> PathBuf {
    let mut path = env::current_exe()
        .expect("Failed to get current executable path")
        .parent()
        .expect("No parent")
        .to_path_buf();

    // Test binaries live in deps/
    if path.ends_with("deps") {
        path = path.parent().expect("No parent").to_path_buf();
    }

    path.join("startupgen")
}

fn run(args: &[&str]) -> Output {
    Command::new(startupgen_bin())
        .args(args)
        .env_remove("PRE_RUN_COMMAND")
        .env_remove("ENABLE_DYNAMIC_INSTALL")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute startupgen")
}

fn create_app(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(path, content).expect("Failed to write file");
    }
    dir
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("Non-UTF-8 temp path")
}

#[test]
fn test_cli_help() {
    let output = run(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("startupgen"));
    assert!(stdout.contains("create-script"));
    assert!(stdout.contains("setup-env"));
}

#[test]
fn test_version_command() {
    let output = run(&["version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with(&format!("startupgen {}", env!("CARGO_PKG_VERSION"))));
}

#[test]
#[serial]
fn test_create_script_for_node() {
    let app = create_app(&[("server.js", "require('http')")]);
    let out = app.path().join("out/run.sh");

    let output = run(&[
        "create-script",
        "node",
        "--appPath",
        path_arg(app.path()),
        "--output",
        path_arg(&out),
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let script = fs::read_to_string(&out).expect("Script was not written");
    assert!(script.starts_with("#!/bin/sh\n"));
    assert_eq!(script.lines().last(), Some("node server.js"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&out).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}

#[test]
#[serial]
fn test_kebab_case_flags_and_appended_run_command() {
    let app = create_app(&[
        ("app.py", "from flask import Flask"),
        ("appsvc.yaml", "run: echo started\n"),
    ]);
    let out = app.path().join("run.sh");

    let output = run(&[
        "create-script",
        "python",
        "--app-path",
        path_arg(app.path()),
        "--bind-port",
        "5000",
        "--output",
        path_arg(&out),
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let script = fs::read_to_string(&out).unwrap();
    assert!(script.contains("export PORT=5000\n"));
    assert!(script.contains("--bind=0.0.0.0:5000"));
    assert!(script.ends_with("gunicorn app:app\n\necho started\n"));
}

#[test]
fn test_invalid_app_path_exits_with_failure() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing");

    let output = run(&["create-script", "ruby", "--appPath", path_arg(&missing)]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not valid or does not exist"));
}

#[test]
#[serial]
fn test_no_startup_command_exits_with_failure() {
    let app = create_app(&[("README.md", "# nothing to run")]);
    let out = app.path().join("run.sh");

    let output = run(&[
        "create-script",
        "golang",
        "--appPath",
        path_arg(app.path()),
        "--output",
        path_arg(&out),
    ]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!out.exists());
}

#[test]
fn test_unknown_platform_is_usage_error() {
    let output = run(&["create-script", "cobol"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_setup_env_dry_run_prints_script() {
    let app = create_app(&[(
        "oryx-manifest.toml",
        "platformName = \"ruby\"\nrubyVersion = \"3.2.2\"\n",
    )]);

    let output = run(&["setupEnv", "--appPath", path_arg(app.path()), "--dry-run"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ruby 3.2.2"));
    assert!(stdout.ends_with("/opt/ruby/installDependencies.sh\n"));
}

#[test]
fn test_setup_env_without_platform_fails() {
    let app = create_app(&[]);
    let output = run(&["setup-env", "--appPath", path_arg(app.path()), "--dry-run"]);
    assert_eq!(output.status.code(), Some(1));
}
