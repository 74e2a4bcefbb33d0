//! Integration tests for the `splice` binary
//!
//! Tests the command-line interface for apply, ask, inspect and check

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

const SOURCE: &str = r#"pub fn hello() {
    println!("Hello");
}

pub fn world() {
    println!("World");
}
"#;

/// Helper to create a workspace holding one Rust file
fn setup_workspace() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("lib.rs");
    fs::write(&file, SOURCE).unwrap();
    (dir, file)
}

fn span_of(needle: &str) -> String {
    let start = SOURCE.find(needle).unwrap();
    format!("{}..{}", start, start + needle.len())
}

fn splice(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_splice"))
        .current_dir(dir)
        .env_remove("SPLICE_CONFIG")
        .env("NO_COLOR", "1")
        .args(args)
        .output()
        .unwrap()
}

fn splice_with_stdin(dir: &Path, args: &[&str], input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_splice"))
        .current_dir(dir)
        .env_remove("SPLICE_CONFIG")
        .env("NO_COLOR", "1")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(input.as_bytes()).unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn test_apply_help() {
    let (dir, _) = setup_workspace();
    let output = splice(dir.path(), &["apply", "--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--span"));
    assert!(stdout.contains("--response"));
    assert!(stdout.contains("--dry-run"));
}

#[test]
fn test_apply_replaces_enclosing_function() {
    let (dir, file) = setup_workspace();
    let response = dir.path().join("response.rs");
    fs::write(&response, "pub fn hello() {\n    println!(\"Hi\");\n}\n").unwrap();

    let span = span_of("println!(\"Hello\");");
    let output = splice(
        dir.path(),
        &["apply", "lib.rs", "--span", &span, "--response", "response.rs"],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Replaced function"));

    let content = fs::read_to_string(&file).unwrap();
    assert!(content.contains("println!(\"Hi\");"));
    assert!(!content.contains("println!(\"Hello\");"));
    assert!(content.contains("pub fn world() {\n    println!(\"World\");\n}"));
}

#[test]
fn test_apply_dry_run_leaves_file_alone() {
    let (dir, file) = setup_workspace();
    let span = span_of("pub fn world() {\n    println!(\"World\");\n}");

    let output = splice_with_stdin(
        dir.path(),
        &["apply", "lib.rs", "--span", &span, "--response", "-", "--dry-run", "--diff"],
        "pub fn world() {}\n",
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Would replace"));
    assert!(stdout.contains("DRY RUN"));
    assert!(stdout.contains("-    println!(\"World\");"));
    assert_eq!(fs::read_to_string(&file).unwrap(), SOURCE);
}

#[test]
fn test_apply_annotates_unparsable_response() {
    let (dir, file) = setup_workspace();
    let response = dir.path().join("response.txt");
    fs::write(&response, "Sure! Here is the code:\nfn hello( {\n").unwrap();

    let span = span_of("println!(\"Hello\");");
    let output = splice(
        dir.path(),
        &["apply", "lib.rs", "--span", &span, "--response", "response.txt"],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let content = fs::read_to_string(&file).unwrap();
    assert!(content.contains(
        "    // AI suggestion (could not be parsed):\n    // Sure! Here is the code:\n"
    ));
    assert!(content.contains("    println!(\"Hello\");"));
}

#[test]
fn test_apply_no_annotate_fails_and_keeps_file() {
    let (dir, file) = setup_workspace();
    let response = dir.path().join("response.txt");
    fs::write(&response, "fn hello( {\n").unwrap();

    let span = span_of("println!(\"Hello\");");
    let output = splice(
        dir.path(),
        &[
            "apply",
            "lib.rs",
            "--span",
            &span,
            "--response",
            "response.txt",
            "--no-annotate",
        ],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("syntax error"));
    assert_eq!(fs::read_to_string(&file).unwrap(), SOURCE);
}

#[test]
fn test_apply_fallback_reports_replaced_and_requested_category() {
    let (dir, file) = setup_workspace();
    let response = dir.path().join("response.rs");
    fs::write(&response, "enum E { A }\n").unwrap();

    let span = span_of("println!(\"Hello\");");
    let output = splice(
        dir.path(),
        &["apply", "lib.rs", "--span", &span, "--response", "response.rs"],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Replaced file-unit (source_file)"));
    assert!(stdout.contains("no enclosing enum matched"));
    let content = fs::read_to_string(&file).unwrap();
    assert!(content.starts_with("enum E { A }"));
    assert!(!content.contains("hello"));
}

#[test]
fn test_apply_rejects_bad_span() {
    let (dir, _) = setup_workspace();
    let response = dir.path().join("response.rs");
    fs::write(&response, "fn a() {}\n").unwrap();

    let output = splice(
        dir.path(),
        &["apply", "lib.rs", "--span", "10", "--response", "response.rs"],
    );
    assert!(!output.status.success());

    let output = splice(
        dir.path(),
        &["apply", "lib.rs", "--span", "0..100000", "--response", "response.rs"],
    );
    assert!(!output.status.success());
}

#[cfg(unix)]
#[test]
fn test_ask_uses_configured_command() {
    let (dir, file) = setup_workspace();
    fs::write(
        dir.path().join("splice.toml"),
        r#"[generator]
command = ["sh", "-c", "cat > /dev/null; printf 'println!(\"Bonjour\");'"]
"#,
    )
    .unwrap();

    let span = span_of("println!(\"Hello\");");
    let output = splice(
        dir.path(),
        &["ask", "lib.rs", "--span", &span, "--prompt", "translate to French"],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let content = fs::read_to_string(&file).unwrap();
    assert!(content.contains("pub fn hello() {\n    println!(\"Bonjour\");\n}"));
}

#[test]
fn test_ask_without_generator_fails() {
    let (dir, _) = setup_workspace();
    let span = span_of("println!(\"Hello\");");

    let output = splice(dir.path(), &["ask", "lib.rs", "--span", &span, "--prompt", "x"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No generator configured"));
}

#[test]
fn test_inspect_lists_ancestors() {
    let (dir, _) = setup_workspace();
    let span = span_of("println!(\"Hello\");");

    let output = splice(dir.path(), &["inspect", "lib.rs", "--span", &span]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("file-unit (source_file)"));
    assert!(stdout.contains("function (function_item)"));
    assert!(stdout.contains("statement (expression_statement)"));
}

#[test]
fn test_check_reports_target_category() {
    let (dir, _) = setup_workspace();

    let response = "#[derive(Debug)]\nstruct A;\nimpl A {}\n";
    let output = splice_with_stdin(dir.path(), &["check", "-"], response);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("replaces the nearest struct"));
    assert!(stdout.contains("impl (impl_item)"));

    let output = splice_with_stdin(dir.path(), &["check", "-"], "fn broken( {\n");
    assert!(!output.status.success());
}

#[test]
fn test_config_env_var_is_honoured() {
    let (dir, _) = setup_workspace();
    let config = dir.path().join("elsewhere.toml");
    fs::write(&config, "[prompt]\nmax_context_bytes = 0\n").unwrap();

    let span = span_of("println!(\"Hello\");");
    let output = Command::new(env!("CARGO_BIN_EXE_splice"))
        .current_dir(dir.path())
        .env("SPLICE_CONFIG", &config)
        .env("NO_COLOR", "1")
        .args(["ask", "lib.rs", "--span", &span, "--prompt", "x"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("elsewhere.toml"), "stderr: {stderr}");
}

#[test]
fn test_invalid_config_is_reported() {
    let (dir, _) = setup_workspace();
    fs::write(dir.path().join("splice.toml"), "[prompt]\nmax_context_bytes = 0\n").unwrap();

    let output = splice_with_stdin(dir.path(), &["check", "-"], "fn a() {}\n");
    // check does not read config
    assert!(output.status.success());

    let span = span_of("println!(\"Hello\");");
    let output = splice(dir.path(), &["ask", "lib.rs", "--span", &span, "--prompt", "x"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid config"));
}
