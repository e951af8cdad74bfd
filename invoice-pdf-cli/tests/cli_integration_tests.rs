//! Integration tests for the invoice-pdf CLI
//!
//! Tests command-line interface functionality including:
//! - Pagination reports
//! - Form rendering
//! - PDF export from a captured image
//! - Error handling and exit codes

use anyhow::Result;
use image::{ImageFormat, Rgb, RgbImage};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::{tempdir, TempDir};

/// Test helper to get the CLI binary path
fn get_cli_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // Remove test binary name
    if path.ends_with("deps") {
        path.pop(); // Remove "deps" directory
    }
    path.push("invoice-pdf");
    #[cfg(windows)]
    path.set_extension("exe");
    path
}

/// Test helper to create a temporary directory
fn setup_temp_dir() -> TempDir {
    tempdir().expect("Failed to create temp directory")
}

/// Test helper to run CLI command and return output
fn run_cli_command(args: &[&str]) -> Result<std::process::Output> {
    let output = Command::new(get_cli_path()).args(args).output()?;
    Ok(output)
}

/// Test helper to write a PNG "capture" of the given size
fn write_capture(dir: &Path, width: u32, height: u32) -> PathBuf {
    let path = dir.join("capture.png");
    RgbImage::from_pixel(width, height, Rgb([250, 250, 250]))
        .save_with_format(&path, ImageFormat::Png)
        .expect("Failed to write capture");
    path
}

/// Test helper to check if PDF file exists and has content
fn assert_pdf_exists_and_valid(path: &Path) {
    assert!(path.exists(), "PDF file should exist: {}", path.display());
    let content = fs::read(path).expect("Failed to read PDF file");
    assert!(
        content.starts_with(b"%PDF-"),
        "File should start with PDF header"
    );
}

#[test]
fn test_cli_help() {
    let output = run_cli_command(&["--help"]).expect("CLI command should run");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["paginate", "render", "export", "edit"] {
        assert!(stdout.contains(command), "help should list {command}");
    }
}

#[test]
fn test_cli_paginate_three_pages() {
    let output = run_cli_command(&["paginate", "--width", "1000", "--height", "4000"])
        .expect("CLI command should run");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Image: 210.00 x 840.00 mm"));
    assert!(stdout.contains("Pages: 3"));
    assert!(stdout.contains("page 3: x = 0.00 mm, y = -594.00 mm"));
    assert!(!stdout.contains("page 4"));
}

#[test]
fn test_cli_paginate_json_legacy() {
    let output = run_cli_command(&[
        "paginate",
        "--width",
        "210",
        "--height",
        "594",
        "--legacy-trailing-page",
        "--json",
    ])
    .expect("CLI command should run");
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["placements"].as_array().unwrap().len(), 3);
}

#[test]
fn test_cli_paginate_zero_width_fails() {
    let output = run_cli_command(&["paginate", "--width", "0", "--height", "100"])
        .expect("CLI command should run");
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid input"));
}

#[test]
fn test_cli_render_to_file() {
    let temp_dir = setup_temp_dir();
    let form_path = temp_dir.path().join("form.json");
    let html_path = temp_dir.path().join("form.html");
    fs::write(
        &form_path,
        r#"{"invoice_number": "INV-9", "items": [{"description": "Gear", "quantity": 2, "unit_price": 4}]}"#,
    )
    .unwrap();

    let output = run_cli_command(&[
        "render",
        "-f",
        form_path.to_str().unwrap(),
        "-o",
        html_path.to_str().unwrap(),
    ])
    .expect("CLI command should run");
    assert!(output.status.success());

    let html = fs::read_to_string(&html_path).unwrap();
    assert!(html.contains("INV-9"));
    assert!(html.contains("8.00"));
}

#[test]
fn test_cli_export_with_image() {
    let temp_dir = setup_temp_dir();
    let capture = write_capture(temp_dir.path(), 100, 400);
    let output_path = temp_dir.path().join("invoice.pdf");

    let output = run_cli_command(&[
        "export",
        "--item",
        "Design:10:85",
        "--item",
        "Hosting:1:20",
        "--image",
        capture.to_str().unwrap(),
        "-o",
        output_path.to_str().unwrap(),
    ])
    .expect("CLI command should run");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_pdf_exists_and_valid(&output_path);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("3 page(s)"));
}

#[test]
fn test_cli_export_requires_capture_source() {
    let output = run_cli_command(&["export"]).expect("CLI command should run");
    assert!(!output.status.success());
}

#[test]
fn test_cli_export_bad_item_leaves_no_file() {
    let temp_dir = setup_temp_dir();
    let capture = write_capture(temp_dir.path(), 10, 10);
    let output_path = temp_dir.path().join("invoice.pdf");

    let output = run_cli_command(&[
        "export",
        "--item",
        "Design:ten:85",
        "--image",
        capture.to_str().unwrap(),
        "-o",
        output_path.to_str().unwrap(),
    ])
    .expect("CLI command should run");

    assert!(!output.status.success());
    assert!(!output_path.exists());
}

#[test]
fn test_cli_export_missing_image_fails() {
    let temp_dir = setup_temp_dir();
    let output_path = temp_dir.path().join("invoice.pdf");

    let output = run_cli_command(&[
        "export",
        "--image",
        "/nonexistent/capture.png",
        "-o",
        output_path.to_str().unwrap(),
    ])
    .expect("CLI command should run");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Capture failed"));
    assert!(!output_path.exists());
}

#[test]
fn test_cli_edit_session() {
    let temp_dir = setup_temp_dir();
    let capture = write_capture(temp_dir.path(), 200, 200);
    let output_path = temp_dir.path().join("edited.pdf");

    let mut child = Command::new(get_cli_path())
        .arg("edit")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("CLI should start");

    let script = format!(
        "set 0 description Consulting\nset 0 quantity 2\nset 0 price 50\nadd\nremove 1\nshow\nexport {} {}\nquit\n",
        output_path.display(),
        capture.display()
    );
    child
        .stdin
        .take()
        .unwrap()
        .write_all(script.as_bytes())
        .unwrap();

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Line item 0 total: 100.00"));
    assert!(stdout.contains("Consulting"));
    assert!(stdout.contains("Exported 1 page(s)"));
    assert_pdf_exists_and_valid(&output_path);
}
