// tests/test_cli.rs — Process-level checks of the clraytrace binary.
//
// Only the failure paths that end before any OpenCL call are exercised here,
// so these run on machines without a device.

use std::process::Command;

fn clraytrace() -> Command {
    Command::new(env!("CARGO_BIN_EXE_clraytrace"))
}

#[test]
fn missing_kernel_exits_with_1_and_no_image() {
    let dir = tempfile::tempdir().unwrap();
    let output = clraytrace()
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("raytracer.ocl"), "stderr: {stderr}");
}

#[test]
fn oversized_kernel_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let kernel = dir.path().join("big.ocl");
    std::fs::write(&kernel, vec![b' '; 2048]).unwrap();
    let output = clraytrace()
        .arg("--kernel")
        .arg(&kernel)
        .arg("--max-source-size")
        .arg("1K")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("1024 byte limit"));
}

#[test]
fn zero_width_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("out.ppm");
    let output = clraytrace()
        .args(["--width", "0", "--output"])
        .arg(&output_path)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(!output_path.exists());
}

#[test]
fn bad_size_suffix_is_a_usage_error() {
    let output = clraytrace()
        .args(["--max-source-size", "12Q"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("12Q"));
}

#[test]
fn unknown_flag_exits_with_1() {
    let output = clraytrace().arg("--no-such-flag").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn help_exits_with_0() {
    let output = clraytrace().arg("--help").output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("--max-source-size"));
}

#[test]
fn overflowing_dimensions_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = clraytrace()
        .current_dir(dir.path())
        .args(["-W", "4294967296", "-H", "4294967296"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(!String::from_utf8_lossy(&output.stderr).contains("raytracer.ocl"));
}
