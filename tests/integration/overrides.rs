use anyhow::Result;
use std::fs;

use crate::common::TestProject;

const REMOTE_LOCK: &str = r#"{ "libs": [
    { "name": "Proto", "url": "https://invalid.example/proto.git", "rev": "v2.0", "dst": "lib/proto" }
] }"#;

/// An override wins over an unreachable remote without touching the network
#[test]
fn test_override_skips_network() -> Result<()> {
    let project = TestProject::new()?;
    let vendor = project.sources_path().join("vendor-proto");
    fs::create_dir_all(&vendor)?;
    fs::write(vendor.join("export.mk"), "")?;

    project.write_lock(REMOTE_LOCK)?;
    project.write_overrides(&format!(r#"{{ "overrides": {{ "PROTO": "{}" }} }}"#, vendor.display()))?;

    project
        .configure()?
        .assert_success()
        .assert_stdout_contains("[info] overrides loaded: PROTO")
        .assert_stdout_contains("[override] Proto");
    assert!(project.read_output()?.contains(&format!("PROTO_DIR := {}", vendor.display())));
    assert!(!project.project_path().join("lib/proto").exists());
    Ok(())
}

/// Overrides may use the raw name and a path relative to the project root
#[test]
fn test_override_by_raw_name_relative_path() -> Result<()> {
    let project = TestProject::new()?;
    fs::create_dir_all(project.sources_path().join("proto"))?;

    project.write_lock(REMOTE_LOCK)?;
    project.write_overrides(r#"{ "overrides": { "Proto": "../sources/proto" } }"#)?;

    project
        .configure()?
        .assert_success()
        .assert_stdout_contains("[warn] Proto: export.mk not found")
        .assert_stderr_contains("Proto: export.mk not found in");
    let expected = project.sources_path().join("proto");
    assert!(project.read_output()?.contains(&format!("PROTO_DIR := {}", expected.display())));
    Ok(())
}

/// A broken override is fatal and leaves the previous output in place
#[test]
fn test_missing_override_directory() -> Result<()> {
    let project = TestProject::new()?;
    project.write_lock(REMOTE_LOCK)?;
    project.write_overrides(r#"{ "overrides": { "PROTO": "/definitely/not/here" } }"#)?;
    project.write_file("generated/third_party.mk", "PREVIOUS\n")?;

    let output = project.configure()?;
    output.assert_failure().assert_stderr_contains("/definitely/not/here");
    assert_eq!(output.code, Some(1));
    assert_eq!(project.read_output()?, "PREVIOUS\n");
    Ok(())
}

/// Absolute-path urls resolve in place
#[test]
fn test_local_reference_url() -> Result<()> {
    let project = TestProject::new()?;
    let local = project.sources_path().join("mpu9250");
    fs::create_dir_all(&local)?;
    fs::write(local.join("export.mk"), "")?;

    project.write_lock(&format!(
        r#"{{ "libs": [ {{ "name": "MPU9250_LIB", "url": "{}", "rev": "main", "dst": "lib/mpu" }} ] }}"#,
        local.display()
    ))?;

    project.configure()?.assert_success().assert_stdout_contains("[local-url] MPU9250_LIB");
    assert!(project.read_output()?.contains(&format!("MPU9250_LIB_DIR := {}", local.display())));
    Ok(())
}

/// A destination with export.mk but no .git is used as-is
#[test]
fn test_vendored_copy() -> Result<()> {
    let project = TestProject::new()?;
    project.write_file("lib/proto/export.mk", "# vendored\n")?;
    project.write_lock(REMOTE_LOCK)?;

    project.configure()?.assert_success().assert_stdout_contains("[vendored] Proto");
    assert!(!project.project_path().join("lib/proto/.git").exists());
    Ok(())
}
