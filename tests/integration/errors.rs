use anyhow::Result;
use predicates::prelude::*;

use crate::common::TestProject;
use crate::git_available;

#[test]
fn test_missing_lock_file() -> Result<()> {
    let project = TestProject::new()?;
    let output = project.configure()?;
    output.assert_failure().assert_stderr_contains("submodules_list.json");
    assert_eq!(output.code, Some(1));
    assert!(!project.output_path().exists());
    Ok(())
}

#[test]
fn test_duplicate_symbolic_keys() -> Result<()> {
    let project = TestProject::new()?;
    project.write_lock(
        r#"{ "libs": [
            { "name": "Foo Bar", "url": "https://example/a.git", "rev": "main", "dst": "lib/a" },
            { "name": "foo-bar", "url": "https://example/b.git", "rev": "main", "dst": "lib/b" }
        ] }"#,
    )?;

    let output = project.configure()?;
    output.assert_failure();
    assert!(predicate::str::contains("FOO_BAR").eval(&output.stderr));
    assert!(!project.output_path().exists());
    Ok(())
}

#[test]
fn test_missing_field_names_record() -> Result<()> {
    let project = TestProject::new()?;
    project.write_lock(r#"{ "libs": [ { "name": "Proto", "url": "u", "dst": "lib/proto" } ] }"#)?;

    let output = project.configure()?;
    output.assert_failure();
    assert!(predicate::str::contains("rev").and(predicate::str::contains("Proto")).eval(&output.stderr));
    Ok(())
}

#[test]
fn test_malformed_lock_reports_line() -> Result<()> {
    let project = TestProject::new()?;
    project.write_lock("{\n  \"libs\": [\n    { \"name\": }\n  ]\n}\n")?;

    let output = project.configure()?;
    output.assert_failure();
    assert!(predicate::str::contains("line 3").eval(&output.stderr));
    Ok(())
}

#[test]
fn test_clone_failure_is_fatal() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let project = TestProject::new()?;
    project.write_lock(
        r#"{ "libs": [ { "name": "Ghost", "url": "../sources/does-not-exist", "rev": "v1", "dst": "lib/ghost" } ] }"#,
    )?;

    project.configure()?.assert_failure().assert_stderr_contains("does-not-exist");
    assert!(!project.output_path().exists());
    Ok(())
}

#[test]
fn test_invalid_project_config() -> Result<()> {
    let project = TestProject::new()?;
    project.write_file("depsync.toml", "unknown-key = 1\n")?;
    project.write_lock(r#"{ "libs": [] }"#)?;

    project.configure()?.assert_failure().assert_stderr_contains("depsync.toml");
    Ok(())
}
