use anyhow::Result;

use crate::common::TestProject;

/// The build program from `depsync.toml` gets make-style arguments and its
/// exit status becomes ours
#[cfg(unix)]
#[test]
fn test_exit_code_is_forwarded() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let project = TestProject::new()?;
    project.write_file("fake-make.sh", "#!/bin/sh\necho \"$@\" > build-args.txt\nexit 7\n")?;
    let script = project.project_path().join("fake-make.sh");
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))?;
    project.write_file("depsync.toml", &format!("[build]\nmake = \"{}\"\n", script.display()))?;

    let output = project.run_depsync(&["--quiet", "build", "--jobs", "4", "--target", "flash"])?;
    assert_eq!(output.code, Some(7));
    let args = std::fs::read_to_string(project.project_path().join("build-args.txt"))?;
    assert_eq!(args.trim(), "-rR -j4 -f STM32Make.make flash");
    Ok(())
}

#[test]
fn test_missing_build_program() -> Result<()> {
    let project = TestProject::new()?;
    let output = project.run_depsync(&["build", "--make", "depsync-no-such-make"])?;
    output.assert_failure().assert_stderr_contains("depsync-no-such-make");
    assert_eq!(output.code, Some(1));
    Ok(())
}
