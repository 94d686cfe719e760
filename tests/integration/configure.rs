use anyhow::Result;
use std::fs;

use crate::common::{TestGit, TestProject};
use crate::git_available;

fn single_lib_lock(url: &str, rev: &str) -> String {
    format!(
        r#"{{ "libs": [ {{ "name": "Proto", "url": "{url}", "rev": "{rev}", "dst": "lib/proto" }} ] }}"#
    )
}

/// Fresh clone pinned at a tag, then an idempotent second run
#[test]
fn test_fresh_clone_then_up_to_date() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let project = TestProject::new()?;
    let (upstream, tagged) = project.create_source_repo("proto", "v2.0")?;

    // A later commit on main must not be picked up
    fs::write(upstream.repo_path().join("export.mk"), "# after v2.0\n")?;
    upstream.add_all()?;
    upstream.commit("after release")?;

    project.write_lock(&single_lib_lock(&project.source_url("proto"), "v2.0"))?;

    project.configure()?.assert_success().assert_stdout_contains("[fetch] Proto@v2.0");
    let dst = project.project_path().join("lib/proto");
    assert_eq!(TestGit::new(&dst).rev_parse_head()?, tagged);

    let text = project.read_output()?;
    assert!(text.contains(&format!("PROTO_DIR := {}", dst.display())));
    assert!(text.contains("-include $(PROTO_DIR)/export.mk"));

    project.configure()?.assert_success().assert_stdout_contains("[up-to-date] Proto");
    assert_eq!(TestGit::new(&dst).rev_parse_head()?, tagged);
    assert_eq!(project.read_output()?, text);
    Ok(())
}

/// A commit id is not cloneable shallowly; the fallback path checks it out
#[test]
fn test_clone_at_commit_id() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let project = TestProject::new()?;
    let (upstream, first) = project.create_source_repo("proto", "v1.0")?;
    fs::write(upstream.repo_path().join("export.mk"), "# v1.1\n")?;
    upstream.add_all()?;
    upstream.commit("second")?;

    project.write_lock(&single_lib_lock(&project.source_url("proto"), &first))?;
    project.configure()?.assert_success();

    let dst = project.project_path().join("lib/proto");
    assert_eq!(TestGit::new(&dst).rev_parse_head()?, first);
    Ok(())
}

/// Changing the pinned revision moves an existing checkout and discards local edits
#[test]
fn test_existing_checkout_is_updated() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let project = TestProject::new()?;
    let (upstream, _) = project.create_source_repo("proto", "v1.0")?;
    fs::write(upstream.repo_path().join("export.mk"), "# v2.0\n")?;
    upstream.add_all()?;
    upstream.commit("v2")?;
    upstream.tag("v2.0")?;
    let v2 = upstream.rev_parse_head()?;

    let url = project.source_url("proto");
    project.write_lock(&single_lib_lock(&url, "v1.0"))?;
    project.configure()?.assert_success();

    let dst = project.project_path().join("lib/proto");
    fs::write(dst.join("export.mk"), "# local edit\n")?;

    project.write_lock(&single_lib_lock(&url, "v2.0"))?;
    project.configure()?.assert_success().assert_stdout_contains("[update] Proto");

    let checkout = TestGit::new(&dst);
    assert_eq!(checkout.rev_parse_head()?, v2);
    assert_eq!(fs::read_to_string(dst.join("export.mk"))?, "# v2.0\n");
    assert!(checkout.status_porcelain()?.trim().is_empty());
    Ok(())
}

/// Mapping-shaped `libs` keep document order in the output
#[test]
fn test_mapping_order_is_preserved() -> Result<()> {
    let project = TestProject::new()?;
    for dir in ["vendor/zeta", "vendor/alpha"] {
        project.write_file(&format!("{dir}/export.mk"), "")?;
    }
    project.write_lock(
        r#"{ "libs": {
            "zeta": { "name": "zeta", "url": "local:vendor/zeta", "rev": "main", "dst": "lib/zeta" },
            "alpha": { "name": "alpha", "url": "local:vendor/alpha", "rev": "main", "dst": "lib/alpha" }
        } }"#,
    )?;

    project.configure()?.assert_success();
    let text = project.read_output()?;
    assert!(text.find("ZETA_DIR :=").unwrap() < text.find("ALPHA_DIR :=").unwrap());
    assert!(text.contains("$(info [AGG] C_INCLUDES = $(C_INCLUDES))"));
    Ok(())
}

/// Lock, override, and output locations can be moved with flags
#[test]
fn test_custom_paths() -> Result<()> {
    let project = TestProject::new()?;
    project.write_file("vendor/proto/export.mk", "")?;
    project.write_file(
        "deps/libs.json",
        r#"{ "libs": [ { "name": "Proto", "url": "local:vendor/proto", "rev": "main", "dst": "lib/proto" } ] }"#,
    )?;

    project
        .run_depsync(&[
            "--quiet",
            "configure",
            "--lock",
            "deps/libs.json",
            "--output",
            "build/deps.mk",
        ])?
        .assert_success();

    let text = fs::read_to_string(project.project_path().join("build/deps.mk"))?;
    assert!(text.contains("PROTO_DIR :="));
    assert!(!project.output_path().exists());
    Ok(())
}
