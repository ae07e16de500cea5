// tests/cli_test.rs
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use git2::Repository as Git2Repo;
use tempfile::TempDir;

const SPEC: &str = "Name: pkg\nVersion: 1.0\nRelease: 1%{?dist}\n\n%changelog\n";

fn rpm_tagger(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rpm-tagger"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute rpm-tagger")
}

fn package(dir: &Path) -> Git2Repo {
    let repo = Git2Repo::init(dir).unwrap();
    {
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
    }
    fs::write(dir.join("pkg.spec"), SPEC).unwrap();
    fs::write(dir.join("VERSION"), "1.1\n").unwrap();

    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    {
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = repo.signature().unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "Initial import", &tree, &[])
            .unwrap();
    }
    repo
}

#[test]
fn test_help() {
    let output = rpm_tagger(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("rpm-tagger"));
    assert!(stdout.contains("--dry-run"));
    assert!(stdout.contains("--keep-version"));
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let repo = package(dir.path());

    let output = rpm_tagger(&["--project", dir.path().to_str().unwrap(), "--dry-run"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("pkg-1.1"));

    assert_eq!(fs::read_to_string(dir.path().join("pkg.spec")).unwrap(), SPEC);
    assert!(repo.tag_names(None).unwrap().is_empty());
}

#[test]
fn test_run_prints_push_instruction() {
    let dir = TempDir::new().unwrap();
    let repo = package(dir.path());

    let output = rpm_tagger(&["--project", dir.path().to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("git push origin"));
    assert!(repo.find_reference("refs/tags/pkg-1.1").is_ok());
}

#[test]
fn test_keep_version_bumps_release() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.toml");
    fs::write(&config, "[tagger]\ntag_format = \"{name}-{version}-{release}\"\n").unwrap();
    let repo = package(dir.path());

    let output = rpm_tagger(&[
        "--project",
        dir.path().to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--keep-version",
    ]);
    assert!(output.status.success());
    assert!(repo.find_reference("refs/tags/pkg-1.0-2").is_ok());
}

#[test]
fn test_unreachable_helper_fails_the_same_way_twice() {
    let dir = TempDir::new().unwrap();
    let repo = package(dir.path());
    fs::write(dir.path().join("pkg.gemspec"), "Gem::Specification.new\n").unwrap();
    fs::write(
        dir.path().join("rpm-tagger.toml"),
        "[helper]\nprogram = \"/nonexistent/rpm-tagger-helper\"\n",
    )
    .unwrap();

    for _ in 0..2 {
        let output = rpm_tagger(&[
            "--project",
            dir.path().to_str().unwrap(),
            "--source",
            "helper",
        ]);
        assert_eq!(output.status.code(), Some(1));
        let stderr = String::from_utf8(output.stderr).unwrap();
        assert!(stderr.contains("version resolution failed"));
        assert_eq!(fs::read_to_string(dir.path().join("pkg.spec")).unwrap(), SPEC);
    }
    assert!(repo.tag_names(None).unwrap().is_empty());
}

#[test]
fn test_undo_removes_release() {
    let dir = TempDir::new().unwrap();
    let repo = package(dir.path());
    let project = dir.path().to_str().unwrap();

    assert!(rpm_tagger(&["--project", project]).status.success());
    assert!(repo.find_reference("refs/tags/pkg-1.1").is_ok());

    let output = rpm_tagger(&["--project", project, "--undo", "--force"]);
    assert!(output.status.success());
    assert!(repo.find_reference("refs/tags/pkg-1.1").is_err());
    assert_eq!(fs::read_to_string(dir.path().join("pkg.spec")).unwrap(), SPEC);
}
