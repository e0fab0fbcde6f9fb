//! End-to-end CLI integration tests
//!
//! These tests invoke the compiled binary as a subprocess to verify
//! that the CLI behaves correctly from a user's perspective.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Returns a Command configured to run our binary.
///
/// Note: `cargo_bin` is marked deprecated for edge cases involving custom
/// cargo build directories, but works correctly for standard project layouts.
#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

/// A project directory plus a separate log directory, so log files never
/// land inside the project.
struct Project {
    dir: TempDir,
    logs: TempDir,
}

impl Project {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            logs: TempDir::new().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, content: &str) -> &Self {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
        self
    }

    fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path().join(name)).unwrap()
    }

    fn cmd(&self) -> Command {
        let mut cmd = cmd();
        cmd.arg("-C")
            .arg(self.path())
            .env("SEMVX_LOG_DIR", self.logs.path())
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("GIT_CONFIG_GLOBAL", self.logs.path().join("gitconfig"))
            .env("GIT_AUTHOR_NAME", "t")
            .env("GIT_AUTHOR_EMAIL", "t@example.com")
            .env("GIT_COMMITTER_NAME", "t")
            .env("GIT_COMMITTER_EMAIL", "t@example.com")
            .env_remove("RUST_LOG");
        cmd
    }

    fn git(&self, args: &[&str]) {
        let status = std::process::Command::new("git")
            .args(args)
            .current_dir(self.path())
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("GIT_CONFIG_GLOBAL", self.logs.path().join("gitconfig"))
            .env("GIT_AUTHOR_NAME", "t")
            .env("GIT_AUTHOR_EMAIL", "t@example.com")
            .env("GIT_COMMITTER_NAME", "t")
            .env("GIT_COMMITTER_EMAIL", "t@example.com")
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?}");
    }

    /// Initialize a repository on `main` and commit everything, or `None`
    /// when git isn't installed.
    fn git_init(self) -> Option<Self> {
        which_git()?;
        self.git(&["init", "--quiet"]);
        self.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        self.git(&["add", "-A"]);
        self.git(&["commit", "--quiet", "-m", "chore: initial"]);
        Some(self)
    }
}

fn which_git() -> Option<()> {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|_| ())
}

fn json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).expect("stdout should be valid JSON")
}

const CARGO: &str = "[package]\nname = \"demo\"\nversion = \"1.2.5\"\n";
const PACKAGE: &str = "{\n  \"name\": \"demo\",\n  \"version\": \"1.2.1\"\n}\n";

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_shows_usage() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("sync"));
}

#[test]
fn long_help_lists_environment() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("SEMVX_LOG_DIR"));
}

#[test]
fn version_flag_shows_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_subcommand_fails() {
    cmd()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn sync_help_lists_flags() {
    cmd()
        .args(["sync", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--force"))
        .stdout(predicate::str::contains("--set"))
        .stdout(predicate::str::contains("--amend"));
}

// =============================================================================
// Detect
// =============================================================================

#[test]
fn detect_lists_sources() {
    let p = Project::new();
    p.write("Cargo.toml", CARGO).write("package.json", PACKAGE);

    p.cmd()
        .arg("detect")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cargo.toml"))
        .stdout(predicate::str::contains("package.json"))
        .stdout(predicate::str::contains("1.2.5"));
}

#[test]
fn detect_json_is_structured() {
    let p = Project::new();
    p.write("Cargo.toml", CARGO).write("web/package.json", PACKAGE);

    let output = p.cmd().args(["detect", "--json"]).assert().success();
    let doc = json(&output.get_output().stdout);
    let sources = doc["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["kind"], "cargo");
    assert_eq!(sources[0]["version"], "1.2.5");
    assert_eq!(sources[1]["path"], "web/package.json");
}

#[test]
fn detect_reports_malformed_files_without_failing() {
    let p = Project::new();
    p.write("Cargo.toml", "[package\nbroken").write("package.json", PACKAGE);

    let output = p.cmd().args(["detect", "--json"]).assert().success();
    let doc = json(&output.get_output().stdout);
    assert_eq!(doc["sources"].as_array().unwrap().len(), 1);
    assert_eq!(doc["problems"].as_array().unwrap().len(), 1);
}

#[test]
fn detect_finds_bash_header() {
    let p = Project::new();
    p.write("mytool.sh", "#!/usr/bin/env bash\n# version: 0.7.0\necho hi\n");

    p.cmd()
        .arg("detect")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.7.0"));
}

// =============================================================================
// Status / Next / Validate without git history
// =============================================================================

#[test]
fn status_json_outside_git_records_problem() {
    let p = Project::new();
    p.write("Cargo.toml", CARGO).write("package.json", PACKAGE);

    let output = p.cmd().args(["status", "--json"]).assert().success();
    let doc = json(&output.get_output().stdout);
    assert_eq!(doc["target_version"], "1.2.5");
    assert_eq!(doc["authority"], "package");
    assert_eq!(doc["authority_source"], "Cargo.toml");
    assert!(!doc["problems"].as_array().unwrap().is_empty());
}

#[test]
fn next_prints_target() {
    let p = Project::new();
    p.write("Cargo.toml", CARGO).write("package.json", PACKAGE);

    p.cmd()
        .arg("next")
        .assert()
        .success()
        .stdout(predicate::str::diff("1.2.5\n"));
}

#[test]
fn next_without_anything_fails() {
    let p = Project::new();
    p.cmd()
        .arg("next")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no version could be determined"));
}

#[test]
fn validate_fails_on_drift() {
    let p = Project::new();
    p.write("Cargo.toml", CARGO).write("package.json", PACKAGE);

    p.cmd()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not aligned"));
}

// =============================================================================
// Sync
// =============================================================================

#[test]
fn sync_dry_run_changes_nothing() {
    let p = Project::new();
    p.write("Cargo.toml", CARGO).write("package.json", PACKAGE);

    let output = p
        .cmd()
        .args(["sync", "--dry-run", "--json"])
        .assert()
        .success();
    let doc = json(&output.get_output().stdout);
    assert_eq!(doc["ok"], true);
    assert_eq!(doc["dry_run"], true);
    assert_eq!(doc["steps"][0]["kind"], "write_file");
    assert_eq!(doc["steps"][0]["target"], "package.json");
    assert_eq!(doc["executed"].as_array().unwrap().len(), 0);
    assert_eq!(p.read("package.json"), PACKAGE);
}

#[test]
fn sync_rejects_invalid_set() {
    let p = Project::new();
    p.write("Cargo.toml", CARGO);

    p.cmd()
        .args(["sync", "--set", "banana"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --set version"));
    assert_eq!(p.read("Cargo.toml"), CARGO);
}

#[test]
fn sync_outside_git_fails_without_writing() {
    let p = Project::new();
    p.write("Cargo.toml", CARGO).write("package.json", PACKAGE);

    let output = p.cmd().args(["sync", "--json"]).assert().failure();
    let doc = json(&output.get_output().stdout);
    assert_eq!(doc["ok"], false);
    assert_eq!(doc["failure"], "git_operation");
    assert_eq!(p.read("package.json"), PACKAGE);
}

// =============================================================================
// Sync in a real repository
// =============================================================================

#[test]
fn sync_aligns_files_and_tags() {
    let p = Project::new();
    p.write("Cargo.toml", CARGO).write("package.json", PACKAGE);
    let Some(p) = p.git_init() else { return };
    p.git(&["tag", "-a", "v1.2.3", "-m", "Release 1.2.3"]);

    p.cmd().arg("sync").assert().success();
    assert!(p.read("package.json").contains("\"version\": \"1.2.5\""));

    let output = p.cmd().args(["tags", "--json"]).assert().success();
    let doc = json(&output.get_output().stdout);
    assert_eq!(doc[0]["name"], "v1.2.5");

    p.git(&["commit", "--quiet", "-am", "chore: release 1.2.5"]);
    p.cmd().arg("validate").assert().success();
}

#[test]
fn sync_is_idempotent() {
    let p = Project::new();
    p.write("Cargo.toml", CARGO);
    let Some(p) = p.git_init() else { return };

    p.cmd().arg("sync").assert().success();
    let output = p.cmd().args(["sync", "--json"]).assert().success();
    let doc = json(&output.get_output().stdout);
    assert_eq!(doc["steps"].as_array().unwrap().len(), 0);
    assert!(doc["message"].as_str().unwrap().contains("aligned"));
}

#[test]
fn sync_blocks_off_release_branch() {
    let p = Project::new();
    p.write("Cargo.toml", CARGO);
    let Some(p) = p.git_init() else { return };
    p.git(&["checkout", "--quiet", "-b", "feature/x"]);

    let output = p.cmd().args(["sync", "--json"]).assert().failure();
    let doc = json(&output.get_output().stdout);
    assert_eq!(doc["failure"], "guard");

    let output = p.cmd().args(["sync", "--force", "--json"]).assert().success();
    let doc = json(&output.get_output().stdout);
    assert_eq!(doc["forced_override"], true);
}

#[test]
fn sync_amend_leaves_clean_tree() {
    let p = Project::new();
    p.write("Cargo.toml", CARGO).write("package.json", PACKAGE);
    let Some(p) = p.git_init() else { return };

    p.cmd().args(["sync", "--amend"]).assert().success();
    p.cmd().arg("validate").assert().success();
}

#[test]
fn commits_drive_calculated_version() {
    let p = Project::new();
    p.write("Cargo.toml", "[package]\nname = \"demo\"\nversion = \"1.0.0\"\n");
    let Some(p) = p.git_init() else { return };
    p.git(&["tag", "-a", "v1.0.0", "-m", "Release 1.0.0"]);
    p.write("src.txt", "x");
    p.git(&["add", "src.txt"]);
    p.git(&["commit", "--quiet", "-m", "feat(api): new endpoint"]);

    p.cmd()
        .args(["next", "--calculated"])
        .assert()
        .success()
        .stdout(predicate::str::diff("1.1.0\n"));

    let output = p.cmd().args(["status", "--json"]).assert().success();
    let doc = json(&output.get_output().stdout);
    assert_eq!(doc["impact"], "minor");
    assert_eq!(doc["authority"], "calculated");
    assert_eq!(doc["drift"], "calculated_higher");
}

// =============================================================================
// Build info
// =============================================================================

#[test]
fn build_outside_git_fails_without_writing() {
    let p = Project::new();
    p.write("Cargo.toml", CARGO);
    p.cmd().arg("build").assert().failure();
    assert!(!p.path().join(".build_info").exists());
}

#[test]
fn build_writes_build_info() {
    let p = Project::new();
    p.write("Cargo.toml", CARGO);
    let Some(p) = p.git_init() else { return };
    p.git(&["tag", "-a", "v1.2.5", "-m", "Release 1.2.5"]);

    let output = p.cmd().args(["build", "--json"]).assert().success();
    let doc = json(&output.get_output().stdout);
    assert_eq!(doc["version"], "1.2.5");
    assert_eq!(doc["build_count"], 1);
    assert_eq!(doc["commits_since_tag"], 0);
    assert_eq!(doc["tag"], "v1.2.5");

    let info = p.read(".build_info");
    assert!(info.starts_with("# Build Information\n"));
    assert!(info.contains("VERSION=1.2.5\nBUILD_COUNT=1\nCOMMIT_HASH="));
    assert!(info.contains("BUILD_TIMESTAMP="));
}

#[test]
fn build_to_named_file() {
    let p = Project::new();
    p.write("package.json", PACKAGE);
    let Some(p) = p.git_init() else { return };

    p.cmd()
        .args(["build", "release.env"])
        .assert()
        .success()
        .stdout(predicate::str::contains("release.env"));
    assert!(p.read("release.env").contains("VERSION=1.2.1\n"));
    assert!(!p.path().join(".build_info").exists());
}

#[test]
fn build_count_alias() {
    let p = Project::new();
    p.write("Cargo.toml", CARGO);
    let Some(p) = p.git_init() else { return };
    p.git(&["tag", "-a", "v1.2.5", "-m", "Release 1.2.5"]);
    p.write("src.txt", "x");
    p.git(&["add", "src.txt"]);
    p.git(&["commit", "--quiet", "-m", "fix: y"]);

    let output = p.cmd().args(["bc", "--json"]).assert().success();
    let doc = json(&output.get_output().stdout);
    assert_eq!(doc["build_count"], 2);
    assert_eq!(doc["commits_since_tag"], 1);
    assert_eq!(doc["tag"], "v1.2.5");
    assert!(doc["commit"].as_str().is_some_and(|c| c.len() >= 7));
}
