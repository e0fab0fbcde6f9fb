//! Command implementations

pub mod build;

pub mod detect;

pub mod next;

pub mod status;

pub mod sync;

pub mod tags;

pub mod validate;

use camino::{Utf8Path, Utf8PathBuf};
use owo_colors::OwoColorize;
use tracing::warn;

use semvx_core::config::Config;
use semvx_core::git::{GitBackend, GitError, GitResult, SubprocessGit};

/// A git backend rooted at `root`.
///
/// When the `git` binary can't be found, the returned backend fails every
/// call with the lookup error, so inspection still runs and records it as a
/// problem.
pub fn open_git(root: &Utf8Path, config: &Config) -> Box<dyn GitBackend> {
    match SubprocessGit::new(root, config.sync.git_timeout()) {
        Ok(git) => Box::new(git),
        Err(err) => {
            warn!(error = %err, "git unavailable");
            Box::new(GitUnavailable {
                reason: err.to_string(),
            })
        }
    }
}

struct GitUnavailable {
    reason: String,
}

impl GitUnavailable {
    fn fail<T>(&self, command: &str) -> GitResult<T> {
        Err(GitError::Command {
            command: command.to_string(),
            stderr: self.reason.clone(),
        })
    }
}

impl GitBackend for GitUnavailable {
    fn list_tags(&self) -> GitResult<Vec<String>> {
        self.fail("tag")
    }

    fn log_since(&self, _since: Option<&str>) -> GitResult<Vec<(String, String)>> {
        self.fail("log")
    }

    fn count_commits(&self, _since: Option<&str>) -> GitResult<u64> {
        self.fail("rev-list")
    }

    fn head_hash(&self, _short: bool) -> GitResult<String> {
        self.fail("rev-parse")
    }

    fn current_branch(&self) -> GitResult<Option<String>> {
        self.fail("symbolic-ref")
    }

    fn is_clean(&self) -> GitResult<bool> {
        self.fail("status")
    }

    fn create_annotated_tag(&self, _name: &str, _message: &str) -> GitResult<()> {
        self.fail("tag")
    }

    fn amend_last_commit(&self, _paths: &[Utf8PathBuf]) -> GitResult<()> {
        self.fail("commit")
    }

    fn unstage(&self, _paths: &[Utf8PathBuf]) -> GitResult<()> {
        self.fail("reset")
    }
}

/// Print non-fatal problems under a heading.
pub fn print_problems(problems: &[String]) {
    if problems.is_empty() {
        return;
    }
    println!();
    println!("{}", "Problems".bold().underline());
    for problem in problems {
        println!("  {} {}", "!".yellow(), problem.yellow());
    }
}
