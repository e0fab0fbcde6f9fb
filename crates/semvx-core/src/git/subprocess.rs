//! [`GitBackend`] over the `git` binary.
//!
//! Output is captured through anonymous temp files while the child is polled
//! against the timeout.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, instrument, warn};

use super::{GitBackend, GitError, GitResult};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Field separator for `git log --format`.
const LOG_SEPARATOR: char = '\u{1f}';

/// Shells out to `git` in a fixed repository root.
#[derive(Debug, Clone)]
pub struct SubprocessGit {
    root: Utf8PathBuf,
    binary: PathBuf,
    timeout: Duration,
}

impl SubprocessGit {
    /// Locate `git` on `PATH` and bind it to `root`.
    pub fn new(root: impl Into<Utf8PathBuf>, timeout: Duration) -> GitResult<Self> {
        let binary = which::which("git")?;
        Ok(Self {
            root: root.into(),
            binary,
            timeout,
        })
    }

    /// The repository root commands run in.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Check if the root is inside a git work tree.
    #[instrument(skip(self))]
    pub fn is_inside_repo(&self) -> GitResult<bool> {
        match self.git(&["rev-parse", "--is-inside-work-tree"]) {
            Ok(output) => Ok(output.trim() == "true"),
            Err(GitError::Command { .. } | GitError::NotARepo) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn has_head(&self) -> GitResult<bool> {
        match self.git(&["rev-parse", "--verify", "--quiet", "HEAD"]) {
            Ok(_) => Ok(true),
            Err(GitError::Command { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Run a git command and return its stdout.
    fn git(&self, args: &[&str]) -> GitResult<String> {
        let command = args.first().copied().unwrap_or_default().to_string();
        let mut stdout = tempfile::tempfile()?;
        let mut stderr = tempfile::tempfile()?;

        let mut child = Command::new(&self.binary)
            .args(args)
            .current_dir(&self.root)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout.try_clone()?))
            .stderr(Stdio::from(stderr.try_clone()?))
            .spawn()?;

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                warn!(%command, timeout = ?self.timeout, "git timed out, killing");
                let _ = child.kill();
                let _ = child.wait();
                return Err(GitError::Timeout {
                    command,
                    timeout: self.timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let out = read_back(&mut stdout)?;
        if status.success() {
            return Ok(out);
        }

        let stderr = read_back(&mut stderr)?.trim().to_string();
        if stderr.contains("not a git repository") {
            return Err(GitError::NotARepo);
        }
        Err(GitError::Command { command, stderr })
    }
}

fn read_back(file: &mut File) -> std::io::Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn path_args(paths: &[Utf8PathBuf]) -> impl Iterator<Item = &str> {
    paths.iter().map(|p| p.as_str())
}

impl GitBackend for SubprocessGit {
    #[instrument(skip(self))]
    fn list_tags(&self) -> GitResult<Vec<String>> {
        let output = self.git(&["tag", "--list"])?;
        let tags: Vec<String> = output
            .lines()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        debug!(count = tags.len(), "listed tags");
        Ok(tags)
    }

    #[instrument(skip(self))]
    fn log_since(&self, since: Option<&str>) -> GitResult<Vec<(String, String)>> {
        if !self.has_head()? {
            debug!("no commits yet");
            return Ok(Vec::new());
        }

        let range = since.map_or_else(|| "HEAD".to_string(), |tag| format!("{tag}..HEAD"));
        let format = format!("--format=%h{LOG_SEPARATOR}%s");
        let output = self.git(&["log", &range, &format])?;

        let commits: Vec<(String, String)> = output
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| {
                let (hash, subject) = line.split_once(LOG_SEPARATOR).unwrap_or((line, ""));
                (hash.to_string(), subject.to_string())
            })
            .collect();

        debug!(count = commits.len(), "commits since tag");
        Ok(commits)
    }

    #[instrument(skip(self))]
    fn count_commits(&self, since: Option<&str>) -> GitResult<u64> {
        if !self.has_head()? {
            return Ok(0);
        }
        let range = since.map_or_else(|| "HEAD".to_string(), |tag| format!("{tag}..HEAD"));
        let output = self.git(&["rev-list", "--count", &range])?;
        let count = output.trim().parse().map_err(|_| GitError::Unexpected {
            command: "rev-list".into(),
            output: output.trim().to_string(),
        })?;
        debug!(count, "counted commits");
        Ok(count)
    }

    #[instrument(skip(self))]
    fn head_hash(&self, short: bool) -> GitResult<String> {
        let args: &[&str] = if short {
            &["rev-parse", "--short", "HEAD"]
        } else {
            &["rev-parse", "HEAD"]
        };
        Ok(self.git(args)?.trim().to_string())
    }

    #[instrument(skip(self))]
    fn current_branch(&self) -> GitResult<Option<String>> {
        // symbolic-ref also resolves an unborn branch; it fails when detached
        match self.git(&["symbolic-ref", "--short", "-q", "HEAD"]) {
            Ok(output) => {
                let branch = output.trim().to_string();
                debug!(%branch, "current branch");
                Ok(Some(branch))
            }
            Err(GitError::Command { .. }) => {
                debug!("detached HEAD");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    fn is_clean(&self) -> GitResult<bool> {
        let output = self.git(&["status", "--porcelain"])?;
        let clean = output.trim().is_empty();
        debug!(clean, "working tree status");
        Ok(clean)
    }

    #[instrument(skip(self))]
    fn create_annotated_tag(&self, name: &str, message: &str) -> GitResult<()> {
        self.git(&["tag", "-a", name, "-m", message])?;
        debug!(%name, "created tag");
        Ok(())
    }

    #[instrument(skip(self))]
    fn amend_last_commit(&self, paths: &[Utf8PathBuf]) -> GitResult<()> {
        let mut add = vec!["add", "--"];
        add.extend(path_args(paths));
        self.git(&add)?;
        self.git(&["commit", "--amend", "--no-edit", "--quiet"])?;
        debug!(files = paths.len(), "amended last commit");
        Ok(())
    }

    #[instrument(skip(self))]
    fn unstage(&self, paths: &[Utf8PathBuf]) -> GitResult<()> {
        let mut reset = vec!["reset", "--quiet", "--"];
        reset.extend(path_args(paths));
        self.git(&reset)?;
        Ok(())
    }
}
