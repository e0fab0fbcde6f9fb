//! In-memory [`GitBackend`] for tests.
//!
//! Commits registered with [`MockGit::with_commit`] are treated as the
//! commits since the latest tag. Creating a tag moves the release point to
//! `HEAD`, so the pending commit list is cleared. Commits older than the
//! latest tag only exist as a count ([`MockGit::with_history`]).

use std::cell::{Cell, RefCell};

use camino::Utf8PathBuf;

use super::{GitBackend, GitError, GitResult};

const DEFAULT_HEAD: &str = "9fceb02d0ae598e95dc970b74767f19372d61af8";
const SHORT_HASH_LEN: usize = 7;

/// Mock repository recording every mutating call.
#[derive(Debug)]
pub struct MockGit {
    tags: RefCell<Vec<String>>,
    commits: RefCell<Vec<(String, String)>>,
    history: Cell<u64>,
    head: String,
    branch: Option<String>,
    clean: bool,
    fail_reads: bool,
    fail_tag: bool,
    fail_amend: bool,
    amend_count: Cell<usize>,
    mutations: RefCell<Vec<String>>,
}

impl Default for MockGit {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGit {
    /// A clean repository on `main` with no tags or commits.
    pub fn new() -> Self {
        Self {
            tags: RefCell::new(Vec::new()),
            commits: RefCell::new(Vec::new()),
            history: Cell::new(0),
            head: DEFAULT_HEAD.to_string(),
            branch: Some("main".into()),
            clean: true,
            fail_reads: false,
            fail_tag: false,
            fail_amend: false,
            amend_count: Cell::new(0),
            mutations: RefCell::new(Vec::new()),
        }
    }

    /// Add an existing tag.
    pub fn with_tag(self, name: impl Into<String>) -> Self {
        self.tags.borrow_mut().push(name.into());
        self
    }

    /// Add a commit since the latest tag.
    pub fn with_commit(self, hash: impl Into<String>, subject: impl Into<String>) -> Self {
        self.commits.borrow_mut().push((hash.into(), subject.into()));
        self
    }

    /// Add `count` commits that predate the latest tag.
    pub fn with_history(self, count: u64) -> Self {
        self.history.set(self.history.get() + count);
        self
    }

    /// Set the full `HEAD` hash.
    pub fn with_head(mut self, hash: impl Into<String>) -> Self {
        self.head = hash.into();
        self
    }

    /// Check out a different branch.
    pub fn on_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Detach `HEAD`.
    pub fn detached(mut self) -> Self {
        self.branch = None;
        self
    }

    /// Report uncommitted changes.
    pub const fn dirty(mut self) -> Self {
        self.clean = false;
        self
    }

    /// Make every read operation fail.
    pub const fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Make tag creation fail.
    pub const fn failing_tag(mut self) -> Self {
        self.fail_tag = true;
        self
    }

    /// Make amending fail.
    pub const fn failing_amend(mut self) -> Self {
        self.fail_amend = true;
        self
    }

    /// Current tag names.
    pub fn tags(&self) -> Vec<String> {
        self.tags.borrow().clone()
    }

    /// Mutating calls in the order they happened (`tag v1.2.3`, `amend ...`,
    /// `unstage ...`). Failed calls are recorded too.
    pub fn mutations(&self) -> Vec<String> {
        self.mutations.borrow().clone()
    }

    /// How many times the last commit was successfully amended.
    pub fn amend_count(&self) -> usize {
        self.amend_count.get()
    }

    fn read_guard(&self, command: &str) -> GitResult<()> {
        if self.fail_reads {
            return Err(GitError::Command {
                command: command.to_string(),
                stderr: "mock read failure".into(),
            });
        }
        Ok(())
    }

    fn record(&self, entry: String) {
        self.mutations.borrow_mut().push(entry);
    }
}

fn joined(paths: &[Utf8PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

impl GitBackend for MockGit {
    fn list_tags(&self) -> GitResult<Vec<String>> {
        self.read_guard("tag")?;
        Ok(self.tags())
    }

    fn log_since(&self, _since: Option<&str>) -> GitResult<Vec<(String, String)>> {
        self.read_guard("log")?;
        Ok(self.commits.borrow().clone())
    }

    fn count_commits(&self, since: Option<&str>) -> GitResult<u64> {
        self.read_guard("rev-list")?;
        let pending = self.commits.borrow().len() as u64;
        Ok(match since {
            Some(_) => pending,
            None => self.history.get() + pending,
        })
    }

    fn head_hash(&self, short: bool) -> GitResult<String> {
        self.read_guard("rev-parse")?;
        if self.count_commits(None)? == 0 {
            return Err(GitError::Command {
                command: "rev-parse".into(),
                stderr: "ambiguous argument 'HEAD': unknown revision".into(),
            });
        }
        let hash = if short {
            self.head.chars().take(SHORT_HASH_LEN).collect()
        } else {
            self.head.clone()
        };
        Ok(hash)
    }

    fn current_branch(&self) -> GitResult<Option<String>> {
        self.read_guard("symbolic-ref")?;
        Ok(self.branch.clone())
    }

    fn is_clean(&self) -> GitResult<bool> {
        self.read_guard("status")?;
        Ok(self.clean)
    }

    fn create_annotated_tag(&self, name: &str, message: &str) -> GitResult<()> {
        self.record(format!("tag {name} ({message})"));
        if self.fail_tag || self.tags.borrow().iter().any(|t| t == name) {
            return Err(GitError::Command {
                command: "tag".into(),
                stderr: if self.fail_tag {
                    "mock tag failure".to_string()
                } else {
                    format!("tag '{name}' already exists")
                },
            });
        }
        self.tags.borrow_mut().push(name.to_string());
        let released = self.commits.borrow_mut().drain(..).count() as u64;
        self.history.set(self.history.get() + released);
        Ok(())
    }

    fn amend_last_commit(&self, paths: &[Utf8PathBuf]) -> GitResult<()> {
        self.record(format!("amend {}", joined(paths)));
        if self.fail_amend {
            return Err(GitError::Command {
                command: "commit".into(),
                stderr: "mock amend failure".into(),
            });
        }
        self.amend_count.set(self.amend_count.get() + 1);
        Ok(())
    }

    fn unstage(&self, paths: &[Utf8PathBuf]) -> GitResult<()> {
        self.record(format!("unstage {}", joined(paths)));
        Ok(())
    }
}
