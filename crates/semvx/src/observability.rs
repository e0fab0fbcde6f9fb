//! Structured logging.
//!
//! Log records are written as JSON lines to a daily-rotated file. stdout is
//! reserved for command output (including `--json` documents), so nothing
//! here ever writes to it. When no log directory is usable, records go to
//! stderr instead.
//!
//! The log file location is chosen in this order:
//!
//! 1. `SEMVX_LOG_PATH` (a full file path)
//! 2. `SEMVX_LOG_DIR`
//! 3. `log_dir` from configuration
//! 4. the platform data directory (`~/.local/share/semvx/logs` on Linux)
//! 5. the system temp directory
//!
//! The repository being operated on is never a candidate: a log file there
//! would dirty the working tree and trip the sync guards.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::OpenOptions;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const ENV_LOG_PATH: &str = "SEMVX_LOG_PATH";
const ENV_LOG_DIR: &str = "SEMVX_LOG_DIR";
const LOG_FILE_SUFFIX: &str = ".jsonl";

/// Where logs should go, before any filesystem checks.
#[derive(Clone, Debug)]
pub struct LogSettings {
    /// Service name; also the log file stem.
    pub service: String,
    /// `log_dir` from configuration.
    pub config_dir: Option<Utf8PathBuf>,
    path_override: Option<Utf8PathBuf>,
    dir_override: Option<Utf8PathBuf>,
}

impl LogSettings {
    /// Read the `SEMVX_LOG_*` variables, layered over `config_dir`.
    pub fn from_env(config_dir: Option<Utf8PathBuf>) -> Self {
        let var = |name| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .map(Utf8PathBuf::from)
        };
        Self {
            service: env!("CARGO_PKG_NAME").to_string(),
            config_dir,
            path_override: var(ENV_LOG_PATH),
            dir_override: var(ENV_LOG_DIR),
        }
    }

    fn file_name(&self) -> String {
        format!("{}{LOG_FILE_SUFFIX}", self.service)
    }

    /// The first usable log file location, as `(dir, file_name)`.
    fn target(&self) -> Result<(Utf8PathBuf, String)> {
        if let Some(ref path) = self.path_override {
            let file_name = path
                .file_name()
                .with_context(|| format!("{ENV_LOG_PATH} must include a file name"))?
                .to_string();
            let dir = path
                .parent()
                .filter(|p| !p.as_str().is_empty())
                .unwrap_or_else(|| Utf8Path::new("."));
            ensure_writable(dir, &file_name)?;
            return Ok((dir.to_path_buf(), file_name));
        }

        let file_name = self.file_name();
        if let Some(dir) = self.dir_override.as_ref().or(self.config_dir.as_ref()) {
            ensure_writable(dir, &file_name)?;
            return Ok((dir.clone(), file_name));
        }

        let data_dir = directories::ProjectDirs::from("", "", &self.service)
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.data_local_dir().join("logs")).ok());
        let temp_dir = Utf8PathBuf::from_path_buf(std::env::temp_dir())
            .ok()
            .map(|dir| dir.join(&self.service));

        data_dir
            .into_iter()
            .chain(temp_dir)
            .find(|dir| ensure_writable(dir, &file_name).is_ok())
            .map(|dir| (dir, file_name))
            .context("no writable log directory found")
    }
}

/// Keeps the background log writer alive; drop it last.
pub struct LogGuard {
    _worker: WorkerGuard,
}

/// Install the global subscriber.
pub fn init(settings: &LogSettings, filter: EnvFilter) -> Result<LogGuard> {
    let (writer, worker) = match settings.target() {
        Ok((dir, file_name)) => file_writer(&dir, &file_name),
        Err(err) => {
            eprintln!("warning: {err:#}; logging to stderr");
            tracing_appender::non_blocking(std::io::stderr())
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_ansi(false)
                .with_writer(writer),
        )
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    tracing::debug!(service = %settings.service, "logging initialized");
    Ok(LogGuard { _worker: worker })
}

fn file_writer(dir: &Utf8Path, file_name: &str) -> (NonBlocking, WorkerGuard) {
    let appender = tracing_appender::rolling::daily(dir, file_name);
    tracing_appender::non_blocking(appender)
}

/// Build an `EnvFilter` from CLI flags and environment.
///
/// Priority: `--quiet` > `--verbose` > `RUST_LOG` > `default_level`.
pub fn env_filter(quiet: bool, verbose: u8, default_level: &str) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }

    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

fn ensure_writable(dir: &Utf8Path, file_name: &str) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {dir}"))?;
    let path = dir.join(file_name);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {path}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_dir() -> (TempDir, Utf8PathBuf) {
        let tmp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        (tmp, dir)
    }

    fn settings(
        path: Option<Utf8PathBuf>,
        dir: Option<Utf8PathBuf>,
        config: Option<Utf8PathBuf>,
    ) -> LogSettings {
        LogSettings {
            service: "demo".into(),
            config_dir: config,
            path_override: path,
            dir_override: dir,
        }
    }

    #[test]
    fn quiet_beats_verbose() {
        assert_eq!(env_filter(true, 2, "info").to_string(), "error");
    }

    #[test]
    fn verbose_levels() {
        assert_eq!(env_filter(false, 1, "info").to_string(), "debug");
        assert_eq!(env_filter(false, 3, "info").to_string(), "trace");
    }

    #[test]
    fn path_override_wins() {
        let (_tmp, dir) = temp_dir();
        let other = dir.join("other");
        let s = settings(Some(dir.join("custom.jsonl")), Some(other.clone()), Some(other));
        let (target_dir, file_name) = s.target().unwrap();
        assert_eq!(target_dir, dir);
        assert_eq!(file_name, "custom.jsonl");
    }

    #[test]
    fn dir_override_beats_config() {
        let (_tmp, dir) = temp_dir();
        let s = settings(None, Some(dir.join("env")), Some(dir.join("config")));
        let (target_dir, file_name) = s.target().unwrap();
        assert_eq!(target_dir, dir.join("env"));
        assert_eq!(file_name, "demo.jsonl");
        assert!(dir.join("env/demo.jsonl").exists());
    }

    #[test]
    fn config_dir_is_used() {
        let (_tmp, dir) = temp_dir();
        let s = settings(None, None, Some(dir.clone()));
        assert_eq!(s.target().unwrap().0, dir);
    }

    #[test]
    fn unwritable_dir_is_an_error() {
        let (_tmp, dir) = temp_dir();
        let blocker = dir.join("file");
        std::fs::write(&blocker, "").unwrap();
        let s = settings(None, Some(blocker.join("logs")), None);
        assert!(s.target().is_err());
    }
}
