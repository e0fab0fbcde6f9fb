//! Configuration loading and discovery.
//!
//! This module provides configuration file discovery by:
//! 1. Walking up from the current directory to find project config
//! 2. Loading user config from XDG config directory
//! 3. Applying `SEMVX_`-prefixed environment overrides
//! 4. Merging with sensible defaults
//!
//! # Supported formats
//!
//! The following configuration file formats are supported:
//! - TOML (`.toml`)
//! - YAML (`.yaml`, `.yml`)
//! - JSON (`.json`)
//!
//! # Config file locations (in order of precedence, highest first):
//! - `SEMVX_*` environment variables (`__` separates nested keys,
//!   e.g. `SEMVX_SYNC__TAG_PREFIX=release-`)
//! - `.semvx.<ext>` in current directory or any parent
//! - `semvx.<ext>` in current directory or any parent
//! - `~/.config/semvx/config.<ext>` (user config)
//!
//! Where `<ext>` is one of: `toml`, `yaml`, `yml`, `json`
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use semvx_core::config::{Config, ConfigLoader};
//!
//! let cwd = std::env::current_dir().unwrap();
//! let cwd = Utf8PathBuf::try_from(cwd).expect("current directory is not valid UTF-8");
//! let config = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! println!("tags look like {}1.2.3", config.sync.tag_prefix);
//! ```

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// The configuration for semvx.
///
/// Loaded once per invocation and passed by reference into detection,
/// state inspection and sync. Nothing in the engine reads configuration from
/// anywhere else.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Sync guards and tagging.
    pub sync: SyncConfig,
    /// Source detection.
    pub detect: DetectConfig,
    /// Version selection overrides.
    pub version: VersionConfig,
}

/// Sync behavior: guards, tag naming and git subprocess limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    /// Branches on which mutating operations are allowed.
    pub protected_branches: Vec<String>,
    /// Prefix for release tags (`v` gives `v1.2.3`).
    pub tag_prefix: String,
    /// Upper bound for any single git call, in seconds.
    pub git_timeout_secs: u64,
    /// Fold version-file writes into the last commit before tagging.
    pub amend: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            protected_branches: vec!["main".into(), "master".into()],
            tag_prefix: "v".into(),
            git_timeout_secs: 10,
            amend: false,
        }
    }
}

impl SyncConfig {
    /// The git timeout as a [`Duration`].
    pub const fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }
}

/// Source detection limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DetectConfig {
    /// How many directory levels below the root are scanned for manifests.
    pub max_depth: usize,
    /// Directory names never descended into.
    pub ignore: Vec<String>,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            ignore: DEFAULT_IGNORE.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

const DEFAULT_IGNORE: &[&str] = &[
    "node_modules",
    "target",
    ".venv",
    "venv",
    "__pycache__",
    "build",
    "dist",
    ".tox",
    ".pytest_cache",
    "coverage",
    ".next",
    ".nuxt",
];

/// Version selection overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct VersionConfig {
    /// Pin the target version, bypassing highest-wins resolution.
    pub manual: Option<String>,
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "semvx";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "SEMVX_";

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Starting directory for project config search.
    project_search_root: Option<Utf8PathBuf>,
    /// Whether to include user config from XDG directory.
    include_user_config: bool,
    /// Whether to apply `SEMVX_*` environment overrides.
    include_env: bool,
    /// Stop searching when we hit a directory containing this file/dir.
    boundary_marker: Option<String>,
    /// Explicit config files to load (for testing or programmatic use).
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default settings.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            include_env: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Set the starting directory for project config search.
    ///
    /// The loader will walk up from this directory looking for config files.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/semvx/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Set whether `SEMVX_*` environment variables override file values.
    pub const fn with_env(mut self, include: bool) -> Self {
        self.include_env = include;
        self
    }

    /// Set a boundary marker to stop directory traversal.
    ///
    /// When walking up directories, stop if we find a directory containing
    /// this file or directory name. Default is `.git`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Disable boundary marker (search all the way to filesystem root).
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file to load.
    ///
    /// Files are loaded in order, with later files taking precedence.
    /// Explicit files are loaded after discovered files.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration, merging all discovered sources.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment (`SEMVX_*`)
    /// 2. Explicit files (in order added via `with_file`)
    /// 3. Project config (closest to search root)
    /// 4. User config (`~/.config/semvx/config.<ext>`)
    /// 5. Default values
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        tracing::debug!("loading configuration");
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if self.include_user_config
            && let Some(user_config) = self.find_user_config()
        {
            figment = Self::merge_file(figment, &user_config);
        }

        if let Some(ref root) = self.project_search_root
            && let Some(project_config) = self.find_project_config(root)
        {
            figment = Self::merge_file(figment, &project_config);
        }

        for file in &self.explicit_files {
            figment = Self::merge_file(figment, file);
        }

        if self.include_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            tag_prefix = %config.sync.tag_prefix,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Find project config by walking up from the given directory.
    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            for ext in CONFIG_EXTENSIONS {
                let dotfile = dir.join(format!(".{APP_NAME}.{ext}"));
                if dotfile.is_file() {
                    return Some(dotfile);
                }

                let regular = dir.join(format!("{APP_NAME}.{ext}"));
                if regular.is_file() {
                    return Some(regular);
                }
            }

            // the marker directory is the last one searched
            if let Some(ref marker) = self.boundary_marker
                && dir.join(marker).exists()
            {
                break;
            }

            current = dir.parent().map(Utf8Path::to_path_buf);
        }

        None
    }

    /// Find user config in XDG config directory.
    fn find_user_config(&self) -> Option<Utf8PathBuf> {
        let config_dir = user_config_dir()?;
        CONFIG_EXTENSIONS
            .iter()
            .map(|ext| config_dir.join(format!("config.{ext}")))
            .find(|path| path.is_file())
    }

    /// Merge a config file into the figment, detecting format from extension.
    fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
        match path.extension() {
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
            Some("json") => figment.merge(Json::file_exact(path.as_str())),
            _ => figment.merge(Toml::file_exact(path.as_str())),
        }
    }
}

/// Find the project config file path without loading it.
///
/// Useful for commands that report where config was loaded from.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new()
        .with_project_search(start.as_ref())
        .find_project_config(start.as_ref())
}

/// Get the user config directory path.
///
/// Returns `~/.config/semvx/` on Linux, `~/Library/Application Support/semvx/`
/// on macOS, and equivalent on other platforms.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("", "", APP_NAME)?;
    Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf()).ok()
}
