//! Error types for semvx-core
//!
//! Each engine module owns its error enum next to the code that raises it
//! ([`GitError`](crate::git::GitError), [`ParseError`](crate::formats::ParseError),
//! [`VersionError`](crate::version::VersionError),
//! [`SyncError`](crate::sync::SyncError), [`BuildError`](crate::build::BuildError)).
//! Configuration errors live here.

use thiserror::Error;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;
