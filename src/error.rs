//! Error types for environment construction and the step protocol.
//!
//! Geometry never produces errors: degenerate segments and cars sitting
//! exactly on a wall resolve to defined fallback values instead.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for environment operations.
pub type EnvResult<T> = Result<T, EnvError>;

/// Errors that can occur while configuring or driving an environment.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Track id is not in the registry.
    #[error("unknown track id: {0}")]
    UnknownTrack(String),

    /// Configuration values are out of range or inconsistent.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Config file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for `EnvConfig`.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// `step` was called before `reset`, or after the episode ended.
    #[error("step called without an active episode; call reset first")]
    NotReset,

    /// Action has the wrong arity or a non-finite element.
    #[error("invalid action: {0}")]
    InvalidAction(String),
}

impl EnvError {
    /// Create an unknown track error.
    #[must_use]
    pub fn unknown_track(id: impl Into<String>) -> Self {
        Self::UnknownTrack(id.into())
    }

    /// Create an invalid config error.
    #[must_use]
    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig(details.into())
    }

    /// Create an invalid action error.
    #[must_use]
    pub fn invalid_action(details: impl Into<String>) -> Self {
        Self::InvalidAction(details.into())
    }

    /// True for errors caused by calling the step protocol incorrectly.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::NotReset | Self::InvalidAction(_))
    }
}
