//! Render error taxonomy.
//!
//! - `RenderError::NotFound` is a control-flow signal, never logged as an error
//! - `LoadError` means a unit could not be loaded (shell failure when it happens
//!   before the first flush)
//! - `ShellFailure` is everything that went wrong before any byte was committed

use std::path::PathBuf;

use thiserror::Error;

/// A unit (page, layout, fallback) failed to load.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// No component is registered under this unit id.
    #[error("no component registered for unit '{0}'")]
    Unregistered(String),

    /// The unit file could not be read.
    #[error("failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// The unit file is malformed.
    #[error("invalid unit {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// Errors raised while rendering a component.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// The page asked for the not-found rendering path.
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Load(#[from] LoadError),

    /// A component failed while producing markup.
    #[error("component failed: {0}")]
    Component(String),
}

impl RenderError {
    pub fn component(message: impl Into<String>) -> Self {
        RenderError::Component(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RenderError::NotFound)
    }
}

/// The shell could not be produced; nothing has been sent yet.
#[derive(Debug, Clone, Error)]
pub enum ShellFailure {
    /// A component raised the not-found signal while building the shell.
    #[error("page signaled not-found")]
    NotFound,

    /// Unit loading or shell rendering failed.
    #[error("shell render failed: {0}")]
    Error(RenderError),
}

impl From<RenderError> for ShellFailure {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::NotFound => ShellFailure::NotFound,
            other => ShellFailure::Error(other),
        }
    }
}

impl From<LoadError> for ShellFailure {
    fn from(err: LoadError) -> Self {
        ShellFailure::Error(RenderError::Load(err))
    }
}
