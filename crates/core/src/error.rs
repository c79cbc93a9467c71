//! Error types for tool invocations.

use std::path::PathBuf;
use std::time::Duration;

/// Result type for engine, fetch and dispatch operations.
pub type FabricResult<T> = Result<T, FabricError>;

/// Everything that can go wrong while serving a tool call.
#[derive(Debug, thiserror::Error)]
pub enum FabricError {
    /// A required argument was missing, empty, or malformed.
    #[error("{0}")]
    Validation(String),

    /// The executable could not be started.
    #[error("Failed to spawn {command}: {message} ({kind:?})")]
    Spawn {
        command: String,
        kind: std::io::ErrorKind,
        errno: Option<i32>,
        syscall: &'static str,
        message: String,
    },

    /// The process outlived its deadline and was killed.
    #[error("{command} timed out after {}ms", .after.as_millis())]
    Timeout {
        command: String,
        after: Duration,
        partial_stdout: String,
    },

    /// The process ran but exited with a failure status.
    #[error("{command} exited with code {}: {stderr}", display_code(.code))]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stderr: String,
        stdout: String,
    },

    /// A referenced local file does not exist.
    #[error("File not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// Reading a local file failed for a reason other than absence.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote server answered with a non-success, non-redirect status.
    #[error("HTTP {status} {reason} fetching {url}")]
    HttpStatus {
        url: String,
        status: u16,
        reason: String,
    },

    /// Transport-level failure while fetching a URL.
    #[error("Network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The redirect chain exceeded the configured hop limit.
    #[error("Too many redirects fetching {url} (limit {limit})")]
    TooManyRedirects { url: String, limit: usize },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

impl FabricError {
    /// Build a spawn failure from the OS error returned by `spawn`/`wait`.
    pub fn spawn(command: impl Into<String>, syscall: &'static str, err: &std::io::Error) -> Self {
        Self::Spawn {
            command: command.into(),
            kind: err.kind(),
            errno: err.raw_os_error(),
            syscall,
            message: err.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Short stable name of the error kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Spawn { .. } => "spawn",
            Self::Timeout { .. } => "timeout",
            Self::NonZeroExit { .. } => "non_zero_exit",
            Self::NotFound { .. } => "not_found",
            Self::Io { .. } => "io",
            Self::HttpStatus { .. } => "http_status",
            Self::Network { .. } => "network",
            Self::TooManyRedirects { .. } => "too_many_redirects",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::UnknownTool(_) => "unknown_tool",
        }
    }
}
