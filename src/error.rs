//! Error types for the uigen generator

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Planning error: {message}")]
    Planning { message: String },

    #[error("Generation of '{unit}' (group: {group}) failed after {attempts} attempt(s): {source}\n  description: {description}")]
    Generation {
        unit: String,
        group: String,
        description: String,
        attempts: u32,
        #[source]
        source: InvocationError,
    },

    #[error("Registry error: {message}")]
    Registry { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },
}

pub type Result<T> = std::result::Result<T, GeneratorError>;

impl GeneratorError {
    pub fn planning(message: impl Into<String>) -> Self {
        Self::Planning {
            message: message.into(),
        }
    }

    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry {
            message: message.into(),
        }
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Attempts made before a generation error was raised, if this is one
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Generation { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

/// A single failed call to a generation backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvocationError {
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("rate limited: {message}")]
    RateLimited { message: String },

    #[error("request aborted: {message}")]
    Aborted { message: String },

    #[error("backend unavailable: {message}")]
    Unavailable { message: String },

    #[error("all backends failed: {}", .failures.join("; "))]
    AllBackendsFailed { failures: Vec<String> },

    #[error("{message}")]
    Terminal { message: String },

    #[error("{message} ({guidance})")]
    Hosted { message: String, guidance: String },
}

impl InvocationError {
    pub fn terminal(message: impl Into<String>) -> Self {
        Self::Terminal {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    /// Rate limits, timeouts, aborts and exhausted fallback chains are worth retrying.
    /// Everything else (bad credentials, malformed requests, hosted failures) is terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::RateLimited { .. }
                | Self::Aborted { .. }
                | Self::Unavailable { .. }
                | Self::AllBackendsFailed { .. }
        )
    }
}

/// Final outcome of a failed invocation, with the number of attempts spent
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationFailure {
    pub error: InvocationError,
    pub attempts: u32,
}

impl fmt::Display for InvocationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (after {} attempt(s))", self.error, self.attempts)
    }
}

impl std::error::Error for InvocationFailure {}
