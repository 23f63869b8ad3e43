// SPDX-License-Identifier: MIT
// Unified error types for Druckport.
//
// Each variant corresponds to one failure category of the intake pipeline,
// and the server maps categories to HTTP status codes. Inspection failures
// are internal only — the pipeline degrades to an unknown page count rather
// than surfacing them to the caller.

use thiserror::Error;

/// Top-level error type for all Druckport operations.
#[derive(Debug, Error)]
pub enum DruckportError {
    // -- Client-fault errors (4xx) --
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMedia(String),

    // -- Pipeline errors (5xx) --
    #[error("workspace error: {0}")]
    Workspace(String),

    #[error("document inspection failed: {0}")]
    Inspection(String),

    #[error("spooler process failed: {0}")]
    Process(String),

    #[error("spooler timed out after {0}s")]
    Timeout(u64),

    // -- Storage / plumbing --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DruckportError {
    /// Convenience constructor for validation failures.
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DruckportError>;
