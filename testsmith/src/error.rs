//! Typed error taxonomy for the external collaborators.
//!
//! Orchestration code uses `anyhow` throughout; these types exist so callers
//! can distinguish the fatal classes (configuration, sandbox provisioning)
//! from transient backend failures that the gateway retries internally.
//! Unexpected test outcomes are classifications, not errors, and never
//! appear here.

use thiserror::Error;

/// Failure of a generation backend call.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No credential configured. Raised at first use, never retried.
    #[error("DASHSCOPE_API_KEY is not set")]
    MissingCredential,
    /// Transport-level failure (connect, timeout, TLS). Retryable.
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Backend answered with a non-success status.
    #[error("backend returned status {status}: {body}")]
    Api { status: u16, body: String },
    /// Backend answered 2xx but the payload did not match the expected shape.
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),
}

impl GenerationError {
    /// Whether the gateway should retry this failure with backoff.
    ///
    /// Transport errors and rate-limit/server-side statuses are transient;
    /// missing credentials and malformed payloads are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Transport(_) => true,
            GenerationError::Api { status, .. } => *status == 429 || *status >= 500,
            GenerationError::MissingCredential | GenerationError::MalformedResponse(_) => false,
        }
    }
}

/// Failure to provision or invoke the execution sandbox.
///
/// Fatal: once provisioning fails, no subsequent classification can be
/// trusted. A failing *test run* is a normal result and never produces this.
#[derive(Debug, Error)]
#[error("sandbox error: {detail}")]
pub struct SandboxError {
    pub detail: String,
}

impl SandboxError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
