//! External collaborators invoked by ichiryu rules.
//!
//! Publishing and sandboxed code execution sit behind the [`Publisher`] and
//! [`CodeExecutor`] traits. [`ExternalRunner`] bounds every call with a
//! timeout and always turns the result into exactly one reply line.

mod external_runner;
mod http_publisher;
mod reply_render;
mod sandbox_executor;

use async_trait::async_trait;
use thiserror::Error;

pub use external_runner::{ExternalRunner, ExternalRunnerSettings};
pub use http_publisher::{HttpPublisher, HttpPublisherConfig};
pub use reply_render::{
    render_execution_reply, render_execution_timeout_reply, render_publish_reply,
    MAX_EXECUTION_REPLY_CHARS,
};
pub use sandbox_executor::{SandboxExecutor, DEFAULT_CPU_LIMIT_MARKER};

#[derive(Debug, Error)]
/// Enumerates failures of external collaborators.
pub enum ExternalError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(String),
    #[error("service returned status {0}")]
    Status(u16),
    #[error("failed to run sandbox: {0}")]
    Sandbox(#[source] std::io::Error),
    #[error("timed out after {0} ms")]
    TimedOut(u64),
}

#[async_trait]
/// Posts text somewhere public and returns a link to it.
pub trait Publisher: Send + Sync {
    async fn publish(&self, text: &str) -> Result<String, ExternalError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Captured output of one sandboxed run. `exit_code` is `None` when the
/// process was killed or ended by a signal.
pub struct ExecutionOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub max_output_bytes: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_output_bytes: MAX_EXECUTION_REPLY_CHARS * 3,
        }
    }
}

#[async_trait]
/// Runs untrusted code and reports what it printed.
pub trait CodeExecutor: Send + Sync {
    async fn execute(
        &self,
        code: &str,
        limits: ExecutionLimits,
    ) -> Result<ExecutionOutput, ExternalError>;
}

/// Stand-in used when the settings file does not configure a collaborator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

#[async_trait]
impl Publisher for Unconfigured {
    async fn publish(&self, _text: &str) -> Result<String, ExternalError> {
        Err(ExternalError::NotConfigured("publishing"))
    }
}

#[async_trait]
impl CodeExecutor for Unconfigured {
    async fn execute(
        &self,
        _code: &str,
        _limits: ExecutionLimits,
    ) -> Result<ExecutionOutput, ExternalError> {
        Err(ExternalError::NotConfigured("code execution"))
    }
}
