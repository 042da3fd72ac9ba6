// Domain Error Types

use serde::Serialize;
use thiserror::Error;

use super::result::StreamName;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;

/// Why an invocation did not end in a clean zero exit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecErrorKind {
    /// The OS refused to create the process
    Spawn,
    /// The process was created but waiting for its exit failed
    Wait,
    /// A stream exceeded `max_buffer_bytes` and the process was killed
    BufferOverflow { stream: StreamName },
    /// `timeout_millis` elapsed and the process was killed
    Timeout,
    /// Terminated by a signal no watchdog sent
    Signaled,
    /// Exited normally with a status other than zero
    NonZeroExit,
}

/// Normalized invocation failure
///
/// Carries the same status, signal and captured output as the
/// `InvocationResult` it is attached to, so the error alone is enough to
/// diagnose the failure.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{message}")]
pub struct ExecError {
    kind: ExecErrorKind,
    message: String,
    #[serde(skip)]
    status: Option<i32>,
    #[serde(skip)]
    signal: Option<String>,
    #[serde(skip)]
    stdout: String,
    #[serde(skip)]
    stderr: String,
}

impl ExecError {
    pub(crate) fn new(
        kind: ExecErrorKind,
        message: String,
        status: Option<i32>,
        signal: Option<String>,
        stdout: String,
        stderr: String,
    ) -> Self {
        Self {
            kind,
            message,
            status,
            signal,
            stdout,
            stderr,
        }
    }

    pub fn kind(&self) -> &ExecErrorKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<i32> {
        self.status
    }

    pub fn signal(&self) -> Option<&str> {
        self.signal.as_deref()
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}
