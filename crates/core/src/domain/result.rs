// Invocation Result - the normalized outcome of one invocation

use serde::{Deserialize, Serialize};

use super::error::ExecError;

/// Which output stream of the child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamName {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamName::Stdout => write!(f, "stdout"),
            StreamName::Stderr => write!(f, "stderr"),
        }
    }
}

/// Result of one invocation, always fully populated
///
/// - `status` and `signal` are never both set
/// - `error` is `None` only for a clean exit with status 0, and otherwise
///   equals the error the caller receives from [`InvocationResult::into_outcome`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationResult {
    pub status: Option<i32>,
    pub signal: Option<String>,
    pub stdout: String,
    pub stderr: String,
    pub error: Option<ExecError>,
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Split into the `(error, result)` view: `Err` carries the same error as
    /// `self.error`, with status, signal and captured output attached
    pub fn into_outcome(self) -> std::result::Result<InvocationResult, ExecError> {
        match self.error.clone() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}
