// Spawn Spec - the concrete process invocation handed to the OS layer

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Program + arguments + environment, exactly as passed to the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Option<HashMap<String, String>>,
    pub cwd: Option<PathBuf>,
}

impl SpawnSpec {
    /// Canonical rendering used as the prefix of every error message:
    /// `exec "<program>" "<arg1>" ...`, tokens double-quoted in invocation order
    pub fn display_form(&self) -> String {
        let mut out = String::from("exec");
        for token in std::iter::once(&self.program).chain(self.args.iter()) {
            let _ = write!(out, " \"{}\"", token);
        }
        out
    }
}
