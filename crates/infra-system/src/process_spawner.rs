// Process spawner implementation on tokio::process
// reason: async-trait, tokio for async process management
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tracing::debug;

use forkexec_core::domain::SpawnSpec;
use forkexec_core::port::{ChildProcess, ExitOutcome, OutputStream, ProcessSpawner};

use crate::signal_name::signal_name;

/// Tokio process spawner
///
/// Children inherit the parent environment (extended by `SpawnSpec::env`),
/// get stdout/stderr pipes and a closed stdin, and are killed and reaped
/// when their handle is dropped.
#[derive(Debug, Default, Clone)]
pub struct TokioProcessSpawner;

impl TokioProcessSpawner {
    /// Create a new process spawner
    ///
    /// # Example
    /// ```ignore
    /// let coordinator = ExecutionCoordinator::new(Arc::new(TokioProcessSpawner::new()));
    /// ```
    pub fn new() -> Self {
        Self
    }

    fn command(spec: &SpawnSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(env) = &spec.env {
            cmd.envs(env);
        }
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }
}

impl ProcessSpawner for TokioProcessSpawner {
    fn spawn(&self, spec: &SpawnSpec) -> std::io::Result<Box<dyn ChildProcess>> {
        let child = Self::command(spec).spawn()?;

        debug!(
            program = %spec.program,
            args = ?spec.args,
            cwd = ?spec.cwd,
            pid = ?child.id(),
            "Spawned child process"
        );

        Ok(Box::new(TokioChild { child }))
    }
}

/// Running tokio child; `kill_on_drop` covers every exit path
struct TokioChild {
    child: Child,
}

#[async_trait]
impl ChildProcess for TokioChild {
    fn take_stdout(&mut self) -> Option<OutputStream> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as OutputStream)
    }

    fn take_stderr(&mut self) -> Option<OutputStream> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as OutputStream)
    }

    fn kill(&mut self) -> std::io::Result<()> {
        debug!(pid = ?self.child.id(), "Sending SIGKILL");
        self.child.start_kill()
    }

    async fn wait(&mut self) -> std::io::Result<ExitOutcome> {
        let status = self.child.wait().await?;
        Ok(exit_outcome(status))
    }
}

/// Translate an OS exit status into the port's exit notification
fn exit_outcome(status: ExitStatus) -> ExitOutcome {
    if let Some(code) = status.code() {
        return ExitOutcome::Exited(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(raw) = status.signal() {
            return ExitOutcome::Signaled(signal_name(raw));
        }
    }

    // Unreachable on supported platforms: no code means a signal on unix
    ExitOutcome::Signaled(signal_name(0))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use tokio::io::AsyncReadExt;

    fn spec(program: &str, args: &[&str]) -> SpawnSpec {
        SpawnSpec {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            env: None,
            cwd: None,
        }
    }

    #[test]
    fn test_exit_outcome_from_code() {
        assert_eq!(
            exit_outcome(ExitStatus::from_raw(2 << 8)),
            ExitOutcome::Exited(2)
        );
    }

    #[test]
    fn test_exit_outcome_from_signal() {
        assert_eq!(
            exit_outcome(ExitStatus::from_raw(9)),
            ExitOutcome::Signaled("SIGKILL".to_string())
        );
    }

    #[tokio::test]
    async fn test_spawn_reads_stdout_and_exits() {
        let spawner = TokioProcessSpawner::new();
        let mut child = spawner.spawn(&spec("echo", &["hello"])).unwrap();

        let mut stdout = child.take_stdout().unwrap();
        let mut out = String::new();
        stdout.read_to_string(&mut out).await.unwrap();

        assert_eq!(out, "hello\n");
        assert_eq!(child.wait().await.unwrap(), ExitOutcome::Exited(0));
        assert!(child.take_stdout().is_none());
    }

    #[tokio::test]
    async fn test_spawn_missing_program_fails() {
        let spawner = TokioProcessSpawner::new();
        let result = spawner.spawn(&spec("/nonexistent/forkexec-test-binary", &[]));

        assert_eq!(result.err().unwrap().kind(), std::io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_kill_reports_sigkill() {
        let spawner = TokioProcessSpawner::new();
        let mut child = spawner.spawn(&spec("sleep", &["10"])).unwrap();

        child.kill().unwrap();

        assert_eq!(
            child.wait().await.unwrap(),
            ExitOutcome::Signaled("SIGKILL".to_string())
        );
    }

    #[tokio::test]
    async fn test_env_and_cwd_are_applied() {
        let spawner = TokioProcessSpawner::new();
        let mut spec = spec("/bin/sh", &["-c", "echo $FORKEXEC_TEST_VAR; pwd"]);
        spec.env = Some([("FORKEXEC_TEST_VAR".to_string(), "xyz".to_string())].into());
        spec.cwd = Some("/".into());

        let mut child = spawner.spawn(&spec).unwrap();
        let mut out = String::new();
        child
            .take_stdout()
            .unwrap()
            .read_to_string(&mut out)
            .await
            .unwrap();

        assert_eq!(out, "xyz\n/\n");
        assert_eq!(child.wait().await.unwrap(), ExitOutcome::Exited(0));
    }
}
