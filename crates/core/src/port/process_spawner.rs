// Process Spawner Port
// Abstraction over OS process creation, stream handles, kill and exit notification
use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::domain::SpawnSpec;

/// Readable handle for one of the child's output streams
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// How the child terminated, as reported by the OS
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Normal exit with a status code
    Exited(i32),
    /// Terminated by the named signal (e.g. "SIGTERM")
    Signaled(String),
}

/// A running child process
///
/// Implementations must release the OS process when dropped (kill + reap),
/// whatever state the invocation ended in.
#[async_trait]
pub trait ChildProcess: Send {
    /// Take the stdout handle; `None` once taken
    fn take_stdout(&mut self) -> Option<OutputStream>;

    /// Take the stderr handle; `None` once taken
    fn take_stderr(&mut self) -> Option<OutputStream>;

    /// Send a forceful termination signal without waiting for the exit
    ///
    /// # Errors
    /// Returns the OS error if the signal could not be delivered
    fn kill(&mut self) -> std::io::Result<()>;

    /// Wait for the process to terminate
    ///
    /// Must be cancel safe: the coordinator polls it inside `tokio::select!`
    /// and re-creates the future after each watchdog action.
    async fn wait(&mut self) -> std::io::Result<ExitOutcome>;
}

/// Process spawner port
///
/// Implementations:
/// - TokioProcessSpawner (infra-system): real OS processes
/// - mocks::ScriptedSpawner: scripted children for coordinator tests
pub trait ProcessSpawner: Send + Sync {
    /// Start a process with stdout/stderr piped and stdin closed
    ///
    /// # Errors
    /// The OS-provided reason when the process could not be created at all
    fn spawn(&self, spec: &SpawnSpec) -> std::io::Result<Box<dyn ChildProcess>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, ReadBuf};
    use tokio::time::Instant;

    /// Script for every child the mock spawner creates
    #[derive(Debug, Clone)]
    pub struct ChildScript {
        /// Fail the spawn itself with this OS error kind
        pub spawn_error: Option<std::io::ErrorKind>,
        /// Fail `wait` with this OS error kind
        pub wait_error: Option<std::io::ErrorKind>,
        pub stdout: Vec<u8>,
        pub stderr: Vec<u8>,
        /// How long the child "runs" before exiting on its own
        pub run_for: Duration,
        /// Reported when the child exits on its own
        pub exit: ExitOutcome,
        /// Reported once the child has been killed
        pub on_kill: ExitOutcome,
        /// Streams never reach end-of-stream after their scripted output,
        /// as when a descendant of the child still holds the pipes
        pub hold_streams_open: bool,
    }

    impl Default for ChildScript {
        fn default() -> Self {
            Self {
                spawn_error: None,
                wait_error: None,
                stdout: Vec::new(),
                stderr: Vec::new(),
                run_for: Duration::ZERO,
                exit: ExitOutcome::Exited(0),
                on_kill: ExitOutcome::Signaled("SIGKILL".to_string()),
                hold_streams_open: false,
            }
        }
    }

    impl ChildScript {
        pub fn exits(code: i32) -> Self {
            Self {
                exit: ExitOutcome::Exited(code),
                ..Default::default()
            }
        }

        pub fn signaled(name: &str) -> Self {
            Self {
                exit: ExitOutcome::Signaled(name.to_string()),
                ..Default::default()
            }
        }

        pub fn stdout(mut self, bytes: impl Into<Vec<u8>>) -> Self {
            self.stdout = bytes.into();
            self
        }

        pub fn stderr(mut self, bytes: impl Into<Vec<u8>>) -> Self {
            self.stderr = bytes.into();
            self
        }

        pub fn run_for(mut self, duration: Duration) -> Self {
            self.run_for = duration;
            self
        }

        pub fn on_kill(mut self, outcome: ExitOutcome) -> Self {
            self.on_kill = outcome;
            self
        }

        pub fn holds_streams_open(mut self) -> Self {
            self.hold_streams_open = true;
            self
        }

        fn stream(&self, bytes: &[u8]) -> OutputStream {
            let scripted = Cursor::new(bytes.to_vec());
            if self.hold_streams_open {
                Box::new(scripted.chain(HeldOpen))
            } else {
                Box::new(scripted)
            }
        }
    }

    /// Reader that never yields data nor end-of-stream
    struct HeldOpen;

    impl AsyncRead for HeldOpen {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Pending
        }
    }

    /// Mock spawner that hands out scripted children
    pub struct ScriptedSpawner {
        script: ChildScript,
        spawned: Arc<Mutex<Vec<SpawnSpec>>>,
        kill_count: Arc<AtomicUsize>,
    }

    impl ScriptedSpawner {
        pub fn new(script: ChildScript) -> Self {
            Self {
                script,
                spawned: Arc::new(Mutex::new(Vec::new())),
                kill_count: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Specs of every spawn attempt, in order
        pub fn spawned(&self) -> Vec<SpawnSpec> {
            self.spawned.lock().unwrap().clone()
        }

        /// Number of kill signals sent across all children
        pub fn kill_count(&self) -> usize {
            self.kill_count.load(Ordering::SeqCst)
        }
    }

    impl ProcessSpawner for ScriptedSpawner {
        fn spawn(&self, spec: &SpawnSpec) -> std::io::Result<Box<dyn ChildProcess>> {
            self.spawned.lock().unwrap().push(spec.clone());

            if let Some(kind) = self.script.spawn_error {
                return Err(std::io::Error::from(kind));
            }

            Ok(Box::new(ScriptedChild {
                stdout: Some(self.script.stream(&self.script.stdout)),
                stderr: Some(self.script.stream(&self.script.stderr)),
                exits_at: Instant::now() + self.script.run_for,
                script: self.script.clone(),
                killed: false,
                kill_count: self.kill_count.clone(),
            }))
        }
    }

    struct ScriptedChild {
        stdout: Option<OutputStream>,
        stderr: Option<OutputStream>,
        exits_at: Instant,
        script: ChildScript,
        killed: bool,
        kill_count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ChildProcess for ScriptedChild {
        fn take_stdout(&mut self) -> Option<OutputStream> {
            self.stdout.take()
        }

        fn take_stderr(&mut self) -> Option<OutputStream> {
            self.stderr.take()
        }

        fn kill(&mut self) -> std::io::Result<()> {
            self.killed = true;
            self.kill_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn wait(&mut self) -> std::io::Result<ExitOutcome> {
            if let Some(kind) = self.script.wait_error {
                return Err(std::io::Error::from(kind));
            }
            if self.killed {
                return Ok(self.script.on_kill.clone());
            }
            tokio::time::sleep_until(self.exits_at).await;
            Ok(self.script.exit.clone())
        }
    }
}
