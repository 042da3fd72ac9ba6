// Execution Coordinator - owns the full lifecycle of one invocation

pub mod constants;
mod accumulator;
mod reduction;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::domain::{InvocationRequest, InvocationResult, StreamName};
use crate::error::{AppError, Result};
use crate::port::{ChildProcess, OutputStream, ProcessSpawner};
use accumulator::{drain, StreamCapture};
use reduction::{Observation, Termination};

/// Per-invocation lifecycle; watchdog kills are actions, not states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Created,
    Spawning,
    Running,
    Draining,
    Terminated,
}

impl std::fmt::Display for InvocationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvocationState::Created => write!(f, "CREATED"),
            InvocationState::Spawning => write!(f, "SPAWNING"),
            InvocationState::Running => write!(f, "RUNNING"),
            InvocationState::Draining => write!(f, "DRAINING"),
            InvocationState::Terminated => write!(f, "TERMINATED"),
        }
    }
}

/// Watchdog firings observed while RUNNING
#[derive(Debug, Default)]
struct Watchdogs {
    overflow: Option<StreamName>,
    timed_out: bool,
}

/// Runs invocations against a [`ProcessSpawner`]
///
/// Invocations share no state; one coordinator can run any number of them
/// concurrently.
#[derive(Clone)]
pub struct ExecutionCoordinator {
    spawner: Arc<dyn ProcessSpawner>,
}

impl ExecutionCoordinator {
    pub fn new(spawner: Arc<dyn ProcessSpawner>) -> Self {
        Self { spawner }
    }

    /// Run one invocation to completion
    ///
    /// Resolves once the process has terminated and both output streams have
    /// been drained. Returns `Err` only when the request fails validation, in
    /// which case nothing is spawned; every run outcome is an `Ok` result
    /// whose `error` field describes any failure.
    ///
    /// # Example
    /// ```text
    /// let coordinator = ExecutionCoordinator::new(Arc::new(TokioProcessSpawner::new()));
    /// let result = coordinator
    ///     .execute(InvocationRequest::argv(["echo", "hello", "world"]))
    ///     .await?;
    /// assert_eq!(result.stdout, "hello world\n");
    /// ```
    pub async fn execute(&self, request: InvocationRequest) -> Result<InvocationResult> {
        request.validate()?;
        Ok(run_invocation(self.spawner.as_ref(), &request).await)
    }

    /// Run one invocation on the tokio runtime and deliver the result once
    /// over a oneshot channel
    ///
    /// Validation happens before this returns. Must be called from within a
    /// tokio runtime.
    pub fn spawn_execute(
        &self,
        request: InvocationRequest,
    ) -> Result<oneshot::Receiver<InvocationResult>> {
        request.validate()?;

        let (tx, rx) = oneshot::channel();
        let spawner = self.spawner.clone();
        tokio::spawn(async move {
            let result = run_invocation(spawner.as_ref(), &request).await;
            if tx.send(result).is_err() {
                debug!("Invocation receiver dropped before completion");
            }
        });

        Ok(rx)
    }
}

/// Await a result delivered by [`ExecutionCoordinator::spawn_execute`]
pub async fn recv_result(rx: oneshot::Receiver<InvocationResult>) -> Result<InvocationResult> {
    rx.await
        .map_err(|_| AppError::Internal("invocation task ended without a result".to_string()))
}

async fn run_invocation(spawner: &dyn ProcessSpawner, request: &InvocationRequest) -> InvocationResult {
    let spec = request.spawn_spec();
    let cmd_display = spec.display_form();
    let mut state = InvocationState::Created;

    advance(&mut state, InvocationState::Spawning, &cmd_display);
    let mut child = match spawner.spawn(&spec) {
        Ok(child) => child,
        Err(e) => {
            debug!(command = %cmd_display, error = %e, "Spawn failed");
            advance(&mut state, InvocationState::Terminated, &cmd_display);
            return Observation::spawn_failed(e.to_string()).reduce(&cmd_display);
        }
    };
    advance(&mut state, InvocationState::Running, &cmd_display);

    let cap = request.max_buffer_bytes;
    let (overflow_tx, mut overflow_rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = watch::channel(false);
    let stdout_task = spawn_drain(
        child.take_stdout(),
        StreamName::Stdout,
        cap,
        &overflow_tx,
        &stop_rx,
    );
    let stderr_task = spawn_drain(
        child.take_stderr(),
        StreamName::Stderr,
        cap,
        &overflow_tx,
        &stop_rx,
    );
    drop(overflow_tx);

    let deadline = request
        .timeout_millis
        .map(|ms| Instant::now() + Duration::from_millis(ms));
    let mut watchdogs = Watchdogs::default();

    // The timer lives only inside this loop, so it is disarmed as soon as
    // the process terminates.
    let exit = loop {
        tokio::select! {
            exit = child.wait() => break exit,
            Some(stream) = overflow_rx.recv(), if watchdogs.overflow.is_none() => {
                debug!(command = %cmd_display, stream = %stream, "maxBuffer watchdog fired; killing process");
                watchdogs.overflow = Some(stream);
                kill(child.as_mut(), &cmd_display);
            }
            _ = timeout_elapsed(deadline), if !watchdogs.timed_out => {
                debug!(command = %cmd_display, timeout_ms = ?request.timeout_millis, "Timeout watchdog fired; killing process");
                watchdogs.timed_out = true;
                kill(child.as_mut(), &cmd_display);
            }
        }
    };

    if let Err(e) = &exit {
        debug!(command = %cmd_display, error = %e, "Wait failed; killing process");
        kill(child.as_mut(), &cmd_display);
    }

    // Once the process was killed its streams are abandoned rather than read
    // to end-of-stream, which a surviving descendant may never produce.
    let killed = exit.is_err() || watchdogs.overflow.is_some() || watchdogs.timed_out;
    if killed {
        // Fails only when both drains already finished
        let _ = stop_tx.send(true);
    }

    advance(&mut state, InvocationState::Draining, &cmd_display);
    let stdout = join_drain(stdout_task, StreamName::Stdout).await;
    let stderr = join_drain(stderr_task, StreamName::Stderr).await;

    // A fast process can exit before its overflow is observed; the drains
    // have all reported by now.
    if watchdogs.overflow.is_none() {
        watchdogs.overflow = overflow_rx.try_recv().ok();
    }

    advance(&mut state, InvocationState::Terminated, &cmd_display);
    let termination = match exit {
        Ok(outcome) => Termination::Exited(outcome),
        Err(e) => Termination::WaitFailed(e.to_string()),
    };

    let result = Observation {
        termination,
        overflow: watchdogs.overflow,
        timed_out: watchdogs.timed_out,
        stdout: stdout.bytes,
        stderr: stderr.bytes,
    }
    .reduce(&cmd_display);

    debug!(
        command = %cmd_display,
        status = ?result.status,
        signal = ?result.signal,
        success = result.is_success(),
        "Invocation completed"
    );

    result
}

fn advance(state: &mut InvocationState, next: InvocationState, cmd_display: &str) {
    trace!(command = %cmd_display, from = %state, to = %next, "Invocation state transition");
    *state = next;
}

fn spawn_drain(
    stream: Option<OutputStream>,
    name: StreamName,
    cap: Option<usize>,
    overflow_tx: &mpsc::UnboundedSender<StreamName>,
    stop: &watch::Receiver<bool>,
) -> Option<JoinHandle<StreamCapture>> {
    let overflow_tx = overflow_tx.clone();
    let stop = stop.clone();
    stream.map(|reader| tokio::spawn(drain(reader, name, cap, overflow_tx, stop)))
}

async fn join_drain(task: Option<JoinHandle<StreamCapture>>, name: StreamName) -> StreamCapture {
    match task {
        Some(handle) => handle.await.unwrap_or_else(|e| {
            debug!(stream = %name, error = %e, "Drain task failed; output lost");
            StreamCapture::default()
        }),
        None => StreamCapture::default(),
    }
}

async fn timeout_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn kill(child: &mut dyn ChildProcess, cmd_display: &str) {
    // Fails when the process already exited; its wait() reports that next
    if let Err(e) = child.kill() {
        debug!(command = %cmd_display, error = %e, "Kill failed");
    }
}
