// Termination reduction - one precedence-ordered step from observations to a result

use super::constants::TIMEOUT_KILL_SIGNAL;
use crate::domain::{ExecError, ExecErrorKind, InvocationResult, StreamName};
use crate::port::ExitOutcome;

/// How the process left the RUNNING state
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Termination {
    SpawnFailed(String),
    WaitFailed(String),
    Exited(ExitOutcome),
}

/// Everything the coordinator saw for one invocation, joined
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Observation {
    pub termination: Termination,
    /// First stream that overflowed, if any
    pub overflow: Option<StreamName>,
    pub timed_out: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Selected cause, in precedence order (earlier wins)
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Cause {
    SpawnFailed(String),
    WaitFailed(String),
    BufferOverflow {
        stream: StreamName,
        reported_signal: Option<String>,
    },
    Timeout,
    Signaled(String),
    NonZeroExit(i32),
    CleanExit,
}

impl Observation {
    pub fn spawn_failed(reason: String) -> Self {
        Self {
            termination: Termination::SpawnFailed(reason),
            overflow: None,
            timed_out: false,
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    pub fn cause(&self) -> Cause {
        let exit = match &self.termination {
            Termination::SpawnFailed(reason) => return Cause::SpawnFailed(reason.clone()),
            Termination::WaitFailed(reason) => return Cause::WaitFailed(reason.clone()),
            Termination::Exited(exit) => exit,
        };

        if let Some(stream) = self.overflow {
            // Mirrors whatever the OS reported for the kill, possibly nothing
            let reported_signal = match exit {
                ExitOutcome::Signaled(name) => Some(name.clone()),
                ExitOutcome::Exited(_) => None,
            };
            return Cause::BufferOverflow {
                stream,
                reported_signal,
            };
        }

        if self.timed_out {
            return Cause::Timeout;
        }

        match exit {
            ExitOutcome::Signaled(name) => Cause::Signaled(name.clone()),
            ExitOutcome::Exited(0) => Cause::CleanExit,
            ExitOutcome::Exited(code) => Cause::NonZeroExit(*code),
        }
    }

    /// Build the final result; `display` is `SpawnSpec::display_form()`
    pub fn reduce(self, display: &str) -> InvocationResult {
        let cause = self.cause();
        let stdout = String::from_utf8_lossy(&self.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&self.stderr).into_owned();

        let (status, signal, failure) = match cause {
            Cause::SpawnFailed(reason) => (
                None,
                None,
                Some((ExecErrorKind::Spawn, format!("{}: {}", display, reason))),
            ),
            Cause::WaitFailed(reason) => (
                None,
                None,
                Some((ExecErrorKind::Wait, format!("{}: {}", display, reason))),
            ),
            Cause::BufferOverflow {
                stream,
                reported_signal,
            } => (
                None,
                reported_signal,
                Some((
                    ExecErrorKind::BufferOverflow { stream },
                    format!("{}: {} maxBuffer exceeded.", display, stream),
                )),
            ),
            Cause::Timeout => (
                None,
                Some(TIMEOUT_KILL_SIGNAL.to_string()),
                Some((
                    ExecErrorKind::Timeout,
                    format!(
                        "{}: unexpectedly terminated by signal {}",
                        display, TIMEOUT_KILL_SIGNAL
                    ),
                )),
            ),
            Cause::Signaled(name) => (
                None,
                Some(name.clone()),
                Some((
                    ExecErrorKind::Signaled,
                    format!("{}: unexpectedly terminated by signal {}", display, name),
                )),
            ),
            Cause::NonZeroExit(code) => (
                Some(code),
                None,
                Some((
                    ExecErrorKind::NonZeroExit,
                    format!("{}: exited with status {}", display, code),
                )),
            ),
            Cause::CleanExit => (Some(0), None, None),
        };

        let error = failure.map(|(kind, message)| {
            ExecError::new(
                kind,
                message,
                status,
                signal.clone(),
                stdout.clone(),
                stderr.clone(),
            )
        });

        InvocationResult {
            status,
            signal,
            stdout,
            stderr,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISPLAY: &str = r#"exec "/bin/sh" "-c" "cmd""#;

    fn exited(exit: ExitOutcome) -> Observation {
        Observation {
            termination: Termination::Exited(exit),
            overflow: None,
            timed_out: false,
            stdout: b"out".to_vec(),
            stderr: b"err".to_vec(),
        }
    }

    #[test]
    fn test_clean_exit_is_only_success() {
        let result = exited(ExitOutcome::Exited(0)).reduce(DISPLAY);

        assert_eq!(result.status, Some(0));
        assert_eq!(result.signal, None);
        assert_eq!(result.error, None);
        assert_eq!(result.stdout, "out");
        assert_eq!(result.stderr, "err");
    }

    #[test]
    fn test_non_zero_exit() {
        let result = exited(ExitOutcome::Exited(2)).reduce(DISPLAY);
        let err = result.error.clone().unwrap();

        assert_eq!(result.status, Some(2));
        assert_eq!(result.signal, None);
        assert_eq!(
            err.message(),
            r#"exec "/bin/sh" "-c" "cmd": exited with status 2"#
        );
        assert_eq!(err.kind(), &ExecErrorKind::NonZeroExit);
        assert_eq!(err.status(), Some(2));
        assert_eq!(err.stderr(), "err");
    }

    #[test]
    fn test_external_signal() {
        let result = exited(ExitOutcome::Signaled("SIGTERM".to_string())).reduce(DISPLAY);

        assert_eq!(result.status, None);
        assert_eq!(result.signal.as_deref(), Some("SIGTERM"));
        assert!(result
            .error
            .unwrap()
            .message()
            .ends_with("unexpectedly terminated by signal SIGTERM"));
    }

    #[test]
    fn test_timeout_always_reports_sigkill() {
        let mut obs = exited(ExitOutcome::Exited(0));
        obs.timed_out = true;

        let result = obs.reduce(DISPLAY);

        assert_eq!(result.status, None);
        assert_eq!(result.signal.as_deref(), Some("SIGKILL"));
        assert_eq!(result.error.unwrap().kind(), &ExecErrorKind::Timeout);
    }

    #[test]
    fn test_overflow_mirrors_reported_signal() {
        // Timeout and overflow deliberately differ here: overflow keeps
        // whatever the OS reported, including nothing at all.
        let mut unreported = exited(ExitOutcome::Exited(0));
        unreported.overflow = Some(StreamName::Stdout);
        let result = unreported.reduce(DISPLAY);
        assert_eq!(result.status, None);
        assert_eq!(result.signal, None);
        assert!(result
            .error
            .unwrap()
            .message()
            .ends_with("stdout maxBuffer exceeded."));

        let mut reported = exited(ExitOutcome::Signaled("SIGKILL".to_string()));
        reported.overflow = Some(StreamName::Stderr);
        let result = reported.reduce(DISPLAY);
        assert_eq!(result.status, None);
        assert_eq!(result.signal.as_deref(), Some("SIGKILL"));
        assert!(result
            .error
            .unwrap()
            .message()
            .ends_with("stderr maxBuffer exceeded."));
    }

    #[test]
    fn test_overflow_wins_over_timeout() {
        let mut obs = exited(ExitOutcome::Signaled("SIGKILL".to_string()));
        obs.timed_out = true;
        obs.overflow = Some(StreamName::Stdout);

        assert_eq!(
            obs.cause(),
            Cause::BufferOverflow {
                stream: StreamName::Stdout,
                reported_signal: Some("SIGKILL".to_string()),
            }
        );
    }

    #[test]
    fn test_spawn_failure_has_no_status_or_output() {
        let result = Observation::spawn_failed("No such file or directory (os error 2)".into())
            .reduce(r#"exec "nope""#);

        assert_eq!(result.status, None);
        assert_eq!(result.signal, None);
        assert_eq!(result.stdout, "");
        assert_eq!(result.stderr, "");
        assert_eq!(
            result.error.unwrap().message(),
            r#"exec "nope": No such file or directory (os error 2)"#
        );
    }

    #[test]
    fn test_wait_failure_precedes_watchdogs() {
        let obs = Observation {
            termination: Termination::WaitFailed("Interrupted".into()),
            overflow: Some(StreamName::Stdout),
            timed_out: true,
            stdout: Vec::new(),
            stderr: Vec::new(),
        };

        assert_eq!(obs.cause(), Cause::WaitFailed("Interrupted".into()));
    }

    #[test]
    fn test_error_matches_result_fields() {
        for exit in [
            ExitOutcome::Exited(1),
            ExitOutcome::Signaled("SIGHUP".to_string()),
        ] {
            let result = exited(exit).reduce(DISPLAY);
            let err = result.error.clone().unwrap();

            assert_eq!(err.status(), result.status);
            assert_eq!(err.signal(), result.signal.as_deref());
            assert_eq!(err.stdout(), result.stdout);
            assert_eq!(err.stderr(), result.stderr);
            assert!(result.status.is_none() || result.signal.is_none());
        }
    }
}
