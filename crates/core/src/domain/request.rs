// Invocation Request - what to run, where, and under which limits

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

use super::error::{DomainError, Result};
use super::spawn_spec::SpawnSpec;

/// Shell used for SHELL mode (`<shell> -c <command>`)
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Option keys accepted by [`InvocationRequest::from_options`]
const KNOWN_OPTIONS: &[&str] = &[
    "argv",
    "command",
    "env",
    "cwd",
    "timeout",
    "timeoutMillis",
    "maxBuffer",
    "maxBufferBytes",
];

/// How the program is started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecMode {
    /// Run `argv[0]` directly with `argv[1..]` as arguments
    Argv,
    /// Wrap a command string in `/bin/sh -c`
    Shell,
}

impl std::fmt::Display for ExecMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecMode::Argv => write!(f, "ARGV"),
            ExecMode::Shell => write!(f, "SHELL"),
        }
    }
}

/// The thing to run; exactly one form is meaningful per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    Argv(Vec<String>),
    Shell(String),
}

/// Invocation request (immutable once handed to the coordinator)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub command: CommandLine,
    /// Overrides/extends the inherited environment
    pub env: Option<HashMap<String, String>>,
    pub cwd: Option<PathBuf>,
    pub timeout_millis: Option<u64>,
    pub max_buffer_bytes: Option<usize>,
}

impl InvocationRequest {
    /// Run a program directly: `argv[0]` is the program, the rest its arguments
    pub fn argv<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_command(CommandLine::Argv(argv.into_iter().map(Into::into).collect()))
    }

    /// Run a command line through `/bin/sh -c`
    pub fn shell(command: impl Into<String>) -> Self {
        Self::with_command(CommandLine::Shell(command.into()))
    }

    fn with_command(command: CommandLine) -> Self {
        Self {
            command,
            env: None,
            cwd: None,
            timeout_millis: None,
            max_buffer_bytes: None,
        }
    }

    /// Set one environment variable for the child
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set several environment variables for the child
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env = self.env.get_or_insert_with(HashMap::new);
        for (k, v) in vars {
            env.insert(k.into(), v.into());
        }
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn timeout_millis(mut self, millis: u64) -> Self {
        self.timeout_millis = Some(millis);
        self
    }

    pub fn max_buffer_bytes(mut self, bytes: usize) -> Self {
        self.max_buffer_bytes = Some(bytes);
        self
    }

    pub fn mode(&self) -> ExecMode {
        match self.command {
            CommandLine::Argv(_) => ExecMode::Argv,
            CommandLine::Shell(_) => ExecMode::Shell,
        }
    }

    /// Build a request from a loosely-typed options object
    ///
    /// Recognized keys: `argv` (ARGV mode) or `command` (SHELL mode), `env`,
    /// `cwd`, `timeout`/`timeoutMillis`, `maxBuffer`/`maxBufferBytes`.
    ///
    /// # Example
    /// ```text
    /// let req = InvocationRequest::from_options(
    ///     ExecMode::Argv,
    ///     &json!({"argv": ["echo", "hello", "world"], "maxBuffer": 5}),
    /// )?;
    /// ```
    pub fn from_options(mode: ExecMode, options: &Value) -> Result<Self> {
        let obj = options
            .as_object()
            .ok_or_else(|| invalid("options must be an object"))?;

        if let Some(unknown) = obj.keys().find(|k| !KNOWN_OPTIONS.contains(&k.as_str())) {
            return Err(invalid(format!("unknown option '{}'", unknown)));
        }

        let mut req = match mode {
            ExecMode::Argv => {
                if obj.contains_key("command") {
                    return Err(invalid("'command' is not accepted in ARGV mode"));
                }
                let argv = obj
                    .get("argv")
                    .and_then(Value::as_array)
                    .ok_or_else(|| invalid("'argv' must be an array of strings"))?
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<Vec<String>>>()
                    .ok_or_else(|| invalid("'argv' must be an array of strings"))?;
                Self::argv(argv)
            }
            ExecMode::Shell => {
                if obj.contains_key("argv") {
                    return Err(invalid("'argv' is not accepted in SHELL mode"));
                }
                let command = obj
                    .get("command")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("'command' must be a string"))?;
                Self::shell(command)
            }
        };

        if let Some(env) = obj.get("env") {
            let env = env
                .as_object()
                .ok_or_else(|| invalid("'env' must be an object of strings"))?;
            let vars = env
                .iter()
                .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect::<Option<HashMap<String, String>>>()
                .ok_or_else(|| invalid("'env' must be an object of strings"))?;
            req.env = Some(vars);
        }

        if let Some(cwd) = obj.get("cwd") {
            let cwd = cwd
                .as_str()
                .ok_or_else(|| invalid("'cwd' must be a string"))?;
            req.cwd = Some(PathBuf::from(cwd));
        }

        req.timeout_millis = positive_integer(obj, &["timeout", "timeoutMillis"])?;
        req.max_buffer_bytes = positive_integer(obj, &["maxBuffer", "maxBufferBytes"])?
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX));

        req.validate()?;
        Ok(req)
    }

    /// Check the request before anything is spawned
    pub fn validate(&self) -> Result<()> {
        match &self.command {
            CommandLine::Argv(argv) => match argv.first() {
                None => return Err(invalid("'argv' must not be empty")),
                Some(program) if program.is_empty() => {
                    return Err(invalid("'argv[0]' must not be empty"))
                }
                Some(_) => {}
            },
            CommandLine::Shell(command) => {
                if command.is_empty() {
                    return Err(invalid("'command' must not be empty"));
                }
            }
        }

        if self.timeout_millis == Some(0) {
            return Err(invalid("'timeout' must be a positive integer"));
        }
        if self.max_buffer_bytes == Some(0) {
            return Err(invalid("'maxBuffer' must be a positive integer"));
        }

        Ok(())
    }

    /// Program, arguments, env and cwd as handed to the OS layer
    pub fn spawn_spec(&self) -> SpawnSpec {
        let (program, args) = match &self.command {
            CommandLine::Argv(argv) => {
                let mut iter = argv.iter().cloned();
                let program = iter.next().unwrap_or_default();
                (program, iter.collect())
            }
            CommandLine::Shell(command) => (
                DEFAULT_SHELL.to_string(),
                vec!["-c".to_string(), command.clone()],
            ),
        };

        SpawnSpec {
            program,
            args,
            env: self.env.clone(),
            cwd: self.cwd.clone(),
        }
    }
}

fn invalid(msg: impl Into<String>) -> DomainError {
    DomainError::InvalidRequest(msg.into())
}

/// First present key wins; the value must be an integer > 0
fn positive_integer(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Result<Option<u64>> {
    let Some((key, value)) = keys.iter().find_map(|k| obj.get(*k).map(|v| (*k, v))) else {
        return Ok(None);
    };

    match value.as_u64() {
        Some(n) if n > 0 => Ok(Some(n)),
        _ => Err(invalid(format!("'{}' must be a positive integer", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_argv_spawn_spec() {
        let spec = InvocationRequest::argv(["echo", "hello", "world"]).spawn_spec();

        assert_eq!(spec.program, "echo");
        assert_eq!(spec.args, vec!["hello", "world"]);
    }

    #[test]
    fn test_shell_spawn_spec_wraps_in_sh() {
        let spec = InvocationRequest::shell("sleep 2").spawn_spec();

        assert_eq!(spec.program, "/bin/sh");
        assert_eq!(spec.args, vec!["-c", "sleep 2"]);
    }

    #[test]
    fn test_validate_rejects_empty_argv() {
        let empty: Vec<String> = vec![];
        let result = InvocationRequest::argv(empty).validate();

        assert!(result.unwrap_err().to_string().contains("must not be empty"));
    }

    #[test]
    fn test_validate_rejects_empty_command() {
        assert!(InvocationRequest::shell("").validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        assert!(InvocationRequest::shell("true")
            .timeout_millis(0)
            .validate()
            .is_err());
        assert!(InvocationRequest::shell("true")
            .max_buffer_bytes(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_options_argv() {
        let req = InvocationRequest::from_options(
            ExecMode::Argv,
            &json!({"argv": ["echo", "hello", "world"], "maxBuffer": 5}),
        )
        .unwrap();

        assert_eq!(req.mode(), ExecMode::Argv);
        assert_eq!(req.max_buffer_bytes, Some(5));
        assert_eq!(req.timeout_millis, None);
    }

    #[test]
    fn test_from_options_shell_with_env_and_cwd() {
        let req = InvocationRequest::from_options(
            ExecMode::Shell,
            &json!({
                "command": "echo $FOO",
                "env": {"FOO": "bar"},
                "cwd": "/tmp",
                "timeoutMillis": 1000
            }),
        )
        .unwrap();

        assert_eq!(req.command, CommandLine::Shell("echo $FOO".to_string()));
        assert_eq!(req.env.unwrap().get("FOO").map(String::as_str), Some("bar"));
        assert_eq!(req.cwd, Some(PathBuf::from("/tmp")));
        assert_eq!(req.timeout_millis, Some(1000));
    }

    #[test]
    fn test_from_options_rejects_non_string_argv() {
        let result =
            InvocationRequest::from_options(ExecMode::Argv, &json!({"argv": ["echo", 42]}));

        assert!(result.unwrap_err().to_string().contains("array of strings"));
    }

    #[test]
    fn test_from_options_rejects_non_string_command() {
        let result = InvocationRequest::from_options(ExecMode::Shell, &json!({"command": ["ls"]}));

        assert!(result.is_err());
    }

    #[test]
    fn test_from_options_rejects_bad_timeouts() {
        for bad in [json!(0), json!(-5), json!(1.5), json!("100")] {
            let result = InvocationRequest::from_options(
                ExecMode::Shell,
                &json!({"command": "true", "timeout": bad}),
            );
            assert!(
                result.unwrap_err().to_string().contains("positive integer"),
                "timeout {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_from_options_rejects_unknown_and_mismatched_keys() {
        assert!(InvocationRequest::from_options(
            ExecMode::Shell,
            &json!({"command": "true", "stdin": "x"})
        )
        .is_err());
        assert!(InvocationRequest::from_options(
            ExecMode::Argv,
            &json!({"argv": ["true"], "command": "true"})
        )
        .is_err());
    }
}
