//! Forkexec CLI - run one command and report its normalized outcome
//! Thin caller around ExecutionCoordinator + TokioProcessSpawner

mod logging;
mod render;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use forkexec_core::{ExecMode, ExecutionCoordinator, InvocationRequest};
use forkexec_infra_system::TokioProcessSpawner;

#[derive(Parser, Debug)]
#[command(name = "forkexec")]
#[command(about = "Run a command and report its exit status, signal and output", long_about = None)]
#[command(version)]
struct Cli {
    /// Run the command line through `/bin/sh -c` instead of executing argv directly
    #[arg(long, env = "FORKEXEC_SHELL")]
    shell: bool,

    /// Kill the process if it is still running after this many milliseconds
    #[arg(long, env = "FORKEXEC_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Kill the process once stdout or stderr exceeds this many bytes
    #[arg(long, env = "FORKEXEC_MAX_BUFFER")]
    max_buffer: Option<usize>,

    /// Working directory for the child
    #[arg(long, env = "FORKEXEC_CWD")]
    cwd: Option<PathBuf>,

    /// Extra environment variable for the child (KEY=VALUE, repeatable)
    #[arg(short, long = "env", value_parser = parse_env_pair)]
    env: Vec<(String, String)>,

    /// Read invocation options (argv/command, env, cwd, timeout, maxBuffer) from a JSON file
    #[arg(long, conflicts_with = "command")]
    options: Option<PathBuf>,

    /// Print the result as JSON instead of passing the output through
    #[arg(long)]
    json: bool,

    /// Program and arguments, or the shell command line with --shell
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn parse_env_pair(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// An options file carrying `command` runs through the shell even without --shell
fn options_mode(shell: bool, options: &serde_json::Value) -> ExecMode {
    if shell || options.get("command").is_some() {
        ExecMode::Shell
    } else {
        ExecMode::Argv
    }
}

/// Flags given on the command line override the options file
fn build_request(cli: &Cli) -> Result<InvocationRequest> {
    let mode = if cli.shell {
        ExecMode::Shell
    } else {
        ExecMode::Argv
    };

    let mut request = match &cli.options {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read options file {}", path.display()))?;
            let options: serde_json::Value =
                serde_json::from_str(&raw).context("Invalid JSON options")?;
            InvocationRequest::from_options(options_mode(cli.shell, &options), &options)?
        }
        None => {
            if cli.command.is_empty() {
                bail!("no command given (pass it after `--`, or use --options <file>)");
            }
            match mode {
                ExecMode::Shell => InvocationRequest::shell(cli.command.join(" ")),
                ExecMode::Argv => InvocationRequest::argv(cli.command.clone()),
            }
        }
    };

    if let Some(ms) = cli.timeout_ms {
        request = request.timeout_millis(ms);
    }
    if let Some(bytes) = cli.max_buffer {
        request = request.max_buffer_bytes(bytes);
    }
    if let Some(cwd) = &cli.cwd {
        request = request.cwd(cwd.clone());
    }
    if !cli.env.is_empty() {
        request = request.envs(cli.env.iter().cloned());
    }

    Ok(request)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging()?;

    let request = build_request(&cli)?;
    debug!(mode = %request.mode(), "Built invocation request");

    let coordinator = ExecutionCoordinator::new(Arc::new(TokioProcessSpawner::new()));
    let result = coordinator
        .execute(request)
        .await
        .context("Invocation rejected")?;

    if cli.json {
        render::print_json(&result)?;
    } else {
        render::print_human(&result)?;
    }

    std::process::exit(render::exit_code(&result));
}
