// Result rendering for the CLI (pass-through + summary table, or JSON)

use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use tabled::{Table, Tabled};

use forkexec_core::InvocationResult;

#[derive(Tabled)]
struct SummaryRow {
    field: &'static str,
    value: String,
}

fn or_null<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "null".to_string())
}

/// Child output to our stdout/stderr, then a summary on stderr
pub fn print_human(result: &InvocationResult) -> Result<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(result.stdout.as_bytes())?;
    out.flush()?;

    let mut err = std::io::stderr().lock();
    err.write_all(result.stderr.as_bytes())?;

    let rows = vec![
        SummaryRow {
            field: "status",
            value: or_null(result.status),
        },
        SummaryRow {
            field: "signal",
            value: or_null(result.signal.as_deref()),
        },
        SummaryRow {
            field: "error",
            value: or_null(result.error.as_ref().map(|e| e.message())),
        },
    ];

    let headline = if result.is_success() {
        "✓ Command succeeded".green().bold()
    } else {
        "✗ Command failed".red().bold()
    };

    writeln!(err)?;
    writeln!(err, "{}", headline)?;
    writeln!(err, "{}", Table::new(rows))?;
    err.flush()?;

    Ok(())
}

pub fn print_json(result: &InvocationResult) -> Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", serde_json::to_string_pretty(result)?)?;
    out.flush()?;
    Ok(())
}

/// 0 on success, the child's status for a non-zero exit, 1 otherwise
pub fn exit_code(result: &InvocationResult) -> i32 {
    match (&result.error, result.status) {
        (None, _) => 0,
        (Some(_), Some(code)) => code,
        (Some(_), None) => 1,
    }
}
