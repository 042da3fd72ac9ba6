// Signal naming - raw signal numbers to "SIGKILL"-style names

/// Name for a raw signal number, e.g. 9 -> "SIGKILL"
///
/// Numbers nix has no name for (realtime signals) render as "SIG<n>".
#[cfg(unix)]
pub fn signal_name(raw: i32) -> String {
    use nix::sys::signal::Signal;

    Signal::try_from(raw)
        .map(|sig| sig.as_str().to_string())
        .unwrap_or_else(|_| format!("SIG{}", raw))
}

#[cfg(not(unix))]
pub fn signal_name(raw: i32) -> String {
    format!("SIG{}", raw)
}
