// Executor constants (no magic values)

/// Bytes requested per read from a child's output stream (8 KiB)
pub const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Signal reported for a timeout kill, whatever the OS surfaces
pub const TIMEOUT_KILL_SIGNAL: &str = "SIGKILL";
