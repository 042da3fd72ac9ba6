// Forkexec Core - Domain Logic & Ports
// NO infrastructure dependencies (hexagonal layout: OS process handling sits behind port::ProcessSpawner)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::ExecutionCoordinator;
pub use domain::{ExecError, ExecErrorKind, ExecMode, InvocationRequest, InvocationResult};
pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
