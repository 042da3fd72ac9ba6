// Domain Layer - Invocation requests, results and their error values

pub mod error;
pub mod request;
pub mod result;
pub mod spawn_spec;

// Re-exports
pub use error::{DomainError, ExecError, ExecErrorKind};
pub use request::{CommandLine, ExecMode, InvocationRequest, DEFAULT_SHELL};
pub use result::{InvocationResult, StreamName};
pub use spawn_spec::SpawnSpec;
