// Port Layer - Interfaces for external dependencies

pub mod process_spawner;

// Re-exports
pub use process_spawner::{ChildProcess, ExitOutcome, OutputStream, ProcessSpawner};
pub use process_spawner::mocks;
