// Forkexec Infrastructure - System Adapters
// Implements: ProcessSpawner

pub mod process_spawner;
pub mod signal_name;

pub use process_spawner::TokioProcessSpawner;
