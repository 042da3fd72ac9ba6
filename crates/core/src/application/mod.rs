// Application Layer - Use Cases

pub mod executor;

// Re-exports
pub use executor::ExecutionCoordinator;
