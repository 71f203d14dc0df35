// All fill logic is in fillmate-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod data_dir;
pub mod logging;

// Re-export core types for convenience
pub use fillmate_core::*;

// Re-export CLI utilities
pub use data_dir::DataDirManager;
