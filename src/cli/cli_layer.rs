// CLI layer - argument parsing and terminal output.
// Stands where an HTTP layer would: thin adapters over the core services.

pub mod commands;
pub mod formatter;

pub use commands::{run, Cli};
