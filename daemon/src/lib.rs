/// Swank daemon: TCP server exposing the SWANK protocol over the wire
/// layer in swank-core, plus the console REPL running beside it.

pub mod config;
pub mod errors;
pub mod repl;
pub mod server;
pub mod startup;

// Re-export commonly used types
pub use config::{DaemonConfig, LoggingConfig, ServerConfig};
pub use errors::{ServerError, ServerResult};
pub use server::SwankServer;

/// Daemon version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
