//! Input/output: errors, configuration, the command line and the terminal host

/// Group directory archive and README reporting
pub mod archive;
/// Command-line parsing and subcommand orchestration
pub mod cli;
/// Constants and layered configuration
pub mod configuration;
/// Error types
pub mod error;
/// Tracing subscriber set-up
pub mod logging;
/// Progress bars
pub mod progress;
/// Interactive terminal host
pub mod terminal;
