//! serialgen command line
//!
//! The binary is a thin clap front end; commands live here so tests can
//! drive them without spawning a process.

pub mod commands;
pub mod error;
pub mod logging;
pub mod output;

pub use error::CliError;
pub use output::OutputFormat;
