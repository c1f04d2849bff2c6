pub mod codegen;
pub mod config;
pub mod context;
pub mod loader;
pub mod sinks;
pub mod vfs;

pub type Result<T> = anyhow::Result<T>;
