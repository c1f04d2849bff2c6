//! Code sinks
//!
//! Concrete [`CodeSink`] backends selected by `[codegen] sink` or `--sink`.

pub mod json;
pub mod rust;

pub use json::JsonSink;
pub use rust::RustSourceSink;

use serde::{Deserialize, Serialize};
use serialgen_core::CodeSink;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Self-contained Rust module
    #[default]
    Rust,
    /// Pretty-printed dispatch table
    Json,
}

impl SinkKind {
    pub fn create(self) -> Box<dyn CodeSink> {
        match self {
            SinkKind::Rust => Box::new(RustSourceSink),
            SinkKind::Json => Box::new(JsonSink),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SinkKind::Rust => "rust",
            SinkKind::Json => "json",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rust" => Ok(SinkKind::Rust),
            "json" => Ok(SinkKind::Json),
            other => Err(format!("unknown sink '{}', expected rust or json", other)),
        }
    }
}
