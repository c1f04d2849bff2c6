//! Command output
//!
//! Every command result can be printed for a person or as one JSON document
//! on stdout. Logging goes to stderr so the two never mix.

use crate::error::CliError;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_flags(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Plain-text rendering of a command result
pub trait HumanOutput {
    fn render_human(&self) -> String;
}

pub fn render<T: Serialize + HumanOutput>(format: OutputFormat, value: &T) -> Result<String, CliError> {
    match format {
        OutputFormat::Human => Ok(value.render_human()),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(value)
                .map_err(|e| CliError::Output(e.to_string()))?;
            json.push('\n');
            Ok(json)
        }
    }
}

pub fn write_output<T: Serialize + HumanOutput>(format: OutputFormat, value: &T) -> Result<(), CliError> {
    let text = render(format, value)?;
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.flush())
        .map_err(|e| CliError::Output(e.to_string()))
}
