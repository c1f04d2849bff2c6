//! CLI error reporting
//!
//! Library errors are wrapped here so miette can render them with a code
//! and a hint at the command line.

use miette::Diagnostic;
use serialgen_common::loader::LoadError;
use serialgen_core::GenerateError;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("{message}")]
    #[diagnostic(
        code(serialgen::config),
        help("check serialgen.toml or pass --config explicitly")
    )]
    Config { message: String },

    #[error("Failed to load type index")]
    #[diagnostic(
        code(serialgen::index),
        help("the [project] index patterns decide which files are read")
    )]
    Index(#[source] LoadError),

    #[error("No owner types to generate")]
    #[diagnostic(
        code(serialgen::no_owners),
        help("pass --owner, list [codegen] owners, or annotate a type with serial_types")
    )]
    NoOwners,

    #[error("Owners {first} and {second} both generate unit {unit}")]
    #[diagnostic(
        code(serialgen::unit_collision),
        help("unit names replace `.` and `$` with `_`; rename one of the owners")
    )]
    UnitCollision {
        unit: String,
        first: String,
        second: String,
    },

    #[error("Generation failed for {owner}")]
    #[diagnostic(code(serialgen::generate))]
    Generate {
        owner: String,
        #[help]
        hint: String,
        #[source]
        source: GenerateError,
    },

    #[error("{failed} of {total} owners failed")]
    #[diagnostic(
        code(serialgen::generate),
        help("diagnostic logs for each owner are in the private directory")
    )]
    Partial { failed: usize, total: usize },

    #[error("Failed to write generated files: {message}")]
    #[diagnostic(
        code(serialgen::publish),
        help("nothing from this owner was published")
    )]
    Publish { message: String },

    #[error("{count} problems found in the type index")]
    #[diagnostic(code(serialgen::validate))]
    Invalid { count: usize },

    #[error("Failed to write output: {0}")]
    #[diagnostic(code(serialgen::output))]
    Output(String),
}

impl CliError {
    pub fn config(err: anyhow::Error) -> Self {
        CliError::Config {
            message: format!("{:#}", err),
        }
    }

    pub fn publish(err: anyhow::Error) -> Self {
        CliError::Publish {
            message: format!("{:#}", err),
        }
    }

    pub fn generate(owner: &str, source: GenerateError) -> Self {
        let hint = if let GenerateError::MissingConfiguration { .. } = source {
            "add a serial_types table to the owner's declaration".to_string()
        } else if let Some(name) = source.missing_type_name() {
            format!("{} is not declared in any index file", name)
        } else {
            format!("run `serialgen closure --owner {}` to inspect the closure", owner)
        };
        CliError::Generate {
            owner: owner.to_string(),
            hint,
            source,
        }
    }
}

impl From<LoadError> for CliError {
    fn from(err: LoadError) -> Self {
        CliError::Index(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_type_hint_names_the_type() {
        let err = CliError::generate(
            "app.Feed",
            GenerateError::UnresolvedRoot {
                root: "app.Point".into(),
                source: Box::new(GenerateError::type_not_found("app.Point")),
            },
        );
        let help = err.help().map(|h| h.to_string()).unwrap();
        assert_eq!(help, "app.Point is not declared in any index file");
        assert_eq!(err.code().map(|c| c.to_string()).unwrap(), "serialgen::generate");
    }

    #[test]
    fn test_closure_errors_point_at_closure_command() {
        let err = CliError::generate(
            "app.Feed",
            GenerateError::Closure {
                type_name: "app.Socket".into(),
                reason: "not serializable".into(),
                via: "field app.Feed.socket".into(),
            },
        );
        let help = err.help().map(|h| h.to_string()).unwrap();
        assert!(help.contains("serialgen closure --owner app.Feed"));
    }
}
